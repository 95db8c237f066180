//! CLI flag shapes accepted from the instrumentation host.
//!
//! Actual argv parsing belongs to the instrumentation host; this module
//! exists so the five flag shapes the host is documented to pass through
//! have one idiomatic, testable home, via `clap::Parser` rather than
//! hand-rolled parsing.

use clap::Parser;

use crate::config::{Config, DEFAULT_FLUSH_ALIGN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    fn as_bool(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "pmem-trace")]
#[command(about = "Flag shapes accepted from the instrumentation host", long_about = None)]
pub struct CliFlags {
    /// Track multiple in-flight stores to the same bytes as distinct
    /// overwrite events.
    #[arg(long = "mult-stores", value_enum, default_value_t = YesNo::No)]
    pub mult_stores: YesNo,

    /// Superblock-count indifference window for benign rewrites.
    #[arg(long = "indiff", default_value_t = 0)]
    pub indiff: u64,

    /// Emit the log stream.
    #[arg(long = "log-stores", value_enum, default_value_t = YesNo::No)]
    pub log_stores: YesNo,

    /// Emit the reporter summary at teardown.
    #[arg(long = "print-summary", value_enum, default_value_t = YesNo::Yes)]
    pub print_summary: YesNo,

    /// Record redundant flushes.
    #[arg(long = "flush-check", value_enum, default_value_t = YesNo::No)]
    pub flush_check: YesNo,
}

impl From<CliFlags> for Config {
    fn from(flags: CliFlags) -> Self {
        Config::new(
            flags.mult_stores.as_bool(),
            flags.log_stores.as_bool(),
            flags.print_summary.as_bool(),
            flags.flush_check.as_bool(),
            flags.indiff,
            DEFAULT_FLUSH_ALIGN,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_match_host_contract() {
        let flags = CliFlags::parse_from(["pmem-trace"]);
        let config: Config = flags.into();
        assert!(!config.track_multiple_stores);
        assert_eq!(config.store_sb_indiff, 0);
        assert!(!config.log_stores);
        assert!(config.print_summary);
        assert!(!config.check_flush);
    }

    #[test]
    fn flags_parse_through_to_config() {
        let flags = CliFlags::parse_from([
            "pmem-trace",
            "--mult-stores=yes",
            "--indiff=1000",
            "--log-stores=yes",
            "--print-summary=no",
            "--flush-check=yes",
        ]);
        let config: Config = flags.into();
        assert!(config.track_multiple_stores);
        assert_eq!(config.store_sb_indiff, 1000);
        assert!(config.log_stores);
        assert!(!config.print_summary);
        assert!(config.check_flush);
    }
}
