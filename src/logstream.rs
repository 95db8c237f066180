//! The log stream: a sink that emits fixed-format human-readable records
//! of every store/flush/fence/commit event, gated by configuration and by
//! whether any loggable regions are registered.
//!
//! Record formats are fixed: every record is prefixed
//! with `|`, integers are lower-case hex with a `0x` prefix and no
//! padding (Rust's `{:#x}` formatter matches this exactly).

use std::io::{self, Write};

use crate::region::Regions;
use crate::state_machine::ReorderMarker;
use crate::Config;

/// Writes fixed-format records to any `impl Write`. Logging is a side
/// effect only -- it never affects the state machine, so every method
/// here takes `&self`/`&Config` plus the data to render and returns
/// `io::Result<()>` from the underlying sink alone.
pub struct LogStream<W: Write> {
    sink: W,
    started: bool,
}

impl<W: Write> LogStream<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            started: false,
        }
    }

    /// `START` at init, if logging was requested at all. Unconditional on
    /// the per-event gate: a session either starts logging or it doesn't.
    pub fn start(&mut self) -> io::Result<()> {
        self.started = true;
        writeln!(self.sink, "START")
    }

    /// `|STOP` at fini.
    pub fn stop(&mut self) -> io::Result<()> {
        if self.started {
            writeln!(self.sink, "|STOP")?;
        }
        Ok(())
    }

    /// Gate shared by every record except `START`/`|STOP`: logging must be
    /// turned on for stores globally, and either the global toggle is on
    /// or at least one loggable region exists.
    fn gated(config: &Config, global_logging_on: bool, loggable_regions: &Regions) -> bool {
        config.log_stores && (global_logging_on || !loggable_regions.is_empty())
    }

    /// STORE records carry one more condition than the shared gate: when
    /// the global toggle is off (so the shared gate only passed because
    /// some loggable region exists somewhere), a given store is only
    /// logged if it specifically hits a loggable region -- not merely
    /// because the program registered one elsewhere.
    pub fn log_store(
        &mut self,
        config: &Config,
        global_logging_on: bool,
        loggable_regions: &Regions,
        addr: u64,
        value: u64,
        size: u64,
        hits_loggable_region: bool,
    ) -> io::Result<()> {
        if !config.log_stores {
            return Ok(());
        }
        if !global_logging_on && (loggable_regions.is_empty() || !hits_loggable_region) {
            return Ok(());
        }
        writeln!(self.sink, "|STORE;{:#x};{:#x};{:#x}", addr, value, size)
    }

    pub fn log_flush(
        &mut self,
        config: &Config,
        global_logging_on: bool,
        loggable_regions: &Regions,
        aligned_addr: u64,
        aligned_size: u64,
    ) -> io::Result<()> {
        if !Self::gated(config, global_logging_on, loggable_regions) {
            return Ok(());
        }
        writeln!(self.sink, "|FLUSH;{:#x};{:#x}", aligned_addr, aligned_size)
    }

    pub fn log_fence(
        &mut self,
        config: &Config,
        global_logging_on: bool,
        loggable_regions: &Regions,
    ) -> io::Result<()> {
        if !Self::gated(config, global_logging_on, loggable_regions) {
            return Ok(());
        }
        writeln!(self.sink, "|FENCE")
    }

    pub fn log_commit(
        &mut self,
        config: &Config,
        global_logging_on: bool,
        loggable_regions: &Regions,
    ) -> io::Result<()> {
        if !Self::gated(config, global_logging_on, loggable_regions) {
            return Ok(());
        }
        writeln!(self.sink, "|COMMIT")
    }

    pub fn log_register_file(
        &mut self,
        config: &Config,
        global_logging_on: bool,
        loggable_regions: &Regions,
        path: &str,
        addr: u64,
        size: u64,
        offset: u64,
    ) -> io::Result<()> {
        if !Self::gated(config, global_logging_on, loggable_regions) {
            return Ok(());
        }
        writeln!(
            self.sink,
            "|REGISTER_FILE;{};{:#x};{:#x};{:#x}",
            path, addr, size, offset
        )
    }

    pub fn log_reorder_marker(
        &mut self,
        config: &Config,
        global_logging_on: bool,
        loggable_regions: &Regions,
        marker: ReorderMarker,
    ) -> io::Result<()> {
        if !Self::gated(config, global_logging_on, loggable_regions) {
            return Ok(());
        }
        let tag = match marker {
            ReorderMarker::FullReorder => "|FREORDER",
            ReorderMarker::PartialReorder => "|PREORDER",
            ReorderMarker::OnlyFault => "|FAULT_ONLY",
            ReorderMarker::StopReorderFault => "|NO_REORDER_FAULT",
        };
        writeln!(self.sink, "{}", tag)
    }
}
