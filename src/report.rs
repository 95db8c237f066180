//! The reporter: summarises non-persistent stores, overwrite events, and
//! multi-flush events, either at teardown or on demand (`WRITE_STATS`,
//! `print_stats`).

use std::fmt;
use std::io::{self, Write};

use crate::callsite::CallSite;
use crate::ingest::OverwriteRecord;
use crate::interval::Interval;
use crate::region::Regions;
use crate::state_machine::MultiFlushRecord;
use crate::tracker::Tracker;

/// `{call-site stack, addr, size, state-name}` -- the reporter's per-entry
/// detail shape, shared by every list it renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub context: CallSite,
    pub addr: u64,
    pub size: u64,
    pub state: &'static str,
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#x}+{:#x} [{}] at {}",
            self.addr, self.size, self.state, self.context
        )
    }
}

/// A full teardown summary.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub non_persistent: Vec<Detail>,
    pub overwrites: Option<Vec<Detail>>,
    pub multi_flush: Option<Vec<Detail>>,
}

impl Summary {
    pub fn non_persistent_bytes(&self) -> u64 {
        self.non_persistent.iter().map(|d| d.size).sum()
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "non-persistent stores: {}", self.non_persistent.len())?;
        for d in &self.non_persistent {
            writeln!(w, "  {}", d)?;
        }
        if let Some(overwrites) = &self.overwrites {
            writeln!(w, "overwrites: {}", overwrites.len())?;
            for d in overwrites {
                writeln!(w, "  {}", d)?;
            }
        }
        if let Some(multi_flush) = &self.multi_flush {
            writeln!(w, "redundant flushes: {}", multi_flush.len())?;
            for d in multi_flush {
                writeln!(w, "  {}", d)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.write_to(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

/// Build the teardown summary from the engine's current state.
///
/// `track_multiple_stores`/`check_flush` gate whether the overwrite and
/// multi-flush sections are present at all ("If
/// `check_flush`: ..."; "If `track_multiple_stores`: ...").
pub fn summarize(
    tracker: &Tracker,
    overwrites: &[OverwriteRecord],
    multi_flush: &[MultiFlushRecord],
    track_multiple_stores: bool,
    check_flush: bool,
) -> Summary {
    let non_persistent = tracker
        .iter()
        .map(|(iv, payload)| Detail {
            context: payload.context.clone(),
            addr: iv.addr,
            size: iv.size,
            state: payload.state.as_str(),
        })
        .collect();

    let overwrites = track_multiple_stores.then(|| {
        overwrites
            .iter()
            .map(|r| Detail {
                context: r.payload.context.clone(),
                addr: r.addr.addr,
                size: r.addr.size,
                state: r.payload.state.as_str(),
            })
            .collect()
    });

    let multi_flush = check_flush.then(|| {
        multi_flush
            .iter()
            .map(|r| Detail {
                context: r.payload.context.clone(),
                addr: r.addr.addr,
                size: r.addr.size,
                state: r.payload.state.as_str(),
            })
            .collect()
    });

    Summary {
        non_persistent,
        overwrites,
        multi_flush,
    }
}

/// Dump the contents of a region registry (`PRINT_PMEM_MAPPINGS`,
/// `print_pmem_regions`, `print_log_regions`).
pub fn write_regions<W: Write>(mut w: W, regions: &Regions) -> io::Result<()> {
    for iv in regions.iter() {
        writeln!(w, "{}", Interval::new(iv.addr, iv.size))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callsite::CallSite;
    use crate::tracker::StorePayload;

    #[test]
    fn summary_reports_non_persistent_bytes() {
        let mut tracker = Tracker::new();
        tracker.put(Interval::new(0x1000, 8), StorePayload::new(0xDEAD, 0, CallSite::empty()));
        let summary = summarize(&tracker, &[], &[], false, false);
        assert_eq!(summary.non_persistent.len(), 1);
        assert_eq!(summary.non_persistent_bytes(), 8);
        assert!(summary.overwrites.is_none());
        assert!(summary.multi_flush.is_none());
    }
}
