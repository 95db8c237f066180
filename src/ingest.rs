//! Store ingestion: filters every guest store through the region
//! registry, detects overwrite-before-persist, and inserts the surviving
//! store into the tracker.

use crate::callsite::CallSite;
use crate::interval::Interval;
use crate::region::RegionRegistry;
use crate::tracker::{StorePayload, Tracker};
use crate::Config;

/// Hard cap on the overwrite-record list. Exceeding it is fatal (the
/// engine aborts the traced process), matching the "overwrite flood"
/// error kind.
pub const MAX_MULT_OVERWRITES: usize = 10_000;

/// A saved in-flight store evicted by a later overlapping store under
/// conditions that make it a likely bug -- recorded verbatim from its
/// tracker entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OverwriteRecord {
    pub addr: Interval,
    pub payload: StorePayload,
}

/// Outcome of a single `trace_store` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Store was outside every persistent mapping; nothing happened.
    OutsideMapping,
    /// Store was ingested normally.
    Tracked,
    /// The overwrite-record list hit `MAX_MULT_OVERWRITES` on this call;
    /// the caller (the engine) must terminate the process.
    OverwriteFlood,
}

/// Ingest one guest store.
///
/// `overwrites` accumulates reportable overwrite records across the whole
/// run; this function never clears it, only appends, and returns
/// `IngestOutcome::OverwriteFlood` the moment appending would push it past
/// `MAX_MULT_OVERWRITES`.
#[allow(clippy::too_many_arguments)]
pub fn trace_store(
    registry: &RegionRegistry,
    tracker: &mut Tracker,
    overwrites: &mut Vec<OverwriteRecord>,
    config: &Config,
    addr: u64,
    size: u64,
    value: u64,
    current_sb: u64,
    context: CallSite,
) -> IngestOutcome {
    let iv = Interval::new(addr, size);
    if iv.is_empty() || !registry.persistent_mappings.contains_any(iv) {
        return IngestOutcome::OutsideMapping;
    }

    let incoming = StorePayload::new(value, current_sb, context);
    let mut flood = false;

    tracker.for_each_overlapping(iv, |_set, old_iv, old_payload| {
        if flood {
            return;
        }
        if !config.track_multiple_stores {
            // Silently drop `old`.
            return;
        }

        let benign = current_sb.saturating_sub(old_payload.block_num) < config.store_sb_indiff
            && old_iv == iv
            && old_payload.value == value;
        if benign {
            return;
        }

        if overwrites.len() >= MAX_MULT_OVERWRITES {
            flood = true;
            return;
        }
        overwrites.push(OverwriteRecord {
            addr: old_iv,
            payload: old_payload,
        });
    });

    if flood {
        return IngestOutcome::OverwriteFlood;
    }

    tracker.put(iv, incoming);
    IngestOutcome::Tracked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::StoreState;

    fn setup(track_multiple: bool, indiff: u64) -> (RegionRegistry, Tracker, Config) {
        let mut registry = RegionRegistry::new();
        registry.persistent_mappings.register(Interval::new(0x1000, 0x1000));
        let tracker = Tracker::new();
        let config = Config::new(track_multiple, false, true, false, indiff, 64);
        (registry, tracker, config)
    }

    #[test]
    fn store_outside_mapping_is_ignored() {
        let (registry, mut tracker, config) = setup(false, 0);
        let mut overwrites = Vec::new();
        let outcome = trace_store(
            &registry,
            &mut tracker,
            &mut overwrites,
            &config,
            0x5000,
            8,
            0xA,
            0,
            CallSite::empty(),
        );
        assert_eq!(outcome, IngestOutcome::OutsideMapping);
        assert!(tracker.is_empty());
    }

    #[test]
    fn overwrite_recorded_when_tracking_enabled() {
        let (registry, mut tracker, config) = setup(true, 0);
        let mut overwrites = Vec::new();

        trace_store(&registry, &mut tracker, &mut overwrites, &config, 0x1000, 8, 0xA, 0, CallSite::empty());
        let outcome = trace_store(&registry, &mut tracker, &mut overwrites, &config, 0x1000, 8, 0xB, 1, CallSite::empty());

        assert_eq!(outcome, IngestOutcome::Tracked);
        assert_eq!(overwrites.len(), 1);
        assert_eq!(overwrites[0].payload.value, 0xA);
        assert_eq!(tracker.len(), 1);
        let (_, only) = tracker.iter().next().unwrap();
        assert_eq!(only.value, 0xB);
        assert_eq!(only.state, StoreState::Dirty);
    }

    #[test]
    fn benign_rewrite_within_indifference_window_is_dropped() {
        let (registry, mut tracker, config) = setup(true, 1000);
        let mut overwrites = Vec::new();

        trace_store(&registry, &mut tracker, &mut overwrites, &config, 0x1000, 8, 0xA, 0, CallSite::empty());
        trace_store(&registry, &mut tracker, &mut overwrites, &config, 0x1000, 8, 0xA, 0, CallSite::empty());

        assert!(overwrites.is_empty());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn overwrite_flood_reported_at_cap() {
        let (registry, mut tracker, config) = setup(true, 0);
        let mut overwrites = Vec::with_capacity(MAX_MULT_OVERWRITES);
        for i in 0..MAX_MULT_OVERWRITES {
            overwrites.push(OverwriteRecord {
                addr: Interval::new(0x1000, 8),
                payload: StorePayload::new(i as u64, 0, CallSite::empty()),
            });
        }
        tracker.put(Interval::new(0x1000, 8), StorePayload::new(0xDEAD, 0, CallSite::empty()));

        let outcome = trace_store(&registry, &mut tracker, &mut overwrites, &config, 0x1000, 8, 0xBEEF, 1, CallSite::empty());
        assert_eq!(outcome, IngestOutcome::OverwriteFlood);
        assert_eq!(overwrites.len(), MAX_MULT_OVERWRITES);
    }
}
