//! The durability state machine: `flush`, `fence`, `commit`, and the
//! reordering markers that drive a tracked store from `DIRTY` through to
//! retirement.

use crate::interval::Interval;
use crate::tracker::{StorePayload, StoreState, Tracker};
use crate::Config;

/// Cap on the multi-flush-record list. Unlike the overwrite flood, this is
/// non-fatal: excess records past the cap are silently dropped rather than
/// aborting the process.
pub const MAX_FLUSH_ERROR_EVENTS: usize = 10_000;

/// A copy of a tracker entry whose state was not `DIRTY` when a flush
/// re-targeted it.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiFlushRecord {
    pub addr: Interval,
    pub payload: StorePayload,
}

/// `flush(base, size)`: align the window down/up to the configured
/// cache-line granularity, then walk every tracker entry overlapping it.
/// `DIRTY` entries are promoted to `FLUSHED`, splitting off any part that
/// falls outside the (aligned) window as new `DIRTY` fragments. Entries
/// already past `DIRTY` are left alone but optionally recorded as
/// redundant flushes.
pub fn flush(
    tracker: &mut Tracker,
    multi_flush: &mut Vec<MultiFlushRecord>,
    config: &Config,
    base: u64,
    size: u64,
) {
    let aligned_base = config.align_down(base);
    let aligned_size = config.align_size(aligned_base, base, size);
    let window = Interval::new(aligned_base, aligned_size);

    tracker.for_each_overlapping(window, |set, found, mut payload| {
        if payload.state != StoreState::Dirty {
            if config.check_flush && multi_flush.len() < MAX_FLUSH_ERROR_EVENTS {
                multi_flush.push(MultiFlushRecord {
                    addr: found,
                    payload: payload.clone(),
                });
            }
            set.put(found, payload);
            return;
        }

        // Head split before tail split, so at most two new DIRTY
        // fragments are produced per flushed original store.
        if found.addr < window.addr {
            let head = Interval::new(found.addr, window.addr - found.addr);
            set.put(head, StorePayload { state: StoreState::Dirty, ..payload.clone() });
        }
        if found.end() > window.end() {
            let tail = Interval::new(window.end(), found.end() - window.end());
            set.put(tail, StorePayload { state: StoreState::Dirty, ..payload.clone() });
        }

        let covered_addr = found.addr.max(window.addr);
        let covered_end = found.end().min(window.end());
        payload.state = StoreState::Flushed;
        set.put(Interval::new(covered_addr, covered_end - covered_addr), payload);
    });
}

/// `fence()`: `FLUSHED -> FENCED`, `COMMITTED -> retired` (removed).
/// Idempotent: a second call finds nothing left in either of those two
/// states to act on.
pub fn fence(tracker: &mut Tracker) {
    let to_retire: Vec<Interval> = tracker
        .iter()
        .filter(|(_, p)| p.state == StoreState::Committed)
        .map(|(iv, _)| iv)
        .collect();
    for iv in to_retire {
        tracker.take(iv.addr);
    }

    let to_fence: Vec<Interval> = tracker
        .iter()
        .filter(|(_, p)| p.state == StoreState::Flushed)
        .map(|(iv, _)| iv)
        .collect();
    for iv in to_fence {
        if let Some((_, mut payload)) = tracker.take(iv.addr) {
            payload.state = StoreState::Fenced;
            tracker.put(iv, payload);
        }
    }
}

/// `commit()`: `FENCED -> COMMITTED`. Idempotent for the same reason as
/// `fence`: a second call finds no `FENCED` entries left to promote.
pub fn commit(tracker: &mut Tracker) {
    let to_commit: Vec<Interval> = tracker
        .iter()
        .filter(|(_, p)| p.state == StoreState::Fenced)
        .map(|(iv, _)| iv)
        .collect();
    for iv in to_commit {
        if let Some((_, mut payload)) = tracker.take(iv.addr) {
            payload.state = StoreState::Committed;
            tracker.put(iv, payload);
        }
    }
}

/// The four reordering markers. They never touch the state machine; they
/// exist purely so an offline consumer of the log stream can reason about
/// reordering windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderMarker {
    FullReorder,
    PartialReorder,
    OnlyFault,
    StopReorderFault,
}
