//! Process-wide configuration for the checker.
//!
//! Six independent knobs are read from several hot paths (`on_store`,
//! `flush`), so configuration is modeled as a plain `Copy` value threaded
//! through `PmemChecker::new` and held by the engine, rather than as
//! global mutable state. The superblock counter is the one genuinely
//! free-running counter and lives directly on the engine, written only
//! from `on_sb_enter`.

/// Default cache-line size used when the host's probe of its own
/// cache-line size is unavailable. The real probe (reading a `/proc`-like
/// interface) is the embedding host's job; this crate only validates and
/// falls back.
pub const DEFAULT_FLUSH_ALIGN: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Track overlapping in-flight stores to the same bytes as distinct
    /// overwrite events instead of silently dropping the earlier one.
    pub track_multiple_stores: bool,
    /// Emit records to the log stream.
    pub log_stores: bool,
    /// Emit the reporter summary at teardown.
    pub print_summary: bool,
    /// Record a flush that re-targets an already-flushed/fenced/committed
    /// store as a multi-flush event.
    pub check_flush: bool,
    /// Superblock-count window within which a same-addr/size/value rewrite
    /// is considered benign rather than a reportable overwrite.
    pub store_sb_indiff: u64,
    /// Cache-line granularity flushes are aligned to. Must be a nonzero
    /// power of two; `Config::new` falls back to `DEFAULT_FLUSH_ALIGN`
    /// otherwise.
    pub flush_align: u64,
}

impl Config {
    pub fn new(
        track_multiple_stores: bool,
        log_stores: bool,
        print_summary: bool,
        check_flush: bool,
        store_sb_indiff: u64,
        flush_align: u64,
    ) -> Self {
        let flush_align = if flush_align != 0 && flush_align.is_power_of_two() {
            flush_align
        } else {
            DEFAULT_FLUSH_ALIGN
        };
        Self {
            track_multiple_stores,
            log_stores,
            print_summary,
            check_flush,
            store_sb_indiff,
            flush_align,
        }
    }

    /// Align `addr` down to the configured flush granularity.
    #[inline]
    pub fn align_down(&self, addr: u64) -> u64 {
        addr & !(self.flush_align - 1)
    }

    /// Round `size` up to a multiple of the configured flush granularity,
    /// given it starts at `aligned_base` (already aligned down).
    #[inline]
    pub fn align_size(&self, aligned_base: u64, addr: u64, size: u64) -> u64 {
        let end = addr + size;
        let aligned_end = (end + self.flush_align - 1) & !(self.flush_align - 1);
        aligned_end - aligned_base
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(false, false, true, false, 0, DEFAULT_FLUSH_ALIGN)
    }
}
