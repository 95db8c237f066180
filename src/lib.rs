#![allow(clippy::too_many_arguments)]

//! A dynamic-analysis engine for persistent-memory correctness: it
//! intercepts every store a traced program executes, decides whether the
//! store falls in a region the program declared persistent, and
//! reconciles it against subsequent cache-line flush, memory-fence, and
//! commit operations.
//!
//! The three tightly coupled subsystems are the region index
//! ([`interval_set`]/[`region`]), the store tracker ([`tracker`]), and the
//! durability state machine ([`state_machine`]) that drives tracked
//! stores through `DIRTY -> FLUSHED -> FENCED -> COMMITTED -> retired`.
//! [`engine::PmemChecker`] is the facade tying all of it together for an
//! embedding host.
//!
//! # Example
//!
//! ```rust
//! use pmem_trace::{Config, PmemChecker};
//!
//! let mut checker = PmemChecker::new(Config::default());
//! checker.register_mapping(0x1000, 0x40);
//! checker.on_store(0x1000, 8, 0xDEAD_BEEF);
//! checker.flush(0x1000, 64);
//! checker.fence();
//! checker.commit();
//! checker.fence();
//!
//! let summary = checker.teardown();
//! assert!(summary.non_persistent.is_empty());
//! ```

pub mod callsite;
pub mod cli;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod interval;
pub mod interval_set;
pub mod logstream;
pub mod region;
pub mod report;
pub mod router;
pub mod state_machine;
pub mod tracker;

pub use callsite::CallSite;
pub use cli::CliFlags;
pub use config::Config;
pub use engine::PmemChecker;
pub use interval::{Interval, OverlapKind};
pub use tracker::{StorePayload, StoreState};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::callsite::CallSite;
    pub use crate::cli::CliFlags;
    pub use crate::config::Config;
    pub use crate::engine::PmemChecker;
    pub use crate::interval::{Interval, OverlapKind};
    pub use crate::router::{ClientRequest, DebugCommand, RouterResponse};
    pub use crate::tracker::{StorePayload, StoreState};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_workflow_matches_readme_example() {
        let mut checker = PmemChecker::new(Config::default());
        checker.register_mapping(0x1000, 0x40);
        checker.on_store(0x1000, 8, 0xDEAD_BEEF);
        checker.flush(0x1000, 64);
        checker.fence();
        checker.commit();
        checker.fence();

        let summary = checker.teardown();
        assert!(summary.non_persistent.is_empty());
    }
}
