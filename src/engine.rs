//! `PmemChecker`: the single struct an embedder constructs and drives.
//! Owns the region registry, the store tracker, the overwrite/multi-flush
//! lists, the superblock counter, and the configuration -- the public
//! surface wrapping the lower-level primitives in `interval_set`,
//! `region`, `tracker`, `ingest`, and `state_machine`.

use std::io::{self, Write};
use std::process;

use crate::callsite::CallSite;
use crate::config::Config;
use crate::ingest::{self, IngestOutcome, OverwriteRecord, MAX_MULT_OVERWRITES};
use crate::interval::{Interval, OverlapKind};
use crate::logstream::LogStream;
use crate::region::RegionRegistry;
use crate::report::{self, Summary};
use crate::router::{ClientRequest, DebugCommand, RouterResponse};
use crate::state_machine::{self, MultiFlushRecord, ReorderMarker};
use crate::tracker::Tracker;

pub struct PmemChecker {
    config: Config,
    registry: RegionRegistry,
    tracker: Tracker,
    overwrites: Vec<OverwriteRecord>,
    multi_flush: Vec<MultiFlushRecord>,
    superblock: u64,
    global_logging_on: bool,
    logger: Option<LogStream<Box<dyn Write + Send>>>,
    fd_resolver: Option<Box<dyn Fn(u64) -> Option<String> + Send>>,
}

impl PmemChecker {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: RegionRegistry::new(),
            tracker: Tracker::new(),
            overwrites: Vec::new(),
            multi_flush: Vec::new(),
            superblock: 0,
            global_logging_on: false,
            logger: None,
            fd_resolver: None,
        }
    }

    /// Install the host's fd-to-pathname resolver, used by the
    /// `REGISTER_FILE` opcode when routed through `dispatch`. Callers
    /// driving `register_file` directly don't need this.
    pub fn set_fd_resolver(&mut self, resolver: impl Fn(u64) -> Option<String> + Send + 'static) {
        self.fd_resolver = Some(Box::new(resolver));
    }

    /// Attach a log sink and emit `START`, mirroring the session-start
    /// record emitted "at init if logging was requested".
    pub fn start_logging(&mut self, sink: Box<dyn Write + Send>) -> io::Result<()> {
        let mut logger = LogStream::new(sink);
        logger.start()?;
        self.logger = Some(logger);
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn superblock(&self) -> u64 {
        self.superblock
    }

    // -- Instrumentation callbacks ---------------------------------------

    /// One guest store of width <= 256 bits. Wider SIMD stores are the
    /// host's job to decompose into 64-bit lanes before calling this.
    pub fn on_store(&mut self, addr: u64, size: u64, value: u64) {
        self.on_store_with_context(addr, size, value, CallSite::empty())
    }

    pub fn on_store_with_context(&mut self, addr: u64, size: u64, value: u64, context: CallSite) {
        let hits_loggable = self.registry.loggable_regions.contains_any(Interval::new(addr, size));
        if let Some(logger) = &mut self.logger {
            let _ = logger.log_store(
                &self.config,
                self.global_logging_on,
                &self.registry.loggable_regions,
                addr,
                value,
                size,
                hits_loggable,
            );
        }

        let outcome = ingest::trace_store(
            &self.registry,
            &mut self.tracker,
            &mut self.overwrites,
            &self.config,
            addr,
            size,
            value,
            self.superblock,
            context,
        );

        if outcome == IngestOutcome::OverwriteFlood {
            if let Some(logger) = &mut self.logger {
                let _ = logger.stop();
            }
            eprintln!(
                "pmem-trace: overwrite-record list exceeded {} entries, aborting",
                MAX_MULT_OVERWRITES
            );
            process::exit(1);
        }
    }

    pub fn on_sb_enter(&mut self) {
        self.superblock += 1;
    }

    // -- State machine --------------------------------------------------

    pub fn flush(&mut self, addr: u64, size: u64) {
        let aligned_base = self.config.align_down(addr);
        let aligned_size = self.config.align_size(aligned_base, addr, size);
        if let Some(logger) = &mut self.logger {
            let _ = logger.log_flush(
                &self.config,
                self.global_logging_on,
                &self.registry.loggable_regions,
                aligned_base,
                aligned_size,
            );
        }
        state_machine::flush(&mut self.tracker, &mut self.multi_flush, &self.config, addr, size);
    }

    pub fn fence(&mut self) {
        if let Some(logger) = &mut self.logger {
            let _ = logger.log_fence(&self.config, self.global_logging_on, &self.registry.loggable_regions);
        }
        state_machine::fence(&mut self.tracker);
    }

    pub fn commit(&mut self) {
        if let Some(logger) = &mut self.logger {
            let _ = logger.log_commit(&self.config, self.global_logging_on, &self.registry.loggable_regions);
        }
        state_machine::commit(&mut self.tracker);
    }

    fn reorder_marker(&mut self, marker: ReorderMarker) {
        if let Some(logger) = &mut self.logger {
            let _ = logger.log_reorder_marker(
                &self.config,
                self.global_logging_on,
                &self.registry.loggable_regions,
                marker,
            );
        }
    }

    // -- Region registry -------------------------------------------------

    pub fn register_mapping(&mut self, addr: u64, size: u64) {
        self.registry.persistent_mappings.register(Interval::new(addr, size));
    }

    pub fn remove_mapping(&mut self, addr: u64, size: u64) {
        self.registry.persistent_mappings.deregister(Interval::new(addr, size));
    }

    pub fn classify_mapping(&self, addr: u64, size: u64) -> OverlapKind {
        self.registry.persistent_mappings.classify(Interval::new(addr, size))
    }

    pub fn add_log_region(&mut self, addr: u64, size: u64) {
        self.registry.loggable_regions.register(Interval::new(addr, size));
    }

    pub fn remove_log_region(&mut self, addr: u64, size: u64) {
        self.registry.loggable_regions.deregister(Interval::new(addr, size));
    }

    pub fn set_global_logging(&mut self, on: bool) {
        self.global_logging_on = on;
    }

    /// `REGISTER_FILE`: resolve `fd` to a pathname via `resolve_fd`,
    /// returning `true` on success. The resolution contract itself is the
    /// host's job (an fd-to-path lookup is OS-specific); the checker's
    /// share of this request is the log record and the
    /// success/failure return value.
    pub fn register_file(
        &mut self,
        resolve_fd: impl FnOnce(u64) -> Option<String>,
        fd: u64,
        addr: u64,
        size: u64,
        offset: u64,
    ) -> bool {
        match resolve_fd(fd) {
            Some(path) => {
                if let Some(logger) = &mut self.logger {
                    let _ = logger.log_register_file(
                        &self.config,
                        self.global_logging_on,
                        &self.registry.loggable_regions,
                        &path,
                        addr,
                        size,
                        offset,
                    );
                }
                true
            }
            None => false,
        }
    }

    // -- Reporting -------------------------------------------------------

    pub fn summary(&self) -> Summary {
        report::summarize(
            &self.tracker,
            &self.overwrites,
            &self.multi_flush,
            self.config.track_multiple_stores,
            self.config.check_flush,
        )
    }

    pub fn write_pmem_mappings<W: Write>(&self, w: W) -> io::Result<()> {
        report::write_regions(w, &self.registry.persistent_mappings)
    }

    pub fn write_log_regions<W: Write>(&self, w: W) -> io::Result<()> {
        report::write_regions(w, &self.registry.loggable_regions)
    }

    /// Teardown: emit the reporter summary (if configured to), stop the
    /// log stream, and return the summary to the caller.
    pub fn teardown(&mut self) -> Summary {
        let summary = self.summary();
        if self.config.print_summary {
            let stdout = io::stdout();
            let _ = summary.write_to(stdout.lock());
        }
        if let Some(logger) = &mut self.logger {
            let _ = logger.stop();
        }
        summary
    }

    // -- Event router ----------------------------------------------------

    pub fn dispatch(&mut self, request: ClientRequest) -> RouterResponse {
        match request {
            ClientRequest::RegisterMapping { addr, size } => {
                self.register_mapping(addr, size);
                RouterResponse::Unit
            }
            ClientRequest::RemoveMapping { addr, size } => {
                self.remove_mapping(addr, size);
                RouterResponse::Unit
            }
            ClientRequest::RegisterFile { fd, addr, size, offset } => {
                let ok = match self.fd_resolver.take() {
                    Some(resolver) => {
                        let ok = self.register_file(|fd| resolver(fd), fd, addr, size, offset);
                        self.fd_resolver = Some(resolver);
                        ok
                    }
                    None => false,
                };
                RouterResponse::Value(ok as u64)
            }
            ClientRequest::CheckIsMapping { addr, size } => {
                RouterResponse::Value(self.classify_mapping(addr, size).as_code())
            }
            ClientRequest::DoFlush { addr, size } => {
                self.flush(addr, size);
                RouterResponse::Unit
            }
            ClientRequest::DoFence => {
                self.fence();
                RouterResponse::Unit
            }
            ClientRequest::DoCommit => {
                self.commit();
                RouterResponse::Unit
            }
            ClientRequest::WriteStats => {
                let stdout = io::stdout();
                let _ = self.summary().write_to(stdout.lock());
                RouterResponse::Unit
            }
            ClientRequest::LogStores => {
                self.set_global_logging(true);
                RouterResponse::Unit
            }
            ClientRequest::NoLogStores => {
                self.set_global_logging(false);
                RouterResponse::Unit
            }
            ClientRequest::AddLogRegion { addr, size } => {
                self.add_log_region(addr, size);
                RouterResponse::Unit
            }
            ClientRequest::RemoveLogRegion { addr, size } => {
                self.remove_log_region(addr, size);
                RouterResponse::Unit
            }
            ClientRequest::Reorder(marker) => {
                self.reorder_marker(marker);
                RouterResponse::Unit
            }
            ClientRequest::PrintPmemMappings => {
                let stdout = io::stdout();
                let _ = self.write_pmem_mappings(stdout.lock());
                RouterResponse::Unit
            }
        }
    }

    /// The interactive debugger command subprotocol
    /// (`help`/`print_stats`/`print_pmem_regions`/`print_log_regions`).
    pub fn dispatch_debug_command(&self, command: &str) -> RouterResponse {
        match DebugCommand::parse(command) {
            Some(DebugCommand::Help) => {
                println!("commands: help, print_stats, print_pmem_regions, print_log_regions");
                RouterResponse::Unit
            }
            Some(DebugCommand::PrintStats) => {
                let stdout = io::stdout();
                let _ = self.summary().write_to(stdout.lock());
                RouterResponse::Unit
            }
            Some(DebugCommand::PrintPmemRegions) => {
                let stdout = io::stdout();
                let _ = self.write_pmem_mappings(stdout.lock());
                RouterResponse::Unit
            }
            Some(DebugCommand::PrintLogRegions) => {
                let stdout = io::stdout();
                let _ = self.write_log_regions(stdout.lock());
                RouterResponse::Unit
            }
            None => RouterResponse::Unhandled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(track_multiple: bool, check_flush: bool, indiff: u64) -> PmemChecker {
        PmemChecker::new(Config::new(track_multiple, false, true, check_flush, indiff, 64))
    }

    #[test]
    fn scenario_unflushed_store() {
        let mut c = checker(false, false, 0);
        c.register_mapping(0x1000, 0x40);
        c.on_store(0x1000, 8, 0xDEAD);
        let summary = c.teardown();
        assert_eq!(summary.non_persistent.len(), 1);
        assert_eq!(summary.non_persistent_bytes(), 8);
    }

    #[test]
    fn scenario_full_persistence_cycle() {
        let mut c = checker(false, false, 0);
        c.register_mapping(0x1000, 0x40);
        c.on_store(0x1000, 8, 0xDEAD);
        c.flush(0x1000, 64);
        c.fence();
        c.commit();
        c.fence();
        let summary = c.teardown();
        assert!(summary.non_persistent.is_empty());
    }

    #[test]
    fn scenario_overwrite_flagged() {
        let mut c = checker(true, false, 0);
        c.register_mapping(0x1000, 0x40);
        c.on_store(0x1000, 8, 0xA);
        c.on_store(0x1000, 8, 0xB);
        let summary = c.teardown();
        let overwrites = summary.overwrites.unwrap();
        assert_eq!(overwrites.len(), 1);
        assert_eq!(overwrites[0].addr, 0x1000);
        assert_eq!(summary.non_persistent.len(), 1);
    }

    #[test]
    fn scenario_overwrite_suppressed_by_indifference() {
        let mut c = checker(true, false, 1000);
        c.register_mapping(0x1000, 0x40);
        c.on_store(0x1000, 8, 0xA);
        c.on_store(0x1000, 8, 0xA);
        let summary = c.teardown();
        assert_eq!(summary.overwrites.unwrap().len(), 0);
        assert_eq!(summary.non_persistent.len(), 1);
    }

    #[test]
    fn scenario_multiple_flush_warning() {
        let mut c = checker(false, true, 0);
        c.register_mapping(0x1000, 0x40);
        c.on_store(0x1000, 8, 0xDEAD);
        c.flush(0x1000, 64);
        c.flush(0x1000, 64);
        let summary = c.teardown();
        assert_eq!(summary.multi_flush.unwrap().len(), 1);
        assert_eq!(summary.non_persistent.len(), 1);
    }

    #[test]
    fn scenario_partial_flush_splits() {
        let mut c = checker(false, false, 0);
        c.register_mapping(0x1000, 0x100);
        c.on_store(0x1000, 128, 0xDEAD);
        c.flush(0x1000, 64);
        c.fence();
        c.commit();
        c.fence();
        let summary = c.teardown();
        assert_eq!(summary.non_persistent.len(), 1);
        assert_eq!(summary.non_persistent[0].addr, 0x1040);
        assert_eq!(summary.non_persistent[0].size, 64);
    }

    #[test]
    fn register_file_returns_success_flag() {
        let mut c = checker(false, false, 0);
        assert!(c.register_file(|fd| Some(format!("/dev/fd/{fd}")), 3, 0x1000, 0x40, 0));
        assert!(!c.register_file(|_| None, 4, 0x2000, 0x40, 0));
    }

    #[test]
    fn debug_command_unknown_is_unhandled() {
        let c = checker(false, false, 0);
        assert_eq!(c.dispatch_debug_command("nonsense"), RouterResponse::Unhandled);
    }
}
