//! The event router: dispatches a numbered client request (from the
//! instrumentation host) or a textual debugger command to the checker's
//! core operations.
//!
//! This module only defines the dispatch *vocabulary*; `PmemChecker`
//! (`engine.rs`) is what actually executes each variant, keeping a
//! request's shape separate from its execution.

use crate::state_machine::ReorderMarker;

/// One numbered client request, per the instrumentation host's opcode table.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    RegisterMapping { addr: u64, size: u64 },
    RemoveMapping { addr: u64, size: u64 },
    RegisterFile { fd: u64, addr: u64, size: u64, offset: u64 },
    CheckIsMapping { addr: u64, size: u64 },
    DoFlush { addr: u64, size: u64 },
    DoFence,
    DoCommit,
    WriteStats,
    LogStores,
    NoLogStores,
    AddLogRegion { addr: u64, size: u64 },
    RemoveLogRegion { addr: u64, size: u64 },
    Reorder(ReorderMarker),
    PrintPmemMappings,
}

/// What came back from dispatching a `ClientRequest`.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterResponse {
    /// No return value; the request was a pure side effect (flush, fence,
    /// toggle a flag, ...).
    Unit,
    /// A numeric result, e.g. `CHECK_IS_MAPPING`'s classification code or
    /// `REGISTER_FILE`'s success/failure flag.
    Value(u64),
    /// The opcode wasn't recognised; the host gets a warning and "not
    /// handled", execution continues normally.
    Unhandled,
}

/// The debugger command subprotocol's four textual commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommand {
    Help,
    PrintStats,
    PrintPmemRegions,
    PrintLogRegions,
}

impl DebugCommand {
    /// Parse a debugger command line. Returns `None` on anything
    /// ambiguous or unknown, matching "on ambiguous or unknown
    /// command, report and return unhandled".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "help" => Some(DebugCommand::Help),
            "print_stats" => Some(DebugCommand::PrintStats),
            "print_pmem_regions" => Some(DebugCommand::PrintPmemRegions),
            "print_log_regions" => Some(DebugCommand::PrintLogRegions),
            _ => None,
        }
    }
}

/// Convenience for building a `ClientRequest` out of a raw
/// `(opcode, [a0, a1, a2, a3])` shape, the form the host actually hands
/// across the FFI boundary. Unknown opcodes produce `None`; the caller
/// (the engine) turns that into `RouterResponse::Unhandled`.
pub fn decode_request(opcode: u64, args: [u64; 4]) -> Option<ClientRequest> {
    let [a0, a1, a2, a3] = args;
    Some(match opcode {
        1 => ClientRequest::RegisterMapping { addr: a0, size: a1 },
        2 => ClientRequest::RemoveMapping { addr: a0, size: a1 },
        3 => ClientRequest::RegisterFile { fd: a0, addr: a1, size: a2, offset: a3 },
        4 => ClientRequest::CheckIsMapping { addr: a0, size: a1 },
        5 => ClientRequest::DoFlush { addr: a0, size: a1 },
        6 => ClientRequest::DoFence,
        7 => ClientRequest::DoCommit,
        8 => ClientRequest::WriteStats,
        9 => ClientRequest::LogStores,
        10 => ClientRequest::NoLogStores,
        11 => ClientRequest::AddLogRegion { addr: a0, size: a1 },
        12 => ClientRequest::RemoveLogRegion { addr: a0, size: a1 },
        13 => ClientRequest::Reorder(ReorderMarker::FullReorder),
        14 => ClientRequest::Reorder(ReorderMarker::PartialReorder),
        15 => ClientRequest::Reorder(ReorderMarker::OnlyFault),
        16 => ClientRequest::Reorder(ReorderMarker::StopReorderFault),
        17 => ClientRequest::PrintPmemMappings,
        _ => return None,
    })
}
