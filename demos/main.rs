//! A thin smoke-test binary wiring `CliFlags` into a `PmemChecker` and
//! feeding it a synthetic event stream, for exercising the engine without
//! a real dynamic-binary-instrumentation host attached.
//!
//! Each line of stdin is one event:
//!
//! ```text
//! map ADDR SIZE
//! store ADDR SIZE VALUE
//! flush ADDR SIZE
//! fence
//! commit
//! sb
//! ```
//!
//! Addresses, sizes, and values are hex, with or without a `0x` prefix.
//! Blank lines and lines starting with `#` are ignored.

use std::io::{self, BufRead};
use std::process;

use clap::Parser;
use pmem_trace::{CliFlags, Config, PmemChecker};

fn parse_hex(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| format!("{}: {}", s, e))
}

fn run_line(checker: &mut PmemChecker, line: &str) -> Result<(), String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(());
    }
    let mut parts = line.split_whitespace();
    let op = parts.next().ok_or("empty line")?;
    match op {
        "map" => {
            let addr = parse_hex(parts.next().ok_or("map: missing addr")?)?;
            let size = parse_hex(parts.next().ok_or("map: missing size")?)?;
            checker.register_mapping(addr, size);
        }
        "store" => {
            let addr = parse_hex(parts.next().ok_or("store: missing addr")?)?;
            let size = parse_hex(parts.next().ok_or("store: missing size")?)?;
            let value = parse_hex(parts.next().ok_or("store: missing value")?)?;
            checker.on_store(addr, size, value);
        }
        "flush" => {
            let addr = parse_hex(parts.next().ok_or("flush: missing addr")?)?;
            let size = parse_hex(parts.next().ok_or("flush: missing size")?)?;
            checker.flush(addr, size);
        }
        "fence" => checker.fence(),
        "commit" => checker.commit(),
        "sb" => checker.on_sb_enter(),
        other => return Err(format!("unrecognised event {:?}", other)),
    }
    Ok(())
}

fn main() {
    let flags = CliFlags::parse();
    let config: Config = flags.into();
    let mut checker = PmemChecker::new(config);

    let stdin = io::stdin();
    for (lineno, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("pmem-trace-demo: read error on line {}: {}", lineno + 1, e);
                process::exit(1);
            }
        };
        if let Err(e) = run_line(&mut checker, &line) {
            eprintln!("pmem-trace-demo: line {}: {}", lineno + 1, e);
            process::exit(1);
        }
    }

    checker.teardown();
}
