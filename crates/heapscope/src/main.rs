//! heapscope: heap census for a suspended managed runtime
//!
//! Attaches to the heap export of the given process, walks every live
//! object once, and prints per-class counts and sizes grouped by
//! generation.
//!
//! Exit status: 0 complete report, 1 attach or read failure, 2 usage
//! error, 3 report cut short by `HEAPSCOPE_DEADLINE_MS`.

mod cli;

use anyhow::{Context, Result};
use heapscope_census::{CensusConfig, CensusEngine, Completeness, ReportFormatter};
use heapscope_snapshot::{SnapshotConfig, SnapshotHeap};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const DEFAULT_LOG_FILTER: &str = "heapscope=info,heapscope_census=info,heapscope_snapshot=info";

fn main() -> ExitCode {
    // Logs go to stderr, stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let pid = match cli::parse_args(args.as_slice()) {
        Ok(pid) => pid,
        Err(err) => {
            eprintln!("heapscope: {err}");
            eprintln!("{}", cli::USAGE);
            return ExitCode::from(err.exit_status());
        }
    };

    let outcome = run(pid);
    if let Err(err) = &outcome {
        eprintln!("heapscope: {err:#}");
    }
    ExitCode::from(cli::exit_status(&outcome))
}

fn run(pid: u32) -> Result<Completeness> {
    let census_config = CensusConfig::from_env();
    let snapshot_config = SnapshotConfig::from_env();

    info!(pid, "heapscope starting");

    let mut heap = SnapshotHeap::open(pid, &snapshot_config)
        .with_context(|| format!("attaching to process {pid}"))?;

    let report = CensusEngine::new(census_config.clone())
        .run(&mut heap)
        .context("heap census failed, no report produced")?;

    let rendered = ReportFormatter::from_config(&census_config).render(&report);
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .and_then(|()| stdout.flush())
        .context("writing report")?;

    Ok(report.completeness())
}
