//! Census Engine
//!
//! Drives the single traversal of the target heap:
//!
//! ```text
//! collector_family() ──▶ HeapLayout (resolved once)
//!         │
//!         ▼
//! for_each_live_object ──▶ classify ──▶ Eden / Survivor / Old table
//!         │                    │
//!         │                    ├── Unknown ──▶ combined table (region-based)
//!         │                    └── Err ──────▶ logged, dropped
//!         ▼
//!   CensusReport
//! ```
//!
//! A misclassified object only costs that object. A read failure costs the
//! run: the engine returns [`CensusError::Incomplete`] rather than a
//! silently truncated report.

use crate::access::{AccessError, HeapAccess, ObjectRef};
use crate::classifier::{GenerationBucket, classify};
use crate::config::CensusConfig;
use crate::layout::HeapLayout;
use crate::stats::ClassStatsTable;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Census failures
#[derive(Debug, Error)]
pub enum CensusError {
    #[error("Failed to resolve heap layout")]
    Attach(#[source] AccessError),

    #[error("Census incomplete after {visited} objects")]
    Incomplete {
        visited: u64,
        #[source]
        source: AccessError,
    },
}

/// Whether the walk covered the whole heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    /// The configured deadline expired first
    TimedOut { visited: u64 },
}

/// Final census result. Immutable once the run returns.
#[derive(Debug, Clone)]
pub struct CensusReport {
    layout: HeapLayout,
    eden: ClassStatsTable,
    survivor: ClassStatsTable,
    old: ClassStatsTable,
    /// Region-based layouts only
    unattributed: ClassStatsTable,
    visited: u64,
    unknown: u64,
    misclassified: u64,
    used_bytes: Option<u64>,
    completeness: Completeness,
    elapsed: Duration,
}

impl CensusReport {
    fn new(layout: HeapLayout) -> Self {
        Self {
            layout,
            eden: ClassStatsTable::new(),
            survivor: ClassStatsTable::new(),
            old: ClassStatsTable::new(),
            unattributed: ClassStatsTable::new(),
            visited: 0,
            unknown: 0,
            misclassified: 0,
            used_bytes: None,
            completeness: Completeness::Complete,
            elapsed: Duration::ZERO,
        }
    }

    fn record(&mut self, object: &ObjectRef<'_>) {
        self.visited += 1;

        let table = match classify(object, &self.layout) {
            Ok(GenerationBucket::Eden) => &mut self.eden,
            Ok(GenerationBucket::Survivor) => &mut self.survivor,
            Ok(GenerationBucket::Old) => &mut self.old,
            Ok(GenerationBucket::Unknown) => {
                self.unknown += 1;
                &mut self.unattributed
            }
            Err(err) => {
                warn!(
                    address = %object.address,
                    class = object.class_name,
                    "Unknown generation, dropping object: {}",
                    err
                );
                self.unknown += 1;
                self.misclassified += 1;
                return;
            }
        };

        table.accumulate(object.class_name, object.shallow_size);
    }

    pub fn layout(&self) -> &HeapLayout {
        &self.layout
    }

    /// Table for one bucket. `Unknown` is the combined region-based table.
    pub fn table(&self, bucket: GenerationBucket) -> &ClassStatsTable {
        match bucket {
            GenerationBucket::Eden => &self.eden,
            GenerationBucket::Survivor => &self.survivor,
            GenerationBucket::Old => &self.old,
            GenerationBucket::Unknown => &self.unattributed,
        }
    }

    /// Objects handed to the engine
    pub fn visited(&self) -> u64 {
        self.visited
    }

    /// Objects counted in the Eden, Survivor and Old tables
    pub fn attributed(&self) -> u64 {
        GenerationBucket::GENERATIONS
            .iter()
            .map(|bucket| self.table(*bucket).totals().count)
            .sum()
    }

    /// Objects not attributed to a generation, misclassified ones included
    pub fn unknown(&self) -> u64 {
        self.unknown
    }

    /// Objects dropped because no region matched
    pub fn misclassified(&self) -> u64 {
        self.misclassified
    }

    pub fn used_bytes(&self) -> Option<u64> {
        self.used_bytes
    }

    pub fn completeness(&self) -> Completeness {
        self.completeness
    }

    pub fn is_complete(&self) -> bool {
        self.completeness == Completeness::Complete
    }

    /// Wall time spent walking the heap
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Runs heap censuses.
#[derive(Debug, Clone, Default)]
pub struct CensusEngine {
    config: CensusConfig,
}

impl CensusEngine {
    pub fn new(config: CensusConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CensusConfig {
        &self.config
    }

    /// Walk every live object of `heap` once and aggregate the result.
    pub fn run<H>(&self, heap: &mut H) -> Result<CensusReport, CensusError>
    where
        H: HeapAccess + ?Sized,
    {
        let layout = heap.collector_family().map_err(CensusError::Attach)?;
        info!(family = layout.family_name(), "Starting heap census");
        debug!("Heap layout: {}", layout);

        if let HeapLayout::RegionBased { collector } = &layout {
            warn!(
                collector = collector.as_str(),
                "Detailed generation breakdown is unsupported for this collector, \
                 reporting a single combined table"
            );
        }

        let mut report = CensusReport::new(layout);
        report.used_bytes = heap.used_bytes();

        let started = Instant::now();
        let deadline = self.config.deadline.map(|limit| started + limit);
        let mut timed_out = false;

        let walk = heap.for_each_live_object(&mut |object: ObjectRef<'_>| {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                timed_out = true;
                return ControlFlow::Break(());
            }
            report.record(&object);
            ControlFlow::Continue(())
        });
        report.elapsed = started.elapsed();

        if let Err(source) = walk {
            error!(
                visited = report.visited,
                "Heap became unreadable during traversal: {}", source
            );
            return Err(CensusError::Incomplete {
                visited: report.visited,
                source,
            });
        }

        if timed_out {
            warn!(
                visited = report.visited,
                "Census deadline reached, report is incomplete"
            );
            report.completeness = Completeness::TimedOut {
                visited: report.visited,
            };
        }

        info!(
            visited = report.visited,
            unknown = report.unknown,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Heap census finished"
        );

        Ok(report)
    }
}
