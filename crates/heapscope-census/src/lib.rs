//! heapscope Heap Census
//!
//! Walks every live object of a suspended managed-runtime heap once and
//! produces per-class instance counts and shallow-size totals, broken
//! down by generation.
//!
//! # Pipeline
//!
//! ```text
//! HeapAccess ──▶ classify ──▶ ClassStatsTable (Eden/Survivor/Old)
//!     │                              │
//!     └── one visit per object       └──▶ CensusReport ──▶ ReportFormatter
//! ```
//!
//! # Collector Families
//!
//! | Family | Layout | Breakdown |
//! |--------|--------|-----------|
//! | Serial / CMS | `Contiguous` | Eden, Survivor, Old |
//! | Parallel Scavenge | `ParallelGenerational` | Eden, Survivor, Old |
//! | G1 / Shenandoah / ZGC | `RegionBased` | single combined table |

pub mod access;
mod classifier;
mod config;
mod engine;
mod layout;
mod report;
mod stats;

pub use access::{AccessError, Address, AddressRange, HeapAccess, ObjectRef};
pub use classifier::{ClassifyError, GenerationBucket, classify};
pub use config::CensusConfig;
pub use engine::{CensusEngine, CensusError, CensusReport, Completeness};
pub use layout::{HeapLayout, LayoutError, YoungGen};
pub use report::ReportFormatter;
pub use stats::{ClassStats, ClassStatsTable};
