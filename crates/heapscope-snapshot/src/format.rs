//! Heap export records.

use heapscope_census::{AddressRange, HeapLayout, LayoutError, YoungGen};
use serde::Deserialize;
use std::borrow::Cow;

/// Version of the heap export format
pub const FORMAT_VERSION: u32 = 1;

/// First line of a heap export
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotHeader {
    /// Export format version
    pub format: u32,
    /// Process the export was taken from
    pub pid: u32,
    /// Runtime name and version as reported by the agent
    #[serde(default)]
    pub runtime: Option<String>,
    /// Used heap bytes at suspension time
    #[serde(default)]
    pub used_bytes: Option<u64>,
    /// Collector in use and its region boundaries
    pub collector: CollectorDescriptor,
}

/// Collector kind reported by the target
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectorDescriptor {
    /// Serial young + serial old
    Serial {
        eden: AddressRange,
        survivors: Vec<AddressRange>,
        old: AddressRange,
    },
    /// ParNew + CMS old generation
    ConcurrentMarkSweep {
        eden: AddressRange,
        survivors: Vec<AddressRange>,
        old: AddressRange,
    },
    /// Parallel scavenge
    Parallel {
        eden: AddressRange,
        from: AddressRange,
        to: AddressRange,
        old: AddressRange,
    },
    G1,
    Shenandoah,
    Z,
}

impl CollectorDescriptor {
    /// Name used in logs and the region-based warning
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serial { .. } => "serial",
            Self::ConcurrentMarkSweep { .. } => "concurrent_mark_sweep",
            Self::Parallel { .. } => "parallel",
            Self::G1 => "g1",
            Self::Shenandoah => "shenandoah",
            Self::Z => "z",
        }
    }

    /// Resolve the heap layout family, rejecting unusable region bounds.
    pub fn to_layout(&self) -> Result<HeapLayout, LayoutError> {
        let layout = match self {
            Self::Serial {
                eden,
                survivors,
                old,
            }
            | Self::ConcurrentMarkSweep {
                eden,
                survivors,
                old,
            } => HeapLayout::Contiguous {
                eden: *eden,
                survivors: survivors.clone(),
                old: *old,
            },
            Self::Parallel { eden, from, to, old } => HeapLayout::ParallelGenerational {
                young: YoungGen {
                    eden: *eden,
                    from: *from,
                    to: *to,
                },
                old: *old,
            },
            Self::G1 | Self::Shenandoah | Self::Z => HeapLayout::RegionBased {
                collector: self.kind().to_string(),
            },
        };

        layout.validate()?;
        Ok(layout)
    }
}

/// One object line. Address 0 is a null reference.
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectRecord<'a> {
    pub address: u64,
    #[serde(borrow)]
    pub class: Cow<'a, str>,
    pub size: u64,
}
