//! Heap layout families.
//!
//! Resolved once per run from the collector the target reports, so the
//! per-object classification is a plain match instead of repeated probing.

use crate::access::AddressRange;
use std::fmt;
use thiserror::Error;

/// Region boundaries that break the layout's assumptions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Contiguous heap reports no survivor space")]
    NoSurvivorSpace,

    #[error("The {region} range {range} ends before it starts")]
    Inverted {
        region: &'static str,
        range: AddressRange,
    },

    #[error("The {first} and {second} ranges overlap")]
    Overlap {
        first: &'static str,
        second: &'static str,
    },
}

/// Young generation of a parallel-scavenge heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YoungGen {
    pub eden: AddressRange,
    pub from: AddressRange,
    /// Empty outside a collection pause; never consulted.
    pub to: AddressRange,
}

/// Collector family backing the target heap, with its region boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapLayout {
    /// Generational heap made of contiguous spaces (serial, CMS).
    ///
    /// `survivors[0]` is the "from" space. Any further survivor spaces
    /// are ignored by the classifier.
    Contiguous {
        eden: AddressRange,
        survivors: Vec<AddressRange>,
        old: AddressRange,
    },

    /// Parallel-scavenge heap with separate young and old generations.
    ParallelGenerational { young: YoungGen, old: AddressRange },

    /// Region-based collector (G1 and friends). Object age cannot be read
    /// off address ranges.
    RegionBased { collector: String },
}

impl HeapLayout {
    /// Short family name for logs and errors
    pub fn family_name(&self) -> &'static str {
        match self {
            Self::Contiguous { .. } => "contiguous",
            Self::ParallelGenerational { .. } => "parallel",
            Self::RegionBased { .. } => "region-based",
        }
    }

    /// Whether objects can be attributed to Eden/Survivor/Old.
    pub fn supports_generations(&self) -> bool {
        !matches!(self, Self::RegionBased { .. })
    }

    /// Check that the regions can classify objects unambiguously.
    ///
    /// A contiguous heap needs at least one survivor space, and every
    /// range, the "to" space included, must be well-formed and disjoint
    /// from the others. Region-based layouts carry no ranges.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if matches!(self, Self::Contiguous { survivors, .. } if survivors.is_empty()) {
            return Err(LayoutError::NoSurvivorSpace);
        }

        let regions = self.regions();
        for &(region, range) in &regions {
            if range.start > range.end {
                return Err(LayoutError::Inverted { region, range });
            }
        }

        for (index, &(first, a)) in regions.iter().enumerate() {
            for &(second, b) in &regions[index + 1..] {
                if a.overlaps(&b) {
                    return Err(LayoutError::Overlap { first, second });
                }
            }
        }

        Ok(())
    }

    fn regions(&self) -> Vec<(&'static str, AddressRange)> {
        match self {
            Self::Contiguous {
                eden,
                survivors,
                old,
            } => std::iter::once(("eden", *eden))
                .chain(survivors.iter().map(|range| ("survivor", *range)))
                .chain(std::iter::once(("old", *old)))
                .collect(),
            Self::ParallelGenerational { young, old } => vec![
                ("eden", young.eden),
                ("from", young.from),
                ("to", young.to),
                ("old", *old),
            ],
            Self::RegionBased { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for HeapLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contiguous {
                eden,
                survivors,
                old,
            } => {
                write!(f, "contiguous eden={eden}")?;
                if let Some(from) = survivors.first() {
                    write!(f, " from={from}")?;
                }
                write!(f, " old={old}")
            }
            Self::ParallelGenerational { young, old } => write!(
                f,
                "parallel eden={} from={} to={} old={}",
                young.eden, young.from, young.to, old
            ),
            Self::RegionBased { collector } => write!(f, "region-based ({collector})"),
        }
    }
}
