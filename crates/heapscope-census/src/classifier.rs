//! Generation classification.

use crate::access::{Address, AddressRange, ObjectRef};
use crate::layout::HeapLayout;
use thiserror::Error;

/// Generation an object is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GenerationBucket {
    Eden,
    Survivor,
    Old,
    /// Layout cannot attribute objects (region-based collectors)
    Unknown,
}

impl GenerationBucket {
    /// The attributable generations, in report order
    pub const GENERATIONS: [GenerationBucket; 3] = [Self::Eden, Self::Survivor, Self::Old];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Eden => "Eden",
            Self::Survivor => "Survivor",
            Self::Old => "Old",
            Self::Unknown => "Unknown",
        }
    }
}

/// Classification failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// No region matched under a layout where one always should.
    #[error("Address {address} lies outside every region of the {family} heap")]
    Unclassified {
        address: Address,
        family: &'static str,
    },
}

/// Decide which generation `object` lives in.
///
/// Regions are tested smallest first (eden, the "from" survivor space,
/// then old); they are disjoint, so the order only affects speed. The
/// "to" survivor space is never tested. Region-based layouts always yield
/// [`GenerationBucket::Unknown`].
pub fn classify(
    object: &ObjectRef<'_>,
    layout: &HeapLayout,
) -> Result<GenerationBucket, ClassifyError> {
    let regions: [(Option<&AddressRange>, GenerationBucket); 3] = match layout {
        HeapLayout::Contiguous {
            eden,
            survivors,
            old,
        } => [
            (Some(eden), GenerationBucket::Eden),
            (survivors.first(), GenerationBucket::Survivor),
            (Some(old), GenerationBucket::Old),
        ],
        HeapLayout::ParallelGenerational { young, old } => [
            (Some(&young.eden), GenerationBucket::Eden),
            (Some(&young.from), GenerationBucket::Survivor),
            (Some(old), GenerationBucket::Old),
        ],
        HeapLayout::RegionBased { .. } => return Ok(GenerationBucket::Unknown),
    };

    regions
        .into_iter()
        .find_map(|(range, bucket)| {
            range
                .filter(|range| range.contains(object.address))
                .map(|_| bucket)
        })
        .ok_or(ClassifyError::Unclassified {
            address: object.address,
            family: layout.family_name(),
        })
}
