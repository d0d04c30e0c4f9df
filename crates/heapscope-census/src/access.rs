//! Heap Access Interface
//!
//! The census never talks to a target process directly. Whatever attached
//! to the target (and keeps it suspended) hands the engine a [`HeapAccess`]
//! value with a single traversal entry point.

use crate::layout::HeapLayout;
use serde::Deserialize;
use std::fmt;
use std::num::NonZeroU64;
use std::ops::ControlFlow;
use thiserror::Error;

/// A non-null address inside the target's heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(NonZeroU64);

impl Address {
    /// Returns `None` for the null address.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.get())
    }
}

/// Half-open address range `[start, end)`.
///
/// An address equal to `end` is outside the range, so two adjacent
/// regions never both claim the boundary address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AddressRange {
    pub start: u64,
    pub end: u64,
}

impl AddressRange {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Containment test used by the generation classifier.
    pub fn contains(&self, address: Address) -> bool {
        let raw = address.get();
        self.start <= raw && raw < self.end
    }

    /// Size of the range in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both ranges claim at least one common address.
    pub fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

/// One live object, valid only for the duration of a single visit.
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'a> {
    pub address: Address,
    /// Fully-qualified class name
    pub class_name: &'a str,
    /// Shallow size in bytes
    pub shallow_size: u64,
}

/// Errors reported by a heap access implementation
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Cannot attach to process {pid}: {reason}")]
    Attach { pid: u32, reason: String },

    #[error("Unsupported runtime: {found}")]
    UnsupportedRuntime { found: String },

    #[error("Heap read failed at position {position}: {reason}")]
    Read { position: u64, reason: String },
}

/// Read-only access to a suspended target heap.
///
/// Implementations own the connection to the target and must keep it
/// suspended for as long as the value is borrowed by the engine.
pub trait HeapAccess {
    /// Identify the collector family and its region boundaries.
    fn collector_family(&self) -> Result<HeapLayout, AccessError>;

    /// Used heap bytes at suspension time, if the target reports it.
    fn used_bytes(&self) -> Option<u64> {
        None
    }

    /// Invoke `visitor` once per live object.
    ///
    /// Null references are filtered out before the visitor runs. The walk
    /// stops early when the visitor returns [`ControlFlow::Break`]; that is
    /// not an error. An `Err` means the heap became unreadable part-way.
    fn for_each_live_object(
        &mut self,
        visitor: &mut dyn FnMut(ObjectRef<'_>) -> ControlFlow<()>,
    ) -> Result<(), AccessError>;
}

/// In-memory heap for tests.
#[cfg(any(test, feature = "synthetic"))]
pub mod synthetic {
    use super::*;

    #[derive(Debug, Clone)]
    struct SyntheticObject {
        address: u64,
        class_name: String,
        size: u64,
    }

    /// A heap whose objects and regions are given up front.
    #[derive(Debug, Clone)]
    pub struct SyntheticHeap {
        layout: HeapLayout,
        objects: Vec<SyntheticObject>,
        used_bytes: Option<u64>,
        fail_at: Option<usize>,
        enumerations: usize,
    }

    impl SyntheticHeap {
        pub fn new(layout: HeapLayout) -> Self {
            Self {
                layout,
                objects: Vec::new(),
                used_bytes: None,
                fail_at: None,
                enumerations: 0,
            }
        }

        /// Add an object. Address 0 stands for a null reference.
        pub fn object(mut self, address: u64, class_name: &str, size: u64) -> Self {
            self.objects.push(SyntheticObject {
                address,
                class_name: class_name.to_string(),
                size,
            });
            self
        }

        pub fn with_used_bytes(mut self, used: u64) -> Self {
            self.used_bytes = Some(used);
            self
        }

        /// Make the walk fail with a read error when it reaches `index`.
        pub fn fail_at(mut self, index: usize) -> Self {
            self.fail_at = Some(index);
            self
        }

        /// Number of times the heap has been enumerated.
        pub fn enumerations(&self) -> usize {
            self.enumerations
        }
    }

    impl HeapAccess for SyntheticHeap {
        fn collector_family(&self) -> Result<HeapLayout, AccessError> {
            Ok(self.layout.clone())
        }

        fn used_bytes(&self) -> Option<u64> {
            self.used_bytes
        }

        fn for_each_live_object(
            &mut self,
            visitor: &mut dyn FnMut(ObjectRef<'_>) -> ControlFlow<()>,
        ) -> Result<(), AccessError> {
            self.enumerations += 1;

            for (index, object) in self.objects.iter().enumerate() {
                if self.fail_at == Some(index) {
                    return Err(AccessError::Read {
                        position: index as u64,
                        reason: "target memory unreadable".to_string(),
                    });
                }

                let Some(address) = Address::new(object.address) else {
                    continue;
                };

                let object = ObjectRef {
                    address,
                    class_name: &object.class_name,
                    shallow_size: object.size,
                };
                if visitor(object).is_break() {
                    break;
                }
            }

            Ok(())
        }
    }
}
