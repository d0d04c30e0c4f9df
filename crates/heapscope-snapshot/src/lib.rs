//! heapscope Snapshot Access
//!
//! Supplies the census with a [`HeapAccess`](heapscope_census::HeapAccess)
//! backed by a heap export that an agent inside the target wrote while the
//! target was suspended.
//!
//! # Export Format
//!
//! JSON Lines, optionally zstd-compressed:
//!
//! ```text
//! <snapshot_dir>/<pid>.heap.jsonl[.zst]
//!
//! {"format":1,"pid":4242,"runtime":"OpenJDK 1.8.0","used_bytes":1048576,
//!  "collector":{"kind":"parallel","eden":{...},"from":{...},"to":{...},"old":{...}}}
//! {"address":4096,"class":"java.lang.String","size":24}
//! {"address":4120,"class":"[B","size":40}
//! ...
//! ```
//!
//! The header is validated when the snapshot is opened ("attach"); object
//! lines are streamed during the walk, so a damaged line surfaces as a
//! mid-traversal read error.

mod config;
mod error;
mod format;
mod heap;
mod process;

pub use config::SnapshotConfig;
pub use error::SnapshotError;
pub use format::{CollectorDescriptor, FORMAT_VERSION, SnapshotHeader};
pub use heap::SnapshotHeap;
pub use process::is_running;
