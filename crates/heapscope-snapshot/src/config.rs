//! Snapshot discovery configuration.

use std::path::PathBuf;
use tracing::warn;

/// Default directory agents write heap exports to
const DEFAULT_SNAPSHOT_DIR: &str = "/tmp/heapscope";

/// Where to find heap exports and how strictly to attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// Directory holding `<pid>.heap.jsonl[.zst]` files
    pub snapshot_dir: PathBuf,
    /// Refuse to read an export unless the process is still running
    pub require_live_process: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            require_live_process: true,
        }
    }
}

impl SnapshotConfig {
    /// Read overrides from the environment.
    ///
    /// - `HEAPSCOPE_SNAPSHOT_DIR`: export directory
    /// - `HEAPSCOPE_REQUIRE_LIVE`: `0`/`false` skips the liveness check
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("HEAPSCOPE_SNAPSHOT_DIR").filter(|dir| !dir.is_empty()) {
            config.snapshot_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup("HEAPSCOPE_REQUIRE_LIVE") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.require_live_process = true,
                "0" | "false" | "no" => config.require_live_process = false,
                _ => warn!(
                    variable = "HEAPSCOPE_REQUIRE_LIVE",
                    value = %raw,
                    "Ignoring unparsable setting"
                ),
            }
        }

        config
    }

    /// Plain export path for `pid`
    pub fn plain_path(&self, pid: u32) -> PathBuf {
        self.snapshot_dir.join(format!("{pid}.heap.jsonl"))
    }

    /// Compressed export path for `pid`
    pub fn compressed_path(&self, pid: u32) -> PathBuf {
        self.snapshot_dir.join(format!("{pid}.heap.jsonl.zst"))
    }
}
