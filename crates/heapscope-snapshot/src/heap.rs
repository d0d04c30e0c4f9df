//! Heap access over an exported snapshot.

use crate::config::SnapshotConfig;
use crate::error::SnapshotError;
use crate::format::{FORMAT_VERSION, ObjectRecord, SnapshotHeader};
use crate::process::is_running;
use heapscope_census::{AccessError, Address, HeapAccess, HeapLayout, ObjectRef};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use tracing::{debug, info};
use zstd::stream::Decoder;

/// A heap export for one process, streamed object by object.
///
/// The export can be walked once; the reader is consumed by the walk.
pub struct SnapshotHeap<R> {
    pid: u32,
    header: SnapshotHeader,
    layout: HeapLayout,
    reader: R,
    /// 1-based number of the last line read
    line_number: u64,
    traversed: bool,
}

impl SnapshotHeap<Box<dyn BufRead>> {
    /// Attach to the export for `pid` under `config.snapshot_dir`.
    ///
    /// The plain `.jsonl` export wins over the `.jsonl.zst` one when both
    /// exist.
    pub fn open(pid: u32, config: &SnapshotConfig) -> Result<Self, AccessError> {
        Self::open_export(pid, config).map_err(|err| err.into_access_error(pid))
    }

    fn open_export(pid: u32, config: &SnapshotConfig) -> Result<Self, SnapshotError> {
        if config.require_live_process && !is_running(pid) {
            return Err(SnapshotError::ProcessNotFound(pid));
        }

        let plain = config.plain_path(pid);
        let compressed = config.compressed_path(pid);

        let reader: Box<dyn BufRead> = if plain.is_file() {
            debug!(path = %plain.display(), "Opening heap export");
            Box::new(BufReader::new(File::open(&plain)?))
        } else if compressed.is_file() {
            debug!(path = %compressed.display(), "Opening compressed heap export");
            Box::new(BufReader::new(Decoder::new(File::open(&compressed)?)?))
        } else {
            return Err(SnapshotError::SnapshotMissing {
                pid,
                dir: config.snapshot_dir.clone(),
            });
        };

        Self::from_reader(pid, reader)
    }
}

impl<R: BufRead> SnapshotHeap<R> {
    /// Read and validate the header line, leaving objects unread.
    pub fn from_reader(pid: u32, mut reader: R) -> Result<Self, SnapshotError> {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(SnapshotError::Empty);
        }

        let header: SnapshotHeader =
            serde_json::from_str(line.trim()).map_err(SnapshotError::Header)?;

        if header.format != FORMAT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                expected: FORMAT_VERSION,
                got: header.format,
            });
        }
        if header.pid != pid {
            return Err(SnapshotError::PidMismatch {
                expected: pid,
                found: header.pid,
            });
        }

        let layout = header.collector.to_layout()?;
        info!(
            pid,
            runtime = header.runtime.as_deref().unwrap_or("unknown"),
            collector = header.collector.kind(),
            "Attached to heap export"
        );

        Ok(Self {
            pid,
            header,
            layout,
            reader,
            line_number: 1,
            traversed: false,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn header(&self) -> &SnapshotHeader {
        &self.header
    }
}

impl<R: BufRead> HeapAccess for SnapshotHeap<R> {
    fn collector_family(&self) -> Result<HeapLayout, AccessError> {
        Ok(self.layout.clone())
    }

    fn used_bytes(&self) -> Option<u64> {
        self.header.used_bytes
    }

    fn for_each_live_object(
        &mut self,
        visitor: &mut dyn FnMut(ObjectRef<'_>) -> ControlFlow<()>,
    ) -> Result<(), AccessError> {
        if self.traversed {
            return Err(AccessError::Read {
                position: self.line_number,
                reason: "heap export already traversed".to_string(),
            });
        }
        self.traversed = true;

        let mut line = String::new();
        loop {
            line.clear();
            let position = self.line_number + 1;
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|err| AccessError::Read {
                    position,
                    reason: err.to_string(),
                })?;
            if read == 0 {
                return Ok(());
            }
            self.line_number = position;

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let record: ObjectRecord<'_> =
                serde_json::from_str(text).map_err(|err| AccessError::Read {
                    position,
                    reason: err.to_string(),
                })?;

            let Some(address) = Address::new(record.address) else {
                debug!(line = position, "Skipping null reference");
                continue;
            };

            let object = ObjectRef {
                address,
                class_name: &record.class,
                shallow_size: record.size,
            };
            if visitor(object).is_break() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapscope_census::{CensusEngine, CensusError, ClassStats, GenerationBucket};
    use std::fs;
    use std::io::Cursor;

    const PID: u32 = 4242;

    const SERIAL_HEADER: &str = r#"{"format":1,"pid":4242,"runtime":"OpenJDK 1.8.0_292","used_bytes":2048,"collector":{"kind":"serial","eden":{"start":4096,"end":8192},"survivors":[{"start":8192,"end":9216},{"start":9216,"end":10240}],"old":{"start":16384,"end":65536}}}"#;

    fn export(lines: &[&str]) -> String {
        let mut text = String::from(SERIAL_HEADER);
        for line in lines {
            text.push('\n');
            text.push_str(line);
        }
        text.push('\n');
        text
    }

    fn heap(lines: &[&str]) -> SnapshotHeap<Cursor<String>> {
        SnapshotHeap::from_reader(PID, Cursor::new(export(lines))).unwrap()
    }

    fn offline() -> SnapshotConfig {
        SnapshotConfig {
            snapshot_dir: std::env::temp_dir(),
            require_live_process: false,
        }
    }

    #[test]
    fn test_census_over_export() {
        let mut heap = heap(&[
            r#"{"address":4112,"class":"A","size":10}"#,
            r#"{"address":4128,"class":"A","size":20}"#,
            r#"{"address":4160,"class":"A","size":30}"#,
            r#"{"address":16400,"class":"B","size":5}"#,
            r#"{"address":16416,"class":"B","size":5}"#,
        ]);

        let report = CensusEngine::default().run(&mut heap).unwrap();

        assert_eq!(
            report.table(GenerationBucket::Eden).get("A").copied(),
            Some(ClassStats {
                count: 3,
                total_size: 60
            })
        );
        assert_eq!(
            report.table(GenerationBucket::Old).get("B").copied(),
            Some(ClassStats {
                count: 2,
                total_size: 10
            })
        );
        assert!(report.table(GenerationBucket::Survivor).is_empty());
        assert_eq!(report.used_bytes(), Some(2048));
    }

    #[test]
    fn test_null_and_blank_lines_skipped() {
        let mut heap = heap(&[
            r#"{"address":0,"class":"Null","size":8}"#,
            "",
            r#"{"address":8192,"class":"S","size":8}"#,
        ]);

        let mut seen = Vec::new();
        heap.for_each_live_object(&mut |object: ObjectRef<'_>| {
            seen.push((object.address.get(), object.class_name.to_string()));
            ControlFlow::Continue(())
        })
        .unwrap();

        assert_eq!(seen, vec![(8192, "S".to_string())]);
    }

    #[test]
    fn test_visitor_can_stop_walk() {
        let mut heap = heap(&[
            r#"{"address":4096,"class":"A","size":8}"#,
            r#"{"address":4104,"class":"B","size":8}"#,
        ]);

        let mut visits = 0;
        let result = heap.for_each_live_object(&mut |_: ObjectRef<'_>| {
            visits += 1;
            ControlFlow::Break(())
        });

        assert!(result.is_ok());
        assert_eq!(visits, 1);
    }

    #[test]
    fn test_malformed_line_is_read_error() {
        let mut heap = heap(&[
            r#"{"address":4096,"class":"A","size":8}"#,
            r#"{"address":4104,"class":"#,
            r#"{"address":4112,"class":"A","size":8}"#,
        ]);

        match CensusEngine::default().run(&mut heap).unwrap_err() {
            CensusError::Incomplete { visited, source } => {
                assert_eq!(visited, 1);
                assert!(matches!(source, AccessError::Read { position: 3, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_second_walk_rejected() {
        let mut heap = heap(&[]);
        let mut noop = |_: ObjectRef<'_>| ControlFlow::Continue(());

        heap.for_each_live_object(&mut noop).unwrap();
        assert!(matches!(
            heap.for_each_live_object(&mut noop),
            Err(AccessError::Read { .. })
        ));
    }

    #[test]
    fn test_header_validation() {
        let empty = SnapshotHeap::from_reader(PID, Cursor::new(String::new()));
        assert!(matches!(empty, Err(SnapshotError::Empty)));

        let garbage = SnapshotHeap::from_reader(PID, Cursor::new("not json\n".to_string()));
        assert!(matches!(garbage, Err(SnapshotError::Header(_))));

        let wrong_pid = SnapshotHeap::from_reader(7, Cursor::new(export(&[])));
        assert!(matches!(
            wrong_pid,
            Err(SnapshotError::PidMismatch {
                expected: 7,
                found: PID
            })
        ));

        let future = SERIAL_HEADER.replace(r#""format":1"#, r#""format":2"#);
        let future = SnapshotHeap::from_reader(PID, Cursor::new(future));
        assert!(matches!(
            future,
            Err(SnapshotError::VersionMismatch {
                expected: 1,
                got: 2
            })
        ));
    }

    #[test]
    fn test_bad_layout_rejected_on_attach() {
        let inverted = r#"{"format":1,"pid":9,"collector":{"kind":"serial","eden":{"start":8192,"end":4096},"survivors":[{"start":8192,"end":9216}],"old":{"start":16384,"end":65536}}}"#;
        let no_survivors = r#"{"format":1,"pid":9,"collector":{"kind":"serial","eden":{"start":4096,"end":8192},"survivors":[],"old":{"start":16384,"end":65536}}}"#;
        let overlapping = r#"{"format":1,"pid":9,"collector":{"kind":"serial","eden":{"start":4096,"end":8192},"survivors":[{"start":8192,"end":9216}],"old":{"start":9000,"end":65536}}}"#;

        for header in [inverted, no_survivors, overlapping] {
            let export = format!("{header}\n{}\n", r#"{"address":4200,"class":"A","size":8}"#);
            let result = SnapshotHeap::from_reader(9, Cursor::new(export));
            assert!(
                matches!(result, Err(SnapshotError::BadLayout(_))),
                "accepted {header}"
            );
        }
    }

    #[test]
    fn test_open_bad_layout_is_unsupported_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let config = SnapshotConfig {
            snapshot_dir: dir.path().to_path_buf(),
            ..offline()
        };
        let header = SERIAL_HEADER.replace(
            r#""survivors":[{"start":8192,"end":9216},{"start":9216,"end":10240}]"#,
            r#""survivors":[]"#,
        );
        fs::write(config.plain_path(PID), format!("{header}\n")).unwrap();

        let result = SnapshotHeap::open(PID, &config);
        assert!(matches!(result, Err(AccessError::UnsupportedRuntime { .. })));
    }

    #[test]
    fn test_open_plain_export() {
        let dir = tempfile::tempdir().unwrap();
        let config = SnapshotConfig {
            snapshot_dir: dir.path().to_path_buf(),
            ..offline()
        };
        fs::write(
            config.plain_path(PID),
            export(&[r#"{"address":4096,"class":"A","size":8}"#]),
        )
        .unwrap();

        let mut heap = SnapshotHeap::open(PID, &config).unwrap();
        let report = CensusEngine::default().run(&mut heap).unwrap();

        assert_eq!(heap.pid(), PID);
        assert_eq!(report.visited(), 1);
    }

    #[test]
    fn test_open_compressed_export() {
        let dir = tempfile::tempdir().unwrap();
        let config = SnapshotConfig {
            snapshot_dir: dir.path().to_path_buf(),
            ..offline()
        };
        let text = export(&[
            r#"{"address":8200,"class":"S","size":16}"#,
            r#"{"address":8216,"class":"S","size":16}"#,
        ]);
        let compressed = zstd::stream::encode_all(Cursor::new(text), 3).unwrap();
        fs::write(config.compressed_path(PID), compressed).unwrap();

        let mut heap = SnapshotHeap::open(PID, &config).unwrap();
        let report = CensusEngine::default().run(&mut heap).unwrap();

        assert_eq!(
            report.table(GenerationBucket::Survivor).get("S").copied(),
            Some(ClassStats {
                count: 2,
                total_size: 32
            })
        );
    }

    #[test]
    fn test_missing_export_is_attach_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = SnapshotConfig {
            snapshot_dir: dir.path().to_path_buf(),
            ..offline()
        };

        let result = SnapshotHeap::open(PID, &config);
        assert!(matches!(result, Err(AccessError::Attach { pid: PID, .. })));
    }

    #[test]
    fn test_dead_process_is_attach_failure() {
        let config = SnapshotConfig {
            require_live_process: true,
            ..offline()
        };

        let result = SnapshotHeap::open(u32::MAX - 1, &config);
        match result {
            Err(AccessError::Attach { reason, .. }) => assert!(reason.contains("not running")),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("attached to a missing process"),
        }
    }
}
