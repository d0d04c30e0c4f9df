//! Census report rendering.

use crate::classifier::GenerationBucket;
use crate::config::CensusConfig;
use crate::engine::{CensusReport, Completeness};
use crate::layout::HeapLayout;
use crate::stats::{ClassStats, ClassStatsTable};
use std::fmt;

const COUNT_WIDTH: usize = 12;
const SIZE_WIDTH: usize = 16;
const TOTAL_LABEL: &str = "(total)";

/// Renders a [`CensusReport`] as fixed-width text.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    min_class_width: usize,
}

impl ReportFormatter {
    pub fn new(min_class_width: usize) -> Self {
        Self { min_class_width }
    }

    pub fn from_config(config: &CensusConfig) -> Self {
        Self::new(config.min_class_width)
    }

    /// Render the full report: one section per generation (or a single
    /// combined section for region-based heaps) and a summary line.
    pub fn render(&self, report: &CensusReport) -> String {
        Rendered {
            report,
            class_width: self.class_width(report),
        }
        .to_string()
    }

    /// Class column width, wide enough for every name in the report.
    fn class_width(&self, report: &CensusReport) -> usize {
        [
            GenerationBucket::Eden,
            GenerationBucket::Survivor,
            GenerationBucket::Old,
            GenerationBucket::Unknown,
        ]
        .iter()
        .map(|bucket| report.table(*bucket).widest_name())
        .chain([self.min_class_width, TOTAL_LABEL.len()])
        .max()
        .unwrap_or(self.min_class_width)
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::from_config(&CensusConfig::default())
    }
}

struct Rendered<'a> {
    report: &'a CensusReport,
    class_width: usize,
}

impl Rendered<'_> {
    fn line_width(&self) -> usize {
        self.class_width + COUNT_WIDTH + SIZE_WIDTH + 2
    }

    fn banner(&self, f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
        writeln!(f, "{:-^width$}", format!(" {title} "), width = self.line_width())
    }

    fn row(
        &self,
        f: &mut fmt::Formatter<'_>,
        class: &str,
        count: &dyn fmt::Display,
        size: &dyn fmt::Display,
    ) -> fmt::Result {
        writeln!(
            f,
            "{:<cw$} {:>nw$} {:>sw$}",
            class,
            count,
            size,
            cw = self.class_width,
            nw = COUNT_WIDTH,
            sw = SIZE_WIDTH
        )
    }

    fn section(
        &self,
        f: &mut fmt::Formatter<'_>,
        title: &str,
        table: &ClassStatsTable,
    ) -> fmt::Result {
        self.banner(f, title)?;
        self.row(f, "class", &"count", &"total size")?;

        if table.is_empty() {
            return writeln!(f, "(no objects)");
        }

        for (class, ClassStats { count, total_size }) in table.sorted() {
            self.row(f, class, &count, &total_size)?;
        }

        let totals = table.totals();
        self.row(f, TOTAL_LABEL, &totals.count, &totals.total_size)
    }
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;

        if let Completeness::TimedOut { visited } = report.completeness() {
            writeln!(
                f,
                "INCOMPLETE: census stopped after {visited} objects (deadline reached)"
            )?;
        }

        if report.layout().supports_generations() {
            for bucket in GenerationBucket::GENERATIONS {
                self.section(f, bucket.label(), report.table(bucket))?;
            }
        } else {
            self.section(
                f,
                "All generations",
                report.table(GenerationBucket::Unknown),
            )?;
            if let HeapLayout::RegionBased { collector } = report.layout() {
                writeln!(
                    f,
                    "note: per-generation attribution unavailable for collector {collector}"
                )?;
            }
        }

        writeln!(f, "{}", "-".repeat(self.line_width()))?;
        write!(
            f,
            "visited={} attributed={} unknown={} misclassified={}",
            report.visited(),
            report.attributed(),
            report.unknown(),
            report.misclassified()
        )?;
        if let Some(used) = report.used_bytes() {
            write!(f, " used={}", format_bytes(used))?;
        }
        writeln!(f)
    }
}

/// Format a byte count for display.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
