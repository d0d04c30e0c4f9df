//! Per-class statistics collection.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Instance count and summed shallow size for one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassStats {
    /// Objects seen
    pub count: u64,
    /// Sum of shallow sizes in bytes
    pub total_size: u64,
}

impl ClassStats {
    /// Record one object of `size` bytes.
    pub fn record(&mut self, size: u64) {
        self.count += 1;
        self.total_size = self.total_size.saturating_add(size);
    }

    /// Report ordering: larger total size first, then larger count.
    pub fn report_order(&self, other: &Self) -> Ordering {
        other
            .total_size
            .cmp(&self.total_size)
            .then_with(|| other.count.cmp(&self.count))
    }
}

/// Class name to stats mapping for one generation.
///
/// Entries are created on first sight and only ever grow.
#[derive(Debug, Clone, Default)]
pub struct ClassStatsTable {
    entries: HashMap<String, ClassStats>,
}

impl ClassStatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one object of class `key` with `size` bytes.
    pub fn accumulate(&mut self, key: &str, size: u64) {
        match self.entries.get_mut(key) {
            Some(stats) => stats.record(size),
            None => {
                let mut stats = ClassStats::default();
                stats.record(size);
                self.entries.insert(key.to_string(), stats);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ClassStats> {
        self.entries.get(key)
    }

    /// Number of distinct classes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum over all classes.
    pub fn totals(&self) -> ClassStats {
        self.entries
            .values()
            .fold(ClassStats::default(), |acc, stats| ClassStats {
                count: acc.count + stats.count,
                total_size: acc.total_size.saturating_add(stats.total_size),
            })
    }

    /// Entries in report order.
    ///
    /// Descending total size, then descending count; remaining ties are
    /// broken by ascending class name so output is reproducible.
    pub fn sorted(&self) -> Vec<(&str, ClassStats)> {
        let mut rows: Vec<(&str, ClassStats)> = self
            .entries
            .iter()
            .map(|(name, stats)| (name.as_str(), *stats))
            .collect();

        rows.sort_by(|(a_name, a), (b_name, b)| {
            a.report_order(b).then_with(|| a_name.cmp(b_name))
        });
        rows
    }

    /// Longest class name in the table, in characters.
    pub fn widest_name(&self) -> usize {
        self.entries
            .keys()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate() {
        let mut table = ClassStatsTable::new();

        table.accumulate("A", 10);
        assert_eq!(
            table.get("A"),
            Some(&ClassStats {
                count: 1,
                total_size: 10
            })
        );

        table.accumulate("A", 20);
        table.accumulate("A", 30);
        table.accumulate("B", 5);

        assert_eq!(table.get("A").unwrap().count, 3);
        assert_eq!(table.get("A").unwrap().total_size, 60);
        assert_eq!(table.len(), 2);
        assert!(table.get("C").is_none());
    }

    #[test]
    fn test_totals() {
        let mut table = ClassStatsTable::new();
        assert_eq!(table.totals(), ClassStats::default());

        table.accumulate("A", 10);
        table.accumulate("B", 5);
        table.accumulate("B", 5);

        assert_eq!(
            table.totals(),
            ClassStats {
                count: 3,
                total_size: 20
            }
        );
    }

    #[test]
    fn test_sort_by_size_then_count() {
        let mut table = ClassStatsTable::new();
        table.accumulate("Small", 8);
        table.accumulate("Big", 100);
        // Same total size as "Single", more instances
        table.accumulate("Many", 20);
        table.accumulate("Many", 20);
        table.accumulate("Single", 40);

        let order: Vec<&str> = table.sorted().into_iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["Big", "Many", "Single", "Small"]);
    }

    #[test]
    fn test_full_tie_uses_class_name() {
        let mut table = ClassStatsTable::new();
        for name in ["zeta.Z", "alpha.A", "mid.M"] {
            table.accumulate(name, 16);
        }

        let first: Vec<&str> = table.sorted().into_iter().map(|(name, _)| name).collect();
        assert_eq!(first, vec!["alpha.A", "mid.M", "zeta.Z"]);

        // Insertion order must not matter
        let mut reversed = ClassStatsTable::new();
        for name in ["mid.M", "zeta.Z", "alpha.A"] {
            reversed.accumulate(name, 16);
        }
        let second: Vec<&str> = reversed.sorted().into_iter().map(|(name, _)| name).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_widest_name() {
        let mut table = ClassStatsTable::new();
        assert_eq!(table.widest_name(), 0);

        table.accumulate("java.lang.String", 24);
        table.accumulate("[B", 16);
        assert_eq!(table.widest_name(), 16);
    }
}
