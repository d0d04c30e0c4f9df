//! Census configuration.

use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Default minimum width of the class column
const DEFAULT_CLASS_WIDTH: usize = 40;

/// Census run options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CensusConfig {
    /// Stop the walk once this much time has passed and report what was
    /// counted so far, marked incomplete. `None` walks the whole heap.
    pub deadline: Option<Duration>,

    /// Minimum width of the class-name column
    pub min_class_width: usize,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            deadline: None,
            min_class_width: DEFAULT_CLASS_WIDTH,
        }
    }
}

impl CensusConfig {
    /// Read overrides from the environment.
    ///
    /// - `HEAPSCOPE_DEADLINE_MS`: deadline in milliseconds
    /// - `HEAPSCOPE_CLASS_WIDTH`: minimum class column width
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            deadline: parse_var(&lookup, "HEAPSCOPE_DEADLINE_MS")
                .map(Duration::from_millis)
                .or(defaults.deadline),
            min_class_width: parse_var(&lookup, "HEAPSCOPE_CLASS_WIDTH")
                .unwrap_or(defaults.min_class_width),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CensusConfig::default();

        assert!(config.deadline.is_none());
        assert_eq!(config.min_class_width, 40);
    }

    #[test]
    fn test_overrides() {
        let config = CensusConfig::from_lookup(|name| match name {
            "HEAPSCOPE_DEADLINE_MS" => Some("1500".to_string()),
            "HEAPSCOPE_CLASS_WIDTH" => Some(" 64 ".to_string()),
            _ => None,
        });

        assert_eq!(config.deadline, Some(Duration::from_millis(1500)));
        assert_eq!(config.min_class_width, 64);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = CensusConfig::from_lookup(|name| match name {
            "HEAPSCOPE_DEADLINE_MS" => Some("soon".to_string()),
            "HEAPSCOPE_CLASS_WIDTH" => Some("-3".to_string()),
            _ => None,
        });

        assert_eq!(config, CensusConfig::default());
    }
}
