//! Analysis configuration
//!
//! Layered lowest to highest: built-in defaults, an optional JSON config
//! file, then command-line flags (which clap also fills from the environment).

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::ranker::{Direction, SortKey};

/// Ore units one site produces per weekly extraction: a 30,000 m3/h drill
/// running 168 hours, at 10 m3 per ore unit.
pub const DEFAULT_SITE_YIELD: f64 = 504_000.0;

/// Recursion ceiling on top of the visited-formula guard
pub const DEFAULT_MAX_DEPTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub site_yield: f64,
    /// Top-level runs of each formula
    pub runs: f64,
    pub max_depth: usize,
    pub sort: SortKey,
    pub direction: Direction,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            site_yield: DEFAULT_SITE_YIELD,
            runs: 1.0,
            max_depth: DEFAULT_MAX_DEPTH,
            sort: SortKey::Margin,
            direction: Direction::Descending,
        }
    }
}

/// Values given on the command line; `None` leaves the lower layer alone
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub site_yield: Option<f64>,
    pub runs: Option<f64>,
    pub max_depth: Option<usize>,
    pub sort: Option<SortKey>,
    pub direction: Option<Direction>,
}

impl AnalysisConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Defaults, then the config file if given, then overrides
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.merge(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn merge(mut self, overrides: Overrides) -> Self {
        if let Some(v) = overrides.site_yield {
            self.site_yield = v;
        }
        if let Some(v) = overrides.runs {
            self.runs = v;
        }
        if let Some(v) = overrides.max_depth {
            self.max_depth = v;
        }
        if let Some(v) = overrides.sort {
            self.sort = v;
        }
        if let Some(v) = overrides.direction {
            self.direction = v;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.site_yield.is_finite() && self.site_yield > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "site_yield must be positive, got {}",
                self.site_yield
            )));
        }
        if !(self.runs.is_finite() && self.runs > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "runs must be positive, got {}",
                self.runs
            )));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"site_yield": 1000.0, "sort": "profit"}"#).unwrap();

        let config = AnalysisConfig::load(
            Some(&path),
            Overrides {
                runs: Some(2.0),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.site_yield, 1000.0);
        assert_eq!(config.sort, SortKey::Profit);
        assert_eq!(config.runs, 2.0);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.direction, Direction::Descending);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = AnalysisConfig::load(
            None,
            Overrides {
                site_yield: Some(0.0),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = AnalysisConfig::load(
            None,
            Overrides {
                runs: Some(f64::INFINITY),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = AnalysisConfig::load(Some(Path::new("/nonexistent/config.json")), Overrides::default());
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
