// Run configuration (projeval.toml).
//
// Every field has a default so the evaluator runs with no config file at
// all; a TOML file overrides only the keys it names.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "projeval.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Seasons to evaluate, in emission order.
    pub years: Vec<i32>,
    /// Projection systems, in emission order. File names are derived from
    /// the lowercased system name.
    pub systems: Vec<String>,
    pub stats_dir: PathBuf,
    pub projections_dir: PathBuf,
    pub output_dir: PathBuf,
    pub woba_constants: PathBuf,
    /// Playing time (PA/BF) assumed for players a system did not project.
    pub playing_time_fallback: f64,
    /// Players per exported chunk file.
    pub chunk_size: usize,
    /// Largest-miss entries retained per statistic.
    pub n_misses: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            years: (2010..=2024).collect(),
            systems: vec![
                "Marcel".to_string(),
                "Steamer".to_string(),
                "ZiPS".to_string(),
                "Razzball".to_string(),
                "Davenport".to_string(),
            ],
            stats_dir: PathBuf::from("stats"),
            projections_dir: PathBuf::from("projections"),
            output_dir: PathBuf::from("src/_data"),
            woba_constants: PathBuf::from("stats/woba.csv"),
            playing_time_fallback: 250.0,
            chunk_size: 100,
            n_misses: 10,
        }
    }
}

/// Load the config. An explicit path must exist; the default path is
/// optional and falls back to built-in defaults when absent.
pub fn load_config(path: Option<&Path>) -> Result<EvalConfig, ConfigError> {
    let config = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.to_path_buf(),
            })?;
            parse(&text, p)?
        }
        None => {
            let p = Path::new(DEFAULT_CONFIG_PATH);
            match std::fs::read_to_string(p) {
                Ok(text) => parse(&text, p)?,
                Err(_) => EvalConfig::default(),
            }
        }
    };
    validate(&config)?;
    Ok(config)
}

fn parse(text: &str, path: &Path) -> Result<EvalConfig, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn validate(config: &EvalConfig) -> Result<(), ConfigError> {
    if config.years.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "years".into(),
            message: "at least one year is required".into(),
        });
    }
    if config.systems.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "systems".into(),
            message: "at least one projection system is required".into(),
        });
    }
    if config.chunk_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "chunk_size".into(),
            message: "chunk_size must be positive".into(),
        });
    }
    if config.n_misses == 0 {
        return Err(ConfigError::ValidationError {
            field: "n_misses".into(),
            message: "n_misses must be positive".into(),
        });
    }
    if !config.playing_time_fallback.is_finite() || config.playing_time_fallback <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "playing_time_fallback".into(),
            message: "playing_time_fallback must be a positive number".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_standard_run() {
        let c = EvalConfig::default();
        assert_eq!(c.years.first(), Some(&2010));
        assert_eq!(c.years.last(), Some(&2024));
        assert_eq!(c.systems.len(), 5);
        assert_eq!(c.chunk_size, 100);
        assert_eq!(c.n_misses, 10);
        assert!((c.playing_time_fallback - 250.0).abs() < f64::EPSILON);
        assert!(validate(&c).is_ok());
    }

    #[test]
    fn partial_toml_overrides_only_named_keys() {
        let text = "\
years = [2022, 2023]
systems = [\"Steamer\"]
playing_time_fallback = 1.0";
        let c: EvalConfig = toml::from_str(text).unwrap();
        assert_eq!(c.years, vec![2022, 2023]);
        assert_eq!(c.systems, vec!["Steamer".to_string()]);
        assert!((c.playing_time_fallback - 1.0).abs() < f64::EPSILON);
        // Unnamed keys keep their defaults.
        assert_eq!(c.chunk_size, 100);
        assert_eq!(c.stats_dir, PathBuf::from("stats"));
    }

    #[test]
    fn empty_years_rejected() {
        let c = EvalConfig {
            years: vec![],
            ..EvalConfig::default()
        };
        assert!(matches!(
            validate(&c),
            Err(ConfigError::ValidationError { field, .. }) if field == "years"
        ));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let c = EvalConfig {
            chunk_size: 0,
            ..EvalConfig::default()
        };
        assert!(validate(&c).is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/projeval.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
