//! Optional TOML configuration for `omop-link`.
//!
//! ```toml
//! index_date = "2016-01-01"
//! vocabulary = "vocab/CONCEPT.csv"
//! output_dir = "final_omop"
//! write_checkpoints = true
//! ```
//!
//! Relative paths are resolved against the directory of the config file.
//! Every value is overridden by the matching command line flag.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use omop_model::LinkOptions;
use serde::Deserialize;
use thiserror::Error;

use crate::cli::{LinkArgs, MapArgs};

/// Default output directory name under the link input directory.
pub const DEFAULT_LINK_OUTPUT: &str = "final_omop";
/// Default output directory name under the map source directory.
pub const DEFAULT_MAP_OUTPUT: &str = "processed_source";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no reference vocabulary given (use --vocabulary or `vocabulary` in the config file)")]
    MissingVocabulary,
}

/// Values read from a config file. Absent keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    pub index_date: Option<NaiveDate>,
    pub vocabulary: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub write_checkpoints: Option<bool>,
}

impl LinkConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    fn relative_to(self, base: &Path) -> Self {
        let rebase = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Self {
            vocabulary: self.vocabulary.map(rebase),
            output_dir: self.output_dir.map(rebase),
            ..self
        }
    }

    fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}

/// Fully resolved settings for one `link` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub vocabulary: PathBuf,
    pub options: LinkOptions,
}

impl LinkSettings {
    /// Merges flags over the config file over built-in defaults.
    pub fn resolve(args: &LinkArgs) -> Result<Self, ConfigError> {
        let config = LinkConfig::load_optional(args.config.as_deref())?;
        let vocabulary = args
            .vocabulary
            .clone()
            .or(config.vocabulary)
            .ok_or(ConfigError::MissingVocabulary)?;
        let output_dir = args
            .output_dir
            .clone()
            .or(config.output_dir)
            .unwrap_or_else(|| args.input_dir.join(DEFAULT_LINK_OUTPUT));

        let mut options = LinkOptions::default()
            .with_checkpoints(args.write_checkpoints || config.write_checkpoints.unwrap_or(false));
        if let Some(date) = args.index_date.or(config.index_date) {
            options = options.with_index_date(date);
        }

        Ok(Self {
            input_dir: args.input_dir.clone(),
            output_dir,
            vocabulary,
            options,
        })
    }
}

/// Fully resolved settings for one `map` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSettings {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub index_date: NaiveDate,
}

impl MapSettings {
    pub fn resolve(args: &MapArgs) -> Result<Self, ConfigError> {
        let config = LinkConfig::load_optional(args.config.as_deref())?;
        let index_date = args
            .index_date
            .or(config.index_date)
            .unwrap_or_else(|| LinkOptions::default().index_date);
        Ok(Self {
            source_dir: args.source_dir.clone(),
            output_dir: args
                .output_dir
                .clone()
                .unwrap_or_else(|| args.source_dir.join(DEFAULT_MAP_OUTPUT)),
            index_date,
        })
    }
}
