//! Pipeline configuration from environment variables.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Default number of records drawn per run.
pub const DEFAULT_SAMPLE_SIZE: usize = 200;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the candidate dataset CSV (`file`, `message` columns).
    pub dataset_path: PathBuf,
    /// Number of records drawn per run.
    pub sample_size: usize,
    /// Path to the staging store database file.
    pub staging_db_path: PathBuf,
    /// Path to the relational warehouse database file.
    pub warehouse_db_path: PathBuf,
    /// Fixed sampler seed. `None` reseeds from wall-clock time per run.
    pub sample_seed: Option<u64>,
}

impl PipelineConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let dataset_path = std::env::var("MAILSINK_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.dataset_path);

        let sample_size = match std::env::var("MAILSINK_SAMPLE_SIZE") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MAILSINK_SAMPLE_SIZE".into(),
                message: format!("not a number: {raw}"),
            })?,
            Err(_) => defaults.sample_size,
        };

        let staging_db_path = std::env::var("MAILSINK_STAGING_DB")
            .map(PathBuf::from)
            .unwrap_or(defaults.staging_db_path);

        let warehouse_db_path = std::env::var("MAILSINK_WAREHOUSE_DB")
            .map(PathBuf::from)
            .unwrap_or(defaults.warehouse_db_path);

        let sample_seed = match std::env::var("MAILSINK_SAMPLE_SEED") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MAILSINK_SAMPLE_SEED".into(),
                message: format!("not a number: {raw}"),
            })?),
            Err(_) => None,
        };

        Ok(Self {
            dataset_path,
            sample_size,
            staging_db_path,
            warehouse_db_path,
            sample_seed,
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("./data/email.csv"),
            sample_size: DEFAULT_SAMPLE_SIZE,
            staging_db_path: PathBuf::from("./data/staging.db"),
            warehouse_db_path: PathBuf::from("./data/warehouse.db"),
            sample_seed: None,
        }
    }
}
