//! Error types for the pipeline.

/// Top-level error type for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Sample error: {0}")]
    Sample(#[from] SampleError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Candidate-dataset loading errors.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to read dataset: {0}")]
    Read(#[from] csv::Error),
}

/// Sampling errors.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("Requested sample of {requested} records exceeds population of {population}")]
    SizeExceedsPopulation { requested: usize, population: usize },
}

/// MIME parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Raw text is not a parseable message: {0}")]
    MalformedMessage(#[from] mailparse::MailParseError),

    #[error("Message has no From address")]
    MissingSender,
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
