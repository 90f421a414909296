//! Candidate dataset — the tabular source of raw email records.
//!
//! Loaded once at process start; the pipeline only ever samples from it and
//! never writes back.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DatasetError;

/// One row of the candidate dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Unique source identifier (the original mailbox file path).
    pub file: String,
    /// Raw MIME message text.
    pub message: String,
}

/// The full candidate dataset held in memory.
#[derive(Debug, Clone)]
pub struct CandidateDataset {
    records: Vec<CandidateRecord>,
}

impl CandidateDataset {
    /// Load the dataset from a CSV file with `file` and `message` columns.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let mut reader = csv::Reader::from_path(path)?;
        let records = reader
            .deserialize()
            .collect::<Result<Vec<CandidateRecord>, csv::Error>>()?;
        info!(count = records.len(), path = %path.display(), "Candidate dataset loaded");
        Ok(Self { records })
    }

    /// Build a dataset directly from records (fixtures, tests).
    pub fn from_records(records: Vec<CandidateRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
