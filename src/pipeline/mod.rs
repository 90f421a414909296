//! The pipeline's four operations: sample, stage, bootstrap, drain-and-sink.
//!
//! An external scheduler runs them in that order on each tick. The stores
//! are injected, so overlapping ticks only interact through the staging
//! store's conditional insert and claim.

pub mod sinker;

pub use sinker::{DrainReport, Sinker};

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::dataset::{CandidateDataset, CandidateRecord};
use crate::error::Result;
use crate::sampler;
use crate::store::traits::{StagingStore, Warehouse};

/// Outcome counts for one staging pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageReport {
    /// Newly created pending records.
    pub staged: usize,
    /// Sampled rows whose `file` was already staged (pending or processed).
    pub duplicates: usize,
}

/// Outcome of a full tick.
#[derive(Debug, Clone, Copy)]
pub struct TickReport {
    pub stage: StageReport,
    pub drain: DrainReport,
}

/// The staging-and-normalization pipeline over injected stores.
pub struct Pipeline {
    config: PipelineConfig,
    dataset: CandidateDataset,
    staging: Arc<dyn StagingStore>,
    warehouse: Arc<dyn Warehouse>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        dataset: CandidateDataset,
        staging: Arc<dyn StagingStore>,
        warehouse: Arc<dyn Warehouse>,
    ) -> Self {
        Self {
            config,
            dataset,
            staging,
            warehouse,
        }
    }

    /// Draw this run's sample from the candidate dataset.
    pub fn sample(&self) -> Result<Vec<CandidateRecord>> {
        let sample = sampler::sample(
            &self.dataset,
            self.config.sample_size,
            self.config.sample_seed,
        )?;
        Ok(sample)
    }

    /// Idempotently stage a sample, assigning positional indexes.
    ///
    /// Safe to call repeatedly with overlapping samples; replays are
    /// absorbed by the staging store's conditional insert.
    pub async fn stage(&self, sample: &[CandidateRecord]) -> Result<StageReport> {
        let mut report = StageReport::default();
        for (index, record) in sample.iter().enumerate() {
            let payload = json!({
                "index": index,
                "file": &record.file,
                "message": &record.message,
            });
            if self
                .staging
                .stage(&record.file, index as i64, &payload)
                .await?
            {
                report.staged += 1;
            } else {
                report.duplicates += 1;
            }
        }
        info!(
            staged = report.staged,
            duplicates = report.duplicates,
            "Sample staged"
        );
        Ok(report)
    }

    /// Run the warehouse's idempotent DDL.
    pub async fn bootstrap_schema(&self) -> Result<()> {
        self.warehouse.bootstrap().await?;
        Ok(())
    }

    /// Drain pending staged records into the warehouse.
    pub async fn drain_and_sink(&self) -> Result<DrainReport> {
        let sinker = Sinker::new(Arc::clone(&self.staging), Arc::clone(&self.warehouse));
        sinker.drain().await
    }

    /// One scheduler tick: sample, stage, bootstrap, drain, in order.
    pub async fn run_tick(&self) -> Result<TickReport> {
        let run_id = Uuid::new_v4();
        info!(%run_id, sample_size = self.config.sample_size, "Pipeline tick started");

        let sample = self.sample()?;
        let stage = self.stage(&sample).await?;
        self.bootstrap_schema().await?;
        let drain = self.drain_and_sink().await?;

        info!(
            %run_id,
            staged = stage.staged,
            sunk = drain.sunk,
            skipped = drain.skipped,
            failed = drain.failed,
            "Pipeline tick complete"
        );
        Ok(TickReport { stage, drain })
    }
}
