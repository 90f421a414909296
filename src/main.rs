use std::sync::Arc;

use mailsink::config::PipelineConfig;
use mailsink::dataset::CandidateDataset;
use mailsink::pipeline::Pipeline;
use mailsink::store::{LibSqlStagingStore, LibSqlWarehouse, StagingStore, Warehouse};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "tick".to_string());

    let config = PipelineConfig::from_env()?;
    let dataset = CandidateDataset::load(&config.dataset_path)?;

    let staging: Arc<dyn StagingStore> =
        Arc::new(LibSqlStagingStore::new_local(&config.staging_db_path).await?);
    let warehouse: Arc<dyn Warehouse> =
        Arc::new(LibSqlWarehouse::new_local(&config.warehouse_db_path).await?);

    let pipeline = Pipeline::new(config, dataset, staging, warehouse);

    match command.as_str() {
        "tick" => {
            pipeline.run_tick().await?;
        }
        "stage" => {
            let sample = pipeline.sample()?;
            pipeline.stage(&sample).await?;
        }
        "bootstrap" => {
            pipeline.bootstrap_schema().await?;
        }
        "drain" => {
            pipeline.bootstrap_schema().await?;
            pipeline.drain_and_sink().await?;
        }
        other => {
            anyhow::bail!("unknown command: {other} (expected tick, stage, bootstrap, or drain)");
        }
    }

    Ok(())
}
