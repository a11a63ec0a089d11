//! Process startup: configuration loading and client construction.
//!
//! Clients are built once per process and handed to the pipeline; nothing
//! here is stored in globals.

use std::path::PathBuf;

use anyhow::{Context, Result};

use steplog_core::config::SteplogConfig;
use steplog_core::error::SteplogError;
use steplog_ingest::{IngestPipeline, IngestPipelineBuilder, OpenSearchIndex, PipelineConfig, S3ObjectStore};

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "STEPLOG_CONFIG";

/// Pipeline type used in production.
pub type ProductionPipeline = IngestPipeline<S3ObjectStore, OpenSearchIndex>;

/// Load configuration.
///
/// When `STEPLOG_CONFIG` points to a file it is read first; environment
/// variables are applied on top either way.
pub async fn load_config() -> Result<SteplogConfig> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.is_empty() => {
            let path = PathBuf::from(path);
            SteplogConfig::load(&path)
                .await
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        _ => SteplogConfig::from_env().context("failed to load config from environment"),
    }
}

/// Build the production pipeline from loaded configuration.
pub async fn build_pipeline(config: &SteplogConfig) -> Result<ProductionPipeline> {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if !config.ingest.region.is_empty() {
        loader = loader.region(aws_config::Region::new(config.ingest.region.clone()));
    }
    let sdk_config = loader.load().await;

    let pipeline = IngestPipelineBuilder::new()
        .config(PipelineConfig::from_core(&config.ingest))
        .object_store(S3ObjectStore::from_sdk_config(&sdk_config))
        .document_index(OpenSearchIndex::from_config(&config.ingest))
        .build()
        .map_err(SteplogError::from)
        .context("failed to build ingest pipeline")?;

    tracing::info!(
        endpoint = %config.ingest.endpoint_url(),
        region = %config.ingest.region,
        batch_size = config.ingest.batch_size,
        "ingest pipeline initialized"
    );

    Ok(pipeline)
}
