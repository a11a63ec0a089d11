//! Command handlers -- one module per subcommand

pub mod config;
pub mod preview;
pub mod replay;

use std::path::Path;

use tracing::info;

use steplog_core::config::SteplogConfig;

use crate::error::CliError;

/// Load the effective configuration.
///
/// With a path the file is read and environment overrides are applied on top;
/// without one, defaults plus environment variables are used.
pub async fn load_config(path: Option<&Path>) -> Result<SteplogConfig, CliError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Ok(SteplogConfig::load(path).await?)
        }
        None => {
            info!("loading configuration from environment");
            Ok(SteplogConfig::from_env()?)
        }
    }
}

/// Human-readable configuration source for reports.
pub fn config_source(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(environment)".to_owned())
}

/// Build AWS SDK configuration honouring the configured region.
pub async fn sdk_config(config: &SteplogConfig) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if !config.ingest.region.is_empty() {
        loader = loader.region(aws_config::Region::new(config.ingest.region.clone()));
    }
    loader.load().await
}
