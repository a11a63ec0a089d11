use anyhow::Result;
use lambda_runtime::{LambdaEvent, service_fn};

use steplog_ingest::QueueEnvelope;
use steplog_lambda::{bootstrap, handle, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let config = bootstrap::load_config().await?;
    logging::init_tracing(&config.general)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "steplog-lambda starting");

    let pipeline = bootstrap::build_pipeline(&config).await?;
    let pipeline = &pipeline;

    lambda_runtime::run(service_fn(
        move |event: LambdaEvent<QueueEnvelope>| async move {
            let response = handle(pipeline, &event.context.request_id, &event.payload).await;
            Ok::<_, lambda_runtime::Error>(response)
        },
    ))
    .await
    .map_err(|e| anyhow::anyhow!("lambda runtime terminated: {}", e))?;

    tracing::info!("steplog-lambda shut down");
    Ok(())
}
