//! Invocation handler and partial batch response.
//!
//! The handler never fails the whole invocation for per-message problems.
//! Instead it lists the failed message ids in `batchItemFailures`, so the
//! queue redelivers only those messages. Because document ids are
//! deterministic, redelivered messages overwrite what was already written.

use serde::{Deserialize, Serialize};

use steplog_ingest::{DocumentIndex, IngestPipeline, InvocationReport, ObjectStore, QueueEnvelope};

/// Partial batch response returned to the queue trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub batch_item_failures: Vec<BatchItemFailure>,
}

/// One message to be redelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub item_identifier: String,
}

impl From<&InvocationReport> for BatchResponse {
    fn from(report: &InvocationReport) -> Self {
        Self {
            batch_item_failures: report
                .failed_message_ids()
                .into_iter()
                .map(|item_identifier| BatchItemFailure { item_identifier })
                .collect(),
        }
    }
}

/// Process one queue event and build the partial batch response.
pub async fn handle<S, I>(
    pipeline: &IngestPipeline<S, I>,
    request_id: &str,
    envelope: &QueueEnvelope,
) -> BatchResponse
where
    S: ObjectStore,
    I: DocumentIndex,
{
    let report = pipeline.process_envelope(envelope, request_id).await;
    let response = BatchResponse::from(&report);

    if !response.batch_item_failures.is_empty() {
        tracing::warn!(
            request_id,
            failed = response.batch_item_failures.len(),
            total = envelope.records.len(),
            "reporting messages for redelivery"
        );
    }

    response
}
