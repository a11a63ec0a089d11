//! Handler tests: queue event in, partial batch response out.
//!
//! Storage and index are replaced with in-memory implementations of the public traits.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;

use steplog_ingest::{
    BulkDocument, BulkReport, DocumentIndex, IngestError, IngestPipeline, IngestPipelineBuilder,
    ObjectStore, QueueEnvelope,
};
use steplog_lambda::{BatchResponse, handle};

#[derive(Default)]
struct MemoryStore {
    objects: HashMap<String, Bytes>,
}

impl MemoryStore {
    fn with_log(mut self, key: &str, text: &str) -> Self {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).expect("gzip write");
        let data = encoder.finish().expect("gzip finish");
        self.objects.insert(key.to_owned(), Bytes::from(data));
        self
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Bytes, IngestError> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| IngestError::Retrieval {
                location: format!("s3://{bucket}/{key}"),
                reason: "NoSuchKey".to_owned(),
            })
    }
}

impl ObjectStore for MemoryStore {
    async fn last_modified(&self, bucket: &str, key: &str) -> Result<DateTime<Utc>, IngestError> {
        self.get(bucket, key)?;
        Ok(DateTime::from_timestamp(1_705_319_998, 0).expect("valid timestamp"))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, IngestError> {
        self.get(bucket, key)
    }
}

#[derive(Default)]
struct MemoryIndex {
    writes: Mutex<usize>,
    unavailable: bool,
}

impl DocumentIndex for MemoryIndex {
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[BulkDocument<'_>],
    ) -> Result<BulkReport, IngestError> {
        if self.unavailable {
            return Err(IngestError::Index {
                index: index.to_owned(),
                reason: "HTTP 503 Service Unavailable".to_owned(),
            });
        }
        *self.writes.lock().expect("lock") += 1;
        Ok(BulkReport {
            index: index.to_owned(),
            attempted: documents.len(),
            succeeded: documents.len(),
            failures: Vec::new(),
        })
    }
}

fn pipeline(store: MemoryStore, index: MemoryIndex) -> IngestPipeline<MemoryStore, MemoryIndex> {
    IngestPipelineBuilder::new()
        .object_store(store)
        .document_index(index)
        .build()
        .expect("pipeline should build")
}

fn queue_event(messages: &[(&str, &str)]) -> QueueEnvelope {
    let records: Vec<_> = messages
        .iter()
        .map(|(id, key)| {
            let body = serde_json::json!({
                "Records": [{
                    "eventSource": "aws:s3",
                    "awsRegion": "eu-west-1",
                    "eventTime": "2024-01-15T12:00:00.000Z",
                    "s3": { "bucket": { "name": "emr-logs" }, "object": { "key": key } }
                }]
            });
            serde_json::json!({
                "messageId": id,
                "receiptHandle": "AQEB",
                "eventSource": "aws:sqs",
                "eventSourceARN": "arn:aws:sqs:eu-west-1:123456789012:emr-step-logs",
                "awsRegion": "eu-west-1",
                "body": body.to_string()
            })
        })
        .collect();
    serde_json::from_value(serde_json::json!({ "Records": records })).expect("valid event")
}

#[tokio::test]
async fn all_messages_succeed_returns_no_failures() {
    // Given: two messages whose logs exist
    let store = MemoryStore::default()
        .with_log("emr/j-1/steps/s-1/stdout.gz", "started\nfinished\n")
        .with_log("emr/j-1/steps/s-1/stderr.gz", "warning\n");
    let p = pipeline(store, MemoryIndex::default());
    let event = queue_event(&[
        ("m1", "emr/j-1/steps/s-1/stdout.gz"),
        ("m2", "emr/j-1/steps/s-1/stderr.gz"),
    ]);

    // When: handling the event
    let response = handle(&p, "req-1", &event).await;

    // Then: nothing is redelivered
    assert_eq!(response, BatchResponse::default());
    assert_eq!(*p.document_index().writes.lock().unwrap(), 2);
}

#[tokio::test]
async fn missing_object_is_reported_for_redelivery() {
    // Given: one message points at an object that does not exist
    let store = MemoryStore::default().with_log("emr/j-1/steps/s-1/stdout.gz", "ok\n");
    let p = pipeline(store, MemoryIndex::default());
    let event = queue_event(&[
        ("m1", "emr/j-1/steps/s-1/stdout.gz"),
        ("m2", "emr/j-2/steps/s-2/stdout.gz"),
    ]);

    // When
    let response = handle(&p, "req-2", &event).await;

    // Then: only the failing message is listed
    assert_eq!(response.batch_item_failures.len(), 1);
    assert_eq!(response.batch_item_failures[0].item_identifier, "m2");
}

#[tokio::test]
async fn index_outage_fails_every_message_with_files() {
    // Given: the index rejects every bulk request
    let store = MemoryStore::default().with_log("emr/j-1/steps/s-1/stdout.gz", "ok\n");
    let index = MemoryIndex {
        unavailable: true,
        ..Default::default()
    };
    let p = pipeline(store, index);
    let event = queue_event(&[
        ("m1", "emr/j-1/steps/s-1/stdout.gz"),
        ("m2", "emr/j-1/steps/s-1/controller.gz"),
    ]);

    // When
    let response = handle(&p, "req-3", &event).await;

    // Then: the filtered message is not redelivered
    let ids: Vec<_> = response
        .batch_item_failures
        .iter()
        .map(|f| f.item_identifier.as_str())
        .collect();
    assert_eq!(ids, vec!["m1"]);
}

#[tokio::test]
async fn response_serializes_to_partial_batch_format() {
    let p = pipeline(MemoryStore::default(), MemoryIndex::default());
    let event = queue_event(&[("gone", "emr/j-1/steps/s-1/stdout.gz")]);

    let response = handle(&p, "req-4", &event).await;
    let json = serde_json::to_value(&response).expect("serializable");

    assert_eq!(
        json,
        serde_json::json!({ "batchItemFailures": [{ "itemIdentifier": "gone" }] })
    );
}
