//! `steplog replay` command handler
//!
//! Feeds a captured queue event through the same pipeline the function runs.
//! With `--dry-run` objects are still read from storage but index writes are
//! only recorded.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

use steplog_core::config::SteplogConfig;
use steplog_ingest::{
    BulkDocument, BulkReport, DocumentIndex, IngestError, IngestPipeline, IngestPipelineBuilder,
    InvocationReport, OpenSearchIndex, PipelineConfig, QueueEnvelope, S3ObjectStore,
};

use crate::cli::ReplayArgs;
use crate::commands::{load_config, sdk_config};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `replay` command.
pub async fn execute(
    args: ReplayArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let envelope = read_event(&args.event).await?;

    info!(
        event = %args.event.display(),
        messages = envelope.records.len(),
        dry_run = args.dry_run,
        "replaying queue event"
    );

    let report = if args.dry_run {
        let pipeline = build_pipeline(&config, RecordingIndex::default()).await?;
        let report = pipeline.process(&envelope).await;
        ReplayReport::new(report, Some(pipeline.document_index().planned_writes()))
    } else {
        let index = OpenSearchIndex::from_config(&config.ingest);
        let pipeline = build_pipeline(&config, index).await?;
        ReplayReport::new(pipeline.process(&envelope).await, None)
    };

    writer.render(&report)?;

    if !report.failed_message_ids.is_empty() {
        return Err(CliError::Command(format!(
            "{} message(s) failed",
            report.failed_message_ids.len()
        )));
    }

    Ok(())
}

/// Read and parse a queue event JSON file.
async fn read_event(path: &Path) -> Result<QueueEnvelope, CliError> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_event(&content)
        .map_err(|e| CliError::Command(format!("invalid event file {}: {}", path.display(), e)))
}

fn parse_event(content: &str) -> Result<QueueEnvelope, serde_json::Error> {
    serde_json::from_str(content)
}

async fn build_pipeline<I: DocumentIndex>(
    config: &SteplogConfig,
    index: I,
) -> Result<IngestPipeline<S3ObjectStore, I>, CliError> {
    let sdk_config = sdk_config(config).await;
    let pipeline = IngestPipelineBuilder::new()
        .config(PipelineConfig::from_core(&config.ingest))
        .object_store(S3ObjectStore::from_sdk_config(&sdk_config))
        .document_index(index)
        .build()?;
    Ok(pipeline)
}

/// Document index that records what would be written.
#[derive(Default)]
struct RecordingIndex {
    writes: Mutex<BTreeMap<String, usize>>,
}

impl RecordingIndex {
    fn planned_writes(&self) -> BTreeMap<String, usize> {
        self.writes
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

impl DocumentIndex for RecordingIndex {
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[BulkDocument<'_>],
    ) -> Result<BulkReport, IngestError> {
        let mut writes = self.writes.lock().map_err(|_| IngestError::Index {
            index: index.to_owned(),
            reason: "recording lock poisoned".to_owned(),
        })?;
        *writes.entry(index.to_owned()).or_default() += documents.len();

        Ok(BulkReport {
            index: index.to_owned(),
            attempted: documents.len(),
            succeeded: documents.len(),
            failures: Vec::new(),
        })
    }
}

/// Replay result.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    /// Whether index writes were only recorded
    pub dry_run: bool,
    #[serde(flatten)]
    pub report: InvocationReport,
    /// Message ids that would be returned as batch item failures
    pub failed_message_ids: Vec<String>,
    /// Documents per index (dry run only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_writes: Option<BTreeMap<String, usize>>,
}

impl ReplayReport {
    fn new(report: InvocationReport, planned_writes: Option<BTreeMap<String, usize>>) -> Self {
        Self {
            dry_run: planned_writes.is_some(),
            failed_message_ids: report.failed_message_ids(),
            report,
            planned_writes,
        }
    }
}

impl Render for ReplayReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(
            w,
            "Replay {}{}",
            self.report.invocation_id.bold(),
            mode.yellow()
        )?;
        writeln!(w, "  Messages:          {}", self.report.messages.len())?;
        writeln!(w, "  Files processed:   {}", self.report.files_processed())?;
        writeln!(w, "  Records indexed:   {}", self.report.records_indexed())?;
        writeln!(w, "  Lines skipped:     {}", self.report.lines_skipped())?;
        writeln!(w, "  Document failures: {}", self.report.document_failures())?;

        for message in &self.report.messages {
            let status = if message.failed() {
                "FAILED".red().bold()
            } else {
                "OK".green().bold()
            };
            writeln!(w)?;
            writeln!(
                w,
                "  [{}] {} (filtered: {})",
                status, message.message_id, message.filtered
            )?;
            for file in &message.files {
                writeln!(
                    w,
                    "    s3://{}/{}  lines={} indexed={} skipped={} batches={}",
                    file.bucket,
                    file.key,
                    file.total_lines,
                    file.indexed,
                    file.skipped,
                    file.batches_flushed
                )?;
                for failure in &file.document_failures {
                    writeln!(
                        w,
                        "      {} {} {}",
                        failure.status.to_string().red(),
                        failure.document_id,
                        failure.reason
                    )?;
                }
            }
            for error in &message.errors {
                writeln!(w, "    Error: {}", error.red())?;
            }
        }

        if let Some(ref planned) = self.planned_writes {
            writeln!(w)?;
            writeln!(w, "  Planned writes:")?;
            for (index, count) in planned {
                writeln!(w, "    {}: {}", index.cyan(), count)?;
            }
        }

        Ok(())
    }
}
