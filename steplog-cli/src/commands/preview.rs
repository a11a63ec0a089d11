//! `steplog preview` command handler
//!
//! Runs decode and enrichment over a local gzip file so the records a real
//! event would produce can be inspected without touching storage or the index.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use steplog_core::config::SteplogConfig;
use steplog_core::types::{EnrichedRecord, IngestionEvent};
use steplog_ingest::{
    LineEnricher, LineOutcome, ObjectText, PathFilter, decode_gzip, document_id, index_name,
};

use crate::cli::PreviewArgs;
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `preview` command.
///
/// Without `--config` the default decompression limit is used, so no index
/// endpoint needs to be configured.
pub async fn execute(
    args: PreviewArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = match config_path {
        Some(_) => load_config(config_path).await?,
        None => SteplogConfig::default(),
    };

    let data = tokio::fs::read(&args.file).await?;
    let modified: DateTime<Utc> = tokio::fs::metadata(&args.file).await?.modified()?.into();

    let event = IngestionEvent {
        source_bucket: args.bucket,
        object_key: args.key,
        region: args.region,
        event_time: modified.to_rfc3339(),
    };
    info!(file = %args.file.display(), log_file = %event.log_file(), "previewing log file");

    let text = decode_gzip(
        &args.file.display().to_string(),
        &data,
        config.ingest.max_object_bytes,
    )?;
    let report = build_preview(&event, &text, modified, args.limit)?;
    writer.render(&report)?;

    Ok(())
}

fn build_preview(
    event: &IngestionEvent,
    text: &ObjectText,
    modified: DateTime<Utc>,
    limit: usize,
) -> Result<PreviewReport, CliError> {
    let filter = PathFilter::new()?;
    let enricher = LineEnricher::new()?;
    let ctx = enricher.file_context(event, modified.to_rfc3339());

    let lines = text.lines();
    let mut records = 0u64;
    let mut skipped = 0u64;
    let mut sample = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let line_number = idx as u64 + 1;
        match enricher.enrich(line_number, line, &ctx) {
            LineOutcome::Record(record) => {
                records += 1;
                if sample.len() < limit {
                    sample.push(PreviewDocument {
                        document_id: document_id(&record.log_file, record.log_file_line_number),
                        record,
                    });
                }
            }
            LineOutcome::Skipped => skipped += 1,
        }
    }

    Ok(PreviewReport {
        log_file: ctx.log_file,
        matches_step_pattern: filter.accepts(&event.object_key),
        index: index_name(Utc::now().date_naive()),
        total_lines: lines.len() as u64,
        records,
        skipped,
        sample,
    })
}

/// One enriched record with its document id.
#[derive(Debug, Serialize)]
pub struct PreviewDocument {
    pub document_id: String,
    #[serde(flatten)]
    pub record: EnrichedRecord,
}

/// Preview result.
#[derive(Debug, Serialize)]
pub struct PreviewReport {
    /// `s3://bucket/key` the records would carry
    pub log_file: String,
    /// Whether a real notification for this key would pass the path filter
    pub matches_step_pattern: bool,
    /// Index a write today would target
    pub index: String,
    pub total_lines: u64,
    pub records: u64,
    pub skipped: u64,
    /// First records, up to `--limit`
    pub sample: Vec<PreviewDocument>,
}

impl Render for PreviewReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Preview: {}", self.log_file.bold())?;
        let matches = if self.matches_step_pattern {
            "yes".green()
        } else {
            "no (would be filtered)".yellow()
        };
        writeln!(w, "  Step log path: {}", matches)?;
        writeln!(w, "  Index:         {}", self.index.cyan())?;
        writeln!(
            w,
            "  Lines:         {} ({} records, {} skipped)",
            self.total_lines, self.records, self.skipped
        )?;

        if self.sample.is_empty() {
            return Ok(());
        }

        writeln!(w)?;
        for doc in &self.sample {
            writeln!(
                w,
                "  {:>6}  {}  {}",
                doc.record.log_file_line_number,
                doc.document_id[..12].dimmed(),
                doc.record.raw_log
            )?;
        }
        if (self.sample.len() as u64) < self.records {
            writeln!(
                w,
                "  ... {} more",
                self.records - self.sample.len() as u64
            )?;
        }

        Ok(())
    }
}
