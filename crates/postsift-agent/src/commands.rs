//! One-shot operator commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use postsift_client::{ClassifierClient, Classify};
use postsift_core::{Classification, ClassificationRequest, Error};
use postsift_extract::{FailedItem, FailureQueue, MirrorExtractor};
use postsift_telemetry::{ExportFormat, ReportQuery, ReportReader, ReportRecord, ReportWriter};
use tracing::warn;

use crate::config::AgentConfig;

/// Classify `--text` or `--url` from the terminal and print the verdict.
///
/// Exhaustion prints the stable unavailable line and exits non-zero.
pub async fn classify_once(
    config: AgentConfig,
    text: Option<String>,
    url: Option<String>,
) -> Result<()> {
    let client = ClassifierClient::new(config.classifier.clone())
        .context("failed to build classifier client")?;

    let request = match (text, url) {
        (Some(text), url) => {
            let mut request = ClassificationRequest::from_text(text);
            if let Some(url) = url {
                request = request.with_url(url);
            }
            request.with_source("cli")
        }
        (None, Some(url)) => {
            let extractor = MirrorExtractor::new(config.extract.clone())?;
            if extractor.is_post_url(&url) {
                extractor.extract(&url).await?.into_request("cli")
            } else {
                ClassificationRequest::from_url(url).with_source("cli")
            }
        }
        (None, None) => anyhow::bail!("pass --text or --url"),
    };

    match client.classify(&request).await {
        Ok(verdict) => {
            println!("label:    {}", verdict.label);
            if let Some(reason) = &verdict.reason {
                println!("reason:   {}", reason);
            }
            println!("endpoint: {}", verdict.endpoint);
            println!("latency:  {} ms", verdict.latency_ms);
            record_verdict(&config, &request, &verdict);
            Ok(())
        }
        Err(Error::Exhausted(report)) => {
            eprintln!("classification unavailable");
            eprintln!("  {} attempts: {}", report.attempt_count(), report.summary());
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Best-effort report append for terminal classifications
fn record_verdict(config: &AgentConfig, request: &ClassificationRequest, verdict: &Classification) {
    let write = || -> std::io::Result<()> {
        let mut writer = ReportWriter::new(config.report.clone())?;
        writer.write_record(&ReportRecord::new(request, verdict))?;
        writer.flush()
    };
    if let Err(e) = write() {
        warn!("Failed to record verdict: {}", e);
    }
}

/// Drain the failure queue and re-run extraction + classification per item
pub async fn retry(config: AgentConfig) -> Result<()> {
    let queue = FailureQueue::new(config.queue_path.clone());
    let items = queue.drain()?;
    if items.is_empty() {
        println!("Failure queue is empty");
        return Ok(());
    }
    println!("Retrying {} queued items", items.len());

    let client = ClassifierClient::new(config.classifier.clone())
        .context("failed to build classifier client")?;
    let extractor = MirrorExtractor::new(config.extract.clone())?;
    let mut writer = ReportWriter::new(config.report.clone())?;

    let mut succeeded = 0usize;
    let mut requeued = 0usize;

    for item in items {
        match retry_item(&client, &extractor, &item.url).await {
            Ok((request, verdict)) => {
                println!("{} -> {} via {}", item.url, verdict.label, verdict.endpoint);
                if let Err(e) = writer.write_record(&ReportRecord::new(&request, &verdict)) {
                    warn!("Failed to record verdict for {}: {}", item.url, e);
                }
                succeeded += 1;
            }
            Err((stage, reason)) => {
                warn!("Retry failed for {} at {}: {}", item.url, stage, reason);
                queue.append(&FailedItem::new(item.url.as_str(), stage, reason))?;
                requeued += 1;
            }
        }
    }

    writer.flush()?;
    println!("Retried: {} succeeded, {} re-queued", succeeded, requeued);
    Ok(())
}

async fn retry_item(
    client: &ClassifierClient,
    extractor: &MirrorExtractor,
    url: &str,
) -> std::result::Result<(ClassificationRequest, Classification), (&'static str, String)> {
    let request = if extractor.is_post_url(url) {
        extractor
            .extract(url)
            .await
            .map_err(|e| ("extract", e.to_string()))?
            .into_request("retry")
    } else {
        ClassificationRequest::from_url(url).with_source("retry")
    };

    let verdict = client
        .classify(&request)
        .await
        .map_err(|e| ("classify", e.to_string()))?;
    Ok((request, verdict))
}

/// Print recent report records or the label distribution
pub fn report(
    config: AgentConfig,
    summary: bool,
    label: Option<String>,
    limit: usize,
    export: Option<PathBuf>,
) -> Result<()> {
    let reader = ReportReader::new(config.report.clone());

    if summary {
        let distribution = reader.label_distribution()?;
        if distribution.is_empty() {
            println!("No reports recorded yet");
            return Ok(());
        }
        println!("Label distribution:");
        for (label, count) in distribution {
            println!("{:>6}  {}", count, label);
        }
        return Ok(());
    }

    let mut query = ReportQuery::new().limit(limit);
    if let Some(label) = label {
        query = query.label(label);
    }

    if let Some(path) = export {
        let exported = reader.export_to_file(&query, &path, ExportFormat::Csv)?;
        println!("Exported {} records to {}", exported, path.display());
        return Ok(());
    }

    let records = reader.query(&query)?;
    if records.is_empty() {
        println!("No matching reports");
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {:<36}  {:<20}  {}",
            record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            record.label,
            record.endpoint,
            truncate(&record.text, 60),
        );
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}
