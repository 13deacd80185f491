//! Report exporters: text, CSV and JSON, plus a CSV reader for stored runs

use crate::proxy::models::ProbeResult;
use crate::proxy::stats::{aggregate, Statistics};
use crate::Result;
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Local};
use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Header row of the CSV export
pub const CSV_HEADER: &str = "endpoint,protocol,status,latency_ms,error_detail";

const RULE: &str = "================================================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Txt,
    Csv,
    Json,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Txt => write!(f, "txt"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "txt" => Ok(ExportFormat::Txt),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(anyhow!("Invalid output format: {}. Use: txt, csv, json", s)),
        }
    }
}

/// Render `results` in `format`, stamping reports with `timestamp`
pub fn render(format: ExportFormat, results: &[ProbeResult], timestamp: DateTime<Local>) -> Result<String> {
    match format {
        ExportFormat::Txt => Ok(render_text(results, timestamp)),
        ExportFormat::Csv => render_csv(results),
        ExportFormat::Json => render_json(results, timestamp),
    }
}

/// Write a report to `path`
pub fn export_to_file<P: AsRef<Path>>(path: P, format: ExportFormat, results: &[ProbeResult]) -> Result<()> {
    let path = path.as_ref();
    let content = render(format, results, Local::now())?;
    fs::write(path, content).with_context(|| format!("failed to write report {}", path.display()))?;
    tracing::info!(path = %path.display(), %format, results = results.len(), "Report exported");
    Ok(())
}

/// Text report: statistics, working proxies fastest first, then failures in
/// completion order
pub fn render_text(results: &[ProbeResult], timestamp: DateTime<Local>) -> String {
    TextReport { results, timestamp }.to_string()
}

struct TextReport<'a> {
    results: &'a [ProbeResult],
    timestamp: DateTime<Local>,
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "Proxy Check Report - {}", self.timestamp.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "{RULE}")?;
        writeln!(f)?;

        writeln!(f, "[Statistics]")?;
        writeln!(f, "{}", aggregate(self.results))?;
        writeln!(f)?;

        writeln!(f, "[Working Proxies]")?;
        for r in working_by_latency(self.results) {
            writeln!(f, "{} - {:.2}ms", r.proxy_url(), r.latency_ms)?;
        }

        writeln!(f)?;
        writeln!(f, "[Failed Proxies]")?;
        for r in self.results.iter().filter(|r| !r.is_success()) {
            writeln!(f, "{} - {}", r.proxy_url(), r.error_detail)?;
        }

        Ok(())
    }
}

/// Successful results sorted ascending by latency
pub fn working_by_latency(results: &[ProbeResult]) -> Vec<&ProbeResult> {
    let mut working: Vec<_> = results.iter().filter(|r| r.is_success()).collect();
    working.sort_by(|a, b| a.latency_ms.total_cmp(&b.latency_ms));
    working
}

/// One row per result, header always present. Latency is written in full
/// precision so the file reads back to identical values.
pub fn render_csv(results: &[ProbeResult]) -> Result<String> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(Vec::new());

    wtr.write_record(CSV_HEADER.split(','))?;
    for result in results {
        wtr.serialize(result)?;
    }

    let bytes = wtr.into_inner().map_err(|e| anyhow!("failed to flush CSV: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Read results back from [`render_csv`] output
pub fn parse_csv(content: &str) -> Result<Vec<ProbeResult>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(content.as_bytes());

    let header = rdr.headers().context("failed to read CSV header")?;
    if header.is_empty() {
        return Ok(Vec::new());
    }
    let header = header.iter().collect::<Vec<_>>().join(",");
    if header != CSV_HEADER {
        bail!("unexpected CSV header: {}", header);
    }

    rdr.deserialize::<ProbeResult>()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("invalid CSV row {}", i + 2)))
        .collect()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    timestamp: DateTime<Local>,
    statistics: Statistics,
    results: &'a [ProbeResult],
}

pub fn render_json(results: &[ProbeResult], timestamp: DateTime<Local>) -> Result<String> {
    let report = JsonReport {
        timestamp,
        statistics: aggregate(results),
        results,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
