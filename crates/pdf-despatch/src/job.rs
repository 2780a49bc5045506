//! The two batch jobs: orders report and pack sheets
//!
//! Both fetch the window's orders, normalize and filter them, render a PDF
//! and hand it to the mailer. They differ only in the document produced.

use crate::compose::{ComposeStats, DocumentBuilder, compose_despatch_pages};
use crate::config::{RunConfig, Window};
use crate::io::{load_pdf_bytes, save_pdf_bytes};
use crate::label::{LabelFetcher, LabelSource, resolve_labels};
use crate::order::{Order, filter_by_reference_prefix, normalize_orders};
use crate::render::text::format_window_bound;
use crate::render::{render_despatch_notes, render_report};
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde_json::Value;

/// Supplies raw upstream order records for a time window
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn fetch_orders(&self, window: &Window) -> Result<Vec<Value>>;
}

/// Delivers a finished document
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Report,
    PackSheets,
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub kind: JobKind,
    /// Orders rendered after filtering
    pub processed: usize,
    /// Orders returned by the source
    pub total: usize,
    pub filter: String,
    pub subject: String,
    pub attachment_name: String,
    pub label_source: Option<LabelSource>,
    pub compose_stats: Option<ComposeStats>,
    pub emailed: bool,
}

/// Document bytes plus the summary describing them
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub pdf: Vec<u8>,
    pub summary: RunSummary,
}

/// Collaborators for one run. `mailer: None` skips delivery.
pub struct JobContext<'a> {
    pub source: &'a dyn OrderSource,
    pub mailer: Option<&'a dyn Mailer>,
    pub now: DateTime<Utc>,
}

/// Fetch, normalize and filter. Returns the kept orders and the unfiltered total.
async fn collect_orders(config: &RunConfig, source: &dyn OrderSource) -> Result<(Vec<Order>, usize)> {
    let raw = source.fetch_orders(&config.window).await?;
    let orders = normalize_orders(&raw);
    let total = orders.len();
    let kept = filter_by_reference_prefix(orders, config.reference_prefix.as_deref());
    info!(
        "Processed {} of {} orders (filter: {})",
        kept.len(),
        total,
        config.filter_description()
    );
    Ok((kept, total))
}

/// Subject line carrying the order count and the window bounds
pub fn subject_line(kind: JobKind, config: &RunConfig, count: usize) -> String {
    let title = match kind {
        JobKind::Report => "Orders Report",
        JobKind::PackSheets => "Pack Sheets",
    };
    format!(
        "{} {}: {} order{} ({} to {})",
        config.brand_name,
        title,
        count,
        if count == 1 { "" } else { "s" },
        format_window_bound(config.window.since),
        format_window_bound(config.window.until)
    )
}

fn attachment_name(kind: JobKind, now: DateTime<Utc>) -> String {
    let stem = match kind {
        JobKind::Report => "orders-report",
        JobKind::PackSheets => "pack-sheets",
    };
    format!("{}-{}.pdf", stem, now.format("%Y%m%d-%H%M"))
}

async fn deliver(ctx: &JobContext<'_>, summary: &mut RunSummary, pdf: &[u8]) -> Result<()> {
    let Some(mailer) = ctx.mailer else {
        info!("Email delivery disabled, not sending '{}'", summary.subject);
        return Ok(());
    };
    let mail = OutgoingMail {
        subject: summary.subject.clone(),
        body: format!(
            "{}\n\n{} of {} orders included (filter: {}).",
            summary.subject, summary.processed, summary.total, summary.filter
        ),
        attachment_name: summary.attachment_name.clone(),
        attachment: pdf.to_vec(),
    };
    mailer.send(&mail).await?;
    summary.emailed = true;
    info!("Sent '{}'", summary.subject);
    Ok(())
}

/// Tabular report of the window's orders
pub async fn run_report(config: &RunConfig, ctx: &JobContext<'_>) -> Result<JobOutput> {
    config.validate()?;
    let (orders, total) = collect_orders(config, ctx.source).await?;

    let processed = orders.len();
    let render_config = config.clone();
    let pdf = tokio::task::spawn_blocking(move || render_report(&orders, &render_config)).await?;

    let mut summary = RunSummary {
        kind: JobKind::Report,
        processed,
        total,
        filter: config.filter_description(),
        subject: subject_line(JobKind::Report, config, processed),
        attachment_name: attachment_name(JobKind::Report, ctx.now),
        label_source: None,
        compose_stats: None,
        emailed: false,
    };
    deliver(ctx, &mut summary, &pdf).await?;
    Ok(JobOutput { pdf, summary })
}

/// Despatch notes merged with postage labels, one page per order
pub async fn run_packsheets(
    config: &RunConfig,
    ctx: &JobContext<'_>,
    fetcher: &dyn LabelFetcher,
) -> Result<JobOutput> {
    config.validate()?;
    let (orders, total) = collect_orders(config, ctx.source).await?;
    let processed = orders.len();

    let (pdf, label_source, compose_stats) = if orders.is_empty() {
        let pdf = save_pdf_bytes(DocumentBuilder::new().finish()).await?;
        (pdf, None, None)
    } else {
        let labels = resolve_labels(
            &orders,
            config.batch_label_url.as_deref(),
            config.window.since,
            fetcher,
        )
        .await;

        let render_config = config.clone();
        let now = ctx.now;
        let notes = tokio::task::spawn_blocking(move || render_despatch_notes(&orders, &render_config, now)).await??;
        let notes = load_pdf_bytes(notes).await?;

        let compose_config = config.clone();
        let records = labels.records;
        let composed =
            tokio::task::spawn_blocking(move || compose_despatch_pages(&notes, &records, &compose_config)).await??;
        let pdf = save_pdf_bytes(composed.document).await?;
        (pdf, Some(labels.source), Some(composed.stats))
    };

    let mut summary = RunSummary {
        kind: JobKind::PackSheets,
        processed,
        total,
        filter: config.filter_description(),
        subject: subject_line(JobKind::PackSheets, config, processed),
        attachment_name: attachment_name(JobKind::PackSheets, ctx.now),
        label_source,
        compose_stats,
        emailed: false,
    };
    deliver(ctx, &mut summary, &pdf).await?;
    Ok(JobOutput { pdf, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Since;
    use chrono::TimeZone;

    #[test]
    fn test_subject_has_count_and_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        let config = RunConfig::new("Vivid Teas", Since::HoursBack(24).resolve(now));
        assert_eq!(
            subject_line(JobKind::PackSheets, &config, 2),
            "Vivid Teas Pack Sheets: 2 orders (09/01/2024 09:00 to 10/01/2024 09:00)"
        );
        assert!(subject_line(JobKind::Report, &config, 1).contains(": 1 order ("));
    }
}
