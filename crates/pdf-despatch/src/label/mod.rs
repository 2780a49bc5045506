//! Postage label resolution
//!
//! Labels come either from a per-order URL or from one shared batch
//! document whose page `i` belongs to order `i`. Per-order labels win only
//! when every order got one; otherwise the batch document is used, and
//! when that fails too every order is left without a label.

mod http;

pub use http::HttpLabelFetcher;

use crate::io::load_pdf_bytes;
use crate::order::Order;
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};
use lopdf::{Document, ObjectId};
use std::sync::Arc;

/// Placeholder in the batch URL replaced by the window's lower bound
pub const SINCE_PLACEHOLDER: &str = "{{since}}";

/// Retrieves raw label document bytes
#[async_trait]
pub trait LabelFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// One page of a label document.
///
/// Batch labels share the parsed document; each record only points at
/// its own page.
#[derive(Debug, Clone)]
pub struct LabelPage {
    pub document: Arc<Document>,
    pub page_id: ObjectId,
}

/// Resolved label for one order
#[derive(Debug, Clone)]
pub struct LabelRecord {
    /// Matches the order's reference
    pub reference: String,
    pub page: Option<LabelPage>,
}

impl LabelRecord {
    pub fn empty(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            page: None,
        }
    }

    pub fn has_label(&self) -> bool {
        self.page.is_some()
    }
}

/// Where a run's labels came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    PerOrder,
    Batch,
    None,
}

/// Labels for a run, positionally aligned with the orders
#[derive(Debug, Clone)]
pub struct ResolvedLabels {
    pub source: LabelSource,
    pub records: Vec<LabelRecord>,
}

impl ResolvedLabels {
    pub fn labelled_count(&self) -> usize {
        self.records.iter().filter(|r| r.has_label()).count()
    }
}

/// Decide which source supplies the labels.
///
/// `per_order_complete` is true only when there was at least one order and
/// each of them got a per-order label.
pub fn choose_source(per_order_complete: bool, batch_configured: bool) -> LabelSource {
    if per_order_complete {
        LabelSource::PerOrder
    } else if batch_configured {
        LabelSource::Batch
    } else {
        LabelSource::None
    }
}

/// Substitute the window lower bound, in UTC, into a batch URL
pub fn expand_batch_url(template: &str, since: DateTime<Utc>) -> String {
    template.replace(
        SINCE_PLACEHOLDER,
        &since.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    )
}

/// Resolve one label record per order, in input order.
pub async fn resolve_labels(
    orders: &[Order],
    batch_url: Option<&str>,
    since: DateTime<Utc>,
    fetcher: &dyn LabelFetcher,
) -> ResolvedLabels {
    if orders.is_empty() {
        return ResolvedLabels {
            source: LabelSource::None,
            records: Vec::new(),
        };
    }

    let per_order = fetch_per_order(orders, fetcher).await;
    let complete = per_order.iter().all(Option::is_some);
    let batch_url = batch_url.filter(|url| !url.trim().is_empty());

    let source = choose_source(complete, batch_url.is_some());
    let records = match (source, batch_url) {
        (LabelSource::PerOrder, _) => orders
            .iter()
            .zip(per_order)
            .map(|(order, page)| LabelRecord {
                reference: order.order_reference.clone(),
                page,
            })
            .collect(),
        (LabelSource::Batch, Some(template)) => {
            let url = expand_batch_url(template, since);
            match fetch_batch(&url, orders, fetcher).await {
                Ok(records) => records,
                Err(e) => {
                    warn!("Batch label document unusable, continuing without labels: {}", e);
                    null_records(orders)
                }
            }
        }
        _ => null_records(orders),
    };

    let resolved = ResolvedLabels { source, records };
    info!(
        "Labels resolved from {:?} source: {} of {} orders labelled",
        resolved.source,
        resolved.labelled_count(),
        orders.len()
    );
    resolved
}

/// Fetch every order's own label concurrently; failures become `None`.
async fn fetch_per_order(orders: &[Order], fetcher: &dyn LabelFetcher) -> Vec<Option<LabelPage>> {
    let fetches = orders.iter().map(|order| async move {
        let url = match order.label_pdf_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => return None,
        };
        match fetch_single_page(url, fetcher).await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("No label for order {}: {}", order.order_reference, e);
                None
            }
        }
    });
    join_all(fetches).await
}

async fn fetch_single_page(url: &str, fetcher: &dyn LabelFetcher) -> Result<LabelPage> {
    let bytes = fetcher.fetch(url).await?;
    let document = load_pdf_bytes(bytes).await?;
    let pages = document.get_pages();
    let page_id = *pages.values().next().ok_or(DespatchError::NoPages)?;
    if pages.len() > 1 {
        debug!("Label at {} has {} pages, using the first", url, pages.len());
    }
    Ok(LabelPage {
        document: Arc::new(document),
        page_id,
    })
}

/// Fetch the batch document once and hand page `i` to order `i`.
async fn fetch_batch(url: &str, orders: &[Order], fetcher: &dyn LabelFetcher) -> Result<Vec<LabelRecord>> {
    let bytes = fetcher.fetch(url).await?;
    let document = Arc::new(load_pdf_bytes(bytes).await?);
    let page_ids: Vec<ObjectId> = document.get_pages().values().copied().collect();
    if page_ids.is_empty() {
        return Err(DespatchError::NoPages);
    }
    if page_ids.len() < orders.len() {
        warn!(
            "Batch label document has {} pages for {} orders",
            page_ids.len(),
            orders.len()
        );
    }
    Ok(slice_batch(&document, &page_ids, orders))
}

fn slice_batch(document: &Arc<Document>, page_ids: &[ObjectId], orders: &[Order]) -> Vec<LabelRecord> {
    orders
        .iter()
        .enumerate()
        .map(|(idx, order)| LabelRecord {
            reference: order.order_reference.clone(),
            page: page_ids.get(idx).map(|&page_id| LabelPage {
                document: Arc::clone(document),
                page_id,
            }),
        })
        .collect()
}

fn null_records(orders: &[Order]) -> Vec<LabelRecord> {
    orders
        .iter()
        .map(|order| LabelRecord::empty(order.order_reference.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_precedence() {
        assert_eq!(choose_source(true, true), LabelSource::PerOrder);
        assert_eq!(choose_source(true, false), LabelSource::PerOrder);
        assert_eq!(choose_source(false, true), LabelSource::Batch);
        assert_eq!(choose_source(false, false), LabelSource::None);
    }

    #[test]
    fn test_since_placeholder_is_utc() {
        let since = Utc.with_ymd_and_hms(2024, 7, 1, 8, 30, 0).unwrap();
        let url = expand_batch_url("https://labels.test/batch?from={{since}}", since);
        assert_eq!(url, "https://labels.test/batch?from=2024-07-01T08:30:00Z");
    }

    #[test]
    fn test_url_without_placeholder_unchanged() {
        let since = Utc.with_ymd_and_hms(2024, 7, 1, 8, 30, 0).unwrap();
        assert_eq!(expand_batch_url("https://labels.test/b.pdf", since), "https://labels.test/b.pdf");
    }
}
