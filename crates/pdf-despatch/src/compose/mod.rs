//! Page composition: despatch notes merged with postage labels
//!
//! Every despatch page is embedded as a Form XObject and redrawn on a new
//! page of the same size. When the order has a label, the label page is
//! embedded too and drawn scaled and rotated into the reserved panel.
//! A label that fails to embed only costs that page its label.

mod builder;
mod placement;
mod xobject;

pub use builder::DocumentBuilder;
pub use placement::{LabelPlacement, fit_area, place_label};
pub use xobject::{copy_object_deep, create_page_xobject, get_page_bounds};

use crate::config::RunConfig;
use crate::label::{LabelPage, LabelRecord};
use crate::types::*;
use log::{debug, warn};
use lopdf::{Document, ObjectId};
use std::collections::HashMap;
use std::sync::Arc;

const NOTE_XOBJECT: &str = "Note";
const LABEL_XOBJECT: &str = "Label";

/// Counters describing one composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComposeStats {
    pub pages: usize,
    pub labels_placed: usize,
    pub labels_missing: usize,
    pub labels_failed: usize,
}

/// The final merged document
#[derive(Debug)]
pub struct ComposedDocument {
    pub document: Document,
    pub stats: ComposeStats,
}

/// Copy caches per label source document, keyed by the shared document's address
#[derive(Default)]
struct LabelCaches {
    caches: HashMap<usize, HashMap<ObjectId, ObjectId>>,
}

impl LabelCaches {
    fn key(doc: &Arc<Document>) -> usize {
        Arc::as_ptr(doc) as usize
    }

    fn get(&mut self, doc: &Arc<Document>) -> &mut HashMap<ObjectId, ObjectId> {
        self.caches.entry(Self::key(doc)).or_default()
    }

    /// Forget copies that may be half-written after a failure
    fn invalidate(&mut self, doc: &Arc<Document>) {
        self.caches.remove(&Self::key(doc));
    }
}

/// Merge each despatch page with the label at the same position.
///
/// `labels[i]` belongs to page `i`; missing or null entries leave the
/// panel blank. Pages are emitted strictly in input order.
pub fn compose_despatch_pages(
    despatch: &Document,
    labels: &[LabelRecord],
    config: &RunConfig,
) -> Result<ComposedDocument> {
    let page_ids: Vec<ObjectId> = despatch.get_pages().values().copied().collect();
    if labels.len() != page_ids.len() {
        warn!(
            "Composing {} despatch pages with {} label records",
            page_ids.len(),
            labels.len()
        );
    }

    let area = fit_area(&config.geometry.panel(), config.geometry.label_inset_pt);
    let mut builder = DocumentBuilder::new();
    let mut note_cache: HashMap<ObjectId, ObjectId> = HashMap::new();
    let mut label_caches = LabelCaches::default();
    let mut stats = ComposeStats::default();

    for (idx, &page_id) in page_ids.iter().enumerate() {
        let bounds = get_page_bounds(despatch, page_id)?;
        let note_id = create_page_xobject(builder.document_mut(), despatch, page_id, &mut note_cache)?;

        let mut xobjects = vec![(NOTE_XOBJECT.to_string(), note_id)];
        let mut content = format!("q 1 0 0 1 0 0 cm /{} Do Q\n", NOTE_XOBJECT);

        let record = labels.get(idx);
        match record.and_then(|r| r.page.as_ref()) {
            Some(label) => {
                let cache = label_caches.get(&label.document);
                match embed_label(builder.document_mut(), label, &area, config.label_rotation, cache) {
                    Ok((label_id, ops)) => {
                        xobjects.push((LABEL_XOBJECT.to_string(), label_id));
                        content.push_str(&ops);
                        stats.labels_placed += 1;
                    }
                    Err(e) => {
                        let reference = record.map(|r| r.reference.as_str()).unwrap_or("?");
                        warn!("Could not place label for order {}: {}", reference, e);
                        label_caches.invalidate(&label.document);
                        stats.labels_failed += 1;
                    }
                }
            }
            None => stats.labels_missing += 1,
        }

        builder.append_page(bounds, xobjects, content);
        stats.pages += 1;
    }

    debug!(
        "Composed {} pages ({} labels placed, {} missing, {} failed)",
        stats.pages, stats.labels_placed, stats.labels_missing, stats.labels_failed
    );

    Ok(ComposedDocument {
        document: builder.finish(),
        stats,
    })
}

/// Embed one label page and return its XObject id with the drawing ops.
fn embed_label(
    output: &mut Document,
    label: &LabelPage,
    area: &Rect,
    rotation: Rotation,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<(ObjectId, String)> {
    let bounds = get_page_bounds(&label.document, label.page_id)?;
    if bounds.width <= 0.0 || bounds.height <= 0.0 {
        return Err(DespatchError::InvalidPage(
            "label page has an empty MediaBox".to_string(),
        ));
    }

    let xobject_id = create_page_xobject(output, &label.document, label.page_id, cache)?;
    let placement = place_label(area, bounds.width, bounds.height, rotation);
    let [a, b, c, d, e, f] = placement.matrix(bounds.width, bounds.height);

    // Outer matrix places the label, inner one moves its MediaBox corner to the origin
    let ops = format!(
        "q {} {} {} {} {} {} cm 1 0 0 1 {} {} cm /{} Do Q\n",
        a, b, c, d, e, f, -bounds.x, -bounds.y, LABEL_XOBJECT
    );
    Ok((xobject_id, ops))
}
