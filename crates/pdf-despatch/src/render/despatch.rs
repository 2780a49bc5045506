//! Despatch note layout: one fixed-size page per order with a blank
//! label panel at the bottom.

use super::text::{bold_text_width, format_despatch_date, text_width, truncate_to_width};
use super::{PageLayout, build_pdf};
use crate::config::{RunConfig, SheetGeometry};
use crate::constants::*;
use crate::order::Order;
use crate::types::*;
use chrono::{DateTime, Utc};

/// Space kept clear between the last table line and the panel divider
const PANEL_CLEARANCE_PT: f32 = 8.0;

/// Vertical gap between blocks (sender, address, metadata, table)
const BLOCK_GAP_PT: f32 = 12.0;

/// Recipient, three address parts and the country line
const MAX_ADDRESS_LINES: usize = 5;

/// Order, order number, channel ref and despatch date
const MAX_META_LINES: usize = 4;

/// How many sender lines (brand included) fit above the label panel
/// while leaving room for the fullest address and metadata blocks, the
/// table header and one item row. `None` when even those do not fit.
pub(crate) fn sender_line_capacity(g: &SheetGeometry) -> Option<usize> {
    let body_line = BODY_FONT_SIZE * LINE_HEIGHT_FACTOR;
    let table_line = TABLE_FONT_SIZE * LINE_HEIGHT_FACTOR;
    let below_sender = (1 + MAX_ADDRESS_LINES + MAX_META_LINES) as f32 * body_line
        + 3.0 * BLOCK_GAP_PT
        + 2.0 * table_line
        + PANEL_CLEARANCE_PT;
    let room = g.page_height_pt - g.margin_pt - g.panel().top() - below_sender;
    if room < 0.0 {
        return None;
    }
    Some((room / body_line).floor() as usize)
}

/// A laid-out despatch note
#[derive(Debug, Clone, PartialEq)]
pub struct DespatchLayout {
    pub page: PageLayout,
    /// Reserved label area; nothing is drawn inside it
    pub panel: Rect,
    /// Items that did not fit above the panel
    pub hidden_items: usize,
}

/// Top-down cursor over baselines
struct Cursor {
    y: f32,
}

impl Cursor {
    fn line(&mut self, size: f32) -> f32 {
        self.y -= size * LINE_HEIGHT_FACTOR;
        self.y
    }

    fn gap(&mut self, gap: f32) {
        self.y -= gap;
    }
}

/// Lay out the despatch note for one order.
pub fn layout_despatch_note(order: &Order, config: &RunConfig, now: DateTime<Utc>) -> DespatchLayout {
    let g = &config.geometry;
    let left = g.margin_pt;
    let right = g.page_width_pt - g.margin_pt;
    let panel = g.panel();

    let mut page = PageLayout::default();
    let mut cursor = Cursor {
        y: g.page_height_pt - g.margin_pt,
    };

    let full_width = g.content_width();

    // Sender block, right-aligned, cut to what fits above the panel
    let capacity = sender_line_capacity(g).unwrap_or(0);
    for (idx, line) in config.sender_block().into_iter().take(capacity).enumerate() {
        let y = cursor.line(BODY_FONT_SIZE);
        let line = truncate_to_width(line, full_width, BODY_FONT_SIZE);
        if idx == 0 {
            let x = right - bold_text_width(&line, BODY_FONT_SIZE);
            page.bold(line, x.max(left), y, BODY_FONT_SIZE);
        } else {
            let x = right - text_width(&line, BODY_FONT_SIZE);
            page.text(line, x.max(left), y, BODY_FONT_SIZE);
        }
    }
    cursor.gap(BLOCK_GAP_PT);

    // Address block
    page.bold("Shipping Address", left, cursor.line(BODY_FONT_SIZE), BODY_FONT_SIZE);
    let address_lines = std::iter::once(order.recipient.name.as_str())
        .chain(order.address.parts())
        .filter(|line| !line.trim().is_empty())
        .chain(std::iter::once(COUNTRY_LINE));
    for line in address_lines {
        let y = cursor.line(BODY_FONT_SIZE);
        page.text(truncate_to_width(line, full_width, BODY_FONT_SIZE), left, y, BODY_FONT_SIZE);
    }
    cursor.gap(BLOCK_GAP_PT);

    // Order metadata
    let mut meta = vec![format!("Order: {}", order.order_reference)];
    if order.order_number != order.order_reference {
        meta.push(format!("Order No: {}", order.order_number));
    }
    if let Some(channel) = order.channel_ref.as_deref() {
        meta.push(format!("Channel Ref: {}", channel));
    }
    meta.push(format!("Despatch Date: {}", format_despatch_date(now)));
    for line in meta {
        let y = cursor.line(BODY_FONT_SIZE);
        page.text(truncate_to_width(&line, full_width, BODY_FONT_SIZE), left, y, BODY_FONT_SIZE);
    }
    cursor.gap(BLOCK_GAP_PT);

    // Items table header, skipped when geometry leaves it no room
    let name_width = full_width - ITEM_NAME_X;
    let floor = panel.top() + PANEL_CLEARANCE_PT;
    let header_y = cursor.line(TABLE_FONT_SIZE);
    if header_y > floor {
        page.bold("Qty", left + ITEM_QTY_X, header_y, TABLE_FONT_SIZE);
        page.bold("SKU", left + ITEM_SKU_X, header_y, TABLE_FONT_SIZE);
        page.bold("Item", left + ITEM_NAME_X, header_y, TABLE_FONT_SIZE);
        let rule_y = header_y - TABLE_FONT_SIZE * 0.4;
        page.rule((left, rule_y), (right, rule_y));
    }

    // Item rows, one line each, stopping short of the panel
    let line_height = TABLE_FONT_SIZE * LINE_HEIGHT_FACTOR;
    let capacity = ((header_y - floor) / line_height).floor().max(0.0) as usize;
    let (shown, hidden_items) = if order.items.len() > capacity {
        let shown = capacity.saturating_sub(1);
        (shown, order.items.len() - shown)
    } else {
        (order.items.len(), 0)
    };

    for item in &order.items[..shown] {
        let y = cursor.line(TABLE_FONT_SIZE);
        page.text(
            truncate_to_width(&item.quantity.to_string(), ITEM_QTY_WIDTH, TABLE_FONT_SIZE),
            left + ITEM_QTY_X,
            y,
            TABLE_FONT_SIZE,
        );
        page.text(
            truncate_to_width(&item.sku, ITEM_SKU_WIDTH, TABLE_FONT_SIZE),
            left + ITEM_SKU_X,
            y,
            TABLE_FONT_SIZE,
        );
        page.text(
            truncate_to_width(&item.name, name_width, TABLE_FONT_SIZE),
            left + ITEM_NAME_X,
            y,
            TABLE_FONT_SIZE,
        );
    }
    if hidden_items > 0 && capacity > 0 {
        let y = cursor.line(TABLE_FONT_SIZE);
        let noun = if hidden_items == 1 { "item" } else { "items" };
        page.text(
            format!("+ {} more {}", hidden_items, noun),
            left + ITEM_NAME_X,
            y,
            TABLE_FONT_SIZE,
        );
    }

    // Panel divider
    page.rule((panel.x, panel.top()), (panel.right(), panel.top()));

    DespatchLayout {
        page,
        panel,
        hidden_items,
    }
}

/// Render one despatch page per order into a single PDF.
pub fn render_despatch_notes(orders: &[Order], config: &RunConfig, now: DateTime<Utc>) -> Result<Vec<u8>> {
    if orders.is_empty() {
        return Err(DespatchError::NoPages);
    }
    let pages: Vec<PageLayout> = orders
        .iter()
        .map(|order| layout_despatch_note(order, config, now).page)
        .collect();
    Ok(build_pdf("Despatch Notes", &pages, &config.geometry))
}
