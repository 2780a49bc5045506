//! Tabular orders report

use super::text::{bold_text_width, format_window_bound, text_width, truncate_to_width};
use super::{PageLayout, build_pdf};
use crate::config::RunConfig;
use crate::constants::*;
use crate::order::Order;

const HEADERS: [&str; 4] = ["Order", "Recipient", "Address", "Tracking / Service"];

pub(crate) const NO_ORDERS_MESSAGE: &str = "No orders found in this window.";

/// The four report cells for one order
pub fn report_row(order: &Order) -> [String; 4] {
    let reference = match order.channel_ref.as_deref() {
        Some(channel) => format!("{} / {}", order.order_reference, channel),
        None => order.order_reference.clone(),
    };

    let tracking = match (order.tracking_number.as_deref(), order.service.as_deref()) {
        (Some(number), Some(service)) => format!("{} ({})", number, service),
        (Some(number), None) => number.to_string(),
        (None, Some(service)) => service.to_string(),
        (None, None) => String::new(),
    };

    [
        reference,
        order.recipient.name.clone(),
        order.address.parts().join(", "),
        tracking,
    ]
}

fn column_layout(config: &RunConfig) -> [(f32, f32); 4] {
    let tracking_width = config.geometry.content_width() - REPORT_TRACKING_X;
    [
        (REPORT_ORDER_X, REPORT_ORDER_WIDTH),
        (REPORT_RECIPIENT_X, REPORT_RECIPIENT_WIDTH),
        (REPORT_ADDRESS_X, REPORT_ADDRESS_WIDTH),
        (REPORT_TRACKING_X, tracking_width),
    ]
}

/// Lay out the report; rows continue on a new page when one fills up.
pub fn layout_report(orders: &[Order], config: &RunConfig) -> Vec<PageLayout> {
    let g = &config.geometry;
    let left = g.margin_pt;
    let right = g.page_width_pt - g.margin_pt;
    let center = g.page_width_pt / 2.0;
    let line_height = TABLE_FONT_SIZE * LINE_HEIGHT_FACTOR;
    let columns = column_layout(config);

    let mut pages = Vec::new();
    let mut page = PageLayout::default();
    let mut y = g.page_height_pt - g.margin_pt - TITLE_FONT_SIZE;

    let title = format!("{} Orders Report", config.brand_name.trim());
    page.bold(
        title.trim(),
        center - bold_text_width(title.trim(), TITLE_FONT_SIZE) / 2.0,
        y,
        TITLE_FONT_SIZE,
    );
    y -= TITLE_FONT_SIZE * LINE_HEIGHT_FACTOR;

    let subtitle = format!(
        "Orders from {} to {}",
        format_window_bound(config.window.since),
        format_window_bound(config.window.until)
    );
    page.text(
        subtitle.as_str(),
        center - text_width(&subtitle, SUBTITLE_FONT_SIZE) / 2.0,
        y,
        SUBTITLE_FONT_SIZE,
    );
    y -= SUBTITLE_FONT_SIZE * LINE_HEIGHT_FACTOR * 2.0;

    if orders.is_empty() {
        page.text(
            NO_ORDERS_MESSAGE,
            center - text_width(NO_ORDERS_MESSAGE, BODY_FONT_SIZE) / 2.0,
            y,
            BODY_FONT_SIZE,
        );
        pages.push(page);
        return pages;
    }

    let header = |page: &mut PageLayout, y: f32| {
        for (label, (x, _)) in HEADERS.iter().zip(columns.iter()) {
            page.bold(*label, left + x, y, TABLE_FONT_SIZE);
        }
        let rule_y = y - TABLE_FONT_SIZE * 0.4;
        page.rule((left, rule_y), (right, rule_y));
    };

    header(&mut page, y);
    for order in orders {
        y -= line_height;
        if y < g.margin_pt {
            pages.push(std::mem::take(&mut page));
            y = g.page_height_pt - g.margin_pt - TABLE_FONT_SIZE;
            header(&mut page, y);
            y -= line_height;
        }
        for (cell, (x, width)) in report_row(order).iter().zip(columns.iter()) {
            if !cell.is_empty() {
                page.text(truncate_to_width(cell, *width, TABLE_FONT_SIZE), left + x, y, TABLE_FONT_SIZE);
            }
        }
    }
    pages.push(page);
    pages
}

/// Render the orders report to PDF bytes.
pub fn render_report(orders: &[Order], config: &RunConfig) -> Vec<u8> {
    let pages = layout_report(orders, config);
    build_pdf(&format!("{} Orders Report", config.brand_name), &pages, &config.geometry)
}
