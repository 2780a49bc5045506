//! Shared constants for despatch documents
//!
//! This module centralizes the page geometry and typography used by
//! both renderers and the compositor.

// =============================================================================
// Page Geometry
// =============================================================================

/// A4 page width in points
pub const A4_WIDTH_PT: f32 = 595.28;

/// A4 page height in points
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Default margin around despatch notes and reports (points)
pub const PAGE_MARGIN_PT: f32 = 36.0;

/// Height of the reserved label panel at the bottom of a despatch note
pub const LABEL_PANEL_HEIGHT_PT: f32 = 380.0;

/// Gap between the panel edge and the placed label
pub const LABEL_INSET_PT: f32 = 10.0;

// =============================================================================
// Typography
// =============================================================================

pub const TITLE_FONT_SIZE: f32 = 16.0;
pub const SUBTITLE_FONT_SIZE: f32 = 10.0;
pub const BODY_FONT_SIZE: f32 = 10.0;
pub const TABLE_FONT_SIZE: f32 = 9.0;

/// Baseline-to-baseline distance as a multiple of the font size
pub const LINE_HEIGHT_FACTOR: f32 = 1.4;

/// Advance assumed for characters the builtin faces have no glyph for,
/// as a fraction of the font size
pub const MISSING_GLYPH_ADVANCE_EM: f32 = 1.0;

/// Marker appended to text cut short to fit its column
pub const ELLIPSIS: &str = "...";

/// Line width for rules and the panel divider (points)
pub const RULE_WIDTH: f32 = 0.5;

// =============================================================================
// Despatch Note Items Table (offsets from the left margin, points)
// =============================================================================

pub const ITEM_QTY_X: f32 = 0.0;
pub const ITEM_QTY_WIDTH: f32 = 40.0;
pub const ITEM_SKU_X: f32 = 45.0;
pub const ITEM_SKU_WIDTH: f32 = 110.0;
pub const ITEM_NAME_X: f32 = 160.0;

// =============================================================================
// Report Table (offsets from the left margin, points)
// =============================================================================

pub const REPORT_ORDER_X: f32 = 0.0;
pub const REPORT_ORDER_WIDTH: f32 = 90.0;
pub const REPORT_RECIPIENT_X: f32 = 95.0;
pub const REPORT_RECIPIENT_WIDTH: f32 = 110.0;
pub const REPORT_ADDRESS_X: f32 = 210.0;
pub const REPORT_ADDRESS_WIDTH: f32 = 190.0;
pub const REPORT_TRACKING_X: f32 = 405.0;

/// Country printed under every despatch address
pub const COUNTRY_LINE: &str = "United Kingdom";
