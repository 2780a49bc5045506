use crate::constants::*;
use crate::render::sender_line_capacity;
use crate::types::*;
use chrono::{DateTime, Duration, Utc};

/// Lower bound of the order window, either explicit or relative to "now"
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Since {
    At(DateTime<Utc>),
    HoursBack(u32),
}

impl Default for Since {
    fn default() -> Self {
        Since::HoursBack(24)
    }
}

impl Since {
    /// Resolve into a concrete `[since, now)` window
    pub fn resolve(self, now: DateTime<Utc>) -> Window {
        let since = match self {
            Since::At(at) => at,
            Since::HoursBack(hours) => now - Duration::hours(i64::from(hours)),
        };
        Window { since, until: now }
    }
}

/// The `[since, until)` range used to select orders for a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// Page geometry shared by the despatch renderer and the compositor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetGeometry {
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub margin_pt: f32,
    pub panel_height_pt: f32,
    pub label_inset_pt: f32,
}

impl Default for SheetGeometry {
    fn default() -> Self {
        Self {
            page_width_pt: A4_WIDTH_PT,
            page_height_pt: A4_HEIGHT_PT,
            margin_pt: PAGE_MARGIN_PT,
            panel_height_pt: LABEL_PANEL_HEIGHT_PT,
            label_inset_pt: LABEL_INSET_PT,
        }
    }
}

impl SheetGeometry {
    /// Width available between the left and right margins
    pub fn content_width(&self) -> f32 {
        self.page_width_pt - 2.0 * self.margin_pt
    }

    /// The reserved label panel, sitting on the bottom margin
    pub fn panel(&self) -> Rect {
        Rect::new(
            self.margin_pt,
            self.margin_pt,
            self.content_width(),
            self.panel_height_pt,
        )
    }
}

/// Immutable configuration for one run, threaded into every component
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Cosmetic header text (report title, first sender line)
    pub brand_name: String,
    /// Extra sender block lines printed under the brand name
    pub sender_lines: Vec<String>,
    pub window: Window,
    pub label_rotation: Rotation,
    /// Only orders whose reference starts with this prefix are rendered
    pub reference_prefix: Option<String>,
    /// Shared batch-label document, may contain a `{{since}}` placeholder
    pub batch_label_url: Option<String>,
    pub geometry: SheetGeometry,
}

impl RunConfig {
    pub fn new(brand_name: impl Into<String>, window: Window) -> Self {
        Self {
            brand_name: brand_name.into(),
            sender_lines: Vec::new(),
            window,
            label_rotation: Rotation::None,
            reference_prefix: None,
            batch_label_url: None,
            geometry: SheetGeometry::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.window.since > self.window.until {
            return Err(DespatchError::Config(format!(
                "Window start {} is after its end {}",
                self.window.since, self.window.until
            )));
        }

        let g = &self.geometry;
        if g.panel_height_pt <= 0.0 || g.panel_height_pt >= g.page_height_pt - 2.0 * g.margin_pt {
            return Err(DespatchError::Config(
                "Label panel must fit inside the page margins".to_string(),
            ));
        }
        if g.label_inset_pt * 2.0 >= g.panel_height_pt.min(g.content_width()) {
            return Err(DespatchError::Config(
                "Label inset leaves no room in the panel".to_string(),
            ));
        }

        let sender = self.sender_block().len();
        match sender_line_capacity(g) {
            None => {
                return Err(DespatchError::Config(
                    "Label panel leaves no room for the despatch note header".to_string(),
                ));
            }
            Some(capacity) if sender > capacity => {
                return Err(DespatchError::Config(format!(
                    "Sender block has {} lines but only {} fit above the label panel",
                    sender, capacity
                )));
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Brand name followed by the sender lines, blanks dropped
    pub fn sender_block(&self) -> Vec<&str> {
        std::iter::once(self.brand_name.as_str())
            .chain(self.sender_lines.iter().map(String::as_str))
            .filter(|line| !line.trim().is_empty())
            .collect()
    }

    /// Human-readable description of the active filter for log lines
    pub fn filter_description(&self) -> String {
        match self.reference_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("reference prefix '{}'", prefix),
            _ => "none".to_string(),
        }
    }
}
