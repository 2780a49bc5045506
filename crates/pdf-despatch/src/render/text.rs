//! Text measurement, truncation and date stamps

use crate::constants::{ELLIPSIS, MISSING_GLYPH_ADVANCE_EM};
use chrono::{DateTime, Utc};
use chrono_tz::Europe::London;
use log::warn;
use printpdf::{BuiltinFont, ParsedFont};

/// Horizontal advances for one of the builtin faces
struct FaceMetrics {
    font: Option<ParsedFont>,
    units_per_em: f32,
}

impl FaceMetrics {
    fn load(face: BuiltinFont) -> Self {
        let mut warnings = Vec::new();
        let font = ParsedFont::from_bytes(&face.get_subset_font().bytes, 0, &mut warnings);
        if font.is_none() {
            warn!("No glyph metrics for {}, using full-em advances", face.get_id());
        }
        let units_per_em = font
            .as_ref()
            .map(|f| f32::from(f.font_metrics.units_per_em.max(1)))
            .unwrap_or(1000.0);
        Self { font, units_per_em }
    }

    /// Advance of `ch` as a fraction of the font size
    fn advance_em(&self, ch: char) -> f32 {
        self.font
            .as_ref()
            .and_then(|font| font.lookup_glyph_index(ch as u32).map(|g| font.get_horizontal_advance(g)))
            .filter(|advance| *advance > 0)
            .map(|advance| f32::from(advance) / self.units_per_em)
            .unwrap_or(MISSING_GLYPH_ADVANCE_EM)
    }
}

thread_local! {
    static REGULAR: FaceMetrics = FaceMetrics::load(BuiltinFont::Helvetica);
    static BOLD: FaceMetrics = FaceMetrics::load(BuiltinFont::HelveticaBold);
}

fn advances(text: &str, font_size: f32, bold: bool) -> Vec<f32> {
    let measure = |metrics: &FaceMetrics| {
        text.chars()
            .map(|ch| metrics.advance_em(ch) * font_size)
            .collect::<Vec<f32>>()
    };
    if bold {
        BOLD.with(measure)
    } else {
        REGULAR.with(measure)
    }
}

/// Rendered width of `text` in Helvetica, in points
pub fn text_width(text: &str, font_size: f32) -> f32 {
    advances(text, font_size, false).iter().sum()
}

/// Rendered width of `text` in Helvetica Bold, in points
pub fn bold_text_width(text: &str, font_size: f32) -> f32 {
    advances(text, font_size, true).iter().sum()
}

/// Cut `text` down to fit `max_width`, ending it with an ellipsis.
///
/// Text that already fits is returned unchanged. The result always
/// occupies a single line and never measures wider than `max_width`.
pub fn truncate_to_width(text: &str, max_width: f32, font_size: f32) -> String {
    let text = single_line(text);
    let widths = advances(&text, font_size, false);
    if widths.iter().sum::<f32>() <= max_width {
        return text;
    }

    let dot_widths = advances(ELLIPSIS, font_size, false);
    let ellipsis_width: f32 = dot_widths.iter().sum();
    if ellipsis_width > max_width {
        let mut used = 0.0;
        return ELLIPSIS
            .chars()
            .zip(dot_widths)
            .take_while(|(_, w)| {
                used += w;
                used <= max_width
            })
            .map(|(ch, _)| ch)
            .collect();
    }

    let budget = max_width - ellipsis_width;
    let mut used = 0.0;
    let mut out: String = text
        .chars()
        .zip(widths)
        .take_while(|(_, w)| {
            used += w;
            used <= budget
        })
        .map(|(ch, _)| ch)
        .collect();
    out.truncate(out.trim_end().len());
    out.push_str(ELLIPSIS);
    out
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Despatch stamp, day/month/year in UK local time
pub fn format_despatch_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&London).format("%d/%m/%Y").to_string()
}

/// Window bound for report subtitles and mail subjects, UK local time
pub fn format_window_bound(at: DateTime<Utc>) -> String {
    at.with_timezone(&London).format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(truncate_to_width("Mug", 100.0, 10.0), "Mug");
    }

    #[test]
    fn test_long_text_gets_ellipsis() {
        let out = truncate_to_width("Extra Large Ceramic Teapot", 50.0, 10.0);
        assert!(out.starts_with("Extra L"));
        assert!(out.ends_with(ELLIPSIS));
        assert!(text_width(&out, 10.0) <= 50.0);
    }

    #[test]
    fn test_truncation_flattens_newlines() {
        let out = truncate_to_width("Line one\nline two", 500.0, 10.0);
        assert_eq!(out, "Line one line two");
    }

    #[test]
    fn test_tiny_column() {
        let out = truncate_to_width("abcdef", 5.0, 10.0);
        assert!(out.chars().all(|c| c == '.'));
        assert!(text_width(&out, 10.0) <= 5.0);
    }

    #[test]
    fn test_widths_follow_glyph_metrics() {
        // Helvetica: W is 944/1000 em, i is 222/1000 em
        let wide = text_width("W", 10.0);
        let narrow = text_width("i", 10.0);
        assert!((wide - 9.44).abs() < 0.1, "W measured {wide}");
        assert!((narrow - 2.22).abs() < 0.1, "i measured {narrow}");
        assert!(bold_text_width("Order", 10.0) > text_width("Order", 10.0));
    }

    #[test]
    fn test_capitals_truncated_to_real_width() {
        let sku = "WM".repeat(15);
        let out = truncate_to_width(&sku, 110.0, 9.0);
        assert!(out.ends_with(ELLIPSIS));
        assert!(text_width(&out, 9.0) <= 110.0);
        assert!(out.len() < 16);
    }

    #[test]
    fn test_despatch_date_uses_uk_time() {
        // 23:30 UTC in July is 00:30 BST the next day
        let at = Utc.with_ymd_and_hms(2024, 7, 14, 23, 30, 0).unwrap();
        assert_eq!(format_despatch_date(at), "15/07/2024");

        // GMT in winter
        let at = Utc.with_ymd_and_hms(2024, 1, 14, 23, 30, 0).unwrap();
        assert_eq!(format_despatch_date(at), "14/01/2024");
    }
}
