//! Document rendering
//!
//! Both layouts are computed first as plain positioned elements
//! ([`PageLayout`]) and only then turned into printpdf operations. The
//! intermediate form keeps the geometry testable without parsing PDFs.

mod despatch;
mod report;
pub mod text;

pub use despatch::{DespatchLayout, layout_despatch_note, render_despatch_notes};
pub(crate) use despatch::sender_line_capacity;
pub use report::{layout_report, render_report, report_row};

use crate::config::SheetGeometry;
use crate::constants::RULE_WIDTH;
use printpdf::*;

/// One positioned drawing instruction, coordinates in points from the
/// bottom-left corner of the page
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
    },
    Rule {
        from: (f32, f32),
        to: (f32, f32),
    },
}

/// Everything drawn on one page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageLayout {
    pub elements: Vec<Element>,
}

impl PageLayout {
    pub fn text(&mut self, text: impl Into<String>, x: f32, y: f32, size: f32) {
        self.push_text(text.into(), x, y, size, false);
    }

    pub fn bold(&mut self, text: impl Into<String>, x: f32, y: f32, size: f32) {
        self.push_text(text.into(), x, y, size, true);
    }

    pub fn rule(&mut self, from: (f32, f32), to: (f32, f32)) {
        self.elements.push(Element::Rule { from, to });
    }

    fn push_text(&mut self, text: String, x: f32, y: f32, size: f32, bold: bool) {
        self.elements.push(Element::Text {
            text,
            x,
            y,
            size,
            bold,
        });
    }

    /// All text runs on the page, in drawing order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            Element::Rule { .. } => None,
        })
    }

    /// Position of the first text run equal to `needle`
    pub fn position_of(&self, needle: &str) -> Option<(f32, f32)> {
        self.elements.iter().find_map(|e| match e {
            Element::Text { text, x, y, .. } if text == needle => Some((*x, *y)),
            _ => None,
        })
    }

    fn to_ops(&self) -> Vec<Op> {
        let mut ops = Vec::new();
        for element in &self.elements {
            match element {
                Element::Text {
                    text,
                    x,
                    y,
                    size,
                    bold,
                } => {
                    let font = if *bold {
                        BuiltinFont::HelveticaBold
                    } else {
                        BuiltinFont::Helvetica
                    };
                    ops.push(Op::StartTextSection);
                    ops.push(Op::SetTextCursor {
                        pos: Point {
                            x: Pt(*x),
                            y: Pt(*y),
                        },
                    });
                    ops.push(Op::SetFontSizeBuiltinFont {
                        font,
                        size: Pt(*size),
                    });
                    ops.push(Op::WriteTextBuiltinFont {
                        items: vec![TextItem::Text(text.clone())],
                        font,
                    });
                    ops.push(Op::EndTextSection);
                }
                Element::Rule { from, to } => {
                    ops.push(Op::SetOutlineThickness { pt: Pt(RULE_WIDTH) });
                    ops.push(Op::DrawLine {
                        line: Line {
                            points: vec![
                                LinePoint {
                                    p: Point {
                                        x: Pt(from.0),
                                        y: Pt(from.1),
                                    },
                                    bezier: false,
                                },
                                LinePoint {
                                    p: Point {
                                        x: Pt(to.0),
                                        y: Pt(to.1),
                                    },
                                    bezier: false,
                                },
                            ],
                            is_closed: false,
                        },
                    });
                }
            }
        }
        ops
    }
}

/// Serialize laid-out pages into PDF bytes
pub(crate) fn build_pdf(title: &str, pages: &[PageLayout], geometry: &SheetGeometry) -> Vec<u8> {
    let mut doc = PdfDocument::new(title);

    doc.pages = pages
        .iter()
        .map(|page| {
            PdfPage::new(
                Mm::from(Pt(geometry.page_width_pt)),
                Mm::from(Pt(geometry.page_height_pt)),
                page.to_ops(),
            )
        })
        .collect();

    let mut warnings = Vec::new();
    doc.save(&PdfSaveOptions::default(), &mut warnings)
}
