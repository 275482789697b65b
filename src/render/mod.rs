//! Document rendering: abstract [`Block`]s → finished document bytes.
//!
//! Rendering happens in two steps so geometry can be tested without parsing
//! PDF output:
//!
//! 1. [`flow`] places blocks onto fixed-size pages and produces a
//!    [`PagePlan`] of absolute [`DrawOp`]s per page, then runs the
//!    [`PageDecorator`] on every page.
//! 2. [`pdf`] replays the plan through `printpdf`.
//!
//! Other backends only need to implement [`DocumentRenderer`].

pub mod flow;
pub mod pdf;
pub mod text;

use crate::error::CatalogError;
use crate::pipeline::decode::RasterImage;
use crate::pipeline::layout::Block;
use std::sync::Arc;
use text::Face;

pub use flow::layout_pages;
pub use pdf::PdfRenderer;

/// Points per centimetre.
pub const PT_PER_CM: f32 = 72.0 / 2.54;

/// Turns a block sequence into a complete document.
pub trait DocumentRenderer {
    /// Render `blocks` into one byte stream. The returned buffer is complete;
    /// nothing is written after it is handed back.
    fn render(&self, blocks: &[Block]) -> Result<Vec<u8>, CatalogError>;
}

/// Physical page size and margins, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    /// A4 portrait with 2 cm margins.
    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin: 2.0 * PT_PER_CM,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// RGB colour, components in 0.0–1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
    pub const GREY: Rgb = Rgb(0.5, 0.5, 0.5);
    pub const LIGHT_GREY: Rgb = Rgb(0.827, 0.827, 0.827);

    /// Parse `#RRGGBB`. Invalid input yields black.
    pub fn hex(s: &str) -> Rgb {
        let s = s.trim_start_matches('#');
        let channel = |i: usize| {
            s.get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .map(|v| v as f32 / 255.0)
                .unwrap_or(0.0)
        };
        Rgb(channel(0), channel(2), channel(4))
    }
}

/// One absolute drawing instruction.
///
/// Coordinates are PDF user space: points, origin at the bottom-left corner,
/// `y` of rectangles and images is their bottom edge, `y` of text its
/// baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<Rgb>,
        /// Outline colour and thickness in points.
        stroke: Option<(Rgb, f32)>,
    },
    Text {
        x: f32,
        y: f32,
        size: f32,
        face: Face,
        color: Rgb,
        text: String,
    },
    Image {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        image: Arc<RasterImage>,
    },
}

/// Everything drawn on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    /// 1-indexed page number.
    pub number: usize,
    pub ops: Vec<DrawOp>,
}

impl PagePlan {
    /// All text drawn on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Invoked once for every produced page, after its content was placed.
pub trait PageDecorator: Send + Sync {
    fn decorate(&self, page_number: usize, geometry: &PageGeometry) -> Vec<DrawOp>;
}

/// Right-aligned "Page N" footer, 8 pt, 1 cm above the bottom edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageNumberFooter;

impl PageNumberFooter {
    const SIZE: f32 = 8.0;
}

impl PageDecorator for PageNumberFooter {
    fn decorate(&self, page_number: usize, geometry: &PageGeometry) -> Vec<DrawOp> {
        let text = format!("Page {page_number}");
        let width = text::text_width(&text, Self::SIZE, Face::Regular);
        vec![DrawOp::Text {
            x: geometry.width - 2.0 * PT_PER_CM - width,
            y: PT_PER_CM,
            size: Self::SIZE,
            face: Face::Regular,
            color: Rgb::BLACK,
            text,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colours() {
        assert_eq!(Rgb::hex("#FFFFFF"), Rgb::WHITE);
        let c = Rgb::hex("#2E86C1");
        assert!((c.0 - 46.0 / 255.0).abs() < 1e-6);
        assert_eq!(Rgb::hex("zz"), Rgb::BLACK);
    }

    #[test]
    fn a4_geometry() {
        let g = PageGeometry::a4();
        assert!((g.margin - 56.69).abs() < 0.01);
        assert!((g.content_width() - (595.28 - 113.39)).abs() < 0.01);
    }

    #[test]
    fn footer_is_right_aligned() {
        let g = PageGeometry::a4();
        let ops = PageNumberFooter.decorate(7, &g);
        let DrawOp::Text { x, y, text, size, .. } = &ops[0] else {
            panic!("expected a text op");
        };
        assert_eq!(text, "Page 7");
        let right_edge = x + text::text_width(text, *size, Face::Regular);
        assert!((right_edge - (g.width - 2.0 * PT_PER_CM)).abs() < 1e-3);
        assert!((y - PT_PER_CM).abs() < 1e-3);
    }
}
