//! Page flow: place blocks top-down onto fixed-size pages.
//!
//! Rules:
//! - A paragraph, banner, image or grid row that does not fit in the space
//!   left on the current page starts a new page. Grids split between rows,
//!   never inside a card.
//! - `PageBreak` closes the current page lazily: the next placed block opens
//!   a new one, so consecutive breaks collapse and a trailing break leaves
//!   no blank page.
//! - A spacer that does not fit is clipped at the bottom margin.

use super::text::{self, Face};
use super::{DrawOp, PageDecorator, PageGeometry, PagePlan, Rgb, PT_PER_CM};
use crate::pipeline::image::ResolvedImage;
use crate::pipeline::layout::{Block, Card, Grid, Paragraph, TextStyle};
use std::sync::Arc;

/// Caption inside the grey box that stands in for a missing image.
pub const PLACEHOLDER_CAPTION: &str = "Image not available";

const CELL_PAD_X: f32 = 0.25 * PT_PER_CM;
const CELL_PAD_Y: f32 = 3.0;
const CARD_PAD: f32 = 5.0;
const IMAGE_GAP: f32 = 5.0;
const HAIRLINE: f32 = 0.25;

const BANNER_SIZE: f32 = 16.0;
const BANNER_LEADING: f32 = 20.0;
const BANNER_PAD: f32 = 6.0;
const BANNER_SPACE: f32 = 12.0;
const BANNER_FILL: &str = "#2E86C1";
const CARD_TITLE_COLOR: &str = "#2E4053";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy)]
struct Style {
    size: f32,
    leading: f32,
    face: Face,
    color: Rgb,
    align: Align,
    space_after: f32,
}

fn style(s: TextStyle) -> Style {
    match s {
        TextStyle::Title => Style {
            size: 24.0,
            leading: 28.0,
            face: Face::Bold,
            color: Rgb::BLACK,
            align: Align::Center,
            space_after: 20.0,
        },
        TextStyle::Subtitle => Style {
            size: 10.0,
            leading: 12.0,
            face: Face::Regular,
            color: Rgb::BLACK,
            align: Align::Center,
            space_after: 6.0,
        },
        TextStyle::CardTitle => Style {
            size: 12.0,
            leading: 14.0,
            face: Face::Bold,
            color: Rgb::hex(CARD_TITLE_COLOR),
            align: Align::Center,
            space_after: 0.0,
        },
        TextStyle::CardText => Style {
            size: 10.0,
            leading: 12.0,
            face: Face::Regular,
            color: Rgb::BLACK,
            align: Align::Center,
            space_after: 0.0,
        },
    }
}

/// Place `blocks` onto pages and decorate every page.
///
/// Always returns at least one page.
pub fn layout_pages(
    blocks: &[Block],
    geometry: &PageGeometry,
    decorator: &dyn PageDecorator,
) -> Vec<PagePlan> {
    let mut flow = Flow::new(*geometry);
    for block in blocks {
        flow.place(block);
    }
    let mut pages = flow.finish();
    for page in &mut pages {
        let decorations = decorator.decorate(page.number, geometry);
        page.ops.extend(decorations);
    }
    pages
}

/// A card with its text already wrapped to the card width.
struct MeasuredCard<'a> {
    card: &'a Card,
    image_size: f32,
    lines: Vec<(Style, Vec<String>)>,
    height: f32,
}

struct Flow {
    geo: PageGeometry,
    pages: Vec<PagePlan>,
    /// Distance from the top edge of the current page, in points.
    cursor: f32,
    open: bool,
}

impl Flow {
    fn new(geo: PageGeometry) -> Self {
        Self {
            geo,
            pages: Vec::new(),
            cursor: geo.margin,
            open: false,
        }
    }

    fn finish(mut self) -> Vec<PagePlan> {
        if self.pages.is_empty() {
            self.open_page();
        }
        self.pages
    }

    // ── Page bookkeeping ─────────────────────────────────────────────────

    fn open_page(&mut self) {
        if !self.open {
            self.pages.push(PagePlan {
                number: self.pages.len() + 1,
                ops: Vec::new(),
            });
            self.cursor = self.geo.margin;
            self.open = true;
        }
    }

    fn at_top(&self) -> bool {
        (self.cursor - self.geo.margin).abs() < 0.01
    }

    fn bottom(&self) -> f32 {
        self.geo.height - self.geo.margin
    }

    fn remaining(&self) -> f32 {
        self.bottom() - self.cursor
    }

    /// Make sure `h` points are available, moving to a new page if needed.
    fn reserve(&mut self, h: f32) {
        self.open_page();
        if h > self.remaining() && !self.at_top() {
            self.open = false;
            self.open_page();
        }
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    /// PDF y of the bottom edge of a box `h` tall whose top is `top` from
    /// the page top.
    fn pdf_y(&self, top: f32, h: f32) -> f32 {
        self.geo.height - top - h
    }

    // ── Blocks ───────────────────────────────────────────────────────────

    fn place(&mut self, block: &Block) {
        match block {
            Block::PageBreak => self.open = false,
            Block::Spacer { height_cm } => {
                self.open_page();
                self.cursor = (self.cursor + height_cm * PT_PER_CM).min(self.bottom());
            }
            Block::Paragraph(p) => self.paragraph(p),
            Block::Banner(text) => self.banner(text),
            Block::Image { image, size_cm } => {
                let size = (size_cm * PT_PER_CM).min(self.geo.content_width());
                self.reserve(size);
                let x = self.geo.margin + (self.geo.content_width() - size) / 2.0;
                let top = self.cursor;
                self.image_box(image, x, top, size);
                self.cursor += size + CARD_PAD;
            }
            Block::Grid(grid) => self.grid(grid),
        }
    }

    fn paragraph(&mut self, p: &Paragraph) {
        let st = style(p.style);
        let width = self.geo.content_width();
        let lines = text::wrap(&p.text, st.size, st.face, width);
        let h = lines.len() as f32 * st.leading + st.space_after;
        self.reserve(h);
        let left = self.geo.margin;
        let mut top = self.cursor;
        for line in lines {
            self.text_line(line, st, left, width, top);
            top += st.leading;
        }
        self.cursor += h;
    }

    fn banner(&mut self, label: &str) {
        let width = self.geo.content_width();
        let lines = text::wrap(label, BANNER_SIZE, Face::Bold, width - 2.0 * BANNER_PAD);
        let h = lines.len() as f32 * BANNER_LEADING + 2.0 * BANNER_PAD;
        self.open_page();
        let before = if self.at_top() { 0.0 } else { BANNER_SPACE };
        self.reserve(before + h + BANNER_SPACE);
        if !self.at_top() {
            self.cursor += before;
        }

        let top = self.cursor;
        self.push(DrawOp::Rect {
            x: self.geo.margin,
            y: self.pdf_y(top, h),
            w: width,
            h,
            fill: Some(Rgb::hex(BANNER_FILL)),
            stroke: None,
        });
        let st = Style {
            size: BANNER_SIZE,
            leading: BANNER_LEADING,
            face: Face::Bold,
            color: Rgb::WHITE,
            align: Align::Left,
            space_after: 0.0,
        };
        let mut line_top = top + BANNER_PAD;
        for line in lines {
            self.text_line(line, st, self.geo.margin + BANNER_PAD, width, line_top);
            line_top += BANNER_LEADING;
        }
        self.cursor += h + BANNER_SPACE;
    }

    fn grid(&mut self, grid: &Grid) {
        let columns = grid.columns.max(1);
        let col_w = self.geo.content_width() / columns as f32;
        let card_w = col_w - 2.0 * CELL_PAD_X;

        for row in &grid.rows {
            let measured: Vec<MeasuredCard> =
                row.iter().map(|card| measure_card(card, card_w)).collect();
            let card_h = measured.iter().map(|m| m.height).fold(0.0, f32::max);
            let row_h = card_h + 2.0 * CELL_PAD_Y;
            self.reserve(row_h);

            for (col, m) in measured.iter().enumerate() {
                let x = self.geo.margin + col as f32 * col_w + CELL_PAD_X;
                let top = self.cursor + CELL_PAD_Y;
                self.card(m, x, top, card_w, card_h);
            }
            self.cursor += row_h;
        }
    }

    // ── Primitives ───────────────────────────────────────────────────────

    fn card(&mut self, m: &MeasuredCard<'_>, x: f32, top: f32, w: f32, h: f32) {
        self.push(DrawOp::Rect {
            x,
            y: self.pdf_y(top, h),
            w,
            h,
            fill: None,
            stroke: Some((Rgb::GREY, HAIRLINE)),
        });

        let image_x = x + (w - m.image_size) / 2.0;
        self.image_box(&m.card.image, image_x, top + CARD_PAD, m.image_size);

        let mut line_top = top + CARD_PAD + m.image_size + IMAGE_GAP;
        for (st, lines) in &m.lines {
            for line in lines {
                self.text_line(line.clone(), *st, x + CARD_PAD, w - 2.0 * CARD_PAD, line_top);
                line_top += st.leading;
            }
        }
    }

    /// Picture fitted inside a `size` square, or the placeholder box.
    fn image_box(&mut self, image: &ResolvedImage, x: f32, top: f32, size: f32) {
        match image {
            ResolvedImage::Image(raster) if raster.width > 0 && raster.height > 0 => {
                let scale = (size / raster.width as f32).min(size / raster.height as f32);
                let w = raster.width as f32 * scale;
                let h = raster.height as f32 * scale;
                let offset_x = (size - w) / 2.0;
                let offset_y = (size - h) / 2.0;
                self.push(DrawOp::Image {
                    x: x + offset_x,
                    y: self.pdf_y(top + offset_y, h),
                    w,
                    h,
                    image: Arc::clone(raster),
                });
            }
            _ => self.placeholder(x, top, size),
        }
    }

    fn placeholder(&mut self, x: f32, top: f32, size: f32) {
        self.push(DrawOp::Rect {
            x,
            y: self.pdf_y(top, size),
            w: size,
            h: size,
            fill: Some(Rgb::LIGHT_GREY),
            stroke: Some((Rgb::GREY, HAIRLINE)),
        });
        let st = style(TextStyle::CardText);
        let lines = text::wrap(PLACEHOLDER_CAPTION, st.size, st.face, size - 2.0 * CARD_PAD);
        let total = lines.len() as f32 * st.leading;
        let mut line_top = top + (size - total) / 2.0;
        for line in lines {
            self.text_line(line, st, x, size, line_top);
            line_top += st.leading;
        }
    }

    /// One line of text inside the box `[left, left + width]`, with the
    /// line's top at `top`.
    fn text_line(&mut self, line: String, st: Style, left: f32, width: f32, top: f32) {
        let tw = text::text_width(&line, st.size, st.face);
        let x = match st.align {
            Align::Left => left,
            Align::Center => left + ((width - tw) / 2.0).max(0.0),
        };
        // Baseline sits ~80% of the font size below the glyph box top.
        let baseline = top + (st.leading - st.size) / 2.0 + 0.8 * st.size;
        self.push(DrawOp::Text {
            x,
            y: self.geo.height - baseline,
            size: st.size,
            face: st.face,
            color: st.color,
            text: line,
        });
    }
}

fn measure_card(card: &Card, card_w: f32) -> MeasuredCard<'_> {
    let image_size = (card.image_size_cm * PT_PER_CM).min(card_w - 2.0 * CARD_PAD);
    let text_w = card_w - 2.0 * CARD_PAD;
    let lines: Vec<(Style, Vec<String>)> = card
        .lines
        .iter()
        .map(|p| {
            let st = style(p.style);
            (st, text::wrap(&p.text, st.size, st.face, text_w))
        })
        .collect();
    let text_h: f32 = lines
        .iter()
        .map(|(st, l)| l.len() as f32 * st.leading)
        .sum();
    MeasuredCard {
        card,
        image_size,
        height: CARD_PAD + image_size + IMAGE_GAP + text_h + CARD_PAD,
        lines,
    }
}
