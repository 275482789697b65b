//! `printpdf` backend: replays [`PagePlan`]s into a PDF byte buffer.

use super::text::Face;
use super::{
    layout_pages, DocumentRenderer, DrawOp, PageDecorator, PageGeometry, PageNumberFooter,
    PagePlan, Rgb,
};
use crate::error::CatalogError;
use crate::pipeline::decode::RasterImage;
use crate::pipeline::layout::Block;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, ImageTransform, ImageXObject,
    IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Polygon, Px,
};
use std::io::{BufWriter, Cursor, Write};
use std::sync::Arc;
use tracing::debug;

const MM_PER_PT: f32 = 25.4 / 72.0;

fn mm(pt: f32) -> Mm {
    Mm(pt * MM_PER_PT)
}

fn pdf_color(c: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(c.0, c.1, c.2, None))
}

/// Renders catalog blocks to PDF with the built-in Helvetica faces.
#[derive(Clone)]
pub struct PdfRenderer {
    geometry: PageGeometry,
    decorator: Arc<dyn PageDecorator>,
    title: String,
}

impl std::fmt::Debug for PdfRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfRenderer")
            .field("geometry", &self.geometry)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new("Product Catalog")
    }
}

impl PdfRenderer {
    /// A4 pages with a "Page N" footer. `title` becomes the document title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            geometry: PageGeometry::a4(),
            decorator: Arc::new(PageNumberFooter),
            title: title.into(),
        }
    }

    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_decorator(mut self, decorator: Arc<dyn PageDecorator>) -> Self {
        self.decorator = decorator;
        self
    }

    /// Page plans the renderer would draw for `blocks`.
    pub fn plan(&self, blocks: &[Block]) -> Vec<PagePlan> {
        layout_pages(blocks, &self.geometry, self.decorator.as_ref())
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, blocks: &[Block]) -> Result<Vec<u8>, CatalogError> {
        let pages = self.plan(blocks);
        debug!(pages = pages.len(), "Writing PDF");
        write_pdf(&self.title, &self.geometry, &pages)
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
        }
    }
}

fn write_pdf(
    title: &str,
    geometry: &PageGeometry,
    pages: &[PagePlan],
) -> Result<Vec<u8>, CatalogError> {
    let width = mm(geometry.width);
    let height = mm(geometry.height);
    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "Layer 1");

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| CatalogError::Pdf(format!("{e:?}")))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| CatalogError::Pdf(format!("{e:?}")))?,
    };

    for (i, page) in pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = doc.add_page(width, height, "Layer 1");
            doc.get_page(p).get_layer(l)
        };
        for op in &page.ops {
            draw(&layer, &fonts, op);
        }
    }

    let mut buf = Vec::new();
    {
        let mut writer = BufWriter::new(Cursor::new(&mut buf));
        doc.save(&mut writer)
            .map_err(|e| CatalogError::Pdf(format!("{e:?}")))?;
        writer
            .flush()
            .map_err(|e| CatalogError::Pdf(format!("flush failed: {e}")))?;
    }
    Ok(buf)
}

fn draw(layer: &PdfLayerReference, fonts: &Fonts, op: &DrawOp) {
    match op {
        DrawOp::Rect {
            x,
            y,
            w,
            h,
            fill,
            stroke,
        } => draw_rect(layer, *x, *y, *w, *h, *fill, *stroke),
        DrawOp::Text {
            x,
            y,
            size,
            face,
            color,
            text,
        } => {
            layer.set_fill_color(pdf_color(*color));
            layer.use_text(winansi(text), *size, mm(*x), mm(*y), fonts.get(*face));
        }
        DrawOp::Image { x, y, w, h, image } => draw_image(layer, *x, *y, *w, *h, image),
    }
}

fn draw_rect(
    layer: &PdfLayerReference,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    fill: Option<Rgb>,
    stroke: Option<(Rgb, f32)>,
) {
    let points = vec![
        (Point::new(mm(x), mm(y)), false),
        (Point::new(mm(x + w), mm(y)), false),
        (Point::new(mm(x + w), mm(y + h)), false),
        (Point::new(mm(x), mm(y + h)), false),
    ];

    if let Some((color, thickness)) = stroke {
        layer.set_outline_color(pdf_color(color));
        layer.set_outline_thickness(thickness);
    }

    match fill {
        Some(color) => {
            layer.set_fill_color(pdf_color(color));
            layer.add_polygon(Polygon {
                rings: vec![points],
                mode: if stroke.is_some() {
                    PaintMode::FillStroke
                } else {
                    PaintMode::Fill
                },
                winding_order: WindingOrder::NonZero,
            });
        }
        None if stroke.is_some() => layer.add_line(Line {
            points,
            is_closed: true,
        }),
        None => {}
    }
}

fn draw_image(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32, raster: &RasterImage) {
    if raster.width == 0 || raster.height == 0 {
        return;
    }
    let image = printpdf::Image::from(ImageXObject {
        width: Px(raster.width as usize),
        height: Px(raster.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: raster.rgb.clone(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });
    // At 72 dpi one pixel is one point, so the scale is the target size
    // over the pixel size.
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(mm(x)),
            translate_y: Some(mm(y)),
            scale_x: Some(w / raster.width as f32),
            scale_y: Some(h / raster.height as f32),
            dpi: Some(72.0),
            ..Default::default()
        },
    );
}

/// Built-in fonts only cover the WinAnsi code page; anything else prints
/// as `?`.
fn winansi(text: &str) -> String {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c,
            _ => '?',
        })
        .collect()
}
