//! Image decoding: downloaded bytes → [`RasterImage`] ready for embedding.
//!
//! Product photos arrive as whatever the sheet owner uploaded: 4000 px phone
//! JPEGs, transparent PNG logos, the odd WebP. Everything is decoded once,
//! downscaled so the longest edge is at most `max_pixels`, and flattened to
//! RGB8 over a white background. The PDF backend then embeds raw pixels and
//! never has to care about the source format.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::fmt;
use tracing::debug;

/// Decoded RGB8 pixels plus their dimensions.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB triples, `width * height * 3` bytes.
    pub rgb: Vec<u8>,
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rgb", &format_args!("<{} bytes>", self.rgb.len()))
            .finish()
    }
}

/// Decode `bytes` (PNG, JPEG, GIF or WebP) into a bounded RGB8 raster.
pub fn decode_image(bytes: &[u8], max_pixels: u32) -> Result<RasterImage, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let (w, h) = img.dimensions();

    let img = if w.max(h) > max_pixels {
        img.resize(max_pixels, max_pixels, FilterType::Triangle)
    } else {
        img
    };

    let raster = flatten_on_white(&img);
    debug!(
        "Decoded image {}x{} → {}x{} px",
        w, h, raster.width, raster.height
    );
    Ok(raster)
}

/// Composite any alpha channel over white so transparent logos don't turn black.
fn flatten_on_white(img: &DynamicImage) -> RasterImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);

    for px in rgba.pixels() {
        let [r, g, b, a] = px.0;
        let a = a as u16;
        for c in [r, g, b] {
            let blended = (c as u16 * a + 255 * (255 - a)) / 255;
            rgb.push(blended as u8);
        }
    }

    RasterImage { width, height, rgb }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode should succeed");
        buf
    }

    #[test]
    fn decode_small_png() {
        let bytes = png_bytes(RgbaImage::from_pixel(10, 4, Rgba([255, 0, 0, 255])));
        let raster = decode_image(&bytes, 600).expect("decode should succeed");
        assert_eq!((raster.width, raster.height), (10, 4));
        assert_eq!(raster.rgb.len(), 10 * 4 * 3);
        assert_eq!(&raster.rgb[..3], &[255, 0, 0]);
    }

    #[test]
    fn large_image_is_downscaled_keeping_aspect() {
        let bytes = png_bytes(RgbaImage::from_pixel(800, 400, Rgba([0, 0, 255, 255])));
        let raster = decode_image(&bytes, 200).unwrap();
        assert_eq!(raster.width, 200);
        assert_eq!(raster.height, 100);
    }

    #[test]
    fn transparent_pixels_become_white() {
        let bytes = png_bytes(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let raster = decode_image(&bytes, 600).unwrap();
        assert!(raster.rgb.iter().all(|&c| c == 255));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(decode_image(b"<html>not found</html>", 600).is_err());
    }

    #[test]
    fn debug_does_not_dump_pixels() {
        let r = RasterImage {
            width: 1,
            height: 1,
            rgb: vec![1, 2, 3],
        };
        assert!(format!("{r:?}").contains("<3 bytes>"));
    }
}
