//! Bitmap codec: rasterize an image handle and compress it to PNG.

use crate::error::{AppsError, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, GenericImage, ImageEncoder, RgbaImage};

/// An image resource with an intrinsic size that can paint itself.
pub trait Drawable {
    fn intrinsic_width(&self) -> u32;

    fn intrinsic_height(&self) -> u32;

    /// Paint into `canvas`, which is sized to the intrinsic dimensions.
    fn draw(&self, canvas: &mut RgbaImage) -> Result<()>;
}

/// Drawable backed by an already decoded RGBA bitmap.
#[derive(Clone, Debug)]
pub struct BitmapDrawable {
    bitmap: RgbaImage,
}

impl BitmapDrawable {
    pub fn new(bitmap: RgbaImage) -> Self {
        Self { bitmap }
    }
}

impl From<image::DynamicImage> for BitmapDrawable {
    fn from(image: image::DynamicImage) -> Self {
        Self::new(image.to_rgba8())
    }
}

impl Drawable for BitmapDrawable {
    fn intrinsic_width(&self) -> u32 {
        self.bitmap.width()
    }

    fn intrinsic_height(&self) -> u32 {
        self.bitmap.height()
    }

    fn draw(&self, canvas: &mut RgbaImage) -> Result<()> {
        canvas
            .copy_from(&self.bitmap, 0, 0)
            .map_err(|e| AppsError::Render(e.to_string()))
    }
}

/// Render `drawable` at its intrinsic size and encode the result as PNG.
pub fn encode(drawable: &dyn Drawable) -> Result<Vec<u8>> {
    let width = drawable.intrinsic_width();
    let height = drawable.intrinsic_height();
    if width == 0 || height == 0 {
        return Err(AppsError::EmptyImage { width, height });
    }

    let mut canvas = RgbaImage::new(width, height);
    drawable.draw(&mut canvas)?;
    encode_png(&canvas)
}

fn encode_png(rgba: &RgbaImage) -> Result<Vec<u8>> {
    let mut encoded = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut encoded, CompressionType::Best, FilterType::Adaptive);
    encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)?;
    Ok(encoded)
}
