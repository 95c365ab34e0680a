use image::imageops::{self, FilterType};
use image::{ColorType, RgbImage};
use ndarray::Array4;

/// Side length of the square model input.
pub const TARGET_SIZE: u32 = 180;
pub const CHANNELS: usize = 3;

#[derive(Debug, thiserror::Error)]
#[error("Failed to decode image: {0}")]
pub struct DecodeError(#[from] image::ImageError);

/// A decoded upload, already converted to 3-channel RGB.
#[derive(Debug, Clone)]
pub struct RawImage {
    pixels: RgbImage,
    source_color: ColorType,
}

impl RawImage {
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Color mode of the upload before conversion.
    pub fn source_color(&self) -> ColorType {
        self.source_color
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Model input with shape `(1, TARGET_SIZE, TARGET_SIZE, 3)`.
///
/// Values are raw 0..=255 intensities. No rescaling is applied; the deployed
/// weights are fed exactly what the reference service fed them.
#[derive(Debug, Clone)]
pub struct NormalizedTensor(Array4<f32>);

impl NormalizedTensor {
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn view(&self) -> ndarray::ArrayView4<'_, f32> {
        self.0.view()
    }
}

#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    size: u32,
    filter: FilterType,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self {
            size: TARGET_SIZE,
            filter: FilterType::CatmullRom,
        }
    }
}

impl ImageNormalizer {
    pub fn decode(&self, bytes: &[u8]) -> Result<RawImage, DecodeError> {
        let image = image::load_from_memory(bytes)?;
        let source_color = image.color();
        log::debug!(
            "Decoded {}x{} image ({:?})",
            image.width(),
            image.height(),
            source_color
        );
        Ok(RawImage {
            pixels: image.to_rgb8(),
            source_color,
        })
    }

    pub fn normalize(&self, raw: &RawImage) -> NormalizedTensor {
        let resized = imageops::resize(raw.pixels(), self.size, self.size, self.filter);
        let side = self.size as usize;
        let tensor = Array4::from_shape_fn((1, side, side, CHANNELS), |(_, y, x, c)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32
        });
        NormalizedTensor(tensor)
    }
}
