//! Static overlay drawn on uploads for display.
//!
//! The boxes sit at fixed proportions of the image and carry no information
//! from the model.

use crate::storage::artifact_store::ArtifactStore;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const CONTRAST_FACTOR: f32 = 1.2;
const OUTLINE_THICKNESS: i32 = 3;

struct OverlayRegion {
    x: (f64, f64),
    y: (f64, f64),
    color: Rgb<u8>,
}

const OVERLAY_REGIONS: [OverlayRegion; 2] = [
    OverlayRegion {
        x: (0.4, 0.6),
        y: (0.4, 0.5),
        color: Rgb([255, 0, 0]),
    },
    OverlayRegion {
        x: (0.45, 0.55),
        y: (0.3, 0.4),
        color: Rgb([0, 0, 255]),
    },
];

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("Image has no pixels")]
    EmptyImage,
}

#[derive(Debug, Clone)]
pub struct AnnotatedArtifact {
    pub image: RgbImage,
    pub filename: String,
}

#[derive(Debug, Clone, Default)]
pub struct VisualAnnotator;

impl VisualAnnotator {
    pub fn annotate(&self, image: &RgbImage) -> Result<AnnotatedArtifact, AnnotationError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(AnnotationError::EmptyImage);
        }
        let mut canvas = enhance_contrast(image, CONTRAST_FACTOR);
        let (width, height) = (canvas.width() as f64, canvas.height() as f64);

        for region in &OVERLAY_REGIONS {
            let x0 = (width * region.x.0) as i32;
            let y0 = (height * region.y.0) as i32;
            let x1 = (width * region.x.1) as i32;
            let y1 = (height * region.y.1) as i32;
            draw_outline(&mut canvas, (x0, y0), (x1, y1), region.color);
        }

        Ok(AnnotatedArtifact {
            image: canvas,
            filename: ArtifactStore::generate_filename(),
        })
    }
}

/// Scales each channel away from the mean luminance by `factor`.
///
/// Luminance uses the 16-bit fixed-point ITU-R 601 weights with rounding,
/// and blended values are clamped then truncated to `u8`.
fn enhance_contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let count = image.pixels().len() as u64;
    let luma_sum: u64 = image.pixels().map(|p| luminance(p) as u64).sum();
    let mean = (luma_sum as f64 / count as f64 + 0.5).floor() as f32;

    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            let value = mean + factor * (*channel as f32 - mean);
            *channel = value.clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn luminance(p: &Rgb<u8>) -> u32 {
    (p[0] as u32 * 19595 + p[1] as u32 * 38470 + p[2] as u32 * 7471 + 0x8000) >> 16
}

/// Outline covering the inclusive box `(x0, y0)..=(x1, y1)`, grown inward.
fn draw_outline(canvas: &mut RgbImage, top_left: (i32, i32), bottom_right: (i32, i32), color: Rgb<u8>) {
    for inset in 0..OUTLINE_THICKNESS {
        let w = bottom_right.0 - top_left.0 + 1 - 2 * inset;
        let h = bottom_right.1 - top_left.1 + 1 - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(top_left.0 + inset, top_left.1 + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_image_keeps_its_color_outside_boxes() {
        let image = RgbImage::from_pixel(100, 100, Rgb([120, 120, 120]));
        let artifact = VisualAnnotator.annotate(&image).unwrap();
        assert_eq!(artifact.image.dimensions(), (100, 100));
        assert_eq!(*artifact.image.get_pixel(5, 5), Rgb([120, 120, 120]));
    }

    #[test]
    fn contrast_spreads_values_around_mean() {
        let mut image = RgbImage::from_pixel(2, 1, Rgb([103, 103, 103]));
        image.put_pixel(1, 0, Rgb([197, 197, 197]));
        let out = enhance_contrast(&image, 1.2);
        // mean luminance is 150; 93.6 and 206.4 truncate
        assert_eq!(*out.get_pixel(0, 0), Rgb([93, 93, 93]));
        assert_eq!(*out.get_pixel(1, 0), Rgb([206, 206, 206]));
    }

    #[test]
    fn contrast_clamps_out_of_range_values() {
        let mut image = RgbImage::from_pixel(2, 1, Rgb([0, 0, 0]));
        image.put_pixel(1, 0, Rgb([255, 255, 255]));
        let out = enhance_contrast(&image, 1.2);
        assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(1, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn luminance_is_rounded() {
        assert_eq!(luminance(&Rgb([1, 1, 0])), 1);
        assert_eq!(luminance(&Rgb([255, 255, 255])), 255);
        assert_eq!(luminance(&Rgb([10, 20, 30])), 18);

        // mean of 3 rather than 2 keeps the bright channels at 3
        let image = RgbImage::from_pixel(1, 1, Rgb([3, 3, 0]));
        assert_eq!(*enhance_contrast(&image, 2.0).get_pixel(0, 0), Rgb([3, 3, 0]));
    }

    #[test]
    fn boxes_are_drawn_at_fixed_proportions() {
        let image = RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]));
        let artifact = VisualAnnotator.annotate(&image).unwrap();
        let out = &artifact.image;

        // red box spans x 80..=120, y 40..=50
        assert_eq!(*out.get_pixel(80, 45), Rgb([255, 0, 0]));
        assert_eq!(*out.get_pixel(82, 45), Rgb([255, 0, 0]));
        assert_eq!(*out.get_pixel(85, 40), Rgb([255, 0, 0]));
        assert_eq!(*out.get_pixel(100, 45), Rgb([0, 0, 0]));
        // blue box spans x 90..=110, y 30..=40 and is drawn last
        assert_eq!(*out.get_pixel(90, 35), Rgb([0, 0, 255]));
        assert_eq!(*out.get_pixel(100, 30), Rgb([0, 0, 255]));
        assert_eq!(*out.get_pixel(100, 40), Rgb([0, 0, 255]));
    }

    #[test]
    fn tiny_images_do_not_panic() {
        let image = RgbImage::from_pixel(1, 1, Rgb([9, 9, 9]));
        assert!(VisualAnnotator.annotate(&image).is_ok());
    }

    #[test]
    fn empty_image_is_an_error() {
        let image = RgbImage::new(0, 0);
        assert!(matches!(
            VisualAnnotator.annotate(&image),
            Err(AnnotationError::EmptyImage)
        ));
    }
}
