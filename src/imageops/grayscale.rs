use std::path::Path;

use image::{ImageBuffer, Pixel, Primitive, Rgb, RgbImage};
use num_traits::AsPrimitive;

use crate::errors::{RestoreError, Result};
use crate::imageops::is_floating_point;

// ITU-R 601-2 luma weights.
const WEIGHT_R: f32 = 0.299;
const WEIGHT_G: f32 = 0.587;
const WEIGHT_B: f32 = 0.114;

/// Replaces every pixel with its luminance, repeated on each color channel.
pub trait Desaturate {
    type Output;
    fn desaturate(&self) -> Self::Output;
}

impl<S> Desaturate for ImageBuffer<Rgb<S>, Vec<S>>
where
    Rgb<S>: Pixel<Subpixel = S>,
    S: Primitive + AsPrimitive<f32> + 'static,
    f32: AsPrimitive<S>,
{
    type Output = ImageBuffer<Rgb<S>, Vec<S>>;

    fn desaturate(&self) -> Self::Output {
        let mut img = ImageBuffer::new(self.width(), self.height());
        for (x, y, p) in self.enumerate_pixels() {
            let Rgb([r, g, b]) = p;
            let l = luma(*r, *g, *b);
            img.put_pixel(x, y, Rgb([l, l, l]));
        }
        img
    }
}

fn luma<S>(r: S, g: S, b: S) -> S
where
    S: Primitive + AsPrimitive<f32> + 'static,
    f32: AsPrimitive<S>,
{
    let value = r.as_() * WEIGHT_R + g.as_() * WEIGHT_G + b.as_() * WEIGHT_B;
    if is_floating_point::<S>() {
        value.as_()
    } else {
        value.round().as_()
    }
}

/// Opens `path` and returns a three-channel grayscale copy. The file itself is not modified.
pub fn to_grayscale_rgb(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|e| RestoreError::ImageProcessing {
        path: path.display().to_string(),
        operation: "decode image".to_string(),
        source: Box::new(e),
    })?;

    Ok(img.to_rgb8().desaturate())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 37 % 256) as u8, (y * 91 % 256) as u8, ((x + y) * 13 % 256) as u8])
        })
    }

    #[test]
    fn test_channels_are_equal() {
        let gray = gradient(32, 16).desaturate();
        assert_eq!(gray.dimensions(), (32, 16));
        for Rgb([r, g, b]) in gray.pixels() {
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
    }

    #[test]
    fn test_known_luma_values() {
        let img = RgbImage::from_vec(
            4,
            1,
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
        )
        .unwrap();
        let gray = img.desaturate();
        assert_eq!(gray.get_pixel(0, 0), &Rgb([76, 76, 76]));
        assert_eq!(gray.get_pixel(1, 0), &Rgb([150, 150, 150]));
        assert_eq!(gray.get_pixel(2, 0), &Rgb([29, 29, 29]));
        assert_eq!(gray.get_pixel(3, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_float_subpixels() {
        let img: ImageBuffer<Rgb<f32>, Vec<f32>> =
            ImageBuffer::from_pixel(2, 2, Rgb([1.0, 0.0, 0.0]));
        let gray = img.desaturate();
        let Rgb([r, g, b]) = *gray.get_pixel(1, 1);
        assert!((r - WEIGHT_R).abs() < 1e-6);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_open_and_convert_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("tinted.png");
        let rgba = RgbaImage::from_pixel(8, 8, Rgba([200, 40, 40, 128]));
        DynamicImage::ImageRgba8(rgba).save(&path)?;
        let before = fs::read(&path)?;

        let gray = to_grayscale_rgb(&path)?;
        assert_eq!(DynamicImage::ImageRgb8(gray.clone()).color().channel_count(), 3);
        assert!(gray.pixels().all(|Rgb([r, g, b])| r == g && g == b));
        assert_eq!(fs::read(&path)?, before);
        Ok(())
    }

    #[test]
    fn test_invalid_image_is_decoding_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("broken.jpg");
        fs::write(&path, b"not an image")?;

        let err = to_grayscale_rgb(&path).unwrap_err();
        assert!(matches!(err, RestoreError::ImageProcessing { .. }));
        Ok(())
    }
}
