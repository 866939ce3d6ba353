use image::DynamicImage;
use log::info;
use nalgebra::Vector3;
use std::path::Path;

/// Represents a decoded 2D texture map.
#[derive(Debug, Clone)]
pub struct Texture {
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, image::ImageError> {
        let path_ref = path.as_ref();
        let img = image::open(path_ref)?;

        let width = img.width();
        let height = img.height();

        info!("Loaded texture: {:?} ({}x{})", path_ref, width, height);

        Ok(Self {
            width,
            height,
            image: img,
        })
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            image,
        }
    }

    /// Mean color over all pixels, in linear space.
    ///
    /// Each pixel is linearized before averaging.
    pub fn average_color(&self) -> Vector3<f32> {
        let rgb = self.image.to_rgb32f();
        let count = (self.width as usize * self.height as usize).max(1) as f32;
        // Textures are usually sRGB. Simple approximation: pow(2.2)
        let sum = rgb
            .pixels()
            .fold(Vector3::zeros(), |acc: Vector3<f32>, p| {
                acc + Vector3::new(p[0], p[1], p[2]).map(|c| c.clamp(0.0, 1.0).powf(2.2))
            });
        sum / count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn average_of_flat_image_is_its_color() {
        let img = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let avg = Texture::from_image(DynamicImage::ImageRgb8(img)).average_color();
        assert!((avg - Vector3::new(1.0, 1.0, 1.0)).norm() < 1e-5);
    }

    #[test]
    fn average_mixes_halves() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 0]));
        let avg = Texture::from_image(DynamicImage::ImageRgb8(img)).average_color();
        // Linear mean of full red and black, not the linearized mean.
        assert!((avg.x - 0.5).abs() < 1e-4);
        assert!(avg.y.abs() < 1e-6);
    }

    #[test]
    fn flat_mid_gray_is_linearized_once() {
        let img = RgbImage::from_pixel(3, 3, Rgb([128, 128, 128]));
        let avg = Texture::from_image(DynamicImage::ImageRgb8(img)).average_color();
        let expected = (128.0f32 / 255.0).powf(2.2);
        assert!((avg - Vector3::repeat(expected)).norm() < 1e-4);
    }
}
