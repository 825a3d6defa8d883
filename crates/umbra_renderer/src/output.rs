//! Frame output buffer.

use crate::tracer::color_to_rgb;
use image::{ImageResult, RgbImage};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use umbra_math::Color;

/// RGB8 image written concurrently by render jobs.
///
/// Each byte is an atomic with relaxed ordering. Jobs own disjoint rows, so
/// no two writers touch the same byte; readers polling mid-render may see a
/// partially written row. Joining the worker threads makes all writes
/// visible.
#[derive(Debug)]
pub struct OutputImage {
    width: u32,
    height: u32,
    data: Vec<AtomicU8>,
}

impl OutputImage {
    pub const CHANNELS: usize = 3;

    /// Black image.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * Self::CHANNELS;
        Self {
            width,
            height,
            data: (0..len).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize * self.width as usize + x as usize) * Self::CHANNELS)
    }

    /// Store an already encoded pixel. Out-of-range writes are ignored.
    pub fn set_rgb(&self, x: u32, y: u32, rgb: [u8; 3]) {
        if let Some(offset) = self.offset(x, y) {
            for (byte, value) in self.data[offset..offset + Self::CHANNELS].iter().zip(rgb) {
                byte.store(value, Ordering::Relaxed);
            }
        }
    }

    /// Encode and store a linear color.
    pub fn set_pixel(&self, x: u32, y: u32, color: Color) {
        self.set_rgb(x, y, color_to_rgb(color));
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let offset = self.offset(x, y)?;
        let byte = |i: usize| self.data[offset + i].load(Ordering::Relaxed);
        Some([byte(0), byte(1), byte(2)])
    }

    /// Row-major RGB bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.iter().map(|b| b.load(Ordering::Relaxed)).collect()
    }

    /// Independent copy of the current contents.
    pub fn snapshot(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|b| AtomicU8::new(b.load(Ordering::Relaxed))).collect(),
        }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        // Buffer length always matches the dimensions
        RgbImage::from_raw(self.width, self.height, self.to_bytes())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Encode to a file, format chosen by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> ImageResult<()> {
        self.to_rgb_image().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_image_is_black() {
        let image = OutputImage::new(4, 3);

        assert_eq!(image.to_bytes(), vec![0; 36]);
        assert_eq!(image.pixel(3, 2), Some([0, 0, 0]));
        assert_eq!(image.pixel(4, 0), None);
    }

    #[test]
    fn test_set_pixel_row_major() {
        let image = OutputImage::new(2, 2);
        image.set_pixel(1, 0, Color::new(1.0, 0.0, 0.25));
        image.set_rgb(0, 1, [1, 2, 3]);

        let bytes = image.to_bytes();
        assert_eq!(&bytes[3..6], &[255, 0, 128]);
        assert_eq!(&bytes[6..9], &[1, 2, 3]);

        // Ignored
        image.set_rgb(5, 5, [9, 9, 9]);
        assert!(!image.to_bytes().contains(&9));
    }

    #[test]
    fn test_to_rgb_image() {
        let image = OutputImage::new(3, 2);
        image.set_rgb(2, 1, [10, 20, 30]);
        let rgb = image.to_rgb_image();

        assert_eq!(rgb.dimensions(), (3, 2));
        assert_eq!(rgb.get_pixel(2, 1).0, [10, 20, 30]);
        assert_eq!(image.snapshot().to_bytes(), image.to_bytes());
    }
}
