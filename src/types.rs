//! Core types for compositing operations

use crate::error::{CompositeError, Result};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Row-major straight-alpha RGBA8 pixel grid
pub type RasterImage = RgbaImage;

/// Single-channel selection mask (0-255) co-extensive with a [`RasterImage`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl Mask {
    /// Create a new mask, checking that the buffer matches the dimensions
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let expected = dimensions.0 as usize * dimensions.1 as usize;
        if data.len() != expected {
            return Err(CompositeError::invalid_config(format!(
                "Mask buffer holds {} values but {}x{} needs {}",
                data.len(),
                dimensions.0,
                dimensions.1,
                expected
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// All-zero mask
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize],
            dimensions: (width, height),
        }
    }

    /// Mask taken from an image's alpha channel
    #[must_use]
    pub fn from_alpha(image: &RgbaImage) -> Self {
        Self {
            data: image.pixels().map(|p| p[3]).collect(),
            dimensions: image.dimensions(),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    /// Mask value at (x, y), or 0 outside the mask
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.dimensions.0 || y >= self.dimensions.1 {
            return 0;
        }
        let index = y as usize * self.dimensions.0 as usize + x as usize;
        self.data.get(index).copied().unwrap_or(0)
    }

    pub(crate) fn set(&mut self, x: u32, y: u32, value: u8) {
        if x >= self.dimensions.0 || y >= self.dimensions.1 {
            return;
        }
        let index = y as usize * self.dimensions.0 as usize + x as usize;
        if let Some(slot) = self.data.get_mut(index) {
            *slot = value;
        }
    }

    /// Number of non-zero entries
    #[must_use]
    pub fn coverage(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0).count()
    }
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the box covers an entire `width` x `height` image
    #[must_use]
    pub fn is_full(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

/// Output of the restoration pass
#[derive(Debug, Clone)]
pub struct RestoredImage {
    /// Removed-background image with erased tag pixels put back
    pub image: RasterImage,
    /// 255 where a pixel was restored from the original, 0 elsewhere
    pub restored_mask: Mask,
    /// Number of restored pixels
    pub restored_pixels: usize,
}

/// Time spent in each pipeline stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeTimings {
    pub restore_ms: u64,
    pub crop_ms: u64,
    pub resize_ms: u64,
    pub blend_ms: u64,
    pub total_ms: u64,
}

/// Details about how the foreground was placed on the canvas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeMetadata {
    /// Pixels restored from the original
    pub restored_pixels: usize,
    /// Auto-crop box in restored-image coordinates, when cropping happened
    pub crop_box: Option<CropBox>,
    /// Foreground size after shrink-to-fit, `None` for a blank canvas
    pub placed_size: Option<(u32, u32)>,
    /// Top-left corner of the foreground on the canvas
    pub offset: (u32, u32),
    pub timings: CompositeTimings,
}

impl CompositeMetadata {
    /// Whether the foreground was empty and the canvas left blank
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.placed_size.is_none()
    }
}

/// Result of a compositing operation
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// The final canvas
    pub image: RasterImage,
    pub metadata: CompositeMetadata,
}

impl CompositeResult {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Get timing summary for display
    #[must_use]
    pub fn timing_summary(&self) -> String {
        let t = &self.metadata.timings;
        format!(
            "Total: {}ms | Restore: {}ms | Crop: {}ms | Resize: {}ms | Blend: {}ms",
            t.total_ms, t.restore_ms, t.crop_ms, t.resize_ms, t.blend_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_mask_rejects_wrong_length() {
        assert!(Mask::new(vec![0; 5], (2, 2)).is_err());
        assert!(Mask::new(vec![0; 4], (2, 2)).is_ok());
    }

    #[test]
    fn test_mask_from_alpha() {
        let mut image = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 0]));
        image.put_pixel(2, 1, Rgba([10, 20, 30, 200]));
        let mask = Mask::from_alpha(&image);
        assert_eq!(mask.dimensions, (3, 2));
        assert_eq!(mask.get(2, 1), 200);
        assert_eq!(mask.get(0, 0), 0);
        assert_eq!(mask.get(5, 5), 0);
        assert_eq!(mask.coverage(), 1);
    }

    #[test]
    fn test_mask_set_ignores_out_of_bounds() {
        let mut mask = Mask::empty(4, 4);
        mask.set(1, 2, 255);
        mask.set(9, 9, 255);
        assert_eq!(mask.get(1, 2), 255);
        assert_eq!(mask.coverage(), 1);
    }

    #[test]
    fn test_crop_box_full() {
        assert!(CropBox::new(0, 0, 10, 5).is_full(10, 5));
        assert!(!CropBox::new(1, 0, 9, 5).is_full(10, 5));
    }
}
