//! Output format handling service
//!
//! Encoding is kept apart from the compositing pipeline, which only ever
//! produces straight-alpha RGBA canvases.

use crate::{
    canvas::{blank_canvas, blend_over},
    config::{BackgroundMode, OutputFormat},
    types::{Mask, RasterImage},
};
use image::DynamicImage;
use tracing::warn;

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Convert an RGBA canvas to what the target format can store
    ///
    /// Formats without alpha get the canvas flattened onto white first, so
    /// transparent areas never turn black.
    ///
    /// # Examples
    /// ```rust
    /// use bgcomposite::{services::OutputFormatHandler, OutputFormat};
    /// use image::{DynamicImage, Rgba, RgbaImage};
    ///
    /// let canvas = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
    /// let converted = OutputFormatHandler::convert_format(&canvas, OutputFormat::Jpeg);
    /// assert!(matches!(converted, DynamicImage::ImageRgb8(_)));
    /// ```
    #[must_use]
    pub fn convert_format(canvas: &RasterImage, format: OutputFormat) -> DynamicImage {
        if Self::supports_transparency(format) {
            return DynamicImage::ImageRgba8(canvas.clone());
        }

        let mut flattened = blank_canvas(canvas.dimensions(), BackgroundMode::White);
        blend_over(&mut flattened, canvas, &Mask::from_alpha(canvas), (0, 0));
        DynamicImage::ImageRgba8(flattened).into_rgb8().into()
    }

    /// Get the appropriate file extension for a given output format
    ///
    /// # Examples
    /// ```rust
    /// use bgcomposite::{services::OutputFormatHandler, OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
            OutputFormat::Tiff => "tiff",
        }
    }

    /// Check if a format supports transparency (alpha channel)
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png | OutputFormat::WebP | OutputFormat::Tiff => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// Warn when a transparent canvas is about to be saved without alpha
    pub fn validate_for_background(format: OutputFormat, background: BackgroundMode) {
        if background.is_transparent() && !Self::supports_transparency(format) {
            warn!(
                ?format,
                "Output format does not support transparency; transparent areas will be flattened onto white"
            );
        }
    }

    /// Get the recommended quality settings for a format
    ///
    /// Returns `(default, min, max)`, or `None` for lossless formats.
    #[must_use]
    pub fn get_quality_range(format: OutputFormat) -> Option<(u8, u8, u8)> {
        match format {
            OutputFormat::Jpeg => Some((90, 0, 100)),
            // WebP is encoded lossless
            OutputFormat::Png | OutputFormat::Tiff | OutputFormat::WebP => None,
        }
    }
}
