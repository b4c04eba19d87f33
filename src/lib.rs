#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Tag-Preserving Background Compositor
//!
//! A Rust library for turning background-removed product photos into
//! uniform catalogue images. Segmentation models tend to treat thin price
//! tags, care labels and stickers as background and erase them; this crate
//! takes the original photo next to the background-removed version, puts
//! those pixels back, and places the result on a fixed-size canvas.
//!
//! ## Features
//!
//! - **Tag Restoration**: Pixels the segmenter erased are restored when they are
//!   opaque in the original and not near-white, optionally limited to tag colors
//! - **Auto-Crop**: Optional crop to the bounding box of visible content
//! - **Shrink-to-Fit**: Aspect-preserving downscale onto the canvas, never upscaled
//! - **Backgrounds**: Transparent, white, or any custom color
//! - **Batch Processing**: Parallel compositing with results returned in input order
//! - **Format Support**: PNG, JPEG, TIFF and (with `webp-support`) WebP output
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use bgcomposite::{BackgroundMode, CanvasSize, CompositeRequest, Compositor};
//! use image::{Rgba, RgbaImage};
//!
//! # fn main() -> bgcomposite::Result<()> {
//! // A product with a red tag the segmenter removed
//! let mut original = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
//! let mut removed = RgbaImage::new(8, 8);
//! for y in 2..6 {
//!     for x in 2..6 {
//!         original.put_pixel(x, y, Rgba([40, 40, 40, 255]));
//!         removed.put_pixel(x, y, Rgba([40, 40, 40, 255]));
//!     }
//! }
//! original.put_pixel(6, 6, Rgba([200, 20, 20, 255]));
//!
//! let request = CompositeRequest::builder()
//!     .canvas_size(CanvasSize::square(16))
//!     .background(BackgroundMode::White)
//!     .build()?;
//!
//! let result = Compositor::new(request)?.run(&original, &removed)?;
//! assert_eq!(result.image.dimensions(), (16, 16));
//! assert_eq!(result.metadata.restored_pixels, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Library vs CLI Usage
//!
//! - **Library Usage**: The compositing pipeline, configuration, batch runner and
//!   image I/O are available by default
//! - **CLI Usage**: Enable the `cli` feature for the `bgcomposite` binary, progress
//!   reporting and tracing setup
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and progress reporting
//! - `webp-support` (default): WebP image format support
//! - `tracing-json`: JSON structured log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! bgcomposite = { version = "0.1", default-features = false }
//! ```

pub mod batch;
pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod crop;
pub mod error;
pub mod restore;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

// Public API exports
pub use batch::{
    composite_batch, composite_batch_with_progress, default_concurrency, BatchOutcome,
    BatchSummary, CompositeJob,
};
pub use compositor::{composite, Compositor};
pub use config::{
    BackgroundColor, BackgroundMode, CanvasSize, CompositeRequest, CompositeRequestBuilder,
    OutputFormat, ResizeFilter, RestorationConfig, TagColorRule,
};
pub use crop::{alpha_bounding_box, auto_crop};
pub use error::{CompositeError, Result};
pub use restore::{restore_tags, should_restore};
pub use services::{ImageIOService, OutputFormatHandler};
pub use types::{
    CompositeMetadata, CompositeResult, CompositeTimings, CropBox, Mask, RasterImage,
    RestoredImage,
};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, spans, TracingConfig, TracingFormat};

/// Composite an original/background-removed pair read from disk
///
/// Convenience wrapper that loads both files, runs the [`Compositor`] and
/// writes the canvas to `output`.
///
/// # Examples
/// ```rust,no_run
/// use bgcomposite::{composite_files, CompositeRequest, OutputFormat};
///
/// let result = composite_files(
///     "shoe.jpg",
///     "shoe_removed.png",
///     "shoe_composited.png",
///     &CompositeRequest::default(),
///     OutputFormat::Png,
/// )?;
/// println!("{}", result.timing_summary());
/// # Ok::<(), bgcomposite::CompositeError>(())
/// ```
pub fn composite_files<P, Q, R>(
    original: P,
    removed: Q,
    output: R,
    request: &CompositeRequest,
    format: OutputFormat,
) -> Result<CompositeResult>
where
    P: AsRef<std::path::Path>,
    Q: AsRef<std::path::Path>,
    R: AsRef<std::path::Path>,
{
    let original = ImageIOService::load_image(original)?;
    let removed = ImageIOService::load_image(removed)?;
    let result = Compositor::new(request.clone())?.run(&original, &removed)?;
    ImageIOService::save_image(&result.image, output, format, 90)?;
    Ok(result)
}

/// Composite a pair of encoded images held in memory
///
/// Returns the encoded canvas. Suitable for servers that receive uploads
/// rather than file paths.
pub fn composite_bytes(
    original: &[u8],
    removed: &[u8],
    request: &CompositeRequest,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>> {
    let original = ImageIOService::load_from_bytes(original)?;
    let removed = ImageIOService::load_from_bytes(removed)?;
    let canvas = composite(&original, &removed, request)?;
    ImageIOService::encode(&canvas, format, quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_composite_bytes_round_trip() {
        let original = RasterImage::from_pixel(4, 4, Rgba([30, 30, 30, 255]));
        let removed = original.clone();
        let encode = |img: &RasterImage| ImageIOService::encode(img, OutputFormat::Png, 0).unwrap();

        let request = CompositeRequest::builder()
            .canvas_size(CanvasSize::square(8))
            .build()
            .unwrap();
        let bytes = composite_bytes(&encode(&original), &encode(&removed), &request, OutputFormat::Png, 0)
            .unwrap();

        let canvas = ImageIOService::load_from_bytes(&bytes).unwrap();
        assert_eq!(canvas.dimensions(), (8, 8));
        assert_eq!(canvas.get_pixel(4, 4).0, [30, 30, 30, 255]);
        assert_eq!(canvas.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_composite_bytes_rejects_garbage() {
        let result = composite_bytes(b"nope", b"nope", &CompositeRequest::default(), OutputFormat::Png, 0);
        assert!(matches!(result, Err(CompositeError::Image(_))));
    }
}
