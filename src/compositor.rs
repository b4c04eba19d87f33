//! Tag-preserving compositor
//!
//! Runs the whole pipeline for one image pair: restore erased tag pixels,
//! optionally auto-crop, shrink-to-fit onto a fresh canvas, center and blend.

use crate::{
    canvas::{blank_canvas, blend_over, center_offset, fit_within, shrink_to},
    config::CompositeRequest,
    crop::auto_crop,
    error::Result,
    restore::restore_tags,
    types::{CompositeMetadata, CompositeResult, CompositeTimings, Mask, RasterImage},
};
use instant::Instant;
use tracing::{debug, instrument, span, warn, Level};

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Compositor bound to a validated request
///
/// Holds no mutable state, so one compositor can serve any number of image
/// pairs, including from several threads at once.
#[derive(Debug, Clone)]
pub struct Compositor {
    request: CompositeRequest,
}

impl Compositor {
    /// Create a compositor, validating the request
    ///
    /// # Errors
    /// - `InvalidConfig` if the request fails validation
    pub fn new(request: CompositeRequest) -> Result<Self> {
        request.validate()?;
        Ok(Self { request })
    }

    #[must_use]
    pub fn request(&self) -> &CompositeRequest {
        &self.request
    }

    /// Composite one original/background-removed pair
    ///
    /// # Errors
    /// - `DimensionMismatch` if the two images differ in size; no output is produced
    #[instrument(
        skip_all,
        fields(
            dimensions = %format!("{}x{}", original.width(), original.height()),
            canvas = %self.request.canvas_size,
            background = %self.request.background
        )
    )]
    pub fn run(&self, original: &RasterImage, removed: &RasterImage) -> Result<CompositeResult> {
        let total_start = Instant::now();
        let mut timings = CompositeTimings::default();
        let mut metadata = CompositeMetadata::default();
        let canvas_dims = self.request.canvas_size.dimensions();

        let restore_start = Instant::now();
        let restored = restore_tags(original, removed, &self.request.restoration)?;
        timings.restore_ms = elapsed_ms(restore_start);
        metadata.restored_pixels = restored.restored_pixels;

        let foreground = if self.request.auto_crop {
            let _span = span!(Level::DEBUG, "auto_crop").entered();
            let crop_start = Instant::now();
            let (cropped, crop_box) = auto_crop(&restored.image);
            timings.crop_ms = elapsed_ms(crop_start);
            match crop_box {
                Some(bbox) => {
                    debug!(x = bbox.x, y = bbox.y, width = bbox.width, height = bbox.height, "Cropped to content");
                    metadata.crop_box = Some(bbox);
                    cropped
                },
                None => {
                    warn!("Restored image is fully transparent; leaving canvas blank");
                    metadata.timings = finish(timings, total_start);
                    return Ok(CompositeResult {
                        image: blank_canvas(canvas_dims, self.request.background),
                        metadata,
                    });
                },
            }
        } else {
            restored.image
        };

        let mut canvas = blank_canvas(canvas_dims, self.request.background);

        if foreground.width() == 0 || foreground.height() == 0 {
            debug!("Empty foreground; returning blank canvas");
            metadata.timings = finish(timings, total_start);
            return Ok(CompositeResult { image: canvas, metadata });
        }

        let target = fit_within(foreground.dimensions(), canvas_dims);
        let resize_start = Instant::now();
        let scaled = shrink_to(&foreground, target, self.request.resize_filter);
        timings.resize_ms = elapsed_ms(resize_start);

        let offset = center_offset(canvas_dims, target);
        debug!(
            placed_width = target.0,
            placed_height = target.1,
            offset_x = offset.0,
            offset_y = offset.1,
            "Placing foreground"
        );

        let blend_start = Instant::now();
        let mask = Mask::from_alpha(&scaled);
        blend_over(&mut canvas, &scaled, &mask, offset);
        timings.blend_ms = elapsed_ms(blend_start);

        metadata.placed_size = Some(target);
        metadata.offset = offset;
        metadata.timings = finish(timings, total_start);

        Ok(CompositeResult { image: canvas, metadata })
    }
}

fn finish(mut timings: CompositeTimings, total_start: Instant) -> CompositeTimings {
    timings.total_ms = elapsed_ms(total_start);
    timings
}

/// Composite an original/background-removed pair according to `request`
///
/// # Examples
/// ```rust
/// use bgcomposite::{composite, BackgroundMode, CanvasSize, CompositeRequest};
/// use image::{Rgba, RgbaImage};
///
/// let original = RgbaImage::from_pixel(20, 10, Rgba([200, 0, 0, 255]));
/// let removed = original.clone();
/// let request = CompositeRequest::builder()
///     .canvas_size(CanvasSize::square(40))
///     .background(BackgroundMode::White)
///     .build()
///     .unwrap();
///
/// let canvas = composite(&original, &removed, &request).unwrap();
/// assert_eq!(canvas.dimensions(), (40, 40));
/// assert_eq!(canvas.get_pixel(10, 15).0, [200, 0, 0, 255]);
/// assert_eq!(canvas.get_pixel(0, 0).0, [255, 255, 255, 255]);
/// ```
///
/// # Errors
/// - `DimensionMismatch` if the two images differ in size
/// - `InvalidConfig` if the request fails validation
pub fn composite(
    original: &RasterImage,
    removed: &RasterImage,
    request: &CompositeRequest,
) -> Result<RasterImage> {
    Compositor::new(request.clone())?
        .run(original, removed)
        .map(|result| result.image)
}
