//! Tag-preserving restoration
//!
//! Background-removal models tend to erase thin foreground details such as
//! price tags, care labels and printed text. This pass compares the removed
//! image against the original and puts back every erased pixel that the
//! original shows as non-background.

use crate::{
    config::RestorationConfig,
    error::{CompositeError, Result},
    types::{Mask, RasterImage, RestoredImage},
};
use image::Rgba;
use tracing::{debug, instrument};

/// Fail with `DimensionMismatch` unless both images have the same size
pub fn ensure_same_dimensions(original: &RasterImage, removed: &RasterImage) -> Result<()> {
    if original.dimensions() != removed.dimensions() {
        return Err(CompositeError::dimension_mismatch(
            original.dimensions(),
            removed.dimensions(),
        ));
    }
    Ok(())
}

/// Whether the original pixel looks like white/near-white background
#[must_use]
pub fn is_near_white(pixel: Rgba<u8>, threshold: u8) -> bool {
    pixel[0] > threshold && pixel[1] > threshold && pixel[2] > threshold
}

/// Per-pixel restoration rule
///
/// A pixel is restored when the removal model made it fully transparent but
/// the original shows an opaque, non-background color there (matching at least
/// one configured tag color, if any are configured).
#[must_use]
pub fn should_restore(original: Rgba<u8>, removed: Rgba<u8>, config: &RestorationConfig) -> bool {
    if removed[3] != 0 {
        return false;
    }
    if original[3] < config.min_original_alpha {
        return false;
    }
    if is_near_white(original, config.near_white_threshold) {
        return false;
    }
    if config.tag_colors.is_empty() {
        return true;
    }
    let rgb = [original[0], original[1], original[2]];
    config.tag_colors.iter().any(|rule| rule.matches(rgb))
}

/// Run the restoration pass over a pair of images
///
/// Neither input is modified; the restored image is a new buffer.
///
/// # Errors
/// - `DimensionMismatch` if the images differ in size
#[instrument(level = "debug", skip_all, fields(width = original.width(), height = original.height()))]
pub fn restore_tags(
    original: &RasterImage,
    removed: &RasterImage,
    config: &RestorationConfig,
) -> Result<RestoredImage> {
    ensure_same_dimensions(original, removed)?;

    let (width, height) = removed.dimensions();
    let mut image = removed.clone();
    let mut restored_mask = Mask::empty(width, height);
    let mut restored_pixels = 0usize;

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let source = *original.get_pixel(x, y);
        if should_restore(source, *pixel, config) {
            *pixel = source;
            restored_mask.set(x, y, 255);
            restored_pixels += 1;
        }
    }

    debug!(restored_pixels, "Restoration pass complete");

    Ok(RestoredImage {
        image,
        restored_mask,
        restored_pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TagColorRule;

    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn test_non_erased_pixels_are_kept() {
        let config = RestorationConfig::default();
        assert!(!should_restore(Rgba([255, 0, 0, 255]), Rgba([1, 2, 3, 1]), &config));
    }

    #[test]
    fn test_near_white_is_not_restored() {
        let config = RestorationConfig::default();
        assert!(!should_restore(Rgba([250, 250, 250, 255]), CLEAR, &config));
        // Equal to the threshold is not "above" it
        assert!(should_restore(Rgba([240, 250, 250, 255]), CLEAR, &config));
    }

    #[test]
    fn test_translucent_original_is_not_restored() {
        let config = RestorationConfig::default();
        assert!(!should_restore(Rgba([0, 0, 0, 254]), CLEAR, &config));

        let relaxed = RestorationConfig {
            min_original_alpha: 128,
            ..RestorationConfig::default()
        };
        assert!(should_restore(Rgba([0, 0, 0, 200]), CLEAR, &relaxed));
    }

    #[test]
    fn test_tag_color_rules_narrow_restoration() {
        let config = RestorationConfig {
            tag_colors: vec![TagColorRule::red()],
            ..RestorationConfig::default()
        };
        assert!(should_restore(Rgba([220, 10, 10, 255]), CLEAR, &config));
        assert!(!should_restore(Rgba([10, 10, 220, 255]), CLEAR, &config));
    }

    #[test]
    fn test_restore_tags_counts_and_masks() {
        let original = RasterImage::from_fn(4, 4, |x, _| {
            if x == 0 {
                Rgba([200, 0, 0, 255])
            } else {
                Rgba([250, 250, 250, 255])
            }
        });
        let removed = RasterImage::from_pixel(4, 4, CLEAR);

        let restored = restore_tags(&original, &removed, &RestorationConfig::default()).unwrap();
        assert_eq!(restored.restored_pixels, 4);
        assert_eq!(restored.restored_mask.coverage(), 4);
        assert_eq!(restored.restored_mask.get(0, 3), 255);
        assert_eq!(*restored.image.get_pixel(0, 1), Rgba([200, 0, 0, 255]));
        assert_eq!(*restored.image.get_pixel(1, 1), CLEAR);
        // Inputs are untouched
        assert_eq!(*removed.get_pixel(0, 1), CLEAR);
    }

    #[test]
    fn test_restore_tags_dimension_mismatch() {
        let original = RasterImage::new(5, 5);
        let removed = RasterImage::new(4, 5);
        let err = restore_tags(&original, &removed, &RestorationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CompositeError::DimensionMismatch {
                original: (5, 5),
                removed: (4, 5)
            }
        ));
    }
}
