//! Auto-crop to the non-transparent content of an image

use crate::types::{CropBox, RasterImage};
use image::imageops;

/// Smallest rectangle containing every pixel with non-zero alpha
///
/// Returns `None` when the image has no such pixel (or is empty).
#[must_use]
pub fn alpha_bounding_box(image: &RasterImage) -> Option<CropBox> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        found = true;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    found.then(|| CropBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Crop an image to its non-transparent content
///
/// Returns the cropped copy and the box used. A fully transparent image is
/// returned unchanged with no box.
#[must_use]
pub fn auto_crop(image: &RasterImage) -> (RasterImage, Option<CropBox>) {
    match alpha_bounding_box(image) {
        Some(bbox) if bbox.is_full(image.width(), image.height()) => (image.clone(), Some(bbox)),
        Some(bbox) => {
            let cropped = imageops::crop_imm(image, bbox.x, bbox.y, bbox.width, bbox.height).to_image();
            (cropped, Some(bbox))
        },
        None => (image.clone(), None),
    }
}
