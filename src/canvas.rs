//! Canvas construction, shrink-to-fit placement and alpha blending
//!
//! All images use straight (non-premultiplied) alpha. The blend in
//! [`blend_over`] is the Porter-Duff "over" operator expressed for straight
//! alpha, which reduces to `fg * a + bg * (1 - a)` on an opaque canvas.

use crate::{
    config::{BackgroundMode, ResizeFilter},
    types::{Mask, RasterImage},
};
use image::{imageops, Rgba, Rgba32FImage};

/// Canvas of the requested size filled according to the background mode
#[must_use]
pub fn blank_canvas((width, height): (u32, u32), mode: BackgroundMode) -> RasterImage {
    RasterImage::from_pixel(width, height, mode.fill_pixel())
}

/// Largest size with the source aspect ratio that fits inside the canvas
///
/// Never upscales: a source that already fits is returned as-is. Each
/// dimension of a non-empty source stays at least one pixel.
#[must_use]
pub fn fit_within(source: (u32, u32), canvas: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = source;
    let (cw, ch) = canvas;

    if sw == 0 || sh == 0 || (sw <= cw && sh <= ch) {
        return source;
    }

    let (sw64, sh64, cw64, ch64) = (u64::from(sw), u64::from(sh), u64::from(cw), u64::from(ch));

    // Width-bound when sw/sh >= cw/ch
    let (w, h) = if sw64 * ch64 >= sh64 * cw64 {
        let h = (sh64 * cw64 + sw64 / 2) / sw64;
        (cw64, h.clamp(1, ch64.max(1)))
    } else {
        let w = (sw64 * ch64 + sh64 / 2) / sh64;
        (w.clamp(1, cw64.max(1)), ch64)
    };

    (
        u32::try_from(w).unwrap_or(cw),
        u32::try_from(h).unwrap_or(ch),
    )
}

/// Offset that centers `inner` in `outer`, biased towards the top-left
#[must_use]
pub fn center_offset(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

/// Resize to `target` unless it already has that size
///
/// Images with any transparency are filtered in premultiplied form, so the
/// color of fully transparent pixels never bleeds into the edges.
#[must_use]
pub fn shrink_to(image: &RasterImage, target: (u32, u32), filter: ResizeFilter) -> RasterImage {
    if image.dimensions() == target {
        return image.clone();
    }
    if image.pixels().all(|p| p[3] == u8::MAX) {
        return imageops::resize(image, target.0, target.1, filter.into());
    }

    let resized = imageops::resize(&premultiply(image), target.0, target.1, filter.into());
    unpremultiply(&resized)
}

fn premultiply(image: &RasterImage) -> Rgba32FImage {
    let (width, height) = image.dimensions();
    Rgba32FImage::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y);
        let a = f32::from(p[3]) / 255.0;
        Rgba([
            f32::from(p[0]) / 255.0 * a,
            f32::from(p[1]) / 255.0 * a,
            f32::from(p[2]) / 255.0 * a,
            a,
        ])
    })
}

fn unpremultiply(image: &Rgba32FImage) -> RasterImage {
    let (width, height) = image.dimensions();
    RasterImage::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y);
        let a = p[3].clamp(0.0, 1.0);
        let alpha = (a * 255.0).round() as u8;
        if alpha == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |v: f32| ((v / a).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([channel(p[0]), channel(p[1]), channel(p[2]), alpha])
    })
}

/// Blend the color of `foreground` over `background` with opacity `alpha`
///
/// The foreground's own alpha channel is ignored; callers pass it (or a mask
/// value) as `alpha`.
#[must_use]
pub fn blend_pixel(background: Rgba<u8>, foreground: Rgba<u8>, alpha: u8) -> Rgba<u8> {
    let fg_a = f32::from(alpha) / 255.0;
    if fg_a <= 0.0 {
        return background;
    }
    let bg_a = f32::from(background[3]) / 255.0;
    let inv = 1.0 - fg_a;
    let out_a = fg_a + bg_a * inv;
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| -> u8 {
        let value = (f32::from(foreground[i]) * fg_a + f32::from(background[i]) * bg_a * inv) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Paste `foreground` onto `canvas` at `offset`, weighted by `mask`
///
/// `mask` supplies the per-pixel opacity and must be co-extensive with
/// `foreground`; it is normally the foreground's own alpha channel. Pixels
/// that land outside the canvas are clipped.
pub fn blend_over(canvas: &mut RasterImage, foreground: &RasterImage, mask: &Mask, offset: (u32, u32)) {
    let (cw, ch) = canvas.dimensions();
    for (x, y, pixel) in foreground.enumerate_pixels() {
        let (Some(cx), Some(cy)) = (x.checked_add(offset.0), y.checked_add(offset.1)) else {
            continue;
        };
        if cx >= cw || cy >= ch {
            continue;
        }
        let blended = blend_pixel(*canvas.get_pixel(cx, cy), *pixel, mask.get(x, y));
        canvas.put_pixel(cx, cy, blended);
    }
}
