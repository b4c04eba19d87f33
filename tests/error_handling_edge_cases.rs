//! Error handling and edge case testing
//!
//! Boundary conditions for configuration, degenerate images and file I/O
//! that could occur while compositing.

use bgcomposite::{
    composite, composite_files, BackgroundColor, BackgroundMode, CanvasSize, CompositeError,
    CompositeRequest, Compositor, ImageIOService, Mask, OutputFormat, RasterImage, Result,
};
use image::Rgba;
use std::str::FromStr;
use tempfile::TempDir;

#[test]
fn test_config_validation_edge_cases() -> Result<()> {
    // Smallest usable canvas
    let request = CompositeRequest::builder().canvas_size(CanvasSize::square(1)).build()?;
    assert!(request.validate().is_ok());

    // Threshold extremes are both legal
    let request = CompositeRequest::builder().near_white_threshold(0).build()?;
    assert_eq!(request.restoration.near_white_threshold, 0);
    let request = CompositeRequest::builder().near_white_threshold(255).build()?;
    assert_eq!(request.restoration.near_white_threshold, 255);

    // Zero-sized canvas is rejected after manual construction
    let mut request = CompositeRequest::default();
    request.canvas_size = CanvasSize::new(1000, 0);
    let error = request.validate().unwrap_err();
    assert!(matches!(error, CompositeError::InvalidConfig(_)));
    assert!(error.is_invalid_input());

    Ok(())
}

#[test]
fn test_background_color_parsing_edge_cases() {
    assert_eq!(BackgroundColor::from_hex("#f2f2f2").unwrap(), BackgroundColor::new(0xF2, 0xF2, 0xF2));
    assert_eq!(BackgroundColor::from_hex("000000").unwrap(), BackgroundColor::new(0, 0, 0));

    for bad in ["", "#", "#fff", "#12345", "#1234567", "#gg0000", "red"] {
        assert!(BackgroundColor::from_hex(bad).is_err(), "accepted {:?}", bad);
    }

    assert_eq!(BackgroundMode::from_str("none").unwrap(), BackgroundMode::Transparent);
    assert!(BackgroundMode::from_str("#zzzzzz").is_err());
}

#[test]
fn test_canvas_size_parsing_edge_cases() {
    assert_eq!(CanvasSize::from_str("1x1").unwrap(), CanvasSize::new(1, 1));
    assert_eq!(CanvasSize::from_str("1920X1080").unwrap(), CanvasSize::new(1920, 1080));
    for bad in ["", "x", "100", "100x", "x100", "-1x5", "10x10x10"] {
        assert!(CanvasSize::from_str(bad).is_err(), "accepted {:?}", bad);
    }
}

#[test]
fn test_single_pixel_images() -> Result<()> {
    let original = RasterImage::from_pixel(1, 1, Rgba([10, 200, 10, 255]));
    let removed = RasterImage::new(1, 1);

    let request = CompositeRequest::builder()
        .canvas_size(CanvasSize::square(3))
        .background(BackgroundMode::Transparent)
        .auto_crop(true)
        .build()?;
    let result = Compositor::new(request)?.run(&original, &removed)?;

    assert_eq!(result.metadata.restored_pixels, 1);
    assert_eq!(result.metadata.offset, (1, 1));
    assert_eq!(result.image.get_pixel(1, 1).0, [10, 200, 10, 255]);
    assert_eq!(result.image.get_pixel(0, 0)[3], 0);
    Ok(())
}

#[test]
fn test_extreme_aspect_ratio_keeps_one_pixel() -> Result<()> {
    let original = RasterImage::from_pixel(2000, 1, Rgba([0, 0, 0, 255]));
    let removed = original.clone();

    let request = CompositeRequest::builder().canvas_size(CanvasSize::square(100)).build()?;
    let result = Compositor::new(request)?.run(&original, &removed)?;
    assert_eq!(result.metadata.placed_size, Some((100, 1)));
    Ok(())
}

#[test]
fn test_fully_transparent_without_autocrop_is_blank() -> Result<()> {
    let original = RasterImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
    let removed = RasterImage::new(10, 10);

    let canvas = composite(&original, &removed, &CompositeRequest::builder().canvas_size(CanvasSize::square(20)).build()?)?;
    assert!(canvas.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    Ok(())
}

#[test]
fn test_partially_transparent_original_is_not_restored() -> Result<()> {
    let original = RasterImage::from_pixel(2, 1, Rgba([200, 20, 20, 128]));
    let removed = RasterImage::new(2, 1);

    let request = CompositeRequest::builder()
        .canvas_size(CanvasSize::new(2, 1))
        .background(BackgroundMode::Transparent)
        .build()?;
    let result = Compositor::new(request.clone())?.run(&original, &removed)?;
    assert_eq!(result.metadata.restored_pixels, 0);

    // Lowering the alpha floor lets semi-transparent tag pixels through
    let lenient = CompositeRequest::builder()
        .canvas_size(CanvasSize::new(2, 1))
        .background(BackgroundMode::Transparent)
        .min_original_alpha(100)
        .build()?;
    let result = Compositor::new(lenient)?.run(&original, &removed)?;
    assert_eq!(result.metadata.restored_pixels, 2);
    Ok(())
}

#[test]
fn test_mask_edge_cases() {
    assert!(Mask::new(vec![0; 3], (2, 2)).is_err());

    let mask = Mask::new(vec![255; 4], (2, 2)).unwrap();
    assert_eq!(mask.coverage(), 4);
    assert_eq!(mask.get(5, 5), 0);

    let empty = Mask::empty(0, 0);
    assert_eq!(empty.coverage(), 0);
}

#[test]
fn test_file_io_errors() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.png");

    let error = ImageIOService::load_image(&missing).unwrap_err();
    assert!(matches!(error, CompositeError::Io(_)));
    assert!(error.to_string().contains("missing.png"));

    let garbage = temp_dir.path().join("garbage.png");
    std::fs::write(&garbage, b"definitely not a png").unwrap();
    assert!(ImageIOService::load_image(&garbage).is_err());
}

#[test]
fn test_composite_files_mismatch_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let original = temp_dir.path().join("original.png");
    let removed = temp_dir.path().join("removed.png");
    let output = temp_dir.path().join("out.png");

    ImageIOService::save_image(&RasterImage::new(5, 5), &original, OutputFormat::Png, 90).unwrap();
    ImageIOService::save_image(&RasterImage::new(4, 4), &removed, OutputFormat::Png, 90).unwrap();

    let result = composite_files(&original, &removed, &output, &CompositeRequest::default(), OutputFormat::Png);
    assert!(matches!(result, Err(CompositeError::DimensionMismatch { .. })));
    assert!(!output.exists());
}
