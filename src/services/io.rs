//! Image I/O operations service
//!
//! This module keeps file decoding and encoding out of the compositing
//! pipeline, which works purely on in-memory buffers.

use crate::{
    config::OutputFormat,
    error::{CompositeError, Result},
    services::format::OutputFormatHandler,
    types::RasterImage,
};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat};
use std::io::{BufWriter, Cursor};
use std::path::Path;
use tracing::debug;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path as straight-alpha RGBA
    ///
    /// Extension-based detection is tried first, then content sniffing.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgcomposite::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("product.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RasterImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(CompositeError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img.into_rgba8()),
            Err(e) => {
                debug!(
                    path = %path_ref.display(),
                    error = %e,
                    "Extension-based loading failed, attempting content-based detection"
                );
                let data = std::fs::read(path_ref)
                    .map_err(|io_err| CompositeError::file_io_error("read image data", path_ref, &io_err))?;
                Self::load_from_bytes(&data)
            },
        }
    }

    /// Decode an image from memory as straight-alpha RGBA
    pub fn load_from_bytes(bytes: &[u8]) -> Result<RasterImage> {
        Ok(image::load_from_memory(bytes)?.into_rgba8())
    }

    /// Encode a canvas into memory
    ///
    /// `quality` applies to JPEG only; PNG, TIFF and WebP are written lossless.
    pub fn encode(canvas: &RasterImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let converted = OutputFormatHandler::convert_format(canvas, format);
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        match format {
            OutputFormat::Jpeg => {
                let rgb = converted.into_rgb8();
                JpegEncoder::new_with_quality(&mut cursor, quality.min(100)).encode_image(&rgb)?;
            },
            OutputFormat::Png => converted.write_to(&mut cursor, ImageFormat::Png)?,
            OutputFormat::Tiff => converted.write_to(&mut cursor, ImageFormat::Tiff)?,
            OutputFormat::WebP => Self::write_webp(&converted, &mut cursor)?,
        }

        Ok(buffer)
    }

    #[cfg(feature = "webp-support")]
    fn write_webp(image: &DynamicImage, cursor: &mut Cursor<&mut Vec<u8>>) -> Result<()> {
        image.write_to(cursor, ImageFormat::WebP)?;
        Ok(())
    }

    #[cfg(not(feature = "webp-support"))]
    fn write_webp(_image: &DynamicImage, _cursor: &mut Cursor<&mut Vec<u8>>) -> Result<()> {
        Err(CompositeError::unsupported_format(
            "webp (rebuild with the webp-support feature)",
        ))
    }

    /// Save a canvas to disk, creating the parent directory if needed
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgcomposite::{services::ImageIOService, OutputFormat};
    /// use image::RgbaImage;
    ///
    /// let canvas = RgbaImage::new(1000, 1000);
    /// ImageIOService::save_image(&canvas, "out/product.png", OutputFormat::Png, 90)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn save_image<P: AsRef<Path>>(
        canvas: &RasterImage,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CompositeError::file_io_error("create output directory", parent, &e))?;
            }
        }

        let bytes = Self::encode(canvas, format, quality)?;
        let file = std::fs::File::create(path_ref)
            .map_err(|e| CompositeError::file_io_error("create output file", path_ref, &e))?;
        let mut writer = BufWriter::new(file);
        std::io::Write::write_all(&mut writer, &bytes)
            .map_err(|e| CompositeError::file_io_error("write output file", path_ref, &e))?;
        std::io::Write::flush(&mut writer)
            .map_err(|e| CompositeError::file_io_error("flush output file", path_ref, &e))?;

        debug!(path = %path_ref.display(), bytes = bytes.len(), ?format, "Saved composite");
        Ok(())
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_ascii_lowercase().as_str(),
                    "jpg" | "jpeg" | "png" | "webp" | "tiff" | "tif"
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file() {
        let err = ImageIOService::load_image("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, CompositeError::Io(_)));
        assert!(err.to_string().contains("read image file"));
    }

    #[test]
    fn test_save_and_load_png_preserves_pixels() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("canvas.png");
        let mut canvas = RasterImage::from_pixel(3, 3, Rgba([0, 0, 0, 0]));
        canvas.put_pixel(1, 1, Rgba([200, 10, 10, 255]));

        ImageIOService::save_image(&canvas, &path, OutputFormat::Png, 90).unwrap();
        let loaded = ImageIOService::load_image(&path).unwrap();
        assert_eq!(loaded, canvas);
    }

    #[test]
    fn test_content_sniffing_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mislabeled.jpg");
        let canvas = RasterImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        std::fs::write(&path, ImageIOService::encode(&canvas, OutputFormat::Png, 0).unwrap()).unwrap();

        let loaded = ImageIOService::load_image(&path).unwrap();
        assert_eq!(loaded.get_pixel(0, 0).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_encode_jpeg_drops_alpha() {
        let canvas = RasterImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        let bytes = ImageIOService::encode(&canvas, OutputFormat::Jpeg, 90).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_is_supported_format() {
        assert!(ImageIOService::is_supported_format("a.PNG"));
        assert!(ImageIOService::is_supported_format("a.jpeg"));
        assert!(!ImageIOService::is_supported_format("a.gif"));
        assert!(!ImageIOService::is_supported_format("noext"));
    }
}
