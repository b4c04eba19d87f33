//! Configuration types for compositing operations

use crate::error::{CompositeError, Result};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Solid background color (RGB, always fully opaque when painted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::white()
    }
}

impl BackgroundColor {
    /// Create a new background color
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pure white (255, 255, 255)
    #[must_use]
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Parse a `#RRGGBB` (or `RRGGBB`) hex string
    ///
    /// # Examples
    /// ```rust
    /// use bgcomposite::BackgroundColor;
    ///
    /// let grey = BackgroundColor::from_hex("#F2F2F2").unwrap();
    /// assert_eq!(grey, BackgroundColor::new(0xF2, 0xF2, 0xF2));
    /// assert!(BackgroundColor::from_hex("#F2F2").is_err());
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CompositeError::invalid_config(format!(
                "Invalid hex color '{}': expected #RRGGBB",
                hex
            )));
        }

        let channel = |range: std::ops::Range<usize>| -> Result<u8> {
            let part = digits
                .get(range)
                .ok_or_else(|| CompositeError::invalid_config(format!("Invalid hex color '{}'", hex)))?;
            u8::from_str_radix(part, 16)
                .map_err(|e| CompositeError::invalid_config(format!("Invalid hex color '{}': {}", hex, e)))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// The color as an opaque RGBA pixel
    #[must_use]
    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, 255])
    }
}

impl std::fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// JPEG (no transparency, flattened onto white)
    Jpeg,
    /// WebP with alpha channel transparency
    WebP,
    /// TIFF with alpha channel transparency and lossless compression
    Tiff,
}

impl FromStr for OutputFormat {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            "tif" | "tiff" => Ok(Self::Tiff),
            other => Err(CompositeError::unsupported_format(other)),
        }
    }
}

/// What the output canvas is filled with before the foreground is pasted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    /// Fully transparent canvas (0, 0, 0, 0)
    Transparent,
    /// Solid white canvas
    #[default]
    White,
    /// Solid caller-specified color
    Custom(BackgroundColor),
}

impl BackgroundMode {
    /// The pixel the blank canvas is filled with
    #[must_use]
    pub fn fill_pixel(self) -> image::Rgba<u8> {
        match self {
            Self::Transparent => image::Rgba([0, 0, 0, 0]),
            Self::White => BackgroundColor::white().to_rgba(),
            Self::Custom(color) => color.to_rgba(),
        }
    }

    /// Whether the canvas keeps an alpha channel worth encoding
    #[must_use]
    pub fn is_transparent(self) -> bool {
        matches!(self, Self::Transparent)
    }
}

impl FromStr for BackgroundMode {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transparent" | "none" => Ok(Self::Transparent),
            "white" => Ok(Self::White),
            other => BackgroundColor::from_hex(other).map(Self::Custom),
        }
    }
}

impl std::fmt::Display for BackgroundMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transparent => write!(f, "transparent"),
            Self::White => write!(f, "white"),
            Self::Custom(color) => write!(f, "{}", color),
        }
    }
}

/// Target canvas dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::square(1000)
    }
}

impl CanvasSize {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    #[must_use]
    pub fn dimensions(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FromStr for CanvasSize {
    type Err = CompositeError;

    /// Parse `WIDTHxHEIGHT`, e.g. `1000x1000`
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let (w, h) = lower.split_once('x').ok_or_else(|| {
            CompositeError::invalid_config(format!("Invalid canvas size '{}': expected WxH", s))
        })?;
        let parse = |part: &str| {
            part.trim().parse::<u32>().map_err(|e| {
                CompositeError::invalid_config(format!("Invalid canvas size '{}': {}", s, e))
            })
        };
        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

impl std::fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resampling filter used when shrinking the foreground to fit the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Explicit "tag color" detector
///
/// When a [`RestorationConfig`] carries any rules, an erased pixel is only
/// restored if it matches at least one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum TagColorRule {
    /// Red dominant: `r > min_red` and both `g`, `b` below `max_other`
    Red { min_red: u8, max_other: u8 },
    /// Dark ink: every channel below `max_channel`
    Dark { max_channel: u8 },
}

impl TagColorRule {
    /// Red price tags and stickers
    #[must_use]
    pub fn red() -> Self {
        Self::Red {
            min_red: 150,
            max_other: 100,
        }
    }

    /// Black or near-black print
    #[must_use]
    pub fn dark() -> Self {
        Self::Dark { max_channel: 60 }
    }

    #[must_use]
    pub fn matches(self, [r, g, b]: [u8; 3]) -> bool {
        match self {
            Self::Red { min_red, max_other } => r > min_red && g < max_other && b < max_other,
            Self::Dark { max_channel } => r < max_channel && g < max_channel && b < max_channel,
        }
    }
}

impl FromStr for TagColorRule {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Self::red()),
            "dark" | "black" => Ok(Self::dark()),
            other => Err(CompositeError::invalid_config(format!(
                "Unknown tag color '{}': expected red or dark",
                other
            ))),
        }
    }
}

/// Parameters of the tag-preserving restoration pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorationConfig {
    /// An original pixel whose R, G and B all exceed this value is background
    pub near_white_threshold: u8,
    /// Minimum original alpha for a pixel to count as "originally opaque"
    pub min_original_alpha: u8,
    /// Optional explicit tag color detectors (empty = restore any non-white pixel)
    pub tag_colors: Vec<TagColorRule>,
}

impl Default for RestorationConfig {
    fn default() -> Self {
        Self {
            near_white_threshold: 240,
            min_original_alpha: 255,
            tag_colors: Vec::new(),
        }
    }
}

/// Configuration for a compositing operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeRequest {
    /// Output canvas dimensions
    pub canvas_size: CanvasSize,
    /// Canvas fill
    pub background: BackgroundMode,
    /// Crop the restored image to its non-transparent bounding box first
    pub auto_crop: bool,
    /// Restoration heuristics
    pub restoration: RestorationConfig,
    /// Filter used when shrinking to fit
    pub resize_filter: ResizeFilter,
}

impl Default for CompositeRequest {
    fn default() -> Self {
        Self {
            canvas_size: CanvasSize::default(),
            background: BackgroundMode::default(),
            auto_crop: false,
            restoration: RestorationConfig::default(),
            resize_filter: ResizeFilter::default(),
        }
    }
}

impl CompositeRequest {
    /// Create a new request builder
    ///
    /// # Examples
    /// ```rust
    /// use bgcomposite::{BackgroundMode, CanvasSize, CompositeRequest};
    ///
    /// let request = CompositeRequest::builder()
    ///     .canvas_size(CanvasSize::square(800))
    ///     .background(BackgroundMode::Transparent)
    ///     .auto_crop(false)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.canvas_size.width, 800);
    /// ```
    #[must_use]
    pub fn builder() -> CompositeRequestBuilder {
        CompositeRequestBuilder::default()
    }

    /// Validate all request parameters
    ///
    /// # Errors
    /// - Canvas width or height is zero
    pub fn validate(&self) -> Result<()> {
        if self.canvas_size.width == 0 || self.canvas_size.height == 0 {
            return Err(CompositeError::invalid_config(format!(
                "Canvas size must be non-zero, got {}",
                self.canvas_size
            )));
        }
        Ok(())
    }

    /// Load a request from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let data = std::fs::read_to_string(path_ref)
            .map_err(|e| CompositeError::file_io_error("read config file", path_ref, &e))?;
        Self::from_json_str(&data)
    }

    /// Parse a request from a JSON string and validate it
    pub fn from_json_str(data: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(data)
            .map_err(|e| CompositeError::invalid_config(format!("Invalid config JSON: {}", e)))?;
        request.validate()?;
        Ok(request)
    }
}

/// Builder for `CompositeRequest`
#[derive(Debug, Default)]
pub struct CompositeRequestBuilder {
    request: CompositeRequest,
}

impl CompositeRequestBuilder {
    #[must_use]
    pub fn canvas_size(mut self, size: CanvasSize) -> Self {
        self.request.canvas_size = size;
        self
    }

    #[must_use]
    pub fn background(mut self, background: BackgroundMode) -> Self {
        self.request.background = background;
        self
    }

    #[must_use]
    pub fn auto_crop(mut self, auto_crop: bool) -> Self {
        self.request.auto_crop = auto_crop;
        self
    }

    #[must_use]
    pub fn near_white_threshold(mut self, threshold: u8) -> Self {
        self.request.restoration.near_white_threshold = threshold;
        self
    }

    #[must_use]
    pub fn min_original_alpha(mut self, alpha: u8) -> Self {
        self.request.restoration.min_original_alpha = alpha;
        self
    }

    #[must_use]
    pub fn tag_colors(mut self, rules: Vec<TagColorRule>) -> Self {
        self.request.restoration.tag_colors = rules;
        self
    }

    #[must_use]
    pub fn restoration(mut self, restoration: RestorationConfig) -> Self {
        self.request.restoration = restoration;
        self
    }

    #[must_use]
    pub fn resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.request.resize_filter = filter;
        self
    }

    /// Build and validate the request
    ///
    /// # Errors
    /// - Canvas width or height is zero
    pub fn build(self) -> Result<CompositeRequest> {
        self.request.validate()?;
        Ok(self.request)
    }
}
