//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliBackground};
use crate::{
    config::{BackgroundColor, BackgroundMode, CanvasSize, CompositeRequest, OutputFormat, TagColorRule},
    error::CompositeError,
    services::OutputFormatHandler,
};
use anyhow::{Context, Result};
use std::str::FromStr;

/// Convert CLI arguments to a [`CompositeRequest`]
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build a CompositeRequest from CLI arguments
    ///
    /// A `--config` file provides the starting point; every flag given on
    /// the command line overrides the matching value.
    pub(crate) fn from_cli(cli: &Cli) -> Result<CompositeRequest> {
        let mut request = match &cli.config {
            Some(path) => CompositeRequest::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => CompositeRequest::default(),
        };

        if let Some(canvas) = &cli.canvas {
            request.canvas_size = CanvasSize::from_str(canvas).context("Invalid canvas size")?;
        }

        if let Some(background) = cli.background {
            request.background = match background {
                CliBackground::Transparent => BackgroundMode::Transparent,
                CliBackground::White => BackgroundMode::White,
                CliBackground::Custom => BackgroundMode::Custom(
                    BackgroundColor::from_hex(&cli.color).context("Invalid background color")?,
                ),
            };
        }

        // The flag can only switch auto-crop on; a config file may also enable it
        if cli.auto_crop {
            request.auto_crop = true;
        }

        if let Some(threshold) = cli.threshold {
            request.restoration.near_white_threshold = threshold;
        }
        if let Some(min_alpha) = cli.min_alpha {
            request.restoration.min_original_alpha = min_alpha;
        }

        if !cli.tag_colors.is_empty() {
            request.restoration.tag_colors = cli
                .tag_colors
                .iter()
                .map(|name| TagColorRule::from_str(name.trim()))
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Invalid tag color")?;
        }

        if let Some(filter) = cli.filter {
            request.resize_filter = filter.into();
        }

        request.validate()?;
        Ok(request)
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        let format = OutputFormat::from(cli.format);
        if let Some((recommended, min, max)) = OutputFormatHandler::get_quality_range(format) {
            if !(min..=max).contains(&cli.quality) {
                return Err(CompositeError::config_value_error(
                    &format!("{} quality", OutputFormatHandler::get_extension(format)),
                    cli.quality,
                    &format!("{}-{}", min, max),
                    Some(recommended),
                )
                .into());
            }
        }

        if cli.background == Some(CliBackground::Custom) {
            BackgroundColor::from_hex(&cli.color).context("Invalid background color")?;
        }

        if let Some(canvas) = &cli.canvas {
            CanvasSize::from_str(canvas).context("Invalid canvas size")?;
        }

        if !cli.original.exists() {
            anyhow::bail!("Original path does not exist: {}", cli.original.display());
        }
        if !cli.removed.exists() {
            anyhow::bail!(
                "Background-removed path does not exist: {}",
                cli.removed.display()
            );
        }

        Ok(())
    }
}
