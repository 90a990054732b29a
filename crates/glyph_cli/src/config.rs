//! Optional `config.toml` for the `glyph-art` CLI.
//!
//! Looked up at `--config`, else `<config dir>/glyph-art/config.toml`.
//! A missing file means defaults; a malformed one is an error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glyph_render::{
    parse_hex_color, Canvas, CanvasLayout, ContinuousRamp, GlyphMetrics, GlyphRamp,
    ThresholdStride, DEFAULT_BACKGROUND, DEFAULT_COLUMNS, DEFAULT_CONTRAST, DEFAULT_CROP_SIZE,
    DEFAULT_FIT_BOUND, DEFAULT_FONT_SCALE, DEFAULT_INK,
};
use log::debug;
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory scanned for named sample images.
    pub samples_dir: Option<PathBuf>,
    pub threshold: ThresholdConfig,
    pub ramp: RampConfig,
    pub canvas: CanvasConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdConfig {
    pub contrast: f64,
    pub threshold: f64,
    pub pixel_skip: u32,
    pub max_bound: u32,
    pub ink: char,
    pub blank: char,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let ramp = GlyphRamp::ink_blank();
        Self {
            contrast: DEFAULT_CONTRAST,
            threshold: 128.0,
            pixel_skip: 4,
            max_bound: DEFAULT_FIT_BOUND,
            ink: ramp.ink(),
            blank: ramp.blank(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RampConfig {
    pub columns: u32,
    pub gain: f64,
    /// Glyphs from most to least ink.
    pub glyphs: String,
    pub font_scale: f64,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            gain: 1.2,
            glyphs: GlyphRamp::blocks().to_string(),
            font_scale: DEFAULT_FONT_SCALE,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    pub size: u32,
    /// Center-crop to a square before rendering instead of aspect-fitting.
    pub crop: bool,
    pub crop_size: u32,
    pub background: String,
    pub ink: String,
    pub glyph_advance: f64,
    pub glyph_height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        let metrics = GlyphMetrics::default();
        Self {
            size: DEFAULT_CROP_SIZE,
            crop: true,
            crop_size: DEFAULT_CROP_SIZE,
            background: hex(DEFAULT_BACKGROUND),
            ink: hex(DEFAULT_INK),
            glyph_advance: metrics.advance,
            glyph_height: metrics.height,
        }
    }
}

fn hex(rgba: [u8; 4]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgba[0], rgba[1], rgba[2])
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {:?}", path))?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn threshold_stride(&self) -> Result<ThresholdStride> {
        let ramp = GlyphRamp::new(format!("{}{}", self.threshold.ink, self.threshold.blank))?;
        Ok(ThresholdStride {
            contrast: self.threshold.contrast,
            threshold: self.threshold.threshold,
            pixel_skip: self.threshold.pixel_skip,
            ramp,
        })
    }

    pub fn continuous_ramp(&self, layout: CanvasLayout) -> Result<ContinuousRamp> {
        let ramp = GlyphRamp::new(self.ramp.glyphs.as_str())
            .with_context(|| format!("invalid glyph ramp {:?}", self.ramp.glyphs))?;
        Ok(ContinuousRamp {
            columns: self.ramp.columns,
            gain: self.ramp.gain,
            ramp,
            font_scale: self.ramp.font_scale,
            layout,
        })
    }

    pub fn canvas(&self) -> Result<Canvas> {
        let background = parse_hex_color(&self.canvas.background)?;
        let ink = parse_hex_color(&self.canvas.ink)?;
        let metrics =
            GlyphMetrics { advance: self.canvas.glyph_advance, height: self.canvas.glyph_height };
        Ok(Canvas::new(self.canvas.size, self.canvas.size)?
            .with_colors(background, ink)
            .with_metrics(metrics))
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("glyph-art").join("config.toml"))
}
