use log::debug;

use super::grid::{CanvasArt, GlyphGrid, RenderedArt};
use super::ramp::GlyphRamp;
use crate::geometry::{self, FitRect, GridGeometry, DEFAULT_FONT_SCALE};
use crate::image_pipeline::adjust::{self, DEFAULT_CONTRAST};
use crate::image_pipeline::buffer::PixelBuffer;
use crate::RenderError;

/// Turns a prepared pixel buffer into glyph art.
pub trait Rasterizer {
    fn rasterize(&self, buffer: &PixelBuffer) -> Result<RenderedArt, RenderError>;
}

/// Contrast pass, then an ink/blank threshold sampled on a fixed pixel stride.
///
/// The grid is `floor(width / pixel_skip) x floor(height / pixel_skip)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdStride {
    pub contrast: f64,
    /// Mean channel values strictly below this select the ink glyph.
    pub threshold: f64,
    pub pixel_skip: u32,
    /// Only the first (ink) and last (blank) glyphs are used.
    pub ramp: GlyphRamp,
}

impl Default for ThresholdStride {
    fn default() -> Self {
        Self {
            contrast: DEFAULT_CONTRAST,
            threshold: 128.0,
            pixel_skip: 4,
            ramp: GlyphRamp::ink_blank(),
        }
    }
}

impl ThresholdStride {
    pub fn glyph_for(&self, rgb: [u8; 3]) -> char {
        if adjust::mean_channel(rgb) < self.threshold {
            self.ramp.ink()
        } else {
            self.ramp.blank()
        }
    }
}

impl Rasterizer for ThresholdStride {
    fn rasterize(&self, buffer: &PixelBuffer) -> Result<RenderedArt, RenderError> {
        ensure_buffer(buffer)?;
        if self.pixel_skip == 0 {
            return Err(RenderError::InvalidConfig("pixel skip must be positive".into()));
        }
        if !self.threshold.is_finite() {
            return Err(RenderError::InvalidConfig("threshold must be finite".into()));
        }

        let adjusted = adjust::apply_contrast(buffer, self.contrast)?;
        let columns = adjusted.width() / self.pixel_skip;
        let rows = adjusted.height() / self.pixel_skip;

        let mut cells = Vec::with_capacity(columns as usize * rows as usize);
        for row in 0..rows {
            for column in 0..columns {
                let rgb = adjusted.rgb_at(column * self.pixel_skip, row * self.pixel_skip);
                cells.push(self.glyph_for(rgb));
            }
        }

        debug!("threshold stride: {columns}x{rows} cells from {:?}", buffer.dimensions());
        Ok(RenderedArt::Text(GlyphGrid::new(columns, rows, cells)))
    }
}

/// Output region the continuous ramp lays its grid over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CanvasLayout {
    /// Grid covers a whole `width x height` surface.
    Full { width: f64, height: f64 },
    /// Grid covers the source's aspect-fit rectangle inside the container.
    AspectFit { container_width: f64, container_height: f64 },
}

impl CanvasLayout {
    pub fn region(&self, source_width: u32, source_height: u32) -> Result<FitRect, RenderError> {
        match *self {
            CanvasLayout::Full { width, height } => Ok(FitRect::full(width, height)),
            CanvasLayout::AspectFit { container_width, container_height } => {
                geometry::aspect_fit(source_width, source_height, container_width, container_height)
            },
        }
    }
}

/// Column count of the canvas variant.
pub const DEFAULT_COLUMNS: u32 = 150;

/// Gain-scaled brightness mapped over a continuous glyph ramp.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuousRamp {
    pub columns: u32,
    pub gain: f64,
    pub ramp: GlyphRamp,
    pub font_scale: f64,
    pub layout: CanvasLayout,
}

impl ContinuousRamp {
    pub fn new(columns: u32, layout: CanvasLayout) -> Self {
        Self {
            columns,
            gain: 1.2,
            ramp: GlyphRamp::blocks(),
            font_scale: DEFAULT_FONT_SCALE,
            layout,
        }
    }

    pub fn glyph_for(&self, rgb: [u8; 3]) -> char {
        self.ramp.glyph_for(adjust::brightness(rgb, self.gain))
    }

    fn validate(&self) -> Result<(), RenderError> {
        if !(self.gain.is_finite() && self.gain > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "brightness gain must be positive, got {}",
                self.gain
            )));
        }
        if !(self.font_scale.is_finite() && self.font_scale > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "font scale must be positive, got {}",
                self.font_scale
            )));
        }
        Ok(())
    }
}

impl Rasterizer for ContinuousRamp {
    fn rasterize(&self, buffer: &PixelBuffer) -> Result<RenderedArt, RenderError> {
        ensure_buffer(buffer)?;
        self.validate()?;

        let (width, height) = buffer.dimensions();
        let region = self.layout.region(width, height)?;
        let geometry = GridGeometry::derive(self.columns, region.width, region.height)?;

        let mut cells = Vec::with_capacity(geometry.columns as usize * geometry.rows as usize);
        for row in 0..geometry.rows {
            for column in 0..geometry.columns {
                let (x, y) = geometry.source_pixel(column, row, width, height);
                cells.push(self.glyph_for(buffer.rgb_at(x, y)));
            }
        }

        debug!(
            "continuous ramp: {}x{} cells over {:.1}x{:.1}",
            geometry.columns, geometry.rows, region.width, region.height
        );

        let grid = GlyphGrid::new(geometry.columns, geometry.rows, cells);
        Ok(RenderedArt::Canvas(CanvasArt { grid, geometry, region, font_scale: self.font_scale }))
    }
}

/// Selectable rasterization pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum Strategy {
    ThresholdStride(ThresholdStride),
    ContinuousRamp(ContinuousRamp),
}

impl Rasterizer for Strategy {
    fn rasterize(&self, buffer: &PixelBuffer) -> Result<RenderedArt, RenderError> {
        match self {
            Strategy::ThresholdStride(strategy) => strategy.rasterize(buffer),
            Strategy::ContinuousRamp(strategy) => strategy.rasterize(buffer),
        }
    }
}

impl From<ThresholdStride> for Strategy {
    fn from(strategy: ThresholdStride) -> Self {
        Strategy::ThresholdStride(strategy)
    }
}

impl From<ContinuousRamp> for Strategy {
    fn from(strategy: ContinuousRamp) -> Self {
        Strategy::ContinuousRamp(strategy)
    }
}

fn ensure_buffer(buffer: &PixelBuffer) -> Result<(), RenderError> {
    if buffer.is_empty() {
        return Err(RenderError::InvalidBuffer { width: buffer.width(), height: buffer.height() });
    }
    Ok(())
}
