mod ascii;
mod canvas;
mod geometry;
mod image_pipeline;
mod session;

use std::path::{Path, PathBuf};

pub use ascii::{
    grid::{CanvasArt, DrawInstruction, GlyphGrid, RenderedArt},
    ramp::GlyphRamp,
    strategy::{
        CanvasLayout, ContinuousRamp, Rasterizer, Strategy, ThresholdStride, DEFAULT_COLUMNS,
    },
};
pub use canvas::{
    parse_hex_color, supports_glyph, Canvas, GlyphMetrics, DEFAULT_BACKGROUND,
    DEFAULT_EXPORT_NAME, DEFAULT_INK,
};
pub use geometry::{aspect_fit, FitRect, GridGeometry, CELL_HEIGHT_RATIO, DEFAULT_FONT_SCALE};
pub use image_pipeline::{
    adjust::{apply_contrast, brightness, contrast_factor, mean_channel, DEFAULT_CONTRAST},
    buffer::PixelBuffer,
    loader::{decode_bytes, decode_path, ImageSource, SampleCatalog},
    resize::{
        center_crop_to_square, fit_within, resize_exact, resize_square, Preprocess,
        DEFAULT_CROP_SIZE, DEFAULT_FIT_BOUND,
    },
};
pub use session::{
    DecodeCompletion, Generation, Loader, RenderContext, Session, SessionEvent, SessionState,
    Transition, PLACEHOLDER_MESSAGE,
};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("decoded image has no pixels")]
    EmptyImage,
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown sample image `{0}`")]
    UnknownSample(String),
    #[error("pixel data holds {actual} bytes, expected {width}x{height}x4")]
    BufferLength { width: u32, height: u32, actual: usize },
    #[error("cannot rasterize a {width}x{height} pixel buffer")]
    InvalidBuffer { width: u32, height: u32 },
    #[error("invalid render configuration: {0}")]
    InvalidConfig(String),
    #[error("glyph {0:?} cannot be drawn on a canvas")]
    UnsupportedGlyph(char),
    #[error("failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),
}

impl RenderError {
    /// Failures caused by the input image rather than by the caller.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            RenderError::Decode(_)
                | RenderError::EmptyImage
                | RenderError::Io { .. }
                | RenderError::UnknownSample(_)
        )
    }
}

/// Pre-processing plus rasterization strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphRenderer {
    pub preprocess: Preprocess,
    pub strategy: Strategy,
}

impl GlyphRenderer {
    pub fn new(preprocess: Preprocess, strategy: impl Into<Strategy>) -> Self {
        Self { preprocess, strategy: strategy.into() }
    }

    /// Fit into 800x800, contrast pass, ink/blank threshold every fourth pixel.
    pub fn text() -> Self {
        Self::new(Preprocess::FitWithin(DEFAULT_FIT_BOUND), ThresholdStride::default())
    }

    /// Square crop resized to 1024, continuous ramp over a `size x size` canvas.
    pub fn canvas(size: u32) -> Self {
        let size = f64::from(size);
        Self::new(
            Preprocess::CropSquare(DEFAULT_CROP_SIZE),
            ContinuousRamp::new(DEFAULT_COLUMNS, CanvasLayout::Full { width: size, height: size }),
        )
    }

    /// Continuous ramp over the image's aspect-fit rectangle inside the container.
    pub fn canvas_fit(container_width: u32, container_height: u32) -> Self {
        Self::new(
            Preprocess::None,
            ContinuousRamp::new(
                DEFAULT_COLUMNS,
                CanvasLayout::AspectFit {
                    container_width: f64::from(container_width),
                    container_height: f64::from(container_height),
                },
            ),
        )
    }

    pub fn render_path<P: AsRef<Path>>(&self, path: P) -> Result<RenderedArt, RenderError> {
        self.render_buffer(&decode_path(path.as_ref())?)
    }

    pub fn render_bytes(&self, bytes: &[u8]) -> Result<RenderedArt, RenderError> {
        self.render_buffer(&decode_bytes(bytes)?)
    }

    pub fn render_source(
        &self,
        source: &ImageSource,
        catalog: &SampleCatalog,
    ) -> Result<RenderedArt, RenderError> {
        self.render_buffer(&source.acquire(catalog)?)
    }

    pub fn render_buffer(&self, buffer: &PixelBuffer) -> Result<RenderedArt, RenderError> {
        let prepared = self.prepare(buffer)?;
        self.rasterize(&prepared)
    }

    pub fn prepare(&self, buffer: &PixelBuffer) -> Result<PixelBuffer, RenderError> {
        self.preprocess.apply(buffer)
    }

    /// Rasterize a buffer that has already been through [`GlyphRenderer::prepare`].
    pub fn rasterize(&self, prepared: &PixelBuffer) -> Result<RenderedArt, RenderError> {
        self.strategy.rasterize(prepared)
    }
}

impl Default for GlyphRenderer {
    fn default() -> Self {
        Self::text()
    }
}
