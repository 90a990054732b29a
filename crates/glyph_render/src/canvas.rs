//! In-memory drawing surface for canvas-style glyph art.
//!
//! Block elements (U+2580..U+259F) are painted as filled rectangles in the
//! glyph's em box, so no font is needed. Any glyph outside that range other
//! than a space is rejected before painting starts.

use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, Rgba, RgbaImage};
use log::{debug, info};

use crate::ascii::grid::{DrawInstruction, RenderedArt};
use crate::RenderError;

pub const DEFAULT_BACKGROUND: [u8; 4] = [0xB9, 0xBF, 0xC8, 0xFF];
pub const DEFAULT_INK: [u8; 4] = [0x00, 0x00, 0x00, 0xFF];

/// File name used by the export action.
pub const DEFAULT_EXPORT_NAME: &str = "image.png";

/// Glyph box size relative to the font size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphMetrics {
    pub advance: f64,
    pub height: f64,
}

impl Default for GlyphMetrics {
    fn default() -> Self {
        Self { advance: 0.6, height: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    Blank,
    /// Rectangle in eighths of the glyph box: left, top, right, bottom.
    Eighths(u8, u8, u8, u8),
    /// Bit 0 upper left, bit 1 upper right, bit 2 lower left, bit 3 lower right.
    Quadrants(u8),
    Shade(Shade),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shade {
    Light,
    Medium,
    Dark,
}

fn shape_of(glyph: char) -> Option<Shape> {
    let shape = match glyph {
        ' ' => Shape::Blank,
        '\u{2580}' => Shape::Eighths(0, 0, 8, 4),
        '\u{2581}'..='\u{2587}' => {
            let filled = glyph as u32 - 0x2580;
            Shape::Eighths(0, 8 - filled as u8, 8, 8)
        },
        '\u{2588}'..='\u{258F}' => {
            let filled = 8 - (glyph as u32 - 0x2588);
            Shape::Eighths(0, 0, filled as u8, 8)
        },
        '\u{2590}' => Shape::Eighths(4, 0, 8, 8),
        '\u{2591}' => Shape::Shade(Shade::Light),
        '\u{2592}' => Shape::Shade(Shade::Medium),
        '\u{2593}' => Shape::Shade(Shade::Dark),
        '\u{2594}' => Shape::Eighths(0, 0, 8, 1),
        '\u{2595}' => Shape::Eighths(7, 0, 8, 8),
        '\u{2596}' => Shape::Quadrants(0b0100),
        '\u{2597}' => Shape::Quadrants(0b1000),
        '\u{2598}' => Shape::Quadrants(0b0001),
        '\u{2599}' => Shape::Quadrants(0b1101),
        '\u{259A}' => Shape::Quadrants(0b1001),
        '\u{259B}' => Shape::Quadrants(0b0111),
        '\u{259C}' => Shape::Quadrants(0b1011),
        '\u{259D}' => Shape::Quadrants(0b0010),
        '\u{259E}' => Shape::Quadrants(0b0110),
        '\u{259F}' => Shape::Quadrants(0b1110),
        _ => return None,
    };
    Some(shape)
}

/// Whether [`Canvas::draw`] can paint `glyph`.
pub fn supports_glyph(glyph: char) -> bool {
    shape_of(glyph).is_some()
}

/// Parse `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(value: &str) -> Result<[u8; 4], RenderError> {
    let invalid = || RenderError::InvalidConfig(format!("invalid color `{value}`"));
    let hex = value.strip_prefix('#').ok_or_else(invalid)?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(invalid());
    }

    let mut rgba = [0xFF; 4];
    for (slot, chunk) in rgba.iter_mut().zip(hex.as_bytes().chunks(2)) {
        let digits = std::str::from_utf8(chunk).map_err(|_| invalid())?;
        *slot = u8::from_str_radix(digits, 16).map_err(|_| invalid())?;
    }
    Ok(rgba)
}

#[derive(Clone, Debug)]
pub struct Canvas {
    pixels: RgbaImage,
    background: Rgba<u8>,
    ink: Rgba<u8>,
    metrics: GlyphMetrics,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "canvas size {width}x{height} must be positive"
            )));
        }

        let background = Rgba(DEFAULT_BACKGROUND);
        Ok(Self {
            pixels: RgbaImage::from_pixel(width, height, background),
            background,
            ink: Rgba(DEFAULT_INK),
            metrics: GlyphMetrics::default(),
        })
    }

    pub fn with_colors(mut self, background: [u8; 4], ink: [u8; 4]) -> Self {
        self.background = Rgba(background);
        self.ink = Rgba(ink);
        self.clear();
        self
    }

    pub fn with_metrics(mut self, metrics: GlyphMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn clear(&mut self) {
        let background = self.background;
        self.pixels.pixels_mut().for_each(|pixel| *pixel = background);
    }

    /// Clear to the background color and paint every draw instruction.
    ///
    /// Nothing is painted if any glyph is unsupported.
    pub fn draw(&mut self, art: &RenderedArt) -> Result<(), RenderError> {
        let RenderedArt::Canvas(canvas_art) = art else {
            return Err(RenderError::InvalidConfig("text art has no canvas placement".into()));
        };

        if let Some(&glyph) = canvas_art.grid.cells.iter().find(|&&glyph| !supports_glyph(glyph)) {
            return Err(RenderError::UnsupportedGlyph(glyph));
        }

        self.clear();
        let mut painted = 0usize;
        for instruction in canvas_art.instructions() {
            if self.paint(&instruction) {
                painted += 1;
            }
        }

        debug!("painted {painted} glyphs on {}x{} canvas", self.width(), self.height());
        Ok(())
    }

    /// Returns whether the glyph put any ink down.
    fn paint(&mut self, instruction: &DrawInstruction) -> bool {
        let Some(shape) = shape_of(instruction.glyph) else {
            return false;
        };

        let box_width = instruction.font_size * self.metrics.advance;
        let box_height = instruction.font_size * self.metrics.height;
        let rect = |left: u8, top: u8, right: u8, bottom: u8| {
            let fraction = |value: u8| f64::from(value) / 8.0;
            (
                instruction.x + box_width * fraction(left),
                instruction.y + box_height * fraction(top),
                instruction.x + box_width * fraction(right),
                instruction.y + box_height * fraction(bottom),
            )
        };

        match shape {
            Shape::Blank => false,
            Shape::Eighths(left, top, right, bottom) => {
                self.fill(rect(left, top, right, bottom), |_, _| true)
            },
            Shape::Quadrants(mask) => {
                let quadrants = [(0, 0, 4, 4), (4, 0, 8, 4), (0, 4, 4, 8), (4, 4, 8, 8)];
                let mut inked = false;
                for (bit, &(left, top, right, bottom)) in quadrants.iter().enumerate() {
                    if mask & (1 << bit) != 0 {
                        inked |= self.fill(rect(left, top, right, bottom), |_, _| true);
                    }
                }
                inked
            },
            Shape::Shade(shade) => self.fill(rect(0, 0, 8, 8), move |x, y| match shade {
                Shade::Light => (x + y) % 4 == 0,
                Shade::Medium => (x + y) % 2 == 0,
                Shade::Dark => (x + y) % 4 != 0,
            }),
        }
    }

    fn fill<F>(&mut self, (left, top, right, bottom): (f64, f64, f64, f64), pattern: F) -> bool
    where
        F: Fn(u32, u32) -> bool,
    {
        let clamp_x = |value: f64| value.round().clamp(0.0, f64::from(self.width())) as u32;
        let clamp_y = |value: f64| value.round().clamp(0.0, f64::from(self.height())) as u32;
        let (x0, x1) = (clamp_x(left), clamp_x(right));
        let (y0, y1) = (clamp_y(top), clamp_y(bottom));

        let mut inked = false;
        for y in y0..y1 {
            for x in x0..x1 {
                if pattern(x, y) {
                    self.pixels.put_pixel(x, y, self.ink);
                    inked = true;
                }
            }
        }
        inked
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(self.pixels.as_raw(), self.width(), self.height(), ColorType::Rgba8)
            .map_err(RenderError::Encode)?;
        Ok(bytes)
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let path = path.as_ref();
        self.pixels.save_with_format(path, ImageFormat::Png).map_err(RenderError::Encode)?;
        info!("exported {}x{} canvas to {}", self.width(), self.height(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ascii::grid::{CanvasArt, GlyphGrid};
    use crate::geometry::{FitRect, GridGeometry};

    fn single_glyph(glyph: char, size: u32) -> RenderedArt {
        // One column and two rows over a square region; font scale 1 / 0.6 makes
        // the glyph box exactly one cell wide.
        let geometry = GridGeometry::derive(1, f64::from(size), f64::from(size) * 4.0).unwrap();
        assert_eq!(geometry.rows, 2);
        RenderedArt::Canvas(CanvasArt {
            grid: GlyphGrid::new(1, 2, vec![glyph, ' ']),
            geometry,
            region: FitRect::full(f64::from(size), f64::from(size) * 4.0),
            font_scale: 1.0 / 0.6,
        })
    }

    fn ink_count(canvas: &Canvas) -> usize {
        canvas.image().pixels().filter(|pixel| pixel.0 == DEFAULT_INK).count()
    }

    #[test]
    fn shapes_cover_block_elements() {
        assert_eq!(shape_of('\u{2588}'), Some(Shape::Eighths(0, 0, 8, 8)));
        assert_eq!(shape_of('\u{2589}'), Some(Shape::Eighths(0, 0, 7, 8)));
        assert_eq!(shape_of('\u{258F}'), Some(Shape::Eighths(0, 0, 1, 8)));
        assert_eq!(shape_of('\u{2581}'), Some(Shape::Eighths(0, 7, 8, 8)));
        assert_eq!(shape_of('\u{2587}'), Some(Shape::Eighths(0, 1, 8, 8)));
        assert!((0x2580..=0x259F).all(|code| supports_glyph(char::from_u32(code).unwrap())));
        assert!(!supports_glyph('@'));
    }

    #[test]
    fn full_block_fills_its_box() {
        let mut canvas = Canvas::new(8, 32).unwrap();
        canvas.draw(&single_glyph('\u{2588}', 8)).unwrap();
        // Box is 8 wide and 8 * 1 / 0.6 * 1.0 tall, rounded to 13 rows.
        assert_eq!(ink_count(&canvas), 8 * 13);
        assert_eq!(canvas.image().get_pixel(0, 0).0, DEFAULT_INK);
        assert_eq!(canvas.image().get_pixel(0, 31).0, DEFAULT_BACKGROUND);
    }

    #[test]
    fn left_eighths_shrink_horizontally() {
        let mut full = Canvas::new(8, 32).unwrap();
        full.draw(&single_glyph('\u{2588}', 8)).unwrap();
        let mut half = Canvas::new(8, 32).unwrap();
        half.draw(&single_glyph('\u{258C}', 8)).unwrap();

        assert_eq!(ink_count(&half) * 2, ink_count(&full));
        assert_eq!(half.image().get_pixel(3, 0).0, DEFAULT_INK);
        assert_eq!(half.image().get_pixel(4, 0).0, DEFAULT_BACKGROUND);
    }

    #[test]
    fn blank_and_text_art() {
        let mut canvas = Canvas::new(8, 32).unwrap();
        canvas.draw(&single_glyph(' ', 8)).unwrap();
        assert_eq!(ink_count(&canvas), 0);

        let text = RenderedArt::Text(GlyphGrid::new(1, 1, vec!['#']));
        assert!(matches!(canvas.draw(&text), Err(RenderError::InvalidConfig(_))));
    }

    #[test]
    fn unsupported_glyphs_leave_canvas_untouched() {
        let mut canvas = Canvas::new(8, 32).unwrap();
        canvas.draw(&single_glyph('\u{2588}', 8)).unwrap();
        let before = canvas.image().clone();

        let err = canvas.draw(&single_glyph('@', 8)).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedGlyph('@')));
        assert_eq!(canvas.image(), &before);
    }

    #[test]
    fn glyphs_are_clipped_to_canvas() {
        let mut canvas = Canvas::new(4, 4).unwrap();
        canvas.draw(&single_glyph('\u{2588}', 8)).unwrap();
        assert_eq!(ink_count(&canvas), 16);
    }

    #[test]
    fn colors_parse_from_hex() {
        assert_eq!(parse_hex_color("#B9BFC8").unwrap(), DEFAULT_BACKGROUND);
        assert_eq!(parse_hex_color("#00000080").unwrap(), [0, 0, 0, 0x80]);
        assert!(parse_hex_color("B9BFC8").is_err());
        assert!(parse_hex_color("#B9BFC").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
    }

    #[test]
    fn png_export_decodes_back() {
        let mut canvas = Canvas::new(8, 32).unwrap();
        canvas.draw(&single_glyph('\u{2588}', 8)).unwrap();
        let bytes = canvas.encode_png().unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(&decoded, canvas.image());
    }
}
