use std::fmt;
use std::str::FromStr;

use crate::RenderError;

const BLOCKS: [char; 9] = [
    '\u{2588}', '\u{2589}', '\u{258A}', '\u{258B}', '\u{258C}', '\u{258D}', '\u{258E}', '\u{258F}',
    ' ',
];

/// Glyphs ordered from most ink to least ink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Vec<char>,
}

impl GlyphRamp {
    pub fn new(glyphs: impl Into<String>) -> Result<Self, RenderError> {
        let glyphs: Vec<char> = glyphs.into().chars().collect();
        if glyphs.len() < 2 {
            return Err(RenderError::InvalidConfig(
                "glyph ramp must contain at least two glyphs".into(),
            ));
        }
        Ok(Self { glyphs })
    }

    /// Full block down to a one-eighth left block, then blank.
    pub fn blocks() -> Self {
        Self { glyphs: BLOCKS.to_vec() }
    }

    /// Seven-eighths block as ink, space as blank.
    pub fn ink_blank() -> Self {
        Self { glyphs: vec!['\u{2589}', ' '] }
    }

    pub fn shades() -> Self {
        Self { glyphs: vec!['\u{2588}', '\u{2593}', '\u{2592}', '\u{2591}', ' '] }
    }

    pub fn standard() -> Self {
        Self { glyphs: "@%#*+=-:. ".chars().collect() }
    }

    pub fn detailed() -> Self {
        Self {
            glyphs: "$@B%8&WM#*oahkbdpqwmZO0QLCJUYXzcvunxrjft/\\|()1{}[]?-_+~<>i!lI;:,\"^`'. "
                .chars()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    /// Glyph with the most ink.
    pub fn ink(&self) -> char {
        self.glyphs[0]
    }

    /// Glyph with the least ink.
    pub fn blank(&self) -> char {
        self.glyphs[self.glyphs.len() - 1]
    }

    /// Ramp position for a brightness value; out of range values are clamped.
    pub fn index_for(&self, brightness: f64) -> usize {
        let max_index = self.glyphs.len() - 1;
        let index = (brightness.clamp(0.0, 1.0) * max_index as f64).floor();
        (index.max(0.0) as usize).min(max_index)
    }

    pub fn glyph_for(&self, brightness: f64) -> char {
        self.glyphs[self.index_for(brightness)]
    }

    pub fn char_at(&self, index: usize) -> char {
        self.glyphs[index.min(self.glyphs.len() - 1)]
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self::blocks()
    }
}

impl FromStr for GlyphRamp {
    type Err = RenderError;

    fn from_str(glyphs: &str) -> Result<Self, Self::Err> {
        Self::new(glyphs)
    }
}

impl fmt::Display for GlyphRamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.glyphs.iter().try_for_each(|glyph| write!(f, "{glyph}"))
    }
}
