use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};

use crate::RenderError;

/// Decoded RGBA pixels, row-major, top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Borrowed view used to hand the buffer to `image::imageops`.
pub(crate) type RgbaView<'a> = ImageBuffer<Rgba<u8>, &'a [u8]>;

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(RenderError::BufferLength { width, height, actual: data.len() });
        }

        Ok(Self { width, height, data })
    }

    /// Buffer where every pixel has the same color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let data = rgba.iter().copied().cycle().take(count * 4).collect();
        Self { width, height, data }
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        Self::from_rgba(image.to_rgba8())
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height, data: image.into_raw() }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte offset of the red channel of pixel `(x, y)`.
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Red, green and blue of pixel `(x, y)`. Alpha is ignored.
    ///
    /// Panics when the coordinate lies outside the buffer.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let idx = self.offset(x, y);
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// New buffer with `map` applied to the color channels of every pixel.
    pub fn map_rgb<F>(&self, map: F) -> Self
    where
        F: Fn(u8) -> u8,
    {
        let mut data = self.data.clone();
        for pixel in data.chunks_exact_mut(4) {
            for channel in &mut pixel[..3] {
                *channel = map(*channel);
            }
        }

        Self { width: self.width, height: self.height, data }
    }

    pub(crate) fn view(&self) -> Result<RgbaView<'_>, RenderError> {
        ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())
            .ok_or(RenderError::InvalidBuffer { width: self.width, height: self.height })
    }

    pub fn into_rgba_image(self) -> Result<RgbaImage, RenderError> {
        let (width, height) = (self.width, self.height);
        RgbaImage::from_raw(width, height, self.data)
            .ok_or(RenderError::InvalidBuffer { width, height })
    }
}
