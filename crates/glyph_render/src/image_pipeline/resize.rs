use image::imageops::{self, FilterType};
use log::debug;

use super::buffer::PixelBuffer;
use crate::RenderError;

/// Bound used by the text variant when scaling the source before sampling.
pub const DEFAULT_FIT_BOUND: u32 = 800;

/// Square resolution the canvas variant normalizes every image to.
pub const DEFAULT_CROP_SIZE: u32 = 1024;

const FILTER: FilterType = FilterType::CatmullRom;

/// Pre-processing applied once per decoded image, before rasterization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preprocess {
    /// Hand the decoded buffer through untouched.
    None,
    /// Scale so the image fits a `bound x bound` box, keeping its aspect ratio.
    FitWithin(u32),
    /// Center-crop to a square, then resize to `size x size`.
    CropSquare(u32),
}

impl Preprocess {
    pub fn apply(&self, buffer: &PixelBuffer) -> Result<PixelBuffer, RenderError> {
        match *self {
            Preprocess::None => Ok(buffer.clone()),
            Preprocess::FitWithin(bound) => fit_within(buffer, bound),
            Preprocess::CropSquare(size) => resize_square(&center_crop_to_square(buffer)?, size),
        }
    }
}

pub fn center_crop_to_square(buffer: &PixelBuffer) -> Result<PixelBuffer, RenderError> {
    ensure_not_empty(buffer)?;

    let (width, height) = buffer.dimensions();
    let side = width.min(height);
    if width == height {
        return Ok(buffer.clone());
    }

    let x = (width - side) / 2;
    let y = (height - side) / 2;
    let owned = buffer.clone().into_rgba_image()?;
    let cropped = imageops::crop_imm(&owned, x, y, side, side).to_image();
    debug!("cropped {width}x{height} to {side}x{side} at ({x}, {y})");

    Ok(PixelBuffer::from_rgba(cropped))
}

pub fn resize_square(buffer: &PixelBuffer, size: u32) -> Result<PixelBuffer, RenderError> {
    resize_exact(buffer, size, size)
}

pub fn resize_exact(
    buffer: &PixelBuffer,
    width: u32,
    height: u32,
) -> Result<PixelBuffer, RenderError> {
    ensure_not_empty(buffer)?;
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidConfig(format!("cannot resize to {width}x{height}")));
    }

    if buffer.dimensions() == (width, height) {
        return Ok(buffer.clone());
    }

    let resized = imageops::resize(&buffer.view()?, width, height, FILTER);
    Ok(PixelBuffer::from_rgba(resized))
}

/// Scale the buffer by `min(bound / width, bound / height)`.
///
/// Small images are scaled up as well. Scaled dimensions are truncated, but
/// never below one pixel.
pub fn fit_within(buffer: &PixelBuffer, bound: u32) -> Result<PixelBuffer, RenderError> {
    ensure_not_empty(buffer)?;
    if bound == 0 {
        return Err(RenderError::InvalidConfig("fit bound must be positive".into()));
    }

    let (width, height) = fit_dimensions(buffer.width(), buffer.height(), bound);
    debug!("fitting {}x{} into {bound}: {width}x{height}", buffer.width(), buffer.height());
    resize_exact(buffer, width, height)
}

pub fn fit_dimensions(width: u32, height: u32, bound: u32) -> (u32, u32) {
    let bound = f64::from(bound);
    let scale = (bound / f64::from(width)).min(bound / f64::from(height));
    let scaled = |value: u32| ((f64::from(value) * scale) as u32).max(1);
    (scaled(width), scaled(height))
}

fn ensure_not_empty(buffer: &PixelBuffer) -> Result<(), RenderError> {
    if buffer.is_empty() {
        return Err(RenderError::InvalidBuffer { width: buffer.width(), height: buffer.height() });
    }
    Ok(())
}
