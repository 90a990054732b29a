use crate::image_pipeline::buffer::PixelBuffer;
use crate::RenderError;

/// Contrast used by the text variant's pre-pass.
pub const DEFAULT_CONTRAST: f64 = 1.5;

pub fn contrast_factor(contrast: f64) -> f64 {
    (259.0 * (contrast + 255.0)) / (255.0 * (259.0 - contrast))
}

/// Stretch one channel around mid-gray and store it as a clamped byte.
///
/// Rounds to nearest with ties to even, matching a clamped byte array store.
pub fn adjust_channel(value: u8, factor: f64) -> u8 {
    let adjusted = factor * (f64::from(value) - 128.0) + 128.0;
    adjusted.clamp(0.0, 255.0).round_ties_even() as u8
}

/// Contrast pre-pass over every color channel of every pixel.
pub fn apply_contrast(buffer: &PixelBuffer, contrast: f64) -> Result<PixelBuffer, RenderError> {
    if !contrast.is_finite() || !(-255.0..=255.0).contains(&contrast) {
        return Err(RenderError::InvalidConfig(format!(
            "contrast {contrast} outside [-255, 255]"
        )));
    }

    if contrast == 0.0 {
        return Ok(buffer.clone());
    }

    let factor = contrast_factor(contrast);
    Ok(buffer.map_rgb(|channel| adjust_channel(channel, factor)))
}

/// Mean of the three color channels, in byte units.
pub fn mean_channel(rgb: [u8; 3]) -> f64 {
    (f64::from(rgb[0]) + f64::from(rgb[1]) + f64::from(rgb[2])) / 3.0
}

/// Normalized brightness scaled by `gain`. Not clamped.
pub fn brightness(rgb: [u8; 3], gain: f64) -> f64 {
    (f64::from(rgb[0]) + f64::from(rgb[1]) + f64::from(rgb[2])) / (3.0 * 255.0) * gain
}
