//! Safe casting between detector pixel coordinates and cloud grid indices

use crate::{Error, Result};

/// Safely convert a pixel coordinate to a grid index
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_usize(value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::InvalidInput(format!("Pixel coordinate {value} is negative")))
}

/// Clamp a pixel coordinate into `[0, max]` and convert it to a grid index
#[must_use]
pub fn i32_clamp_to_usize(value: i32, max: usize) -> usize {
    usize::try_from(value).map_or(0, |v| v.min(max))
}

/// Narrow a world-frame coordinate to cloud precision
///
/// # Errors
///
/// Returns an error if the value is not finite or overflows `f32`
#[allow(clippy::cast_possible_truncation)] // Range checked before narrowing
pub fn f64_to_f32(value: f64) -> Result<f32> {
    if value.is_finite() && value.abs() <= f64::from(f32::MAX) {
        Ok(value as f32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to f32"
        )))
    }
}
