//! Errors raised by the renderer.

use lumen_core::SceneError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    #[error("Unknown render mode: {0}")]
    UnknownMode(u32),

    #[error("Buffer holds {actual} pixels, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Check that a frame buffer matches the image size.
pub(crate) fn check_len(expected: usize, actual: usize) -> RenderResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(RenderError::BufferSize { expected, actual })
    }
}
