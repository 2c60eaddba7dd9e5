//! Error types for the haze pipeline
//!
//! Nothing here is fatal to the host: every error degrades to "this visual
//! effect is absent this frame".

use thiserror::Error;

use crate::core::types::CameraKind;

/// Main error type for the pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// A required material, shader or image was not resolved. The owning
    /// effect skips its GPU work for the frame and retries next frame.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// The camera or editor preview resolution is degenerate; allocation
    /// and stage execution are skipped for the frame.
    #[error("invalid viewport: {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    /// The active camera is a type that should not receive post-processing.
    #[error("camera kind {0:?} does not receive post-processing")]
    UnsupportedCamera(CameraKind),

    #[error("GPU error: {0}")]
    Gpu(String),
}
