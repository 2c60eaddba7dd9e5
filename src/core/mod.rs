//! Core types, error taxonomy and logging

pub mod error;
pub mod logging;
pub mod types;

pub use error::Error;
pub use types::{CameraKind, Extent2d, TargetFormat, Viewport};
