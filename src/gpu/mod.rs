//! wgpu execution backend
//!
//! Everything above this module records typed stages against pooled
//! handles; this module is the only place that touches a device. It
//! provides the texture-allocating [`WgpuBacking`], the built-in WGSL
//! material set, and an executor that replays a [`CommandList`] into a
//! command encoder.
//!
//! [`CommandList`]: crate::command::CommandList

pub mod backing;
pub mod context;
pub mod executor;
pub mod material;

pub use backing::WgpuBacking;
pub use context::GpuContext;
pub use executor::{ExecuteInputs, WgpuExecutor};
pub use material::{builtin_materials, MaterialDesc, MaterialSet};
