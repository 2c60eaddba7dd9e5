//! Haze - engine-agnostic full-screen post-processing pipeline
//!
//! Effects record typed pass stages (blits, masked draws, global parameter
//! and texture binds) into a [`command::CommandList`] against a
//! [`target::ScratchPool`] of reusable off-screen targets. The host drives
//! three lifecycle calls per camera per frame - `begin_frame`, `run`,
//! `end_frame` - and hands the recorded list to a backend such as
//! [`gpu::WgpuExecutor`] for submission.

pub mod core;
pub mod binding;
pub mod target;
pub mod command;
pub mod material;
pub mod frame;
pub mod pipeline;
pub mod effects;
pub mod gpu;
