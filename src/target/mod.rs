//! Scratch render-target management

pub mod backing;
pub mod descriptor;
pub mod pingpong;
pub mod pool;

pub use backing::{BackingId, HeadlessBacking, TargetBacking};
pub use descriptor::TargetDescriptor;
pub use pingpong::PingPongPair;
pub use pool::{ScratchPool, TargetHandle};
