//! Built-in post-processing effects

pub mod blur;
pub mod fog;
pub mod fullscreen;
pub mod outline;
pub mod sharpen;
pub mod volumetric;

pub use blur::{KawaseBlur, KawaseBlurSettings};
pub use fog::{DepthFog, FogAxis, FogSettings, SoftFogSettings};
pub use fullscreen::{Fullscreen, FullscreenSettings};
pub use outline::{Outline, OutlineProfile, OutlineSettings};
pub use sharpen::{Sharpen, SharpenSettings};
pub use volumetric::{
    BilateralBlur, DebugStage, Downsample, EmitterSet, FogVolumeSettings, SunLight,
    VolumetricLighting, VolumetricSettings,
};
