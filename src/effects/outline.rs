//! Edge detection outline
//!
//! Single full-screen blit through a Sobel kernel over the depth and
//! normal buffers. Two profiles share the stage: the depth+normals
//! profile with per-buffer sensitivities, and a depth-only profile with
//! the thickness/power contract of the older Sobel variant.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::binding::ParamValue;
use crate::command::ImageRef;
use crate::core::error::Error;
use crate::core::types::TargetFormat;
use crate::frame::FrameContext;
use crate::pipeline::{Effect, InputRequirements, RecordCtx};
use crate::target::descriptor::TargetDescriptor;

pub const MATERIAL: &str = "outline";

pub const THICKNESS: &str = "outline_thickness";
pub const DEPTH_SENSITIVITY: &str = "outline_depth_sensitivity";
pub const NORMALS_SENSITIVITY: &str = "outline_normals_sensitivity";
pub const COLOR: &str = "outline_color";
/// Capability switch: show the raw edge mask instead of the composite
pub const PREVIEW: &str = "outline_preview";
pub const LINE_THICKNESS: &str = "outline_line_thickness";
pub const POWER: &str = "outline_power";

/// Which discontinuity sources the Sobel kernel samples
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlineProfile {
    /// Depth + normals with independent sensitivities
    #[default]
    DepthNormals,
    /// Depth-only Sobel with the thickness/power contract
    DepthOnly,
}

impl OutlineProfile {
    fn subpass(self) -> u32 {
        match self {
            OutlineProfile::DepthNormals => 0,
            OutlineProfile::DepthOnly => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OutlineSettings {
    pub profile: OutlineProfile,
    pub thickness: f32,
    pub depth_sensitivity: f32,
    pub normals_sensitivity: f32,
    pub color: Vec4,
    /// Debug: show the raw edge mask
    pub preview: bool,
    /// Depth-only profile: UV-space line thickness, clamped to
    /// [0.00005, 0.0025]
    pub line_thickness: f32,
    /// Depth-only profile: edge contrast exponent, clamped to [50, 10000]
    pub power: f32,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            profile: OutlineProfile::DepthNormals,
            thickness: 2.0,
            depth_sensitivity: 1.0,
            normals_sensitivity: 1.0,
            color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            preview: false,
            line_thickness: 0.001,
            power: 50.0,
        }
    }
}

pub struct Outline {
    pub settings: OutlineSettings,
}

impl Outline {
    pub fn new(settings: OutlineSettings) -> Self {
        Self { settings }
    }
}

impl Default for Outline {
    fn default() -> Self {
        Self::new(OutlineSettings::default())
    }
}

impl Effect for Outline {
    fn name(&self) -> &str {
        "outline"
    }

    fn requirements(&self) -> InputRequirements {
        InputRequirements {
            depth: true,
            normals: self.settings.profile == OutlineProfile::DepthNormals,
        }
    }

    fn record(&mut self, frame: &FrameContext, ctx: &mut RecordCtx<'_>) -> Result<(), Error> {
        let Some(material) = ctx.material(MATERIAL) else {
            return Ok(());
        };

        let s = &self.settings;
        ctx.cmds.set_global(THICKNESS, s.thickness);
        ctx.cmds.set_global(DEPTH_SENSITIVITY, s.depth_sensitivity);
        ctx.cmds
            .set_global(NORMALS_SENSITIVITY, s.normals_sensitivity);
        ctx.cmds.set_global(COLOR, ParamValue::Color(s.color));
        ctx.cmds.set_global(PREVIEW, s.preview);
        ctx.cmds
            .set_global(LINE_THICKNESS, s.line_thickness.clamp(0.00005, 0.0025));
        ctx.cmds.set_global(POWER, s.power.clamp(50.0, 10000.0));

        let desc = TargetDescriptor::for_viewport(&frame.viewport, TargetFormat::Rgba8Unorm);
        let tmp = ctx.pool.acquire(ctx.backing, "outline_tmp", desc);
        ctx.cmds.blit_with(
            ImageRef::SourceColor,
            ImageRef::Scratch(tmp),
            material,
            s.profile.subpass(),
        );
        ctx.cmds.blit(ImageRef::Scratch(tmp), ImageRef::SourceColor);
        ctx.pool.release(tmp);
        Ok(())
    }
}
