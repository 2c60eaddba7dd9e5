//! Depth and height fog
//!
//! Exponential falloff fog over two independent axes: camera distance and
//! world height. The blend policy lives in the fog material; this stage
//! binds the named parameters and sequences the blits. An optional soft
//! pass renders the raw fog term to scratch, runs it through the Kawase
//! chain and composites the blurred contribution with a second material.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::binding::{ParamValue, TextureBinding};
use crate::command::ImageRef;
use crate::core::error::Error;
use crate::core::types::TargetFormat;
use crate::effects::blur::record_blur_chain;
use crate::frame::FrameContext;
use crate::pipeline::{Effect, InputRequirements, RecordCtx};
use crate::target::descriptor::TargetDescriptor;
use crate::target::pingpong::PingPongPair;

pub const MATERIAL: &str = "depth_fog";
pub const COMPOSITE_MATERIAL: &str = "fog_composite";

/// Blurred fog contribution sampled by the composite material
pub const BLURRED_TEXTURE: &str = "fog_blurred";

pub const COLOR: &str = "fog_color";
pub const DEPTH_DENSITY: &str = "depth_density";
pub const DEPTH_START: &str = "depth_start";
pub const DEPTH_END: &str = "depth_end";
pub const DEPTH_FALLOFF: &str = "depth_falloff";
pub const HEIGHT_DENSITY: &str = "height_density";
pub const HEIGHT_START: &str = "height_start";
pub const HEIGHT_END: &str = "height_end";
pub const HEIGHT_FALLOFF: &str = "height_falloff";

/// One fog axis: density over [start, end] with an exponential falloff
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FogAxis {
    /// Contribution weight, clamped to [0, 1]
    pub density: f32,
    pub start: f32,
    pub end: f32,
    /// Falloff exponent, clamped to [1, 4]
    pub falloff: f32,
}

impl FogAxis {
    pub fn depth_default() -> Self {
        Self {
            density: 0.0,
            start: 5.0,
            end: 100.0,
            falloff: 2.0,
        }
    }

    pub fn height_default() -> Self {
        Self {
            density: 0.0,
            start: 0.0,
            end: 15.0,
            falloff: 2.0,
        }
    }
}

/// Soft-pass tuning: blur applied to the fog contribution
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SoftFogSettings {
    pub blur_passes: u32,
    pub downsample: u32,
}

impl Default for SoftFogSettings {
    fn default() -> Self {
        Self {
            blur_passes: 4,
            downsample: 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FogSettings {
    /// Fog tint, HDR allowed
    pub color: Vec4,
    pub depth: FogAxis,
    pub height: FogAxis,
    /// When set, the fog contribution is blurred before a second
    /// composite blit
    pub soft: Option<SoftFogSettings>,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            depth: FogAxis::depth_default(),
            height: FogAxis::height_default(),
            soft: None,
        }
    }
}

impl FogSettings {
    /// Whether the stage does any work at all this frame
    ///
    /// Checked once per frame, not per pixel: an inactive fog stage must
    /// skip all GPU work.
    pub fn is_active(&self) -> bool {
        self.depth.density + self.height.density > 0.0
    }
}

/// Depth/height fog effect
pub struct DepthFog {
    pub settings: FogSettings,
}

impl DepthFog {
    pub fn new(settings: FogSettings) -> Self {
        Self { settings }
    }

    fn bind_params(&self, ctx: &mut RecordCtx<'_>) {
        let s = &self.settings;
        ctx.cmds.set_global(COLOR, ParamValue::Color(s.color));
        ctx.cmds
            .set_global(DEPTH_DENSITY, s.depth.density.clamp(0.0, 1.0));
        ctx.cmds.set_global(DEPTH_START, s.depth.start);
        ctx.cmds.set_global(DEPTH_END, s.depth.end);
        ctx.cmds
            .set_global(DEPTH_FALLOFF, s.depth.falloff.clamp(1.0, 4.0));
        ctx.cmds
            .set_global(HEIGHT_DENSITY, s.height.density.clamp(0.0, 1.0));
        ctx.cmds.set_global(HEIGHT_START, s.height.start);
        ctx.cmds.set_global(HEIGHT_END, s.height.end);
        ctx.cmds
            .set_global(HEIGHT_FALLOFF, s.height.falloff.clamp(1.0, 4.0));
    }
}

impl Default for DepthFog {
    fn default() -> Self {
        Self::new(FogSettings::default())
    }
}

impl Effect for DepthFog {
    fn name(&self) -> &str {
        "depth_fog"
    }

    fn is_active(&self, _frame: &FrameContext) -> bool {
        self.settings.is_active()
    }

    fn requirements(&self) -> InputRequirements {
        InputRequirements {
            depth: true,
            normals: false,
        }
    }

    fn record(&mut self, frame: &FrameContext, ctx: &mut RecordCtx<'_>) -> Result<(), Error> {
        let Some(material) = ctx.material(MATERIAL) else {
            return Ok(());
        };

        self.bind_params(ctx);

        let full = TargetDescriptor::for_viewport(&frame.viewport, TargetFormat::Rgba16Float);
        let term = ctx.pool.acquire(ctx.backing, "fog_term", full);

        match self.settings.soft {
            None => {
                // sharp path: the fog material composites in one pass,
                // then the result is copied back
                ctx.cmds
                    .blit_with(ImageRef::SourceColor, ImageRef::Scratch(term), material, 0);
                ctx.cmds.blit(ImageRef::Scratch(term), ImageRef::SourceColor);
            }
            Some(soft) => {
                let Some(composite) = ctx.material(COMPOSITE_MATERIAL) else {
                    ctx.pool.release(term);
                    return Ok(());
                };
                let Some(blur) = ctx.material(crate::effects::blur::MATERIAL) else {
                    ctx.pool.release(term);
                    return Ok(());
                };

                // raw fog term only (subpass 1), blurred, then blended
                // back by the composite material
                ctx.cmds
                    .blit_with(ImageRef::SourceColor, ImageRef::Scratch(term), material, 1);

                let low = full.with_downsample(soft.downsample.clamp(1, 4));
                let ping = ctx.pool.acquire(ctx.backing, "fog_blur_ping", low);
                let pong = ctx.pool.acquire(ctx.backing, "fog_blur_pong", low);
                let mut pair = PingPongPair::new(ping, pong);
                let blurred = record_blur_chain(
                    ctx.cmds,
                    blur,
                    ImageRef::Scratch(term),
                    &mut pair,
                    soft.blur_passes,
                );
                ctx.cmds
                    .set_global_texture(BLURRED_TEXTURE, TextureBinding::Scratch(blurred));

                let tmp = ctx.pool.acquire(ctx.backing, "fog_composite_tmp", full);
                ctx.cmds
                    .blit_with(ImageRef::SourceColor, ImageRef::Scratch(tmp), composite, 0);
                ctx.cmds.blit(ImageRef::Scratch(tmp), ImageRef::SourceColor);

                ctx.pool.release(tmp);
                ctx.pool.release(ping);
                ctx.pool.release(pong);
            }
        }

        ctx.pool.release(term);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CameraKind, Viewport};
    use crate::material::MaterialRegistry;
    use crate::material::WarnOnce;
    use crate::target::backing::HeadlessBacking;
    use crate::target::pool::ScratchPool;

    fn frame() -> FrameContext {
        FrameContext::new(CameraKind::Game, Viewport::new(1920, 1080))
    }

    fn registry() -> MaterialRegistry {
        let mut reg = MaterialRegistry::new();
        reg.register(MATERIAL);
        reg.register(COMPOSITE_MATERIAL);
        reg.register(crate::effects::blur::MATERIAL);
        reg
    }

    fn record(fog: &mut DepthFog) -> (crate::command::CommandList, ScratchPool, HeadlessBacking) {
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();
        let reg = registry();
        let mut warn = WarnOnce::new();
        let mut cmds = crate::command::CommandList::new();
        pool.begin_frame();
        {
            let mut ctx = RecordCtx {
                pool: &mut pool,
                backing: &mut backing,
                materials: &reg,
                warn_once: &mut warn,
                cmds: &mut cmds,
            };
            fog.record(&frame(), &mut ctx).unwrap();
        }
        (cmds, pool, backing)
    }

    #[test]
    fn test_inactive_fog_is_skipped_entirely() {
        let fog = DepthFog::default();
        // both densities default to zero
        assert!(!fog.is_active(&frame()));
    }

    #[test]
    fn test_active_when_either_axis_has_density() {
        let mut fog = DepthFog::default();
        fog.settings.height.density = 0.2;
        assert!(fog.is_active(&frame()));
        fog.settings.height.density = 0.0;
        fog.settings.depth.density = 0.1;
        assert!(fog.is_active(&frame()));
    }

    #[test]
    fn test_sharp_path_is_two_blits() {
        let mut fog = DepthFog::default();
        fog.settings.depth.density = 0.5;
        let (cmds, pool, _) = record(&mut fog);
        assert_eq!(cmds.blit_count(), 2);
        assert_eq!(pool.live_acquired(), 0);
    }

    #[test]
    fn test_soft_path_blurs_then_composites() {
        let mut fog = DepthFog::default();
        fog.settings.depth.density = 0.5;
        fog.settings.soft = Some(SoftFogSettings {
            blur_passes: 3,
            downsample: 2,
        });
        let (cmds, pool, _) = record(&mut fog);
        // raw term + 3 blur taps + composite + copy back
        assert_eq!(cmds.blit_count(), 6);
        assert_eq!(pool.live_acquired(), 0);
        assert!(cmds.stages().iter().any(|s| matches!(
            s,
            crate::command::PassStage::SetGlobalTexture { name, .. } if name == BLURRED_TEXTURE
        )));
    }

    #[test]
    fn test_tint_binds_as_a_color_value() {
        let mut fog = DepthFog::default();
        fog.settings.depth.density = 0.5;
        fog.settings.color = Vec4::new(0.4, 0.5, 0.6, 1.0);
        let (cmds, _, _) = record(&mut fog);
        let tint = cmds.stages().iter().find_map(|s| match s {
            crate::command::PassStage::SetGlobal { name, value } if name == COLOR => {
                Some(value.clone())
            }
            _ => None,
        });
        assert_eq!(
            tint,
            Some(ParamValue::Color(Vec4::new(0.4, 0.5, 0.6, 1.0)))
        );
    }

    #[test]
    fn test_falloff_is_clamped_into_range() {
        let mut fog = DepthFog::default();
        fog.settings.depth.density = 2.0;
        fog.settings.depth.falloff = 9.0;
        let (cmds, _, _) = record(&mut fog);
        let mut depth_density = None;
        let mut depth_falloff = None;
        for s in cmds.stages() {
            if let crate::command::PassStage::SetGlobal { name, value } = s {
                if name == DEPTH_DENSITY {
                    depth_density = value.as_float();
                } else if name == DEPTH_FALLOFF {
                    depth_falloff = value.as_float();
                }
            }
        }
        assert_eq!(depth_density, Some(1.0));
        assert_eq!(depth_falloff, Some(4.0));
    }
}
