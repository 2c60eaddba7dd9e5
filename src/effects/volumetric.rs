//! Volumetric lighting / god rays
//!
//! Downsampled raymarch through scene depth accumulating in-scattered
//! light toward the sun, a separable depth-aware (bilateral) blur at low
//! resolution, then a joint-bilateral upsample and composite at full
//! resolution. Local volumetric emitters contribute through bounded
//! global arrays and an optional masked surface draw; fog volumes add a
//! particle-density pre-pass. Every sub-pass is independently
//! toggleable, and any buffer a disabled pass would have written is
//! bound to a neutral black fallback so dependents never sample stale
//! memory.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::binding::{ParamValue, TextureBinding};
use crate::command::ImageRef;
use crate::core::error::Error;
use crate::core::types::TargetFormat;
use crate::frame::FrameContext;
use crate::pipeline::{Effect, InputRequirements, RecordCtx};
use crate::target::descriptor::TargetDescriptor;

pub const MATERIAL: &str = "volumetric_light";
pub const SURFACE_MATERIAL: &str = "volumetric_surface";
pub const DENSITY_MATERIAL: &str = "fog_density";

/// Blurred scattering buffer, sampled by the composite subpass
pub const SCATTER_TEXTURE: &str = "volumetric_scatter";
/// Downsampled depth, the joint-bilateral guide
pub const LOW_RES_DEPTH_TEXTURE: &str = "low_res_depth";
pub const DENSITY_TEXTURE: &str = "fog_density_texture";
pub const SURFACE_TEXTURE: &str = "volumetric_surface_texture";

pub const STEPS: &str = "vol_steps";
pub const JITTER: &str = "vol_jitter";
pub const MAX_DISTANCE: &str = "vol_max_distance";
pub const INTENSITY: &str = "vol_intensity";
pub const SCATTERING: &str = "vol_scattering";
pub const BLUR_SAMPLES: &str = "vol_blur_samples";
pub const BLUR_AMOUNT: &str = "vol_blur_amount";

pub const SUN_DIRECTION: &str = "sun_direction";
pub const SUN_COLOR: &str = "sun_color";

pub const EMITTER_COUNT: &str = "emitter_count";
pub const EMITTER_POSITIONS: &str = "emitter_positions";
pub const EMITTER_RANGES: &str = "emitter_ranges";
pub const EMITTER_COLORS: &str = "emitter_colors";

/// Material subpasses, in the order the full pipeline runs them
pub const SUBPASS_RAYMARCH: u32 = 0;
pub const SUBPASS_BLUR_X: u32 = 1;
pub const SUBPASS_BLUR_Y: u32 = 2;
pub const SUBPASS_COMPOSITE: u32 = 3;
pub const SUBPASS_DOWNSAMPLE_DEPTH: u32 = 4;

/// Most local emitters bound in one frame
pub const MAX_EMITTERS: usize = 16;

/// Scattering-buffer scale tier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Downsample {
    #[default]
    Off,
    Half,
    Third,
    Quarter,
}

impl Downsample {
    pub fn divisor(self) -> u32 {
        match self {
            Downsample::Off => 1,
            Downsample::Half => 2,
            Downsample::Third => 3,
            Downsample::Quarter => 4,
        }
    }
}

/// Debug view: stop the pipeline after a given point
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugStage {
    /// Raymarch result only
    Raymarch,
    /// Raymarch plus the separable blur
    Blur,
    #[default]
    Full,
}

/// Directional sun feeding the raymarch
///
/// Bound as globals each frame so every material in the frame reads a
/// consistent light.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SunLight {
    pub direction: Vec3,
    pub color: Vec4,
}

impl Default for SunLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, 0.0),
            color: Vec4::ONE,
        }
    }
}

/// Bounded set of local volumetric emitters
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EmitterSet {
    positions: Vec<Vec4>,
    ranges: Vec<f32>,
    colors: Vec<Vec4>,
}

impl EmitterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an emitter; silently ignored past [`MAX_EMITTERS`]
    pub fn push(&mut self, position: Vec3, range: f32, color: Vec4) {
        if self.positions.len() >= MAX_EMITTERS {
            return;
        }
        self.positions.push(position.extend(1.0));
        self.ranges.push(range);
        self.colors.push(color);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.ranges.clear();
        self.colors.clear();
    }
}

/// Fog-volume sub-pass toggles
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct FogVolumeSettings {
    /// Write the particle density buffer
    pub density_pass: bool,
    /// Draw masked volumetric surface geometry
    pub surface_pass: bool,
}

/// Bilateral blur tuning: sample count and spread are independent
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BilateralBlur {
    pub samples: u32,
    pub amount: f32,
}

impl Default for BilateralBlur {
    fn default() -> Self {
        Self {
            samples: 2,
            amount: 4.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VolumetricSettings {
    pub downsample: Downsample,
    pub stage: DebugStage,
    pub intensity: f32,
    /// Henyey-Greenstein anisotropy, negative scatters toward the light
    pub scattering: f32,
    /// Ray samples per pixel, at least 1
    pub steps: u32,
    pub max_distance: f32,
    /// Dither amplitude hiding banding between steps
    pub jitter: f32,
    pub blur: BilateralBlur,
    pub sun: SunLight,
    pub fog_volumes: FogVolumeSettings,
}

impl Default for VolumetricSettings {
    fn default() -> Self {
        Self {
            downsample: Downsample::Off,
            stage: DebugStage::Full,
            intensity: 2.0,
            scattering: -0.25,
            steps: 12,
            max_distance: 50.0,
            jitter: 250.0,
            blur: BilateralBlur::default(),
            sun: SunLight::default(),
            fog_volumes: FogVolumeSettings::default(),
        }
    }
}

/// Volumetric lighting effect
pub struct VolumetricLighting {
    pub settings: VolumetricSettings,
    pub emitters: EmitterSet,
}

impl VolumetricLighting {
    pub fn new(settings: VolumetricSettings) -> Self {
        Self {
            settings,
            emitters: EmitterSet::new(),
        }
    }

    fn bind_params(&self, ctx: &mut RecordCtx<'_>) {
        let s = &self.settings;
        ctx.cmds.set_global(STEPS, s.steps.max(1) as i32);
        ctx.cmds.set_global(JITTER, s.jitter);
        ctx.cmds.set_global(MAX_DISTANCE, s.max_distance);
        ctx.cmds.set_global(INTENSITY, s.intensity);
        ctx.cmds.set_global(SCATTERING, s.scattering);
        ctx.cmds
            .set_global(BLUR_SAMPLES, s.blur.samples.max(1) as i32);
        ctx.cmds.set_global(BLUR_AMOUNT, s.blur.amount);
        ctx.cmds.set_global(SUN_DIRECTION, s.sun.direction);
        ctx.cmds
            .set_global(SUN_COLOR, ParamValue::Color(s.sun.color));

        ctx.cmds
            .set_global(EMITTER_COUNT, self.emitters.len() as i32);
        if !self.emitters.is_empty() {
            ctx.cmds.set_global(
                EMITTER_POSITIONS,
                ParamValue::Vec4Array(self.emitters.positions.clone()),
            );
            ctx.cmds.set_global(
                EMITTER_RANGES,
                ParamValue::FloatArray(self.emitters.ranges.clone()),
            );
            ctx.cmds.set_global(
                EMITTER_COLORS,
                ParamValue::Vec4Array(self.emitters.colors.clone()),
            );
        }
    }
}

impl Default for VolumetricLighting {
    fn default() -> Self {
        Self::new(VolumetricSettings::default())
    }
}

impl Effect for VolumetricLighting {
    fn name(&self) -> &str {
        "volumetric_lighting"
    }

    fn is_active(&self, _frame: &FrameContext) -> bool {
        self.settings.intensity > 0.0
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

        let divisor = self.settings.downsample.divisor();
        let low = TargetDescriptor::for_viewport(&frame.viewport, TargetFormat::R16Float)
            .with_downsample(divisor);
        let full = TargetDescriptor::for_viewport(&frame.viewport, TargetFormat::Rgba16Float);

        let scatter = ctx.pool.acquire(ctx.backing, "vol_scatter", low);
        let blur_tmp = ctx.pool.acquire(ctx.backing, "vol_blur_tmp", low);
        ctx.cmds.clear_target(ImageRef::Scratch(scatter), [0.0; 4]);
        ctx.cmds.clear_target(ImageRef::Scratch(blur_tmp), [0.0; 4]);

        // fog-volume pre-passes run before the main raymarch; a disabled
        // pass leaves its dependent texture on the neutral fallback
        if self.settings.fog_volumes.density_pass {
            match ctx.material(DENSITY_MATERIAL) {
                Some(density_mat) => {
                    let density = ctx.pool.acquire(ctx.backing, "vol_density", low);
                    ctx.cmds.clear_target(ImageRef::Scratch(density), [0.0; 4]);
                    ctx.cmds.blit_with(
                        ImageRef::SourceColor,
                        ImageRef::Scratch(density),
                        density_mat,
                        0,
                    );
                    ctx.cmds
                        .set_global_texture(DENSITY_TEXTURE, TextureBinding::Scratch(density));
                    ctx.pool.release(density);
                }
                None => {
                    ctx.cmds
                        .set_global_texture(DENSITY_TEXTURE, TextureBinding::NeutralBlack);
                }
            }
        } else {
            ctx.cmds
                .set_global_texture(DENSITY_TEXTURE, TextureBinding::NeutralBlack);
        }

        if self.settings.fog_volumes.surface_pass {
            match ctx.material(SURFACE_MATERIAL) {
                Some(surface_mat) => {
                    let surface = ctx.pool.acquire(ctx.backing, "vol_surface", low);
                    ctx.cmds.clear_target(ImageRef::Scratch(surface), [0.0; 4]);
                    ctx.cmds.draw(ImageRef::Scratch(surface), surface_mat, 0);
                    ctx.cmds
                        .set_global_texture(SURFACE_TEXTURE, TextureBinding::Scratch(surface));
                    ctx.pool.release(surface);
                }
                None => {
                    ctx.cmds
                        .set_global_texture(SURFACE_TEXTURE, TextureBinding::NeutralBlack);
                }
            }
        } else {
            ctx.cmds
                .set_global_texture(SURFACE_TEXTURE, TextureBinding::NeutralBlack);
        }

        match self.settings.stage {
            DebugStage::Raymarch => {
                ctx.cmds.blit_with(
                    ImageRef::SourceColor,
                    ImageRef::Scratch(scatter),
                    material,
                    SUBPASS_RAYMARCH,
                );
                ctx.cmds
                    .blit(ImageRef::Scratch(scatter), ImageRef::SourceColor);
            }
            DebugStage::Blur => {
                ctx.cmds.blit_with(
                    ImageRef::SourceColor,
                    ImageRef::Scratch(scatter),
                    material,
                    SUBPASS_RAYMARCH,
                );
                ctx.cmds.blit_with(
                    ImageRef::Scratch(scatter),
                    ImageRef::Scratch(blur_tmp),
                    material,
                    SUBPASS_BLUR_X,
                );
                ctx.cmds.blit_with(
                    ImageRef::Scratch(blur_tmp),
                    ImageRef::SourceColor,
                    material,
                    SUBPASS_BLUR_Y,
                );
            }
            DebugStage::Full => {
                let low_depth = ctx.pool.acquire(ctx.backing, "vol_low_depth", low);
                let composite_tmp = ctx.pool.acquire(ctx.backing, "vol_composite_tmp", full);
                ctx.cmds
                    .clear_target(ImageRef::Scratch(composite_tmp), [0.0; 4]);

                // (1) raymarch into the low-res scattering buffer
                ctx.cmds.blit_with(
                    ImageRef::SourceColor,
                    ImageRef::Scratch(scatter),
                    material,
                    SUBPASS_RAYMARCH,
                );
                // (2)+(3) separable bilateral blur, Y reads X's output
                ctx.cmds.blit_with(
                    ImageRef::Scratch(scatter),
                    ImageRef::Scratch(blur_tmp),
                    material,
                    SUBPASS_BLUR_X,
                );
                ctx.cmds.blit_with(
                    ImageRef::Scratch(blur_tmp),
                    ImageRef::Scratch(scatter),
                    material,
                    SUBPASS_BLUR_Y,
                );
                ctx.cmds
                    .set_global_texture(SCATTER_TEXTURE, TextureBinding::Scratch(scatter));
                // (4) depth downsample guides the joint-bilateral upsample
                ctx.cmds.blit_with(
                    ImageRef::SourceColor,
                    ImageRef::Scratch(low_depth),
                    material,
                    SUBPASS_DOWNSAMPLE_DEPTH,
                );
                ctx.cmds.set_global_texture(
                    LOW_RES_DEPTH_TEXTURE,
                    TextureBinding::Scratch(low_depth),
                );
                // (5) upsample + composite at full resolution, copy back
                ctx.cmds.blit_with(
                    ImageRef::SourceColor,
                    ImageRef::Scratch(composite_tmp),
                    material,
                    SUBPASS_COMPOSITE,
                );
                ctx.cmds
                    .blit(ImageRef::Scratch(composite_tmp), ImageRef::SourceColor);

                ctx.pool.release(low_depth);
                ctx.pool.release(composite_tmp);
            }
        }

        ctx.pool.release(scatter);
        ctx.pool.release(blur_tmp);
        Ok(())
    }
}
