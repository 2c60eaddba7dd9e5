//! Sharpen filter: single out-and-back blit with a kernel-size and
//! intensity knob

use serde::{Deserialize, Serialize};

use crate::command::ImageRef;
use crate::core::error::Error;
use crate::core::types::TargetFormat;
use crate::frame::FrameContext;
use crate::pipeline::{Effect, RecordCtx};
use crate::target::descriptor::TargetDescriptor;

pub const MATERIAL: &str = "sharpen";
pub const SIZE: &str = "sharpen_size";
pub const INTENSITY: &str = "sharpen_intensity";

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SharpenSettings {
    /// Kernel offset in UV units, clamped to [0, 0.001]
    pub size: f32,
    /// Blend weight, clamped to [0, 1]
    pub intensity: f32,
}

impl Default for SharpenSettings {
    fn default() -> Self {
        Self {
            size: 0.0005,
            intensity: 0.5,
        }
    }
}

pub struct Sharpen {
    pub settings: SharpenSettings,
}

impl Sharpen {
    pub fn new(settings: SharpenSettings) -> Self {
        Self { settings }
    }
}

impl Default for Sharpen {
    fn default() -> Self {
        Self::new(SharpenSettings::default())
    }
}

impl Effect for Sharpen {
    fn name(&self) -> &str {
        "sharpen"
    }

    fn is_active(&self, _frame: &FrameContext) -> bool {
        self.settings.intensity > 0.0
    }

    fn record(&mut self, frame: &FrameContext, ctx: &mut RecordCtx<'_>) -> Result<(), Error> {
        let Some(material) = ctx.material(MATERIAL) else {
            return Ok(());
        };

        ctx.cmds
            .set_global(SIZE, self.settings.size.clamp(0.0, 0.001));
        ctx.cmds
            .set_global(INTENSITY, self.settings.intensity.clamp(0.0, 1.0));

        let desc = TargetDescriptor::for_viewport(&frame.viewport, TargetFormat::Rgba8Unorm);
        let tmp = ctx.pool.acquire(ctx.backing, "sharpen_tmp", desc);
        ctx.cmds
            .blit_with(ImageRef::SourceColor, ImageRef::Scratch(tmp), material, 0);
        ctx.cmds.blit(ImageRef::Scratch(tmp), ImageRef::SourceColor);
        ctx.pool.release(tmp);
        Ok(())
    }
}
