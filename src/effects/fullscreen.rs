//! Generic fullscreen pass
//!
//! Blits the source through a caller-named material subpass and copies
//! the result back. The simplest possible effect, useful for one-off
//! materials that need no scratch topology of their own.

use serde::{Deserialize, Serialize};

use crate::command::ImageRef;
use crate::core::error::Error;
use crate::core::types::TargetFormat;
use crate::frame::FrameContext;
use crate::pipeline::{Effect, RecordCtx};
use crate::target::descriptor::TargetDescriptor;

/// Plain copy material, always registered by the built-in set
pub const DEFAULT_MATERIAL: &str = "blit";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FullscreenSettings {
    /// Material name resolved through the provider
    pub material: String,
    pub subpass: u32,
}

impl Default for FullscreenSettings {
    fn default() -> Self {
        Self {
            material: DEFAULT_MATERIAL.to_owned(),
            subpass: 0,
        }
    }
}

pub struct Fullscreen {
    pub settings: FullscreenSettings,
}

impl Fullscreen {
    pub fn new(settings: FullscreenSettings) -> Self {
        Self { settings }
    }

    pub fn with_material(material: &str) -> Self {
        Self::new(FullscreenSettings {
            material: material.to_owned(),
            subpass: 0,
        })
    }
}

impl Effect for Fullscreen {
    fn name(&self) -> &str {
        "fullscreen"
    }

    fn record(&mut self, frame: &FrameContext, ctx: &mut RecordCtx<'_>) -> Result<(), Error> {
        let Some(material) = ctx.material(&self.settings.material) else {
            return Ok(());
        };

        let desc = TargetDescriptor::for_viewport(&frame.viewport, TargetFormat::Rgba8Unorm);
        let tmp = ctx.pool.acquire(ctx.backing, "fullscreen_tmp", desc);
        ctx.cmds.blit_with(
            ImageRef::SourceColor,
            ImageRef::Scratch(tmp),
            material,
            self.settings.subpass,
        );
        ctx.cmds.blit(ImageRef::Scratch(tmp), ImageRef::SourceColor);
        ctx.pool.release(tmp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CameraKind, Viewport};
    use crate::material::{MaterialRegistry, WarnOnce};
    use crate::target::backing::HeadlessBacking;
    use crate::target::pool::ScratchPool;

    #[test]
    fn test_missing_material_logs_once_and_records_nothing() {
        let reg = MaterialRegistry::new(); // nothing registered
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();
        let mut warn = WarnOnce::new();
        let frame = FrameContext::new(CameraKind::Game, Viewport::new(640, 480));
        let mut fx = Fullscreen::with_material("vignette");

        pool.begin_frame();
        // the reference stays missing for 100 consecutive frames
        for _ in 0..100 {
            let mut cmds = crate::command::CommandList::new();
            let mut ctx = RecordCtx {
                pool: &mut pool,
                backing: &mut backing,
                materials: &reg,
                warn_once: &mut warn,
                cmds: &mut cmds,
            };
            fx.record(&frame, &mut ctx).unwrap();
            assert!(cmds.is_empty());
        }
        assert_eq!(warn.reported(), 1);
        assert_eq!(backing.total_allocations(), 0);
    }

    #[test]
    fn test_resolves_and_blits_when_registered() {
        let mut reg = MaterialRegistry::new();
        reg.register("vignette");
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();
        let mut warn = WarnOnce::new();
        let frame = FrameContext::new(CameraKind::Game, Viewport::new(640, 480));
        let mut fx = Fullscreen::with_material("vignette");

        pool.begin_frame();
        let mut cmds = crate::command::CommandList::new();
        let mut ctx = RecordCtx {
            pool: &mut pool,
            backing: &mut backing,
            materials: &reg,
            warn_once: &mut warn,
            cmds: &mut cmds,
        };
        fx.record(&frame, &mut ctx).unwrap();
        assert_eq!(cmds.blit_count(), 2);
        assert_eq!(pool.live_acquired(), 0);
    }
}
