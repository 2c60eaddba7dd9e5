//! Typed pass stages recorded by effects and executed by a backend
//!
//! Stages execute strictly in declaration order within a frame; effects
//! record in registration order, which makes last-writer-wins global
//! binds deterministic.

use crate::binding::{ParamValue, TextureBinding};
use crate::target::pool::TargetHandle;

/// Identifier of a resolved material (compiled GPU program)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// An image a stage reads from or writes to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageRef {
    /// The camera color target supplied by the host
    SourceColor,
    /// A scratch target acquired from the pool this frame
    Scratch(TargetHandle),
}

/// One typed step in the pipeline
#[derive(Clone, Debug, PartialEq)]
pub enum PassStage {
    /// Full-screen blit from `src` to `dst`, optionally through a
    /// material subpass; `None` is a plain copy
    Blit {
        src: ImageRef,
        dst: ImageRef,
        material: Option<(MaterialId, u32)>,
    },
    /// Masked geometry draw into `dst`
    Draw {
        dst: ImageRef,
        material: MaterialId,
        subpass: u32,
    },
    /// Bind a named global parameter for subsequent stages
    SetGlobal { name: String, value: ParamValue },
    /// Bind a named global texture for subsequent stages
    SetGlobalTexture {
        name: String,
        binding: TextureBinding,
    },
    /// Clear `dst` to a constant color
    Clear { dst: ImageRef, color: [f32; 4] },
}

/// Ordered list of pass stages for one frame
#[derive(Clone, Debug, Default)]
pub struct CommandList {
    stages: Vec<PassStage>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain copy blit
    pub fn blit(&mut self, src: ImageRef, dst: ImageRef) {
        self.stages.push(PassStage::Blit {
            src,
            dst,
            material: None,
        });
    }

    /// Blit through a material subpass
    pub fn blit_with(&mut self, src: ImageRef, dst: ImageRef, material: MaterialId, subpass: u32) {
        self.stages.push(PassStage::Blit {
            src,
            dst,
            material: Some((material, subpass)),
        });
    }

    pub fn draw(&mut self, dst: ImageRef, material: MaterialId, subpass: u32) {
        self.stages.push(PassStage::Draw {
            dst,
            material,
            subpass,
        });
    }

    pub fn set_global(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.stages.push(PassStage::SetGlobal {
            name: name.to_owned(),
            value: value.into(),
        });
    }

    pub fn set_global_texture(&mut self, name: &str, binding: TextureBinding) {
        self.stages.push(PassStage::SetGlobalTexture {
            name: name.to_owned(),
            binding,
        });
    }

    pub fn clear_target(&mut self, dst: ImageRef, color: [f32; 4]) {
        self.stages.push(PassStage::Clear { dst, color });
    }

    pub fn stages(&self) -> &[PassStage] {
        &self.stages
    }

    pub fn append(&mut self, other: &mut CommandList) {
        self.stages.append(&mut other.stages);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn clear(&mut self) {
        self.stages.clear();
    }

    /// Number of blit stages recorded
    pub fn blit_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| matches!(s, PassStage::Blit { .. }))
            .count()
    }

    /// Number of masked draw stages recorded
    pub fn draw_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| matches!(s, PassStage::Draw { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Extent2d, TargetFormat};
    use crate::target::backing::HeadlessBacking;
    use crate::target::descriptor::TargetDescriptor;
    use crate::target::pool::{ScratchPool, TargetHandle};

    fn scratch_handle() -> TargetHandle {
        let mut pool = ScratchPool::new();
        let mut backing = HeadlessBacking::new();
        pool.begin_frame();
        pool.acquire(
            &mut backing,
            "t",
            TargetDescriptor::new(Extent2d::new(8, 8), TargetFormat::Rgba8Unorm),
        )
    }

    #[test]
    fn test_stages_preserve_declaration_order() {
        let mut cmds = CommandList::new();
        let t = scratch_handle();
        cmds.set_global("blur_offset", 0.5);
        cmds.blit(ImageRef::SourceColor, ImageRef::Scratch(t));
        cmds.blit(ImageRef::Scratch(t), ImageRef::SourceColor);

        assert_eq!(cmds.len(), 3);
        assert!(matches!(cmds.stages()[0], PassStage::SetGlobal { .. }));
        assert_eq!(cmds.blit_count(), 2);
        assert_eq!(cmds.draw_count(), 0);
    }

    #[test]
    fn test_append_moves_stages() {
        let mut a = CommandList::new();
        let mut b = CommandList::new();
        let t = scratch_handle();
        b.blit(ImageRef::SourceColor, ImageRef::Scratch(t));
        b.clear_target(ImageRef::Scratch(t), [0.0; 4]);

        a.append(&mut b);
        assert_eq!(a.len(), 2);
        assert!(b.is_empty());
    }
}
