//! Per-frame immutable inputs supplied by the host

use crate::binding::BindingTable;
use crate::core::types::{CameraKind, Viewport};

/// Global texture name the host's linearized depth copy is bound under
pub const DEPTH_TEXTURE: &str = "scene_depth";
/// Global texture name the host's view-space normals are bound under
pub const NORMALS_TEXTURE: &str = "scene_normals";

/// Auxiliary buffers the host can provide this frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuxInputs {
    pub depth: bool,
    pub normals: bool,
}

/// Per-frame inputs: camera, viewport, declared auxiliary buffers and a
/// table of caller-supplied named parameters
///
/// Owned by the caller; read-only to the pipeline.
#[derive(Clone, Debug)]
pub struct FrameContext {
    pub camera: CameraKind,
    pub viewport: Viewport,
    pub inputs: AuxInputs,
    /// Caller-supplied globals (light directions, tints, ...)
    pub globals: BindingTable,
}

impl FrameContext {
    pub fn new(camera: CameraKind, viewport: Viewport) -> Self {
        Self {
            camera,
            viewport,
            inputs: AuxInputs::default(),
            globals: BindingTable::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: AuxInputs) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_globals(mut self, globals: BindingTable) -> Self {
        self.globals = globals;
        self
    }
}
