//! Material descriptions and the built-in WGSL set
//!
//! A material is a WGSL source with one fragment entry point per subpass,
//! a slot table mapping named globals into the shared uniform array, and
//! the aux texture names its fragment stages sample. The executor
//! compiles pipelines from these lazily, one per (subpass, target format)
//! actually used.

use std::collections::HashMap;

use crate::command::MaterialId;
use crate::effects::{blur, fog, fullscreen, outline, sharpen, volumetric};
use crate::material::MaterialProvider;

/// Uniform array length shared by every material, in vec4 slots
pub const GLOBAL_SLOTS: usize = 64;

/// Aux texture bindings available to a material's fragment stages
pub const AUX_TEXTURES: usize = 6;

/// One material: shader source plus its binding contract
#[derive(Clone, Copy, Debug)]
pub struct MaterialDesc {
    pub name: &'static str,
    pub source: &'static str,
    /// Fragment entry point per subpass index
    pub entry_points: &'static [&'static str],
    /// Named globals and the uniform slot they land in; arrays occupy
    /// consecutive slots starting at theirs
    pub params: &'static [(&'static str, u32)],
    /// Global texture names bound to the aux slots, in order
    pub textures: &'static [&'static str],
}

const EMITTER_PARAMS: &[(&str, u32)] = &[
    (volumetric::EMITTER_COUNT, 9),
    (volumetric::EMITTER_POSITIONS, 10),
    (volumetric::EMITTER_RANGES, 26),
    (volumetric::EMITTER_COLORS, 42),
];

/// The materials every built-in effect resolves by name
pub fn builtin_materials() -> Vec<MaterialDesc> {
    vec![
        MaterialDesc {
            name: fullscreen::DEFAULT_MATERIAL,
            source: include_str!("../../shaders/blit.wgsl"),
            entry_points: &["fs_main"],
            params: &[],
            textures: &[],
        },
        MaterialDesc {
            name: blur::MATERIAL,
            source: include_str!("../../shaders/kawase.wgsl"),
            entry_points: &["fs_blur"],
            params: &[(blur::OFFSET, 0)],
            textures: &[],
        },
        MaterialDesc {
            name: fog::MATERIAL,
            source: include_str!("../../shaders/fog.wgsl"),
            entry_points: &["fs_fog", "fs_term"],
            params: &[
                (fog::COLOR, 0),
                (fog::DEPTH_DENSITY, 1),
                (fog::DEPTH_START, 2),
                (fog::DEPTH_END, 3),
                (fog::DEPTH_FALLOFF, 4),
                (fog::HEIGHT_DENSITY, 5),
                (fog::HEIGHT_START, 6),
                (fog::HEIGHT_END, 7),
                (fog::HEIGHT_FALLOFF, 8),
            ],
            textures: &[crate::frame::DEPTH_TEXTURE],
        },
        MaterialDesc {
            name: fog::COMPOSITE_MATERIAL,
            source: include_str!("../../shaders/fog.wgsl"),
            entry_points: &["fs_composite"],
            params: &[(fog::COLOR, 0)],
            textures: &[fog::BLURRED_TEXTURE],
        },
        MaterialDesc {
            name: sharpen::MATERIAL,
            source: include_str!("../../shaders/sharpen.wgsl"),
            entry_points: &["fs_sharpen"],
            params: &[(sharpen::SIZE, 0), (sharpen::INTENSITY, 1)],
            textures: &[],
        },
        MaterialDesc {
            name: outline::MATERIAL,
            source: include_str!("../../shaders/outline.wgsl"),
            entry_points: &["fs_depth_normals", "fs_depth_only"],
            params: &[
                (outline::THICKNESS, 0),
                (outline::DEPTH_SENSITIVITY, 1),
                (outline::NORMALS_SENSITIVITY, 2),
                (outline::COLOR, 3),
                (outline::PREVIEW, 4),
                (outline::LINE_THICKNESS, 5),
                (outline::POWER, 6),
            ],
            textures: &[crate::frame::DEPTH_TEXTURE, crate::frame::NORMALS_TEXTURE],
        },
        MaterialDesc {
            name: volumetric::MATERIAL,
            source: include_str!("../../shaders/volumetric.wgsl"),
            entry_points: &[
                "fs_raymarch",
                "fs_blur_x",
                "fs_blur_y",
                "fs_composite",
                "fs_downsample_depth",
            ],
            params: &[
                (volumetric::STEPS, 0),
                (volumetric::JITTER, 1),
                (volumetric::MAX_DISTANCE, 2),
                (volumetric::INTENSITY, 3),
                (volumetric::SCATTERING, 4),
                (volumetric::BLUR_SAMPLES, 5),
                (volumetric::BLUR_AMOUNT, 6),
                (volumetric::SUN_DIRECTION, 7),
                (volumetric::SUN_COLOR, 8),
                (volumetric::EMITTER_COUNT, 9),
                (volumetric::EMITTER_POSITIONS, 10),
                (volumetric::EMITTER_RANGES, 26),
                (volumetric::EMITTER_COLORS, 42),
            ],
            textures: &[
                volumetric::SCATTER_TEXTURE,
                volumetric::LOW_RES_DEPTH_TEXTURE,
                volumetric::DENSITY_TEXTURE,
                volumetric::SURFACE_TEXTURE,
                crate::frame::DEPTH_TEXTURE,
            ],
        },
        MaterialDesc {
            name: volumetric::DENSITY_MATERIAL,
            source: include_str!("../../shaders/fog_volume.wgsl"),
            entry_points: &["fs_density"],
            params: &[(volumetric::MAX_DISTANCE, 2)],
            textures: &[crate::frame::DEPTH_TEXTURE],
        },
        MaterialDesc {
            name: volumetric::SURFACE_MATERIAL,
            source: include_str!("../../shaders/fog_volume.wgsl"),
            entry_points: &["fs_surface"],
            params: EMITTER_PARAMS,
            textures: &[],
        },
    ]
}

/// Registered materials, resolvable by name
#[derive(Default)]
pub struct MaterialSet {
    descs: Vec<MaterialDesc>,
    by_name: HashMap<&'static str, MaterialId>,
}

impl MaterialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full built-in set
    pub fn builtin() -> Self {
        let mut set = Self::new();
        for desc in builtin_materials() {
            set.register(desc);
        }
        set
    }

    pub fn register(&mut self, desc: MaterialDesc) -> MaterialId {
        if let Some(&id) = self.by_name.get(desc.name) {
            return id;
        }
        let id = MaterialId(self.descs.len() as u32);
        self.by_name.insert(desc.name, id);
        self.descs.push(desc);
        id
    }

    pub fn desc(&self, id: MaterialId) -> Option<&MaterialDesc> {
        self.descs.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.descs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }
}

impl MaterialProvider for MaterialSet {
    fn resolve(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }
}
