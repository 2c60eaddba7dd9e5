//! wgpu texture allocation behind the pool's backing seam

use std::collections::HashMap;

use crate::core::types::TargetFormat;
use crate::target::backing::{BackingId, TargetBacking};
use crate::target::descriptor::TargetDescriptor;

/// Map a scratch format onto the concrete texture format
pub fn texture_format(format: TargetFormat) -> wgpu::TextureFormat {
    match format {
        TargetFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TargetFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TargetFormat::R16Float => wgpu::TextureFormat::R16Float,
    }
}

struct GpuTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

/// Texture-allocating backing for the scratch pool
pub struct WgpuBacking {
    device: wgpu::Device,
    next: u64,
    targets: HashMap<BackingId, GpuTarget>,
}

impl WgpuBacking {
    pub fn new(device: wgpu::Device) -> Self {
        Self {
            device,
            next: 0,
            targets: HashMap::new(),
        }
    }

    /// View of a live backing image
    pub fn view(&self, id: BackingId) -> Option<&wgpu::TextureView> {
        self.targets.get(&id).map(|t| &t.view)
    }

    pub fn format(&self, id: BackingId) -> Option<wgpu::TextureFormat> {
        self.targets.get(&id).map(|t| t.format)
    }

    pub fn live_count(&self) -> usize {
        self.targets.len()
    }
}

impl TargetBacking for WgpuBacking {
    fn alloc(&mut self, name: &str, desc: &TargetDescriptor) -> BackingId {
        let extent = desc.scaled();
        let format = texture_format(desc.format);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(name),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = BackingId(self.next);
        self.next += 1;
        self.targets.insert(
            id,
            GpuTarget {
                texture,
                view,
                format,
            },
        );
        log::debug!(
            "allocated scratch '{}' {}x{} {:?}",
            name,
            extent.width,
            extent.height,
            format
        );
        id
    }

    fn free(&mut self, id: BackingId) {
        match self.targets.remove(&id) {
            Some(target) => target.texture.destroy(),
            None => log::error!("freed unknown backing id {:?}", id),
        }
    }
}
