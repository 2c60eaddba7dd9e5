//! Descriptors for off-screen scratch targets

use serde::{Deserialize, Serialize};

use crate::core::types::{Extent2d, TargetFormat, Viewport};

/// Size, format and scale tier of a scratch target
///
/// Several scratch targets may share one descriptor at different scale
/// tiers (full, half, quarter resolution) via the downsample divisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Base extent before downsampling
    pub extent: Extent2d,
    pub format: TargetFormat,
    /// Integer divisor applied to width/height
    pub downsample: u32,
}

impl TargetDescriptor {
    pub fn new(extent: Extent2d, format: TargetFormat) -> Self {
        Self {
            extent,
            format,
            downsample: 1,
        }
    }

    /// Descriptor sized to the viewport's effective pixel rect
    pub fn for_viewport(viewport: &Viewport, format: TargetFormat) -> Self {
        Self::new(viewport.effective(), format)
    }

    pub fn with_downsample(mut self, divisor: u32) -> Self {
        self.downsample = divisor.max(1);
        self
    }

    /// Concrete allocation extent, floored at 1x1
    pub fn scaled(&self) -> Extent2d {
        self.extent.downsampled(self.downsample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_extent() {
        let desc = TargetDescriptor::new(Extent2d::new(1920, 1080), TargetFormat::Rgba8Unorm)
            .with_downsample(4);
        assert_eq!(desc.scaled(), Extent2d::new(480, 270));
    }

    #[test]
    fn test_descriptor_equality_drives_reallocation() {
        let a = TargetDescriptor::new(Extent2d::new(1920, 1080), TargetFormat::Rgba8Unorm);
        let b = TargetDescriptor::new(Extent2d::new(1280, 720), TargetFormat::Rgba8Unorm);
        let c = TargetDescriptor::new(Extent2d::new(1920, 1080), TargetFormat::Rgba16Float);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a.with_downsample(1));
    }

    #[test]
    fn test_for_viewport_uses_pixel_rect() {
        let vp = Viewport::new(1920, 1080).with_pixel_rect(640, 360);
        let desc = TargetDescriptor::for_viewport(&vp, TargetFormat::R16Float);
        assert_eq!(desc.extent, Extent2d::new(640, 360));
    }
}
