//! Shared value types for frames and render targets

use serde::{Deserialize, Serialize};

/// 2D pixel extent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Divide both dimensions by `divisor`, flooring at 1x1
    ///
    /// A zero divisor is treated as 1.
    pub fn downsampled(&self, divisor: u32) -> Self {
        let divisor = divisor.max(1);
        Self {
            width: (self.width / divisor).max(1),
            height: (self.height / divisor).max(1),
        }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Pixel format for scratch targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetFormat {
    /// 8-bit LDR color, the default scratch format
    Rgba8Unorm,
    /// Half-float HDR color
    Rgba16Float,
    /// Single-channel half float. Used for scattering buffers and the
    /// downsampled depth guide; R8 shows visible banding there, and full
    /// float is not filterable on the baseline feature set.
    R16Float,
}

/// What kind of camera is submitting the frame
///
/// Reflection probes and asset-preview cameras never receive
/// post-processing; detecting them up front avoids render-target churn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraKind {
    /// Regular in-game camera
    Game,
    /// Editor scene-view camera; renders at its actual pixel rect
    SceneView,
    /// Inspector/asset preview camera
    Preview,
    /// Reflection probe capture
    Reflection,
}

impl CameraKind {
    /// Whether cameras of this kind receive post-processing at all
    pub fn receives_post_processing(&self) -> bool {
        matches!(self, CameraKind::Game | CameraKind::SceneView)
    }
}

/// Camera viewport for one frame
///
/// Editor viewports can render at a pixel rect that differs from the
/// nominal camera target size; scratch targets must be sized to the rect
/// actually rendered or they over/under-allocate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Nominal camera target size
    pub nominal: Extent2d,
    /// Actual pixel rect when it differs from the nominal size
    pub pixel_rect: Option<Extent2d>,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            nominal: Extent2d::new(width, height),
            pixel_rect: None,
        }
    }

    pub fn with_pixel_rect(mut self, width: u32, height: u32) -> Self {
        self.pixel_rect = Some(Extent2d::new(width, height));
        self
    }

    /// The extent scratch targets must be sized to
    pub fn effective(&self) -> Extent2d {
        self.pixel_rect.unwrap_or(self.nominal)
    }

    pub fn is_valid(&self) -> bool {
        !self.effective().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_downsampled_floors_at_one() {
        let e = Extent2d::new(1920, 1080);
        assert_eq!(e.downsampled(2), Extent2d::new(960, 540));
        assert_eq!(e.downsampled(3), Extent2d::new(640, 360));

        let tiny = Extent2d::new(2, 1);
        assert_eq!(tiny.downsampled(4), Extent2d::new(1, 1));
        // a zero divisor must not panic
        assert_eq!(e.downsampled(0), e);
    }

    #[test]
    fn test_camera_kind_exclusion() {
        assert!(CameraKind::Game.receives_post_processing());
        assert!(CameraKind::SceneView.receives_post_processing());
        assert!(!CameraKind::Preview.receives_post_processing());
        assert!(!CameraKind::Reflection.receives_post_processing());
    }

    #[test]
    fn test_viewport_pixel_rect_overrides_nominal() {
        let vp = Viewport::new(1920, 1080);
        assert_eq!(vp.effective(), Extent2d::new(1920, 1080));

        let vp = vp.with_pixel_rect(800, 450);
        assert_eq!(vp.effective(), Extent2d::new(800, 450));
        assert!(vp.is_valid());

        let vp = Viewport::new(1920, 1080).with_pixel_rect(0, 450);
        assert!(!vp.is_valid());
    }
}
