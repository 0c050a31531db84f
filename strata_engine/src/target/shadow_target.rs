/// Shadow targets - depth arrays rendered from the lights
///
/// The direct shadow map holds one layer per cascade (a single layer without
/// cascades); the point shadow map is a cube array with six layers per light.
/// Both are square and keep their size across swapchain changes.

use crate::error::Result;
use crate::device::Extent2D;
use crate::pass::PassKind;
use crate::sampler::TextureKind;
use super::offscreen_target::OffscreenTarget;
use super::render_target_pass::{delegate_offscreen_pass, RenderTargetPass, TargetContext, TargetSize};

pub struct ShadowTarget {
    target: OffscreenTarget,
}

impl ShadowTarget {
    /// Directional light shadow map
    pub fn direct(ctx: &mut TargetContext<'_>) -> Result<Self> {
        Self::new(ctx, PassKind::ShadowDirect, TextureKind::ShadowMapDirect)
    }

    /// Point light shadow cube array
    pub fn point(ctx: &mut TargetContext<'_>) -> Result<Self> {
        Self::new(ctx, PassKind::ShadowPoint, TextureKind::ShadowMapPoint)
    }

    fn new(ctx: &mut TargetContext<'_>, kind: PassKind, texture: TextureKind) -> Result<Self> {
        let size = ctx.settings.shadow_map_size;
        let target = OffscreenTarget::new(ctx, kind, texture, 0,
            TargetSize::Fixed(Extent2D::new(size, size)))?;
        Ok(Self { target })
    }

    /// Depth layers (cascades, or 6 per point light)
    pub fn layer_count(&self) -> u32 {
        self.target.layout().array_layers
    }

    pub fn is_cube(&self) -> bool {
        self.target.layout().cube
    }

    pub fn offscreen(&self) -> &OffscreenTarget {
        &self.target
    }
}

delegate_offscreen_pass!(ShadowTarget);
