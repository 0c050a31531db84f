/// Water targets - scene rendered above and below the water plane
///
/// The reflection is rendered at a reduced width with the swapchain aspect
/// ratio, the refraction at full swapchain size. Each pass clips the scene
/// against the water plane from its own side.

use crate::error::Result;
use crate::pass::PassKind;
use crate::sampler::TextureKind;
use super::offscreen_target::OffscreenTarget;
use super::render_target_pass::{delegate_offscreen_pass, RenderTargetPass, TargetContext, TargetSize};

pub struct WaterTarget {
    target: OffscreenTarget,
}

impl WaterTarget {
    pub fn reflection(ctx: &mut TargetContext<'_>) -> Result<Self> {
        let width = ctx.settings.water_reflection_width;
        let target = OffscreenTarget::new(ctx, PassKind::WaterReflection, TextureKind::Reflection, 0,
            TargetSize::AspectWidth(width))?;
        Ok(Self { target })
    }

    pub fn refraction(ctx: &mut TargetContext<'_>) -> Result<Self> {
        let target = OffscreenTarget::new(ctx, PassKind::WaterRefraction, TextureKind::Refraction, 0,
            TargetSize::Swapchain)?;
        Ok(Self { target })
    }

    /// Sign of the clip plane normal's y component: +1 keeps what lies above
    /// the water (reflection), -1 what lies below (refraction)
    pub fn clip_sign(&self) -> f32 {
        match self.target.pass_kind() {
            PassKind::WaterReflection => 1.0,
            _ => -1.0,
        }
    }

    pub fn offscreen(&self) -> &OffscreenTarget {
        &self.target
    }
}

delegate_offscreen_pass!(WaterTarget);
