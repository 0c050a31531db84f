/// Screen-quad targets - the deferred sub-stages
///
/// Depth, normal, MRT and late stages each render into a swapchain-sized
/// target. The MRT stage publishes one sub-index per color attachment.

use crate::error::Result;
use crate::engine_bail;
use crate::pass::PassKind;
use crate::sampler::TextureKind;
use super::offscreen_target::OffscreenTarget;
use super::render_target_pass::{delegate_offscreen_pass, RenderTargetPass, TargetContext, TargetSize};

pub struct ScreenQuadTarget {
    target: OffscreenTarget,
}

impl ScreenQuadTarget {
    pub fn new(ctx: &mut TargetContext<'_>, stage: PassKind) -> Result<Self> {
        let texture = match stage {
            PassKind::ScreenQuadDepth => TextureKind::ScreenQuadDepth,
            PassKind::ScreenQuadNormal => TextureKind::ScreenQuadNormal,
            PassKind::ScreenQuadMrt => TextureKind::ScreenQuadMrt,
            PassKind::ScreenQuadLate => TextureKind::ScreenQuadLate,
            other => engine_bail!("strata::ScreenQuadTarget", "{} is not a screen-quad stage", other),
        };
        let target = OffscreenTarget::new(ctx, stage, texture, 0, TargetSize::Swapchain)?;
        Ok(Self { target })
    }

    pub fn stage(&self) -> PassKind {
        self.target.pass_kind()
    }

    pub fn offscreen(&self) -> &OffscreenTarget {
        &self.target
    }
}

delegate_offscreen_pass!(ScreenQuadTarget);
