/// Target manager - every render target of the configured passes
///
/// Built from the pass table: one target per configured graphics pass, the
/// swapchain target for the main pass and the post-effect chain. The
/// scheduler looks targets up by pass kind.

use crate::error::Result;
use crate::material::MaterialKey;
use crate::pass::PassKind;
use super::main_target::MainTarget;
use super::post_effect::PostEffectChain;
use super::render_target_pass::{RenderTargetPass, TargetContext};
use super::screen_quad_target::ScreenQuadTarget;
use super::shadow_target::ShadowTarget;
use super::water_target::WaterTarget;

const SOURCE: &str = "strata::TargetManager";

pub struct TargetManager {
    shadow_direct: Option<ShadowTarget>,
    shadow_point: Option<ShadowTarget>,
    water_reflection: Option<WaterTarget>,
    water_refraction: Option<WaterTarget>,
    screen_quad: Vec<ScreenQuadTarget>,
    post_effects: PostEffectChain,
    main: MainTarget,
}

impl TargetManager {
    /// Create the targets of every pass configured in `ctx.table`
    ///
    /// Post effects are not created here: each needs its material, see
    /// `add_post_effect`.
    pub fn new(ctx: &mut TargetContext<'_>) -> Result<Self> {
        let table = ctx.table;
        let shadow_direct = if table.contains(PassKind::ShadowDirect) {
            Some(ShadowTarget::direct(ctx)?)
        } else {
            None
        };
        let shadow_point = if table.contains(PassKind::ShadowPoint) {
            Some(ShadowTarget::point(ctx)?)
        } else {
            None
        };
        let water_reflection = if table.contains(PassKind::WaterReflection) {
            Some(WaterTarget::reflection(ctx)?)
        } else {
            None
        };
        let water_refraction = if table.contains(PassKind::WaterRefraction) {
            Some(WaterTarget::refraction(ctx)?)
        } else {
            None
        };
        let mut screen_quad = Vec::new();
        for stage in PassKind::SCREEN_QUAD_STAGES {
            if table.contains(stage) {
                screen_quad.push(ScreenQuadTarget::new(ctx, stage)?);
            }
        }
        let main = MainTarget::new(ctx)?;

        let manager = Self {
            shadow_direct,
            shadow_point,
            water_reflection,
            water_refraction,
            screen_quad,
            post_effects: PostEffectChain::new(),
            main,
        };
        crate::engine_info!(SOURCE, "{} render targets created", manager.target_count());
        Ok(manager)
    }

    /// Add post effect `PostEffect(len)` rendered with `material`
    pub fn add_post_effect(
        &mut self,
        ctx: &mut TargetContext<'_>,
        material: MaterialKey,
        name: &str,
        size: Option<(u32, u32)>,
    ) -> Result<u32> {
        self.post_effects.add_post_effect(ctx, material, name, size)
    }

    // ===== LOOKUP =====

    /// Target recording `kind`; `None` for compute and unconfigured passes
    pub fn get_mut(&mut self, kind: PassKind) -> Option<&mut dyn RenderTargetPass> {
        match kind {
            PassKind::ComputeParticles => None,
            PassKind::ShadowDirect => self.shadow_direct.as_mut().map(|t| t as &mut dyn RenderTargetPass),
            PassKind::ShadowPoint => self.shadow_point.as_mut().map(|t| t as &mut dyn RenderTargetPass),
            PassKind::WaterReflection => self.water_reflection.as_mut().map(|t| t as &mut dyn RenderTargetPass),
            PassKind::WaterRefraction => self.water_refraction.as_mut().map(|t| t as &mut dyn RenderTargetPass),
            PassKind::ScreenQuadDepth
            | PassKind::ScreenQuadNormal
            | PassKind::ScreenQuadMrt
            | PassKind::ScreenQuadLate => self
                .screen_quad
                .iter_mut()
                .find(|t| t.stage() == kind)
                .map(|t| t as &mut dyn RenderTargetPass),
            PassKind::PostEffect(n) => self.post_effects.get_mut(n).map(|t| t as &mut dyn RenderTargetPass),
            PassKind::Main => Some(&mut self.main),
        }
    }

    pub fn shadow_direct(&self) -> Option<&ShadowTarget> {
        self.shadow_direct.as_ref()
    }

    pub fn shadow_point(&self) -> Option<&ShadowTarget> {
        self.shadow_point.as_ref()
    }

    pub fn water_reflection(&self) -> Option<&WaterTarget> {
        self.water_reflection.as_ref()
    }

    pub fn water_refraction(&self) -> Option<&WaterTarget> {
        self.water_refraction.as_ref()
    }

    pub fn screen_quad(&self, stage: PassKind) -> Option<&ScreenQuadTarget> {
        self.screen_quad.iter().find(|t| t.stage() == stage)
    }

    pub fn post_effects(&self) -> &PostEffectChain {
        &self.post_effects
    }

    pub fn main(&self) -> &MainTarget {
        &self.main
    }

    /// Offscreen targets plus the main target
    pub fn target_count(&self) -> usize {
        let optional = [
            self.shadow_direct.is_some(),
            self.shadow_point.is_some(),
            self.water_reflection.is_some(),
            self.water_refraction.is_some(),
        ];
        optional.iter().filter(|&&present| present).count()
            + self.screen_quad.len()
            + self.post_effects.len()
            + 1
    }

    fn all_mut(&mut self) -> Vec<&mut dyn RenderTargetPass> {
        let mut targets: Vec<&mut dyn RenderTargetPass> = Vec::new();
        if let Some(t) = self.shadow_direct.as_mut() {
            targets.push(t);
        }
        if let Some(t) = self.shadow_point.as_mut() {
            targets.push(t);
        }
        if let Some(t) = self.water_reflection.as_mut() {
            targets.push(t);
        }
        if let Some(t) = self.water_refraction.as_mut() {
            targets.push(t);
        }
        for t in self.screen_quad.iter_mut() {
            targets.push(t);
        }
        for t in self.post_effects.iter_mut() {
            targets.push(t);
        }
        targets.push(&mut self.main);
        targets
    }

    // ===== FRAME / RESIZE =====

    /// Advance every target's command pool rotation
    pub fn reallocate_command_buffers(&mut self) -> Result<()> {
        for target in self.all_mut() {
            target.reallocate_command_buffers()?;
        }
        Ok(())
    }

    /// Rebuild every target against a new swapchain and pass registry
    pub fn recreate(&mut self, ctx: &mut TargetContext<'_>) -> Result<()> {
        for target in self.all_mut() {
            target.recreate(ctx)?;
        }
        crate::engine_debug!(SOURCE, "Render targets recreated at {}x{}",
            ctx.swapchain.extent.width, ctx.swapchain.extent.height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "target_manager_tests.rs"]
mod tests;
