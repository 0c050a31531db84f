/// Post effects - full-screen passes chained after the screen-quad stages
///
/// Effect n renders a full-screen triangle with its material into its own
/// target, published as `PostEffect[n]`. Materials read earlier effects (or
/// `PostEffectFinal`, the last one) through the sampler registry.

use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::device::Extent2D;
use crate::material::MaterialKey;
use crate::pass::PassKind;
use crate::sampler::TextureKind;
use super::offscreen_target::OffscreenTarget;
use super::render_target_pass::{delegate_offscreen_pass, RenderTargetPass, TargetContext, TargetSize};

const SOURCE: &str = "strata::PostEffectChain";

pub struct PostEffectTarget {
    target: OffscreenTarget,
    index: u32,
    name: String,
    material: MaterialKey,
}

impl PostEffectTarget {
    /// Target for effect `index`; `size` of `None` follows the swapchain
    pub fn new(
        ctx: &mut TargetContext<'_>,
        index: u32,
        name: &str,
        material: MaterialKey,
        size: Option<(u32, u32)>,
    ) -> Result<Self> {
        let size = match size {
            Some((width, height)) => TargetSize::Fixed(Extent2D::new(width, height)),
            None => TargetSize::Swapchain,
        };
        let target = OffscreenTarget::new(ctx, PassKind::PostEffect(index), TextureKind::PostEffect,
            index, size)?;
        Ok(Self {
            target,
            index,
            name: name.to_string(),
            material,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn material(&self) -> MaterialKey {
        self.material
    }

    pub fn offscreen(&self) -> &OffscreenTarget {
        &self.target
    }
}

delegate_offscreen_pass!(PostEffectTarget);

/// Ordered post effects with name lookup
#[derive(Default)]
pub struct PostEffectChain {
    effects: Vec<PostEffectTarget>,
    names: FxHashMap<String, u32>,
}

impl PostEffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect; its pass `PostEffect(len)` must already be in the
    /// table and registry
    pub fn add_post_effect(
        &mut self,
        ctx: &mut TargetContext<'_>,
        material: MaterialKey,
        name: &str,
        size: Option<(u32, u32)>,
    ) -> Result<u32> {
        if self.names.contains_key(name) {
            return Err(crate::engine_config_err!(SOURCE, "Post effect '{}' already exists", name));
        }
        let index = self.effects.len() as u32;
        let effect = PostEffectTarget::new(ctx, index, name, material, size)?;
        self.effects.push(effect);
        self.names.insert(name.to_string(), index);

        crate::engine_info!(SOURCE, "Post effect '{}' added at index {}", name, index);
        Ok(index)
    }

    /// Index of the effect called `name`
    pub fn effect_index(&self, name: &str) -> Option<u32> {
        self.names.get(name).copied()
    }

    pub fn get(&self, index: u32) -> Option<&PostEffectTarget> {
        self.effects.get(index as usize)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut PostEffectTarget> {
        self.effects.get_mut(index as usize)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PostEffectTarget> {
        self.effects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PostEffectTarget> {
        self.effects.iter_mut()
    }
}

#[cfg(test)]
#[path = "post_effect_tests.rs"]
mod tests;
