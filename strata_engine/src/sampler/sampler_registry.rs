/// Sampler registry - typed producer/consumer table for render-target outputs
///
/// Render-target passes publish their sampled output under
/// `(TextureKind, sub_index)`, one binding per swapchain image. Materials
/// resolve bindings through the `SamplerProvider` capability and never see
/// the producing pass.

use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::device::SamplerBinding;
use super::texture_kind::TextureKind;

const SOURCE: &str = "strata::SamplerRegistry";

/// Capability: provides the sampler bindings of a texture kind
pub trait SamplerProvider {
    /// Per-swapchain-image bindings for `(kind, sub_index)`
    fn sampler_for(&self, kind: TextureKind, sub_index: u32) -> Result<&[SamplerBinding]>;

    /// Bumped on every publish; consumers compare it to detect rebinding needs
    fn revision(&self) -> u64;
}

#[derive(Default)]
pub struct SamplerRegistry {
    entries: FxHashMap<(TextureKind, u32), Vec<SamplerBinding>>,
    revision: u64,
}

impl SamplerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish per-image bindings for a produced texture
    pub fn publish(&mut self, kind: TextureKind, sub_index: u32, bindings: Vec<SamplerBinding>) -> Result<()> {
        match kind {
            TextureKind::ImageFile => {
                return Err(crate::engine_config_err!(SOURCE,
                    "Image file textures are owned by their material and cannot be published"));
            }
            TextureKind::PostEffectFinal => {
                return Err(crate::engine_config_err!(SOURCE,
                    "PostEffectFinal is an alias and cannot be published"));
            }
            _ => {}
        }
        if bindings.is_empty() {
            return Err(crate::engine_config_err!(SOURCE,
                "Empty binding list published for {}[{}]", kind, sub_index));
        }

        self.entries.insert((kind, sub_index), bindings);
        self.revision += 1;
        crate::engine_debug!(SOURCE, "Published {}[{}] (revision {})", kind, sub_index, self.revision);
        Ok(())
    }

    /// Publish one binding replicated for every swapchain image
    pub fn publish_replicated(
        &mut self,
        kind: TextureKind,
        sub_index: u32,
        binding: SamplerBinding,
        image_count: u32,
    ) -> Result<()> {
        self.publish(kind, sub_index, vec![binding; image_count.max(1) as usize])
    }

    /// Remove a published texture
    pub fn unpublish(&mut self, kind: TextureKind, sub_index: u32) -> bool {
        let removed = self.entries.remove(&(kind, sub_index)).is_some();
        if removed {
            self.revision += 1;
        }
        removed
    }

    /// Concrete key a request resolves to (aliases followed)
    pub fn resolve(&self, kind: TextureKind, sub_index: u32) -> (TextureKind, u32) {
        if kind != TextureKind::PostEffectFinal {
            return (kind, sub_index);
        }
        self.entries
            .keys()
            .filter(|(k, _)| *k == TextureKind::PostEffect)
            .map(|&(_, n)| n)
            .max()
            .map(|n| (TextureKind::PostEffect, n))
            .unwrap_or((TextureKind::ScreenQuadLate, 0))
    }

    pub fn contains(&self, kind: TextureKind, sub_index: u32) -> bool {
        self.entries.contains_key(&self.resolve(kind, sub_index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SamplerProvider for SamplerRegistry {
    fn sampler_for(&self, kind: TextureKind, sub_index: u32) -> Result<&[SamplerBinding]> {
        let key = self.resolve(kind, sub_index);
        self.entries
            .get(&key)
            .map(|bindings| bindings.as_slice())
            .ok_or_else(|| crate::engine_config_err!(SOURCE,
                "No sampler published for {}[{}]", key.0, key.1))
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
#[path = "sampler_registry_tests.rs"]
mod tests;
