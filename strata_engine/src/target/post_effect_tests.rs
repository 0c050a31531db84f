/// Tests for PostEffectChain

use std::sync::Arc;
use super::*;
use crate::device::mock_device::MockDevice;
use crate::device::{GpuDevice, SwapchainInfo};
use crate::error::Error;
use crate::pass::{PassRegistry, PassTable};
use crate::sampler::{SamplerProvider, SamplerRegistry};
use crate::settings::EngineSettings;

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    device: Arc<dyn GpuDevice>,
    settings: EngineSettings,
    table: PassTable,
    registry: PassRegistry,
    samplers: SamplerRegistry,
    swapchain: SwapchainInfo,
}

impl Fixture {
    fn new(post_effect_count: u32) -> Self {
        let (_mock, device) = MockDevice::shared(2, Extent2D::new(1280, 720));
        let settings = EngineSettings { use_screen_quad: true, ..Default::default() };
        let swapchain = device.swapchain_info();
        let table = PassTable::build(&device, &settings, post_effect_count, swapchain.format).unwrap();
        let registry = PassRegistry::build(&device, &table).unwrap();
        Self {
            device,
            settings,
            table,
            registry,
            samplers: SamplerRegistry::new(),
            swapchain,
        }
    }

    fn ctx(&mut self) -> TargetContext<'_> {
        TargetContext {
            device: &self.device,
            registry: &self.registry,
            table: &self.table,
            settings: &self.settings,
            swapchain: self.swapchain,
            samplers: &mut self.samplers,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_add_post_effects_in_order() {
    let mut f = Fixture::new(2);
    let mut chain = PostEffectChain::new();
    assert!(chain.is_empty());

    let blur = chain.add_post_effect(&mut f.ctx(), MaterialKey::default(), "blur", None).unwrap();
    let bloom = chain.add_post_effect(&mut f.ctx(), MaterialKey::default(), "bloom", Some((640, 360))).unwrap();

    assert_eq!((blur, bloom), (0, 1));
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.effect_index("bloom"), Some(1));
    assert_eq!(chain.effect_index("missing"), None);

    let first = chain.get(0).unwrap();
    assert_eq!(first.name(), "blur");
    assert_eq!(first.pass_kind(), PassKind::PostEffect(0));
    assert_eq!(first.extent(), Extent2D::new(1280, 720));
    assert_eq!(chain.get(1).unwrap().extent(), Extent2D::new(640, 360));
}

#[test]
fn test_duplicate_name_rejected() {
    let mut f = Fixture::new(2);
    let mut chain = PostEffectChain::new();
    chain.add_post_effect(&mut f.ctx(), MaterialKey::default(), "blur", None).unwrap();
    let result = chain.add_post_effect(&mut f.ctx(), MaterialKey::default(), "blur", None);
    assert!(matches!(result, Err(Error::Config(_))));
    assert_eq!(chain.len(), 1);
}

#[test]
fn test_effect_without_pass_fails() {
    let mut f = Fixture::new(0);
    let mut chain = PostEffectChain::new();
    assert!(chain.add_post_effect(&mut f.ctx(), MaterialKey::default(), "blur", None).is_err());
    assert!(chain.effect_index("blur").is_none());
}

#[test]
fn test_outputs_published_and_final_alias() {
    let mut f = Fixture::new(2);
    let mut chain = PostEffectChain::new();
    chain.add_post_effect(&mut f.ctx(), MaterialKey::default(), "blur", None).unwrap();
    assert_eq!(f.samplers.resolve(TextureKind::PostEffectFinal, 0), (TextureKind::PostEffect, 0));

    chain.add_post_effect(&mut f.ctx(), MaterialKey::default(), "bloom", None).unwrap();
    assert_eq!(f.samplers.resolve(TextureKind::PostEffectFinal, 0), (TextureKind::PostEffect, 1));

    let last = chain.get(1).unwrap().offscreen().outputs()[0];
    assert_eq!(f.samplers.sampler_for(TextureKind::PostEffectFinal, 0).unwrap()[0], last);
}
