/// Tests for MaterialManager

use std::sync::Arc;
use super::*;
use crate::device::mock_device::MockDevice;
use crate::device::{Extent2D, GpuDevice, ShaderStage};
use crate::error::Error;
use crate::material::{ShaderDesc, UniformField};
use crate::sampler::SamplerRegistry;
use crate::settings::{EngineSettings, ShaderLimits};

// ============================================================================
// Helpers
// ============================================================================

fn setup() -> (Arc<MockDevice>, Arc<dyn GpuDevice>, PassTable, PassRegistry) {
    let (mock, device) = MockDevice::shared(2, Extent2D::new(640, 480));
    let table = PassTable::build(&device, &EngineSettings::default(), 0,
        device.swapchain_info().format).unwrap();
    let registry = PassRegistry::build(&device, &table).unwrap();
    (mock, device, table, registry)
}

fn ctx<'a>(device: &'a Arc<dyn GpuDevice>, registry: &'a PassRegistry, table: &'a PassTable) -> MaterialContext<'a> {
    MaterialContext {
        device,
        registry,
        table,
        image_count: 2,
        frames_in_flight: 2,
        limits: ShaderLimits::default(),
    }
}

fn desc(name: &str) -> MaterialDesc {
    MaterialDesc::new(name)
        .with_shader(ShaderDesc::new(ShaderStage::Vertex, vec![1], vec![UniformField::Model]))
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_create_and_lookup_by_name() {
    let (_mock, device, table, registry) = setup();
    let mut manager = MaterialManager::new();
    let key = manager.create_material(desc("stone"), &ctx(&device, &registry, &table)).unwrap();

    assert_eq!(manager.len(), 1);
    assert_eq!(manager.material_by_name("stone").unwrap(), key);
    assert_eq!(manager.material(key).unwrap().name(), "stone");
}

#[test]
fn test_duplicate_name_is_config_error() {
    let (_mock, device, table, registry) = setup();
    let mut manager = MaterialManager::new();
    manager.create_material(desc("stone"), &ctx(&device, &registry, &table)).unwrap();
    let result = manager.create_material(desc("stone"), &ctx(&device, &registry, &table));
    assert!(matches!(result, Err(Error::Config(_))));
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_unknown_name_is_config_error() {
    let manager = MaterialManager::new();
    assert!(matches!(manager.material_by_name("missing"), Err(Error::Config(_))));
}

#[test]
fn test_remove_frees_name_and_resources() {
    let (mock, device, table, registry) = setup();
    let baseline = mock.live_handle_count();
    let mut manager = MaterialManager::new();
    let key = manager.create_material(desc("stone"), &ctx(&device, &registry, &table)).unwrap();
    manager
        .material_mut(key)
        .unwrap()
        .get_instance_for_entity(EntityKey(1), 0, &SamplerRegistry::new())
        .unwrap();

    assert!(manager.remove_material(key));
    assert!(!manager.remove_material(key));
    assert!(manager.material_by_name("stone").is_err());
    assert_eq!(mock.live_handle_count(), baseline);
    assert!(mock.stale_uses().is_empty());
}

#[test]
fn test_delete_instances_spans_materials() {
    let (_mock, device, table, registry) = setup();
    let samplers = SamplerRegistry::new();
    let mut manager = MaterialManager::new();
    let a = manager.create_material(desc("a"), &ctx(&device, &registry, &table)).unwrap();
    let b = manager.create_material(desc("b"), &ctx(&device, &registry, &table)).unwrap();
    for key in [a, b] {
        manager
            .material_mut(key)
            .unwrap()
            .get_instance_for_entity(EntityKey(7), 0, &samplers)
            .unwrap();
    }

    assert_eq!(manager.delete_instances_for_entity(EntityKey(7)), 2);
    assert_eq!(manager.delete_instances_for_entity(EntityKey(7)), 0);
    assert_eq!(manager.material(a).unwrap().live_instance_count(), 0);
}
