/// Tests for Material
///
/// Materials are built against a mock device with a real pass table and
/// registry; uniform buffer contents are read back from the mock.

use std::sync::Arc;
use glam::{Mat4, Vec3};
use super::*;
use crate::camera::Camera;
use crate::device::mock_device::{MockDevice, MockCall};
use crate::device::{Extent2D, ImageViewHandle, SamplerHandle};
use crate::error::Error;
use crate::sampler::SamplerRegistry;
use crate::scene::LightSet;
use crate::settings::EngineSettings;
use crate::uniform::{EntityUniforms, UniformSnapshot};

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    mock: Arc<MockDevice>,
    device: Arc<dyn GpuDevice>,
    table: PassTable,
    registry: PassRegistry,
    samplers: SamplerRegistry,
}

impl Fixture {
    fn new() -> Self {
        let (mock, device) = MockDevice::shared(3, Extent2D::new(800, 600));
        let settings = EngineSettings { init_water: true, ..Default::default() };
        let table = PassTable::build(&device, &settings, 0, device.swapchain_info().format).unwrap();
        let registry = PassRegistry::build(&device, &table).unwrap();
        let mut samplers = SamplerRegistry::new();
        samplers.publish_replicated(TextureKind::Reflection, 0, binding(900), 3).unwrap();
        Self { mock, device, table, registry, samplers }
    }

    fn ctx(&self) -> MaterialContext<'_> {
        MaterialContext {
            device: &self.device,
            registry: &self.registry,
            table: &self.table,
            image_count: 3,
            frames_in_flight: 3,
            limits: ShaderLimits::default(),
        }
    }
}

fn binding(n: u64) -> SamplerBinding {
    SamplerBinding { view: ImageViewHandle(n), sampler: SamplerHandle(n + 1) }
}

fn basic_desc() -> MaterialDesc {
    MaterialDesc::new("basic")
        .with_shader(ShaderDesc::new(ShaderStage::Vertex, vec![0x0723_0203],
            vec![UniformField::Model, UniformField::ViewProjection]))
        .with_shader(ShaderDesc::new(ShaderStage::Fragment, vec![0x0723_0203],
            vec![UniformField::Time]))
        .with_passes(&[PassKind::ShadowDirect, PassKind::Main])
}

fn water_desc() -> MaterialDesc {
    MaterialDesc::new("water")
        .with_shader(ShaderDesc::new(ShaderStage::Vertex, vec![1], vec![UniformField::Model]))
        .with_shader(ShaderDesc::new(ShaderStage::Fragment, vec![1], vec![]))
        .with_texture(TextureBinding::external(TextureKind::Reflection, 0, ShaderStage::Fragment, 1))
}

fn snapshot() -> UniformSnapshot {
    let camera = Camera::new(Vec3::ZERO, 1.0, 1.0, 0.1, 10.0);
    UniformSnapshot::build(&camera, &LightSet::default(), &ShaderLimits::default(), 3.0, 0.1)
}

fn model(x: f32) -> EntityUniforms {
    EntityUniforms::default().with_model(Mat4::from_translation(Vec3::new(x, 0.0, 0.0)))
}

fn write(material: &mut Material, instance: usize, entity: &EntityUniforms, frame: u64) -> UniformWrite {
    let snap = snapshot();
    material
        .set_uniform_data(instance, &UniformView::new(&snap, entity), 0, frame)
        .unwrap()
}

// ============================================================================
// Tests: creation
// ============================================================================

#[test]
fn test_pipelines_only_for_configured_passes() {
    let f = Fixture::new();
    let desc = basic_desc().with_passes(&[PassKind::Main, PassKind::ScreenQuadLate]);
    let material = Material::new(desc, &f.ctx()).unwrap();
    assert!(material.draws_in(PassKind::Main));
    assert!(!material.draws_in(PassKind::ScreenQuadLate));
    assert_eq!(material.passes(), &[PassKind::Main, PassKind::ScreenQuadLate]);
}

#[test]
fn test_invalid_descs_rejected() {
    let f = Fixture::new();
    assert!(Material::new(MaterialDesc::new("empty"), &f.ctx()).is_err());

    let duplicate = basic_desc()
        .with_shader(ShaderDesc::new(ShaderStage::Vertex, vec![1], vec![]));
    assert!(Material::new(duplicate, &f.ctx()).is_err());

    let clash = basic_desc()
        .with_texture(TextureBinding::external(TextureKind::Reflection, 0, ShaderStage::Fragment, 0));
    assert!(Material::new(clash, &f.ctx()).is_err());

    let image_without_binding = basic_desc().with_texture(TextureBinding {
        kind: TextureKind::ImageFile,
        sub_index: 0,
        stage: ShaderStage::Fragment,
        binding: 2,
        image: None,
    });
    assert!(Material::new(image_without_binding, &f.ctx()).is_err());

    assert!(Material::new(basic_desc().with_instancing(0), &f.ctx()).is_err());
}

// ============================================================================
// Tests: instances
// ============================================================================

#[test]
fn test_instance_allocates_per_stage_per_image() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();
    f.mock.clear_calls();

    let index = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    assert_eq!(index, 0);

    let calls = f.mock.calls();
    let buffers = calls.iter().filter(|c| matches!(c, MockCall::CreateBuffer(..))).count();
    let sets = calls.iter().filter(|c| matches!(c, MockCall::AllocateDescriptorSet(_))).count();
    assert_eq!(buffers, 2 * 3);
    assert_eq!(sets, 2 * 3);
    assert_eq!(material.instance_owner(0), Some((EntityKey(1), 0)));
}

#[test]
fn test_get_instance_is_idempotent() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();
    let a = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    let b = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    assert_eq!(a, b);
    assert_eq!(material.instance_capacity(), 1);
}

#[test]
fn test_slot_out_of_order_is_config_error() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();
    let result = material.get_instance_for_entity(EntityKey(1), 1, &f.samplers);
    assert!(matches!(result, Err(Error::Config(_))));

    assert_eq!(material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap(), 0);
    assert_eq!(material.get_instance_for_entity(EntityKey(1), 1, &f.samplers).unwrap(), 1);
}

#[test]
fn test_external_sampler_resolved_at_creation() {
    let f = Fixture::new();
    let mut material = Material::new(water_desc(), &f.ctx()).unwrap();
    f.mock.clear_calls();
    material.get_instance_for_entity(EntityKey(5), 0, &f.samplers).unwrap();

    let sampler_writes = f
        .mock
        .calls()
        .iter()
        .filter_map(|c| match c {
            MockCall::UpdateDescriptorSet(_, writes) => Some(writes.clone()),
            _ => None,
        })
        .flatten()
        .filter(|w| w.resource == DescriptorResource::ImageSampler(binding(900)))
        .count();
    assert_eq!(sampler_writes, 3);
}

#[test]
fn test_missing_external_sampler_fails() {
    let f = Fixture::new();
    let desc = water_desc().with_texture(
        TextureBinding::external(TextureKind::Refraction, 0, ShaderStage::Fragment, 2));
    let mut material = Material::new(desc, &f.ctx()).unwrap();
    assert!(material.get_instance_for_entity(EntityKey(5), 0, &f.samplers).is_err());
}

// ============================================================================
// Tests: uniform data
// ============================================================================

#[test]
fn test_set_uniform_data_writes_fields_in_order() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();
    let instance = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();

    assert_eq!(write(&mut material, instance, &model(4.0), 1), UniformWrite::Written);

    let buffer = material.uniform_buffer(instance, ShaderStage::Vertex, 0).unwrap();
    let bytes = f.mock.buffer_contents(buffer.handle()).unwrap();
    assert_eq!(bytes.len(), 128);
    // Model translation x lives in column 3
    assert_eq!(f32::from_ne_bytes(bytes[48..52].try_into().unwrap()), 4.0);

    let fragment = material.uniform_buffer(instance, ShaderStage::Fragment, 0).unwrap();
    let bytes = f.mock.buffer_contents(fragment.handle()).unwrap();
    assert_eq!(f32::from_ne_bytes(bytes[0..4].try_into().unwrap()), 3.0);
}

#[test]
fn test_set_uniform_data_only_touches_current_image() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();
    let instance = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    write(&mut material, instance, &model(4.0), 1);

    let other = material.uniform_buffer(instance, ShaderStage::Vertex, 1).unwrap();
    assert!(f.mock.buffer_contents(other.handle()).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn test_unknown_instance_is_invalid_resource() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();
    let snap = snapshot();
    let entity = EntityUniforms::default();
    let result = material.set_uniform_data(7, &UniformView::new(&snap, &entity), 0, 1);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

// ============================================================================
// Tests: instancing
// ============================================================================

#[test]
fn test_instanced_group_folds_later_instances() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc().with_instancing(16), &f.ctx()).unwrap();
    let a = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    let b = material.get_instance_for_entity(EntityKey(2), 0, &f.samplers).unwrap();
    let c = material.get_instance_for_entity(EntityKey(3), 0, &f.samplers).unwrap();

    assert_eq!(write(&mut material, a, &model(1.0), 1), UniformWrite::Written);
    assert_eq!(write(&mut material, b, &model(2.0), 1), UniformWrite::Folded);
    assert_eq!(write(&mut material, c, &model(3.0), 1), UniformWrite::Folded);

    let group = material.finish_instanced_group().unwrap();
    assert_eq!(group, InstancedDraw { main: a, first_instance: 0, instance_count: 3 });
    assert!(material.finish_instanced_group().is_none());

    // Models appended in order
    let storage = f.mock.buffer_contents(material.instance_storage(0).unwrap().handle()).unwrap();
    let x_of = |i: usize| f32::from_ne_bytes(storage[i * 64 + 48..i * 64 + 52].try_into().unwrap());
    assert_eq!([x_of(0), x_of(1), x_of(2)], [1.0, 2.0, 3.0]);
}

#[test]
fn test_second_group_in_frame_continues_after_first() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc().with_instancing(16), &f.ctx()).unwrap();
    let a = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    let b = material.get_instance_for_entity(EntityKey(2), 0, &f.samplers).unwrap();

    write(&mut material, a, &model(1.0), 1);
    write(&mut material, b, &model(2.0), 1);
    material.finish_instanced_group();

    assert_eq!(write(&mut material, b, &model(2.0), 1), UniformWrite::Written);
    let group = material.finish_instanced_group().unwrap();
    assert_eq!(group, InstancedDraw { main: b, first_instance: 2, instance_count: 1 });
}

#[test]
fn test_new_frame_resets_instance_cursor() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc().with_instancing(2), &f.ctx()).unwrap();
    let a = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    let b = material.get_instance_for_entity(EntityKey(2), 0, &f.samplers).unwrap();

    write(&mut material, a, &model(1.0), 1);
    write(&mut material, b, &model(2.0), 1);

    // Frame 2 starts over even though the group was never finished
    assert_eq!(write(&mut material, a, &model(1.0), 2), UniformWrite::Written);
    assert_eq!(material.finish_instanced_group().unwrap().first_instance, 0);
}

#[test]
fn test_instance_capacity_overflow() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc().with_instancing(1), &f.ctx()).unwrap();
    let a = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    let b = material.get_instance_for_entity(EntityKey(2), 0, &f.samplers).unwrap();
    write(&mut material, a, &model(1.0), 1);

    let snap = snapshot();
    let entity = model(2.0);
    assert!(material.set_uniform_data(b, &UniformView::new(&snap, &entity), 0, 1).is_err());
}

// ============================================================================
// Tests: binding
// ============================================================================

#[test]
fn test_bind_pipeline_and_sets() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc().with_instancing(4), &f.ctx()).unwrap();
    let instance = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    f.mock.clear_calls();

    let cb = CommandBufferHandle(1234);
    material.bind(cb, PassKind::Main, instance, 2).unwrap();

    let calls = f.mock.calls();
    assert!(matches!(calls[0], MockCall::BindPipeline(c, _) if c == cb));
    match &calls[1] {
        MockCall::BindDescriptorSets(c, sets) => {
            assert_eq!(*c, cb);
            // vertex + fragment + instance storage
            assert_eq!(sets.len(), 3);
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[test]
fn test_bind_unconfigured_pass_is_invalid_state() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();
    let instance = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    let result = material.bind(CommandBufferHandle(1), PassKind::WaterReflection, instance, 0);
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

// ============================================================================
// Tests: detach
// ============================================================================

#[test]
fn test_delete_tombstones_without_reuse() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();
    let a0 = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    let a1 = material.get_instance_for_entity(EntityKey(1), 1, &f.samplers).unwrap();
    let b0 = material.get_instance_for_entity(EntityKey(2), 0, &f.samplers).unwrap();

    assert_eq!(material.delete_instances_for_entity(EntityKey(1)), 2);
    assert!(!material.is_live(a0));
    assert!(!material.is_live(a1));
    assert!(material.is_live(b0));
    assert_eq!(material.instance_capacity(), 3);

    // Re-attaching allocates fresh indices
    let again = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    assert_eq!(again, 3);
    assert_eq!(material.delete_instances_for_entity(EntityKey(99)), 0);
}

#[test]
fn test_retired_instances_released_after_frames_in_flight() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();
    material.begin_frame(10, &f.samplers).unwrap();
    let instance = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();
    let buffer = material.uniform_buffer(instance, ShaderStage::Vertex, 0).unwrap().handle();

    material.delete_instances_for_entity(EntityKey(1));
    assert_eq!(material.retired_count(), 1);
    assert!(f.mock.is_live(buffer.raw()));

    material.begin_frame(12, &f.samplers).unwrap();
    assert!(f.mock.is_live(buffer.raw()));

    material.begin_frame(13, &f.samplers).unwrap();
    assert_eq!(material.retired_count(), 0);
    assert!(!f.mock.is_live(buffer.raw()));
    assert!(f.mock.stale_uses().is_empty());
}

// ============================================================================
// Tests: external rebinding
// ============================================================================

#[test]
fn test_refresh_rewrites_changed_bindings_only() {
    let mut f = Fixture::new();
    let mut material = Material::new(water_desc(), &f.ctx()).unwrap();
    material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();

    // Same revision, nothing to do after the first pass
    material.refresh_external_bindings(&f.samplers).unwrap();
    assert_eq!(material.refresh_external_bindings(&f.samplers).unwrap(), 0);

    f.samplers.publish_replicated(TextureKind::Reflection, 0, binding(950), 3).unwrap();
    f.mock.clear_calls();
    assert_eq!(material.refresh_external_bindings(&f.samplers).unwrap(), 3);

    let updates = f
        .mock
        .calls()
        .iter()
        .filter(|c| matches!(c, MockCall::UpdateDescriptorSet(..)))
        .count();
    assert_eq!(updates, 3);

    // An unrelated publish bumps the revision but changes no binding
    f.samplers.publish_replicated(TextureKind::Refraction, 0, binding(970), 3).unwrap();
    assert_eq!(material.refresh_external_bindings(&f.samplers).unwrap(), 0);
}

#[test]
fn test_recreate_pipelines_uses_new_registry() {
    let mut f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();

    let registry = PassRegistry::build(&f.device, &f.table).unwrap();
    material.recreate_pipelines(&registry, &f.table).unwrap();
    f.registry = registry;

    let created: Vec<_> = f
        .mock
        .calls()
        .iter()
        .filter_map(|c| match c {
            MockCall::CreateGraphicsPipeline { render_pass, .. } => Some(*render_pass),
            _ => None,
        })
        .collect();
    let main = f.registry.render_pass(PassKind::Main).unwrap();
    assert_eq!(created.last(), Some(&main));
    assert!(f.mock.stale_uses().is_empty());
}

#[test]
fn test_set_image_count_rebuilds_in_place() {
    let f = Fixture::new();
    let mut material = Material::new(basic_desc(), &f.ctx()).unwrap();
    let instance = material.get_instance_for_entity(EntityKey(1), 0, &f.samplers).unwrap();

    material.set_image_count(4, &f.samplers).unwrap();
    assert!(material.uniform_buffer(instance, ShaderStage::Vertex, 3).is_some());
    assert_eq!(material.instance_owner(instance), Some((EntityKey(1), 0)));
}
