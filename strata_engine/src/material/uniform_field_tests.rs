/// Tests for UniformField sizes and writers

use glam::{Mat4, Vec3};
use super::*;
use crate::camera::Camera;
use crate::scene::{LightSet, PointLight};
use crate::uniform::{UniformSnapshot, EntityUniforms};

fn snapshot(lights: &LightSet) -> UniformSnapshot {
    let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), 1.0, 1.0, 0.1, 10.0);
    UniformSnapshot::build(&camera, lights, &ShaderLimits::default(), 2.5, 0.5)
}

fn write(field: UniformField, frame: &UniformSnapshot, entity: &EntityUniforms) -> Vec<u8> {
    let mut out = Vec::new();
    field.write(&UniformView::new(frame, entity), &ShaderLimits::default(), &mut out);
    out
}

fn f32_at(bytes: &[u8], index: usize) -> f32 {
    f32::from_ne_bytes(bytes[index * 4..index * 4 + 4].try_into().unwrap())
}

// ============================================================================
// Tests: parsing
// ============================================================================

#[test]
fn test_names_round_trip() {
    for field in UniformField::ALL {
        assert_eq!(field.name().parse::<UniformField>().unwrap(), field);
    }
}

#[test]
fn test_unknown_field_is_config_error() {
    assert!(matches!("ModelView".parse::<UniformField>(), Err(Error::Config(_))));
}

// ============================================================================
// Tests: sizes
// ============================================================================

#[test]
fn test_byte_sizes() {
    let limits = ShaderLimits::default();
    assert_eq!(UniformField::Model.byte_size(&limits), 64);
    assert_eq!(UniformField::ViewProjectionList.byte_size(&limits), 64 * 6);
    assert_eq!(UniformField::ViewProjectionListSize.byte_size(&limits), 16);
    assert_eq!(UniformField::CameraPosition.byte_size(&limits), 16);
    assert_eq!(UniformField::MaterialInfo.byte_size(&limits), 48);
    assert_eq!(UniformField::LightInfo.byte_size(&limits), 16);
    assert_eq!(UniformField::LightDirectional.byte_size(&limits), 48);
    assert_eq!(UniformField::LightPoint.byte_size(&limits), 48 * 4);
    assert_eq!(UniformField::LightDirectViewProjectionList.byte_size(&limits), 64 * 5);
    assert_eq!(UniformField::LightPointViewProjectionList.byte_size(&limits), 64 * 4 * 6);
    assert_eq!(UniformField::BoneMatrices.byte_size(&limits), 64 * 64);
    assert_eq!(UniformField::Time.byte_size(&limits), 4);
    assert_eq!(UniformField::ParticleCount.byte_size(&limits), 4);
    assert_eq!(UniformField::SpritesheetSize.byte_size(&limits), 8);
}

#[test]
fn test_block_size() {
    let fields = [UniformField::Model, UniformField::Time, UniformField::ClipPlane];
    assert_eq!(UniformField::block_size(&fields, &ShaderLimits::default()), 64 + 4 + 16);
}

#[test]
fn test_every_write_matches_byte_size() {
    let lights = LightSet {
        directional: None,
        points: vec![PointLight::new(Vec3::ZERO, Vec3::ONE)],
    };
    let frame = snapshot(&lights);
    let entity = EntityUniforms {
        bones: vec![Mat4::IDENTITY; 3],
        ..Default::default()
    };
    for field in UniformField::ALL {
        let bytes = write(field, &frame, &entity);
        assert_eq!(bytes.len() as u64, field.byte_size(&ShaderLimits::default()), "{}", field);
    }
}

// ============================================================================
// Tests: contents
// ============================================================================

#[test]
fn test_model_contents() {
    let frame = snapshot(&LightSet::default());
    let entity = EntityUniforms::default().with_model(Mat4::from_translation(Vec3::new(7.0, 8.0, 9.0)));
    let bytes = write(UniformField::Model, &frame, &entity);
    assert_eq!(f32_at(&bytes, 12), 7.0);
    assert_eq!(f32_at(&bytes, 13), 8.0);
    assert_eq!(f32_at(&bytes, 14), 9.0);
}

#[test]
fn test_camera_position_and_time() {
    let frame = snapshot(&LightSet::default());
    let entity = EntityUniforms::default();
    let position = write(UniformField::CameraPosition, &frame, &entity);
    assert_eq!([f32_at(&position, 0), f32_at(&position, 1), f32_at(&position, 2)], [1.0, 2.0, 3.0]);
    assert_eq!(f32_at(&write(UniformField::Time, &frame, &entity), 0), 2.5);
    assert_eq!(f32_at(&write(UniformField::DeltaTime, &frame, &entity), 0), 0.5);
}

#[test]
fn test_lists_are_zero_padded() {
    let frame = snapshot(&LightSet::default());
    let entity = EntityUniforms {
        bones: vec![Mat4::IDENTITY],
        ..Default::default()
    };
    let bones = write(UniformField::BoneMatrices, &frame, &entity);
    assert_eq!(f32_at(&bones, 0), 1.0);
    assert!(bones[64..].iter().all(|&b| b == 0));
}

#[test]
fn test_view_projection_list_size() {
    let frame = snapshot(&LightSet::default());
    let bytes = write(UniformField::ViewProjectionListSize, &frame, &EntityUniforms::default());
    assert_eq!(i32::from_ne_bytes(bytes[0..4].try_into().unwrap()), 1);
}
