/// Tests for UniformSnapshot

use glam::{Mat4, Vec3, Vec4};
use super::*;
use crate::scene::{DirectionalLight, PointLight};

fn camera() -> Camera {
    let mut camera = Camera::new(Vec3::new(0.0, 4.0, 10.0), 1.0, 1.5, 0.1, 100.0);
    camera.set_yaw_pitch_roll(0.0, -0.3, 0.0);
    camera
}

fn lights() -> LightSet {
    let mut sun = DirectionalLight::new(Vec3::new(0.0, -1.0, -1.0), Vec3::ONE);
    sun.cascade_view_projections = vec![Mat4::IDENTITY, Mat4::from_scale(Vec3::splat(2.0))];
    LightSet {
        directional: Some(sun),
        points: vec![
            PointLight::new(Vec3::ZERO, Vec3::X),
            PointLight::new(Vec3::ONE, Vec3::Y),
        ],
    }
}

fn snapshot() -> UniformSnapshot {
    UniformSnapshot::build(&camera(), &lights(), &ShaderLimits::default(), 1.5, 0.016)
}

// ============================================================================
// Tests: build
// ============================================================================

#[test]
fn test_build_from_camera() {
    let snap = snapshot();
    let cam = camera();
    assert_eq!(snap.view(), cam.view_matrix());
    assert_eq!(snap.projection(), cam.projection_matrix());
    assert_eq!(snap.camera_position(), Vec4::new(0.0, 4.0, 10.0, 1.0));
    assert_eq!(snap.clip_plane(), Vec4::ZERO);
    assert_eq!(snap.view_projections(), &[snap.view_projection()]);
    assert_eq!(snap.time(), 1.5);
    assert_eq!(snap.delta_time(), 0.016);
}

#[test]
fn test_build_lights() {
    let snap = snapshot();
    let info = snap.light_info();
    assert_eq!(info.directional_count, 1);
    assert_eq!(info.point_count, 2);
    assert_eq!(info.cascade_count, 2);
    assert_eq!(snap.light_points().len(), 2);
    assert_eq!(snap.light_points()[1].color, [0.0, 1.0, 0.0, 1.0]);
    assert_eq!(snap.light_point_view_projections().len(), 12);
    assert_eq!(snap.light_direct_view_projections().len(), 2);
}

#[test]
fn test_lights_clamped_to_limits() {
    let limits = ShaderLimits { max_point_lights: 1, max_cascades: 1, ..Default::default() };
    let snap = UniformSnapshot::build(&camera(), &lights(), &limits, 0.0, 0.0);
    assert_eq!(snap.light_points().len(), 1);
    assert_eq!(snap.light_point_view_projections().len(), 6);
    assert_eq!(snap.light_direct_view_projections().len(), 1);
}

#[test]
fn test_no_lights() {
    let snap = UniformSnapshot::build(&camera(), &LightSet::default(),
        &ShaderLimits::default(), 0.0, 0.0);
    assert_eq!(snap.light_info(), LightInfo::default());
    assert!(snap.light_points().is_empty());
}

// ============================================================================
// Tests: per-pass variants
// ============================================================================

#[test]
fn test_water_clip_planes_are_opposite() {
    let snap = snapshot();
    let reflection = snap.for_water_reflection(1.0);
    let refraction = snap.for_water_refraction(1.0);
    assert_eq!(reflection.clip_plane(), Vec4::new(0.0, 1.0, 0.0, 1.0));
    assert_eq!(refraction.clip_plane(), Vec4::new(0.0, -1.0, 0.0, 1.0));
}

#[test]
fn test_reflection_uses_mirrored_camera() {
    let snap = snapshot();
    let reflection = snap.for_water_reflection(1.0);
    let mirrored = camera().mirrored(1.0);

    assert_eq!(reflection.view(), mirrored.view_matrix());
    // y' = 4 - 2 * (4 - 1) = -2
    assert_eq!(reflection.camera_position(), Vec4::new(0.0, -2.0, 10.0, 1.0));
    assert_eq!(reflection.projection(), snap.projection());
    assert_eq!(reflection.view_projections(), &[reflection.view_projection()]);
}

#[test]
fn test_variants_leave_frame_snapshot_untouched() {
    let snap = snapshot();
    let before = snap.clone();
    let _ = snap.for_water_reflection(1.0);
    let _ = snap.for_water_refraction(1.0);
    let _ = snap.for_shadow_direct();
    assert_eq!(snap, before);
}

#[test]
fn test_refraction_keeps_camera() {
    let snap = snapshot();
    let refraction = snap.for_water_refraction(1.0);
    assert_eq!(refraction.view(), snap.view());
    assert_eq!(refraction.camera_position(), snap.camera_position());
}

#[test]
fn test_shadow_variants_carry_light_matrices() {
    let snap = snapshot();
    assert_eq!(snap.for_shadow_direct().view_projections(), snap.light_direct_view_projections());
    assert_eq!(snap.for_shadow_point().view_projections().len(), 12);
}

// ============================================================================
// Tests: EntityUniforms
// ============================================================================

#[test]
fn test_entity_uniforms_default() {
    let entity = EntityUniforms::default();
    assert_eq!(entity.model, Mat4::IDENTITY);
    assert_eq!(entity.spritesheet_size, [1, 1]);

    let moved = entity.with_model(Mat4::from_translation(Vec3::X));
    assert_eq!(moved.model.w_axis, Vec4::new(1.0, 0.0, 0.0, 1.0));
}
