/// Per-frame uniform snapshot
///
/// Built once per frame from the camera, the lights and the clock, then
/// never mutated. Passes that need different values (water clip planes,
/// shadow view-projections) derive a new snapshot from the frame's one.
/// Per-entity data is combined by reference in a `UniformView`.

use glam::{Mat4, Vec4};
use crate::camera::Camera;
use crate::scene::LightSet;
use crate::settings::ShaderLimits;
use super::gpu_types::{MaterialInfo, LightInfo, LightDirectional, LightPoint};

#[derive(Debug, Clone, PartialEq)]
pub struct UniformSnapshot {
    camera: Camera,
    view: Mat4,
    projection: Mat4,
    camera_position: Vec4,
    clip_plane: Vec4,
    view_projections: Vec<Mat4>,
    light_info: LightInfo,
    light_directional: LightDirectional,
    light_points: Vec<LightPoint>,
    light_direct_view_projections: Vec<Mat4>,
    light_point_view_projections: Vec<Mat4>,
    time: f32,
    delta_time: f32,
}

impl UniformSnapshot {
    /// Snapshot of the frame as seen from `camera`
    ///
    /// Lights beyond the shader limits are dropped.
    pub fn build(
        camera: &Camera,
        lights: &LightSet,
        limits: &ShaderLimits,
        time: f32,
        delta_time: f32,
    ) -> Self {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();

        let point_lights: Vec<_> = lights
            .points
            .iter()
            .take(limits.max_point_lights as usize)
            .collect();
        let light_direct_view_projections: Vec<Mat4> = lights
            .directional
            .as_ref()
            .map(|light| {
                light
                    .cascade_view_projections
                    .iter()
                    .take(limits.max_cascades as usize)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            camera: camera.clone(),
            view,
            projection,
            camera_position: camera.position().extend(1.0),
            clip_plane: Vec4::ZERO,
            view_projections: vec![projection * view],
            light_info: LightInfo {
                directional_count: i32::from(lights.directional.is_some()),
                point_count: point_lights.len() as i32,
                cascade_count: light_direct_view_projections.len() as i32,
                _padding: 0,
            },
            light_directional: lights
                .directional
                .as_ref()
                .map(LightDirectional::from)
                .unwrap_or_default(),
            light_points: point_lights.iter().map(|&light| LightPoint::from(light)).collect(),
            light_point_view_projections: point_lights
                .iter()
                .flat_map(|light| light.face_view_projections())
                .collect(),
            light_direct_view_projections,
            time,
            delta_time,
        }
    }

    // ===== PER-PASS VARIANTS =====

    /// Reflection pass: camera mirrored about the water plane, clip below it
    pub fn for_water_reflection(&self, water_height: f32) -> Self {
        let mirrored = self.camera.mirrored(water_height);
        let view = mirrored.view_matrix();
        Self {
            view,
            camera_position: mirrored.position().extend(1.0),
            clip_plane: Vec4::new(0.0, 1.0, 0.0, water_height),
            view_projections: vec![self.projection * view],
            camera: mirrored,
            ..self.clone()
        }
    }

    /// Refraction pass: same camera, clip above the water plane
    pub fn for_water_refraction(&self, water_height: f32) -> Self {
        Self {
            clip_plane: Vec4::new(0.0, -1.0, 0.0, water_height),
            ..self.clone()
        }
    }

    /// Directional shadow pass: one view-projection per cascade layer
    pub fn for_shadow_direct(&self) -> Self {
        Self {
            view_projections: self.light_direct_view_projections.clone(),
            ..self.clone()
        }
    }

    /// Point shadow pass: six cube faces per light
    pub fn for_shadow_point(&self) -> Self {
        Self {
            view_projections: self.light_point_view_projections.clone(),
            ..self.clone()
        }
    }

    // ===== GETTERS =====

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn camera_position(&self) -> Vec4 {
        self.camera_position
    }

    pub fn clip_plane(&self) -> Vec4 {
        self.clip_plane
    }

    pub fn view_projections(&self) -> &[Mat4] {
        &self.view_projections
    }

    pub fn light_info(&self) -> LightInfo {
        self.light_info
    }

    pub fn light_directional(&self) -> LightDirectional {
        self.light_directional
    }

    pub fn light_points(&self) -> &[LightPoint] {
        &self.light_points
    }

    pub fn light_direct_view_projections(&self) -> &[Mat4] {
        &self.light_direct_view_projections
    }

    pub fn light_point_view_projections(&self) -> &[Mat4] {
        &self.light_point_view_projections
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }
}

/// Per-entity uniform data supplied by a drawable
#[derive(Debug, Clone, PartialEq)]
pub struct EntityUniforms {
    pub model: Mat4,
    pub bones: Vec<Mat4>,
    pub material_info: MaterialInfo,
    pub particle_count: u32,
    /// Columns and rows of a sprite sheet
    pub spritesheet_size: [i32; 2],
}

impl Default for EntityUniforms {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            bones: Vec::new(),
            material_info: MaterialInfo::default(),
            particle_count: 0,
            spritesheet_size: [1, 1],
        }
    }
}

impl EntityUniforms {
    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model = model;
        self
    }
}

/// Frame snapshot + entity data, read by the uniform writers
#[derive(Debug, Clone, Copy)]
pub struct UniformView<'a> {
    pub frame: &'a UniformSnapshot,
    pub entity: &'a EntityUniforms,
}

impl<'a> UniformView<'a> {
    pub fn new(frame: &'a UniformSnapshot, entity: &'a EntityUniforms) -> Self {
        Self { frame, entity }
    }
}

#[cfg(test)]
#[path = "uniform_snapshot_tests.rs"]
mod tests;
