/// Scene lights
///
/// Lights are plain data owned by the scene. Each one exposes the
/// view-projection matrices its shadow map is rendered with.

use glam::{Mat4, Vec3};

/// Sun-like light
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels (normalized on construction)
    pub direction: Vec3,
    pub color: Vec3,
    /// One view-projection per shadow cascade, nearest first
    pub cascade_view_projections: Vec<Mat4>,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            color,
            cascade_view_projections: Vec::new(),
        }
    }

    /// Orthographic light matrix covering a box of `half_extent` around `center`
    pub fn fit_cascade(&self, center: Vec3, half_extent: f32) -> Mat4 {
        let up = if self.direction.abs().dot(Vec3::Y) > 0.99 { Vec3::Z } else { Vec3::Y };
        let eye = center - self.direction * half_extent * 2.0;
        let view = Mat4::look_at_rh(eye, center, up);
        let projection = Mat4::orthographic_rh(
            -half_extent, half_extent,
            -half_extent, half_extent,
            0.0, half_extent * 4.0,
        );
        projection * view
    }
}

/// Omni light with a cube shadow map
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    /// Constant, linear and quadratic attenuation
    pub attenuation: Vec3,
    /// Far plane of the cube shadow projection
    pub range: f32,
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            color,
            attenuation: Vec3::new(1.0, 0.09, 0.032),
            range: 100.0,
        }
    }

    /// View-projections of the six cube faces (+X, -X, +Y, -Y, +Z, -Z)
    pub fn face_view_projections(&self) -> [Mat4; 6] {
        const FACES: [(Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::NEG_Y),
            (Vec3::NEG_X, Vec3::NEG_Y),
            (Vec3::Y, Vec3::Z),
            (Vec3::NEG_Y, Vec3::NEG_Z),
            (Vec3::Z, Vec3::NEG_Y),
            (Vec3::NEG_Z, Vec3::NEG_Y),
        ];
        let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, self.range);
        FACES.map(|(forward, up)| {
            projection * Mat4::look_at_rh(self.position, self.position + forward, up)
        })
    }
}

/// Every light of a scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightSet {
    pub directional: Option<DirectionalLight>,
    pub points: Vec<PointLight>,
}

impl LightSet {
    pub fn is_empty(&self) -> bool {
        self.directional.is_none() && self.points.is_empty()
    }
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
