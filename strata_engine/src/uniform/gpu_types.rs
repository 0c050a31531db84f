/// GPU-layout uniform blocks
///
/// `#[repr(C)]` + `Pod` structs copied byte for byte into uniform buffers.
/// Sizes are fixed and match the shader declarations.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use crate::scene::{DirectionalLight, PointLight};

/// Phong material colors (48 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialInfo {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

impl Default for MaterialInfo {
    fn default() -> Self {
        Self {
            ambient: [0.1, 0.1, 0.1, 1.0],
            diffuse: [1.0, 1.0, 1.0, 1.0],
            specular: [0.5, 0.5, 0.5, 32.0],
        }
    }
}

/// Light counts as an ivec4 (16 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct LightInfo {
    pub directional_count: i32,
    pub point_count: i32,
    pub cascade_count: i32,
    pub _padding: i32,
}

/// Directional light block (48 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LightDirectional {
    pub direction: [f32; 4],
    pub color: [f32; 4],
    pub ambient: [f32; 4],
}

impl From<&DirectionalLight> for LightDirectional {
    fn from(light: &DirectionalLight) -> Self {
        Self {
            direction: light.direction.extend(0.0).to_array(),
            color: light.color.extend(1.0).to_array(),
            ambient: (light.color * 0.1).extend(1.0).to_array(),
        }
    }
}

/// Point light block (48 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LightPoint {
    pub position: [f32; 4],
    pub color: [f32; 4],
    /// Constant, linear, quadratic, range
    pub attenuation: [f32; 4],
}

impl From<&PointLight> for LightPoint {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.extend(1.0).to_array(),
            color: light.color.extend(1.0).to_array(),
            attenuation: Vec4::new(
                light.attenuation.x,
                light.attenuation.y,
                light.attenuation.z,
                light.range,
            )
            .to_array(),
        }
    }
}

const _: () = assert!(std::mem::size_of::<MaterialInfo>() == 48);
const _: () = assert!(std::mem::size_of::<LightInfo>() == 16);
const _: () = assert!(std::mem::size_of::<LightDirectional>() == 48);
const _: () = assert!(std::mem::size_of::<LightPoint>() == 48);
