/// Uniform fields a shader stage declares
///
/// A stage's uniform block is the concatenation of its fields in declared
/// order. Each field has an exact byte size; list fields are padded with
/// zeros up to the maximum declared in `ShaderLimits`.

use std::fmt;
use std::str::FromStr;
use glam::Mat4;
use crate::error::{Error, Result};
use crate::settings::ShaderLimits;
use crate::uniform::UniformView;

const MAT4_SIZE: u64 = 64;
const VEC4_SIZE: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformField {
    Model,
    View,
    Projection,
    InverseModel,
    ModelViewProjection,
    ViewProjection,
    ViewProjectionList,
    ViewProjectionListSize,
    CameraPosition,
    ClipPlane,
    MaterialInfo,
    LightInfo,
    LightDirectional,
    LightPoint,
    LightDirectViewProjectionList,
    LightPointViewProjectionList,
    BoneMatrices,
    Time,
    DeltaTime,
    ParticleCount,
    SpritesheetSize,
}

impl UniformField {
    pub const ALL: [UniformField; 21] = [
        UniformField::Model,
        UniformField::View,
        UniformField::Projection,
        UniformField::InverseModel,
        UniformField::ModelViewProjection,
        UniformField::ViewProjection,
        UniformField::ViewProjectionList,
        UniformField::ViewProjectionListSize,
        UniformField::CameraPosition,
        UniformField::ClipPlane,
        UniformField::MaterialInfo,
        UniformField::LightInfo,
        UniformField::LightDirectional,
        UniformField::LightPoint,
        UniformField::LightDirectViewProjectionList,
        UniformField::LightPointViewProjectionList,
        UniformField::BoneMatrices,
        UniformField::Time,
        UniformField::DeltaTime,
        UniformField::ParticleCount,
        UniformField::SpritesheetSize,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UniformField::Model => "Model",
            UniformField::View => "View",
            UniformField::Projection => "Projection",
            UniformField::InverseModel => "InverseModel",
            UniformField::ModelViewProjection => "ModelViewProjection",
            UniformField::ViewProjection => "ViewProjection",
            UniformField::ViewProjectionList => "ViewProjectionList",
            UniformField::ViewProjectionListSize => "ViewProjectionListSize",
            UniformField::CameraPosition => "CameraPosition",
            UniformField::ClipPlane => "ClipPlane",
            UniformField::MaterialInfo => "MaterialInfo",
            UniformField::LightInfo => "LightInfo",
            UniformField::LightDirectional => "LightDirectional",
            UniformField::LightPoint => "LightPoint",
            UniformField::LightDirectViewProjectionList => "LightDirectViewProjectionList",
            UniformField::LightPointViewProjectionList => "LightPointViewProjectionList",
            UniformField::BoneMatrices => "BoneMatrices",
            UniformField::Time => "Time",
            UniformField::DeltaTime => "DeltaTime",
            UniformField::ParticleCount => "ParticleCount",
            UniformField::SpritesheetSize => "SpritesheetSize",
        }
    }

    /// Exact size in bytes, lists padded to their limit
    pub fn byte_size(&self, limits: &ShaderLimits) -> u64 {
        match self {
            UniformField::Model
            | UniformField::View
            | UniformField::Projection
            | UniformField::InverseModel
            | UniformField::ModelViewProjection
            | UniformField::ViewProjection => MAT4_SIZE,
            UniformField::ViewProjectionList => MAT4_SIZE * limits.max_view_projections as u64,
            UniformField::ViewProjectionListSize
            | UniformField::CameraPosition
            | UniformField::ClipPlane
            | UniformField::LightInfo => VEC4_SIZE,
            UniformField::MaterialInfo | UniformField::LightDirectional => 48,
            UniformField::LightPoint => 48 * limits.max_point_lights as u64,
            UniformField::LightDirectViewProjectionList => MAT4_SIZE * limits.max_cascades as u64,
            UniformField::LightPointViewProjectionList => {
                MAT4_SIZE * limits.max_point_lights as u64 * 6
            }
            UniformField::BoneMatrices => MAT4_SIZE * limits.max_bones as u64,
            UniformField::Time | UniformField::DeltaTime | UniformField::ParticleCount => 4,
            UniformField::SpritesheetSize => 8,
        }
    }

    /// Total size of a block of fields
    pub fn block_size(fields: &[UniformField], limits: &ShaderLimits) -> u64 {
        fields.iter().map(|f| f.byte_size(limits)).sum()
    }

    /// Append this field's bytes for `view` to `out`
    pub fn write(&self, view: &UniformView<'_>, limits: &ShaderLimits, out: &mut Vec<u8>) {
        let start = out.len();
        let frame = view.frame;
        let entity = view.entity;

        match self {
            UniformField::Model => push_mat4(out, &entity.model),
            UniformField::View => push_mat4(out, &frame.view()),
            UniformField::Projection => push_mat4(out, &frame.projection()),
            UniformField::InverseModel => push_mat4(out, &entity.model.inverse()),
            UniformField::ModelViewProjection => {
                push_mat4(out, &(frame.view_projection() * entity.model))
            }
            UniformField::ViewProjection => push_mat4(out, &frame.view_projection()),
            UniformField::ViewProjectionList => {
                push_mat4_list(out, frame.view_projections(), limits.max_view_projections)
            }
            UniformField::ViewProjectionListSize => {
                let count = frame.view_projections().len().min(limits.max_view_projections as usize);
                out.extend_from_slice(bytemuck::bytes_of(&[count as i32, 0, 0, 0]));
            }
            UniformField::CameraPosition => {
                out.extend_from_slice(bytemuck::bytes_of(&frame.camera_position().to_array()))
            }
            UniformField::ClipPlane => {
                out.extend_from_slice(bytemuck::bytes_of(&frame.clip_plane().to_array()))
            }
            UniformField::MaterialInfo => {
                out.extend_from_slice(bytemuck::bytes_of(&entity.material_info))
            }
            UniformField::LightInfo => out.extend_from_slice(bytemuck::bytes_of(&frame.light_info())),
            UniformField::LightDirectional => {
                out.extend_from_slice(bytemuck::bytes_of(&frame.light_directional()))
            }
            UniformField::LightPoint => {
                let points = frame.light_points();
                let count = points.len().min(limits.max_point_lights as usize);
                out.extend_from_slice(bytemuck::cast_slice(&points[..count]));
            }
            UniformField::LightDirectViewProjectionList => push_mat4_list(
                out,
                frame.light_direct_view_projections(),
                limits.max_cascades,
            ),
            UniformField::LightPointViewProjectionList => push_mat4_list(
                out,
                frame.light_point_view_projections(),
                limits.max_point_lights * 6,
            ),
            UniformField::BoneMatrices => push_mat4_list(out, &entity.bones, limits.max_bones),
            UniformField::Time => out.extend_from_slice(&frame.time().to_ne_bytes()),
            UniformField::DeltaTime => out.extend_from_slice(&frame.delta_time().to_ne_bytes()),
            UniformField::ParticleCount => out.extend_from_slice(&entity.particle_count.to_ne_bytes()),
            UniformField::SpritesheetSize => {
                out.extend_from_slice(bytemuck::bytes_of(&entity.spritesheet_size))
            }
        }

        // Pad lists up to their declared maximum
        out.resize(start + self.byte_size(limits) as usize, 0);
    }
}

fn push_mat4(out: &mut Vec<u8>, matrix: &Mat4) {
    out.extend_from_slice(bytemuck::bytes_of(&matrix.to_cols_array()));
}

fn push_mat4_list(out: &mut Vec<u8>, matrices: &[Mat4], max: u32) {
    for matrix in matrices.iter().take(max as usize) {
        push_mat4(out, matrix);
    }
}

impl fmt::Display for UniformField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UniformField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        UniformField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| crate::engine_config_err!("strata::UniformField",
                "Unknown uniform field '{}'", s))
    }
}

#[cfg(test)]
#[path = "uniform_field_tests.rs"]
mod tests;
