//! Material module
//!
//! Material descriptions, uniform field writers, and the material instance
//! manager that owns every per-entity uniform buffer and descriptor set.

mod uniform_field;
mod material_desc;
mod material;
mod material_manager;

pub use uniform_field::UniformField;
pub use material_desc::{MaterialDesc, ShaderDesc, TextureBinding};
pub use material::{Material, MaterialContext, UniformWrite, InstancedDraw};
pub use material_manager::{MaterialManager, MaterialKey};
