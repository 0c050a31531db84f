//! Uniform module
//!
//! Immutable per-frame snapshot, per-entity uniform data and the GPU-layout
//! blocks written into uniform buffers.

mod uniform_snapshot;
mod gpu_types;

pub use uniform_snapshot::{UniformSnapshot, EntityUniforms, UniformView};
pub use gpu_types::{MaterialInfo, LightInfo, LightDirectional, LightPoint};
