//! Scene module
//!
//! Read-only interfaces the frame scheduler traverses: scene root, nodes,
//! drawables, computables and lights. The camera lives in `crate::camera`
//! and is re-exported here.

mod scene;
mod light;

pub use scene::{
    Scene, SceneNode, Drawable, Computable, Capability, EntityKey, DrawFlags,
    WaterSurface, DrawCommands, DispatchCommands,
};
pub use light::{LightSet, DirectionalLight, PointLight};
pub use crate::camera::Camera;
