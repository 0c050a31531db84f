//! Camera module
//!
//! Viewer position, orientation and projection, with the water-plane mirror
//! used by the reflection pass.

mod camera;

pub use camera::Camera;
