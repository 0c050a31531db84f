//! In-flight frame synchronization
//!
//! Bounds how many frames the CPU may queue ahead of the GPU.

mod frame_sync;

pub use frame_sync::{FrameSync, DEFAULT_FRAMES_IN_FLIGHT};
