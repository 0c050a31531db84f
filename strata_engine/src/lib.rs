/*!
# Strata Engine

Multi-pass frame orchestrator for explicit GPU APIs.

Every frame the engine decides which passes run, in which order, with which
command buffers and which semaphores chain them, and keeps per-entity GPU
state (uniform buffers, descriptor sets) alive across the frames in flight.
The GPU is reached through the `GpuDevice` trait; the Vulkan implementation
lives in `strata_engine_renderer_vulkan`.

## Architecture

- **Engine**: explicit context owning every subsystem
- **FrameScheduler**: records and submits the passes of one frame
- **PassTable / SyncChain**: configured passes and their semaphore chain
- **TargetManager**: shadow, water, screen-quad, post-effect and main targets
- **MaterialManager**: materials, per-entity instances, uniform writes
- **SamplerRegistry**: render-target outputs looked up by texture kind
- **Scene**: read-only traversal interfaces implemented by the caller
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod settings;
pub mod camera;
pub mod device;
pub mod frame;
pub mod pass;
pub mod command;
pub mod sampler;
pub mod scene;
pub mod uniform;
pub mod material;
pub mod target;
pub mod scheduler;

// Main strata namespace module
pub mod strata {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine context and frame scheduling
    pub use crate::engine::Engine;
    pub use crate::scheduler::{FrameScheduler, FrameStatus, ComputeDesc, ComputePipeline};
    pub use crate::settings::{EngineSettings, PostEffectSettings, PresentMode, ShaderLimits};

    // Device seam
    pub use crate::device::{GpuDevice, DeviceManager};

    // Scene interfaces
    pub use crate::scene::{
        Scene, SceneNode, Drawable, Computable, Capability, EntityKey, DrawFlags,
        WaterSurface, DrawCommands, DispatchCommands, LightSet, DirectionalLight, PointLight,
    };
    pub use crate::camera::Camera;

    // Materials
    pub use crate::material::{
        MaterialDesc, ShaderDesc, TextureBinding, UniformField, MaterialKey, MaterialManager,
    };
    pub use crate::pass::PassKind;
    pub use crate::sampler::TextureKind;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, set_logger, reset_logger};
    }
}

// Re-export math library at crate root
pub use glam;
