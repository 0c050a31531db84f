/// Render-target pass - the contract every pass-owning target fulfils
///
/// A target records one pass per frame: `start_pass` opens a command buffer
/// through the device manager's sync chain and begins the render pass,
/// `end_pass` closes both. The sync chain tracks the pass state, so a start
/// without an end (or a second start) is rejected.

use std::sync::Arc;
use crate::error::Result;
use crate::command::BufferIndex;
use crate::device::{CommandBufferHandle, DeviceManager, Extent2D, GpuDevice, SwapchainInfo};
use crate::pass::{PassKind, PassRegistry, PassTable};
use crate::sampler::SamplerRegistry;
use crate::settings::EngineSettings;

/// Engine state targets are created and recreated against
pub struct TargetContext<'a> {
    pub device: &'a Arc<dyn GpuDevice>,
    pub registry: &'a PassRegistry,
    pub table: &'a PassTable,
    pub settings: &'a EngineSettings,
    pub swapchain: SwapchainInfo,
    pub samplers: &'a mut SamplerRegistry,
}

/// How a target's extent follows the swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSize {
    /// Never changes
    Fixed(Extent2D),
    /// Swapchain extent
    Swapchain,
    /// Fixed width, height scaled by the swapchain aspect ratio
    AspectWidth(u32),
}

impl TargetSize {
    pub fn resolve(&self, swapchain: Extent2D) -> Extent2D {
        match *self {
            TargetSize::Fixed(extent) => extent,
            TargetSize::Swapchain => swapchain,
            TargetSize::AspectWidth(width) => {
                let height = (width as f32 / swapchain.aspect_ratio()).round() as u32;
                Extent2D::new(width, height.max(1))
            }
        }
    }

    pub fn follows_swapchain(&self) -> bool {
        !matches!(self, TargetSize::Fixed(_))
    }
}

pub trait RenderTargetPass {
    /// Pass this target records
    fn pass_kind(&self) -> PassKind;

    /// Current render area
    fn extent(&self) -> Extent2D;

    /// Advance the target's command pool rotation (once per frame)
    fn reallocate_command_buffers(&mut self) -> Result<()>;

    /// Open `buffer` for this pass and begin the render pass
    fn start_pass(
        &mut self,
        device_manager: &mut DeviceManager,
        buffer: BufferIndex,
        image_index: u32,
    ) -> Result<CommandBufferHandle>;

    /// End the render pass and the command buffer opened by `start_pass`
    fn end_pass(&mut self, device_manager: &mut DeviceManager, command_buffer: CommandBufferHandle) -> Result<()>;

    /// Swapchain or pass registry changed: rebuild GPU objects and republish
    fn recreate(&mut self, ctx: &mut TargetContext<'_>) -> Result<()>;
}

/// Implement `RenderTargetPass` for a wrapper holding an `OffscreenTarget`
/// in its `target` field
macro_rules! delegate_offscreen_pass {
    ($wrapper:ty) => {
        impl $crate::target::RenderTargetPass for $wrapper {
            fn pass_kind(&self) -> $crate::pass::PassKind {
                self.target.pass_kind()
            }

            fn extent(&self) -> $crate::device::Extent2D {
                self.target.extent()
            }

            fn reallocate_command_buffers(&mut self) -> $crate::error::Result<()> {
                self.target.reallocate_command_buffers()
            }

            fn start_pass(
                &mut self,
                device_manager: &mut $crate::device::DeviceManager,
                buffer: $crate::command::BufferIndex,
                image_index: u32,
            ) -> $crate::error::Result<$crate::device::CommandBufferHandle> {
                self.target.start_pass(device_manager, buffer, image_index)
            }

            fn end_pass(
                &mut self,
                device_manager: &mut $crate::device::DeviceManager,
                command_buffer: $crate::device::CommandBufferHandle,
            ) -> $crate::error::Result<()> {
                self.target.end_pass(device_manager, command_buffer)
            }

            fn recreate(&mut self, ctx: &mut $crate::target::TargetContext<'_>) -> $crate::error::Result<()> {
                self.target.recreate(ctx)
            }
        }
    };
}

pub(crate) use delegate_offscreen_pass;
