/// Main target - the swapchain
///
/// Renders into the framebuffer of the acquired image. Its command buffers
/// come from the device manager's rotation, keyed by image index.

use std::sync::Arc;
use crate::error::Result;
use crate::command::BufferIndex;
use crate::device::{
    CommandBufferHandle, DeviceManager, Extent2D, GpuDevice, GpuSwapchainFramebuffers,
    RenderPassHandle, RenderTargetLayout,
};
use crate::pass::{PassKind, PassRegistry};
use super::render_target_pass::{RenderTargetPass, TargetContext};

const SOURCE: &str = "strata::MainTarget";

pub struct MainTarget {
    device: Arc<dyn GpuDevice>,
    layout: RenderTargetLayout,
    render_pass: RenderPassHandle,
    framebuffers: GpuSwapchainFramebuffers,
    extent: Extent2D,
}

impl MainTarget {
    pub fn new(ctx: &mut TargetContext<'_>) -> Result<Self> {
        let layout = PassRegistry::layout(ctx.table, PassKind::Main)?.clone();
        let render_pass = ctx.registry.render_pass(PassKind::Main)?;
        let framebuffers = GpuSwapchainFramebuffers::new(ctx.device, render_pass, &layout)?;
        Ok(Self {
            device: Arc::clone(ctx.device),
            layout,
            render_pass,
            framebuffers,
            extent: ctx.swapchain.extent,
        })
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }
}

impl RenderTargetPass for MainTarget {
    fn pass_kind(&self) -> PassKind {
        PassKind::Main
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    /// The device manager rotates the main pass buffers
    fn reallocate_command_buffers(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_pass(
        &mut self,
        device_manager: &mut DeviceManager,
        buffer: BufferIndex,
        image_index: u32,
    ) -> Result<CommandBufferHandle> {
        let Some(framebuffer) = self.framebuffers.get(image_index) else {
            return Err(crate::engine_state_err!(SOURCE,
                "No framebuffer for swapchain image {} ({} images)", image_index, self.framebuffers.len()));
        };
        let command_buffer = device_manager.create_or_get_command_buffer(buffer)?;
        device_manager.begin_pass(PassKind::Main, command_buffer)?;
        self.device.cmd_begin_render_pass(
            command_buffer,
            self.render_pass,
            framebuffer,
            self.extent,
            &self.layout.clear_values(),
        );
        Ok(command_buffer)
    }

    fn end_pass(&mut self, device_manager: &mut DeviceManager, command_buffer: CommandBufferHandle) -> Result<()> {
        self.device.cmd_end_render_pass(command_buffer);
        let ended = device_manager.end_pass(PassKind::Main)?;
        if ended != command_buffer {
            return Err(crate::engine_state_err!(SOURCE,
                "Main pass ended {:?} but was started with {:?}", ended, command_buffer));
        }
        Ok(())
    }

    fn recreate(&mut self, ctx: &mut TargetContext<'_>) -> Result<()> {
        self.layout = PassRegistry::layout(ctx.table, PassKind::Main)?.clone();
        self.render_pass = ctx.registry.render_pass(PassKind::Main)?;
        self.framebuffers = GpuSwapchainFramebuffers::new(ctx.device, self.render_pass, &self.layout)?;
        self.extent = ctx.swapchain.extent;
        Ok(())
    }
}
