/// Offscreen target - one render target sampled by later passes
///
/// Owns the GPU images of a pass, a command pool rotation of its own and the
/// registry entries its outputs are published under. Output i is published
/// as `(texture, first_sub_index + i)`, replicated for every swapchain image.

use std::sync::Arc;
use crate::error::Result;
use crate::command::{BufferIndex, CommandBufferManager};
use crate::device::{
    CommandBufferHandle, DeviceManager, Extent2D, GpuDevice, GpuRenderTarget, RenderPassHandle,
    RenderTargetDesc, RenderTargetLayout, SamplerBinding,
};
use crate::pass::{PassKind, PassRegistry};
use crate::sampler::TextureKind;
use super::render_target_pass::{RenderTargetPass, TargetContext, TargetSize};

const SOURCE: &str = "strata::OffscreenTarget";

pub struct OffscreenTarget {
    device: Arc<dyn GpuDevice>,
    kind: PassKind,
    texture: TextureKind,
    first_sub_index: u32,
    size: TargetSize,
    layout: RenderTargetLayout,
    render_pass: RenderPassHandle,
    target: GpuRenderTarget,
    commands: CommandBufferManager,
}

impl OffscreenTarget {
    pub fn new(
        ctx: &mut TargetContext<'_>,
        kind: PassKind,
        texture: TextureKind,
        first_sub_index: u32,
        size: TargetSize,
    ) -> Result<Self> {
        let layout = PassRegistry::layout(ctx.table, kind)?.clone();
        let render_pass = ctx.registry.render_pass(kind)?;
        let target = Self::create_target(ctx.device, kind, &layout, render_pass,
            size.resolve(ctx.swapchain.extent))?;
        let commands = CommandBufferManager::new(
            ctx.device,
            CommandBufferManager::pool_count_for(ctx.swapchain.image_count, ctx.settings.frames_in_flight),
        )?;

        let offscreen = Self {
            device: Arc::clone(ctx.device),
            kind,
            texture,
            first_sub_index,
            size,
            layout,
            render_pass,
            target,
            commands,
        };
        offscreen.publish(ctx)?;

        crate::engine_debug!(SOURCE, "{} target {}x{} ({} outputs)", kind,
            offscreen.extent().width, offscreen.extent().height, offscreen.outputs().len());
        Ok(offscreen)
    }

    fn create_target(
        device: &Arc<dyn GpuDevice>,
        kind: PassKind,
        layout: &RenderTargetLayout,
        render_pass: RenderPassHandle,
        extent: Extent2D,
    ) -> Result<GpuRenderTarget> {
        GpuRenderTarget::new(device, &RenderTargetDesc {
            label: kind.to_string(),
            layout: layout.clone(),
            extent,
        }, render_pass)
    }

    fn publish(&self, ctx: &mut TargetContext<'_>) -> Result<()> {
        for (i, output) in self.outputs().iter().enumerate() {
            ctx.samplers.publish_replicated(
                self.texture,
                self.first_sub_index + i as u32,
                *output,
                ctx.swapchain.image_count,
            )?;
        }
        Ok(())
    }

    // ===== GETTERS =====

    pub fn texture_kind(&self) -> TextureKind {
        self.texture
    }

    pub fn size(&self) -> TargetSize {
        self.size
    }

    pub fn layout(&self) -> &RenderTargetLayout {
        &self.layout
    }

    /// Sampled outputs in attachment order
    pub fn outputs(&self) -> &[SamplerBinding] {
        &self.target.resources().outputs
    }
}

impl RenderTargetPass for OffscreenTarget {
    fn pass_kind(&self) -> PassKind {
        self.kind
    }

    fn extent(&self) -> Extent2D {
        self.target.resources().extent
    }

    fn reallocate_command_buffers(&mut self) -> Result<()> {
        self.commands.reallocate()
    }

    fn start_pass(
        &mut self,
        device_manager: &mut DeviceManager,
        buffer: BufferIndex,
        _image_index: u32,
    ) -> Result<CommandBufferHandle> {
        let command_buffer = self.commands.create_or_get(buffer)?;
        device_manager.begin_pass(self.kind, command_buffer)?;

        let resources = self.target.resources();
        self.device.cmd_begin_render_pass(
            command_buffer,
            self.render_pass,
            resources.framebuffer,
            resources.extent,
            &self.layout.clear_values(),
        );
        Ok(command_buffer)
    }

    fn end_pass(&mut self, device_manager: &mut DeviceManager, command_buffer: CommandBufferHandle) -> Result<()> {
        self.device.cmd_end_render_pass(command_buffer);
        let ended = device_manager.end_pass(self.kind)?;
        if ended != command_buffer {
            return Err(crate::engine_state_err!(SOURCE,
                "{} ended {:?} but was started with {:?}", self.kind, ended, command_buffer));
        }
        Ok(())
    }

    fn recreate(&mut self, ctx: &mut TargetContext<'_>) -> Result<()> {
        self.layout = PassRegistry::layout(ctx.table, self.kind)?.clone();
        self.render_pass = ctx.registry.render_pass(self.kind)?;
        self.target = Self::create_target(ctx.device, self.kind, &self.layout, self.render_pass,
            self.size.resolve(ctx.swapchain.extent))?;
        self.commands.reset_all(CommandBufferManager::pool_count_for(
            ctx.swapchain.image_count,
            ctx.settings.frames_in_flight,
        ))?;
        self.publish(ctx)?;

        crate::engine_debug!(SOURCE, "{} target recreated at {}x{}", self.kind,
            self.extent().width, self.extent().height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "offscreen_target_tests.rs"]
mod tests;
