/// VulkanDevice - the `GpuDevice` implementation
///
/// Single-object handles carry the raw Vulkan value. Objects that own memory
/// live in tables keyed by the raw value of the handle given out: buffers by
/// their `VkBuffer`, render targets and swapchain framebuffer sets by their
/// (first) `VkFramebuffer`.

use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use strata_engine::strata::Result;
use strata_engine::device::{
    AcquiredImage, BufferHandle, BufferUsage, ClearValue, CommandBufferHandle, CommandPoolHandle,
    ComputePipelineDesc, DescriptorResource, DescriptorSetHandle, DescriptorSetLayoutHandle,
    DescriptorWrite, Extent2D, FenceHandle, FramebufferHandle, GpuDevice, GraphicsPipelineDesc,
    IndexType, LayoutBinding, PipelineBindPoint, PipelineHandle, PipelineLayoutHandle,
    PresentOutcome, RenderPassHandle, RenderTargetDesc, RenderTargetHandle, RenderTargetLayout,
    RenderTargetResources, SemaphoreHandle, Submission, SwapchainInfo,
};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor::DescriptorAllocator;
use crate::vulkan_format::{
    bind_point_to_vk, clear_value_to_vk, descriptor_type_to_vk, device_error, from_raw,
    index_type_to_vk, lock, raw, shader_stages_to_vk, SOURCE,
};
use crate::vulkan_pipeline::{create_compute_pipeline, create_graphics_pipeline};
use crate::vulkan_render_pass::create_render_pass;
use crate::vulkan_render_target::{RenderTarget, SwapchainFramebuffers};
use crate::vulkan_settings::VulkanSettings;
use crate::vulkan_swapchain::Swapchain;

/// Descriptor info a write points at
enum DescriptorInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

fn descriptor_info(resource: &DescriptorResource) -> DescriptorInfo {
    match *resource {
        DescriptorResource::Buffer { buffer, offset, range } => DescriptorInfo::Buffer(vk::DescriptorBufferInfo {
            buffer: from_raw(buffer.raw()),
            offset,
            range,
        }),
        DescriptorResource::ImageSampler(binding) => DescriptorInfo::Image(vk::DescriptorImageInfo {
            sampler: from_raw(binding.sampler.raw()),
            image_view: from_raw(binding.view.raw()),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }),
    }
}

/// Vulkan GPU device
///
/// Fields are released in declaration order after `Drop::drop` has emptied
/// the tables; the context goes last.
pub struct VulkanDevice {
    render_targets: Mutex<FxHashMap<u64, RenderTarget>>,
    framebuffer_sets: Mutex<FxHashMap<u64, SwapchainFramebuffers>>,
    buffers: Mutex<FxHashMap<u64, Buffer>>,
    descriptors: DescriptorAllocator,
    swapchain: Mutex<Swapchain>,
    ctx: Arc<GpuContext>,
}

impl VulkanDevice {
    /// Create the device and a swapchain sized to the window
    pub fn new(window: &winit::window::Window, settings: VulkanSettings) -> Result<Self> {
        let size = window.inner_size();
        let (ctx, surface) = GpuContext::new(window, &settings)?;
        let ctx = Arc::new(ctx);
        let swapchain = Swapchain::new(
            Arc::clone(&ctx),
            surface,
            settings.present_mode,
            size.width,
            size.height,
        )?;

        Ok(Self {
            render_targets: Mutex::new(FxHashMap::default()),
            framebuffer_sets: Mutex::new(FxHashMap::default()),
            buffers: Mutex::new(FxHashMap::default()),
            descriptors: DescriptorAllocator::default(),
            swapchain: Mutex::new(swapchain),
            ctx,
        })
    }

    fn device(&self) -> &ash::Device {
        &self.ctx.device
    }
}

impl GpuDevice for VulkanDevice {
    fn swapchain_info(&self) -> SwapchainInfo {
        lock(&self.swapchain).info()
    }

    fn supports_compute(&self) -> bool {
        self.ctx.supports_compute
    }

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let semaphore = unsafe { self.device().create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .map_err(|e| device_error("vkCreateSemaphore", e))?;
        Ok(SemaphoreHandle(raw(semaphore)))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        unsafe { self.device().destroy_semaphore(from_raw(semaphore.raw()), None) }
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let fence = unsafe { self.device().create_fence(&vk::FenceCreateInfo::default().flags(flags), None) }
            .map_err(|e| device_error("vkCreateFence", e))?;
        Ok(FenceHandle(raw(fence)))
    }

    fn wait_for_fence(&self, fence: FenceHandle) -> Result<()> {
        let fences = [from_raw::<vk::Fence>(fence.raw())];
        unsafe { self.device().wait_for_fences(&fences, true, u64::MAX) }
            .map_err(|e| device_error("vkWaitForFences", e))
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        let fences = [from_raw::<vk::Fence>(fence.raw())];
        unsafe { self.device().reset_fences(&fences) }
            .map_err(|e| device_error("vkResetFences", e))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        unsafe { self.device().destroy_fence(from_raw(fence.raw()), None) }
    }

    // ===== COMMANDS =====

    fn create_command_pool(&self) -> Result<CommandPoolHandle> {
        let info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(self.ctx.queue_family);
        let pool = unsafe { self.device().create_command_pool(&info, None) }
            .map_err(|e| device_error("vkCreateCommandPool", e))?;
        Ok(CommandPoolHandle(raw(pool)))
    }

    fn reset_command_pool(&self, pool: CommandPoolHandle) -> Result<()> {
        unsafe {
            self.device().reset_command_pool(from_raw(pool.raw()), vk::CommandPoolResetFlags::empty())
        }
        .map_err(|e| device_error("vkResetCommandPool", e))
    }

    fn destroy_command_pool(&self, pool: CommandPoolHandle) {
        unsafe { self.device().destroy_command_pool(from_raw(pool.raw()), None) }
    }

    fn allocate_command_buffer(&self, pool: CommandPoolHandle) -> Result<CommandBufferHandle> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(from_raw(pool.raw()))
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device().allocate_command_buffers(&info) }
            .map_err(|e| device_error("vkAllocateCommandBuffers", e))?;
        Ok(CommandBufferHandle(raw(buffers[0])))
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device().begin_command_buffer(from_raw(command_buffer.raw()), &info) }
            .map_err(|e| device_error("vkBeginCommandBuffer", e))
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        unsafe { self.device().end_command_buffer(from_raw(command_buffer.raw())) }
            .map_err(|e| device_error("vkEndCommandBuffer", e))
    }

    // ===== RENDER PASSES / TARGETS =====

    fn create_render_pass(&self, layout: &RenderTargetLayout) -> Result<RenderPassHandle> {
        let render_pass = create_render_pass(self.device(), layout)?;
        Ok(RenderPassHandle(raw(render_pass)))
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        unsafe { self.device().destroy_render_pass(from_raw(render_pass.raw()), None) }
    }

    fn create_render_target(
        &self,
        desc: &RenderTargetDesc,
        render_pass: RenderPassHandle,
    ) -> Result<RenderTargetResources> {
        let (target, resources) = RenderTarget::new(&self.ctx, desc, from_raw(render_pass.raw()))?;
        lock(&self.render_targets).insert(resources.target.raw(), target);
        Ok(resources)
    }

    fn destroy_render_target(&self, target: RenderTargetHandle) {
        if lock(&self.render_targets).remove(&target.raw()).is_none() {
            strata_engine::engine_warn!(SOURCE, "destroy_render_target: unknown target {:?}", target);
        }
    }

    fn create_swapchain_framebuffers(
        &self,
        render_pass: RenderPassHandle,
        layout: &RenderTargetLayout,
    ) -> Result<Vec<FramebufferHandle>> {
        let set = {
            let swapchain = lock(&self.swapchain);
            SwapchainFramebuffers::new(
                &self.ctx,
                from_raw(render_pass.raw()),
                layout,
                swapchain.views(),
                swapchain.extent(),
            )?
        };
        let handles = set.handles();
        let Some(first) = handles.first() else {
            strata_engine::engine_bail!(SOURCE, "Swapchain has no images");
        };
        lock(&self.framebuffer_sets).insert(first.raw(), set);
        Ok(handles)
    }

    fn destroy_swapchain_framebuffers(&self, framebuffers: &[FramebufferHandle]) {
        let removed = framebuffers
            .first()
            .and_then(|first| lock(&self.framebuffer_sets).remove(&first.raw()));
        if removed.is_none() {
            strata_engine::engine_warn!(SOURCE, "destroy_swapchain_framebuffers: unknown framebuffer set");
        }
    }

    // ===== BUFFERS =====

    fn create_buffer(&self, size: u64, usage: BufferUsage) -> Result<BufferHandle> {
        let buffer = Buffer::new(&self.ctx, size, usage)?;
        let handle = BufferHandle(raw(buffer.handle()));
        lock(&self.buffers).insert(handle.raw(), buffer);
        Ok(handle)
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let buffers = lock(&self.buffers);
        let target = buffers
            .get(&buffer.raw())
            .ok_or_else(|| strata_engine::engine_err!(SOURCE, "write_buffer: unknown buffer {:?}", buffer))?;
        target.write(offset, data)
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        if lock(&self.buffers).remove(&buffer.raw()).is_none() {
            strata_engine::engine_warn!(SOURCE, "destroy_buffer: unknown buffer {:?}", buffer);
        }
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(&self, bindings: &[LayoutBinding]) -> Result<DescriptorSetLayoutHandle> {
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(descriptor_type_to_vk(b.descriptor_type))
                    .descriptor_count(1)
                    .stage_flags(shader_stages_to_vk(b.stages))
            })
            .collect();
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&vk_bindings);
        let layout = unsafe { self.device().create_descriptor_set_layout(&info, None) }
            .map_err(|e| device_error("vkCreateDescriptorSetLayout", e))?;
        Ok(DescriptorSetLayoutHandle(raw(layout)))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        unsafe { self.device().destroy_descriptor_set_layout(from_raw(layout.raw()), None) }
    }

    fn allocate_descriptor_set(&self, layout: DescriptorSetLayoutHandle) -> Result<DescriptorSetHandle> {
        let set = self.descriptors.allocate(self.device(), from_raw(layout.raw()))?;
        Ok(DescriptorSetHandle(raw(set)))
    }

    fn update_descriptor_set(&self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) -> Result<()> {
        let dst_set: vk::DescriptorSet = from_raw(set.raw());
        // Infos must outlive the write structs that point at them
        let infos: Vec<DescriptorInfo> = writes.iter().map(|w| descriptor_info(&w.resource)).collect();
        let vk_writes: Vec<vk::WriteDescriptorSet> = writes
            .iter()
            .zip(&infos)
            .map(|(write, info)| {
                let vk_write = vk::WriteDescriptorSet::default()
                    .dst_set(dst_set)
                    .dst_binding(write.binding)
                    .descriptor_type(descriptor_type_to_vk(write.descriptor_type));
                match info {
                    DescriptorInfo::Buffer(buffer) => vk_write.buffer_info(std::slice::from_ref(buffer)),
                    DescriptorInfo::Image(image) => vk_write.image_info(std::slice::from_ref(image)),
                }
            })
            .collect();
        unsafe { self.device().update_descriptor_sets(&vk_writes, &[]) };
        Ok(())
    }

    fn free_descriptor_set(&self, set: DescriptorSetHandle) {
        self.descriptors.free(self.device(), from_raw(set.raw()));
    }

    // ===== PIPELINES =====

    fn create_pipeline_layout(&self, set_layouts: &[DescriptorSetLayoutHandle]) -> Result<PipelineLayoutHandle> {
        let layouts: Vec<vk::DescriptorSetLayout> = set_layouts.iter().map(|l| from_raw(l.raw())).collect();
        let info = vk::PipelineLayoutCreateInfo::default().set_layouts(&layouts);
        let layout = unsafe { self.device().create_pipeline_layout(&info, None) }
            .map_err(|e| device_error("vkCreatePipelineLayout", e))?;
        Ok(PipelineLayoutHandle(raw(layout)))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        unsafe { self.device().destroy_pipeline_layout(from_raw(layout.raw()), None) }
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<'_>) -> Result<PipelineHandle> {
        let pipeline = create_graphics_pipeline(self.device(), desc)?;
        Ok(PipelineHandle(raw(pipeline)))
    }

    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc<'_>) -> Result<PipelineHandle> {
        if !self.ctx.supports_compute {
            strata_engine::engine_bail_warn!(SOURCE,
                "Compute pipeline '{}' requested on a queue without compute", desc.label);
        }
        let pipeline = create_compute_pipeline(self.device(), desc)?;
        Ok(PipelineHandle(raw(pipeline)))
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        unsafe { self.device().destroy_pipeline(from_raw(pipeline.raw()), None) }
    }

    // ===== RECORDING =====

    fn cmd_begin_render_pass(
        &self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        clear_values: &[ClearValue],
    ) {
        let command_buffer: vk::CommandBuffer = from_raw(command_buffer.raw());
        let area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D { width: extent.width, height: extent.height },
        };
        let vk_clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(from_raw(render_pass.raw()))
            .framebuffer(from_raw(framebuffer.raw()))
            .render_area(area)
            .clear_values(&vk_clear_values);
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        unsafe {
            let device = self.device();
            device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[area]);
        }
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        unsafe { self.device().cmd_end_render_pass(from_raw(command_buffer.raw())) }
    }

    fn cmd_bind_pipeline(
        &self,
        command_buffer: CommandBufferHandle,
        bind_point: PipelineBindPoint,
        pipeline: PipelineHandle,
    ) {
        unsafe {
            self.device().cmd_bind_pipeline(
                from_raw(command_buffer.raw()),
                bind_point_to_vk(bind_point),
                from_raw(pipeline.raw()),
            )
        }
    }

    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: CommandBufferHandle,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutHandle,
        first_set: u32,
        sets: &[DescriptorSetHandle],
    ) {
        let vk_sets: Vec<vk::DescriptorSet> = sets.iter().map(|s| from_raw(s.raw())).collect();
        unsafe {
            self.device().cmd_bind_descriptor_sets(
                from_raw(command_buffer.raw()),
                bind_point_to_vk(bind_point),
                from_raw(layout.raw()),
                first_set,
                &vk_sets,
                &[],
            )
        }
    }

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle, offset: u64) {
        unsafe {
            self.device().cmd_bind_vertex_buffers(
                from_raw(command_buffer.raw()),
                0,
                &[from_raw(buffer.raw())],
                &[offset],
            )
        }
    }

    fn cmd_bind_index_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    ) {
        unsafe {
            self.device().cmd_bind_index_buffer(
                from_raw(command_buffer.raw()),
                from_raw(buffer.raw()),
                offset,
                index_type_to_vk(index_type),
            )
        }
    }

    fn cmd_draw(
        &self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device().cmd_draw(
                from_raw(command_buffer.raw()),
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            )
        }
    }

    fn cmd_draw_indexed(
        &self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device().cmd_draw_indexed(
                from_raw(command_buffer.raw()),
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            )
        }
    }

    fn cmd_dispatch(&self, command_buffer: CommandBufferHandle, x: u32, y: u32, z: u32) {
        unsafe { self.device().cmd_dispatch(from_raw(command_buffer.raw()), x, y, z) }
    }

    // ===== PRESENTATION =====

    fn acquire_next_image(&self, signal: SemaphoreHandle) -> Result<AcquiredImage> {
        lock(&self.swapchain).acquire(from_raw(signal.raw()))
    }

    fn queue_submit(&self, submission: &Submission) -> Result<()> {
        let wait: Vec<vk::Semaphore> = submission.wait.iter().map(|s| from_raw(s.raw())).collect();
        let wait_stages = vec![vk::PipelineStageFlags::ALL_COMMANDS; wait.len()];
        let signal: Vec<vk::Semaphore> = Some(submission.signal)
            .filter(|s| !s.is_null())
            .into_iter()
            .map(|s| from_raw(s.raw()))
            .collect();
        let command_buffers = [from_raw::<vk::CommandBuffer>(submission.command_buffer.raw())];
        let fence = submission.fence.map_or(vk::Fence::null(), |f| from_raw(f.raw()));

        let info = vk::SubmitInfo::default()
            .wait_semaphores(&wait)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal);

        let queue = self.ctx.queue();
        unsafe { self.device().queue_submit(*queue, std::slice::from_ref(&info), fence) }
            .map_err(|e| device_error("vkQueueSubmit", e))
    }

    fn present(&self, image_index: u32, wait: &[SemaphoreHandle]) -> Result<PresentOutcome> {
        let wait: Vec<vk::Semaphore> = wait.iter().map(|s| from_raw(s.raw())).collect();
        lock(&self.swapchain).present(image_index, &wait)
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.device().device_wait_idle() }
            .map_err(|e| device_error("vkDeviceWaitIdle", e))
    }

    fn recreate_swapchain(&self, width: u32, height: u32) -> Result<SwapchainInfo> {
        self.wait_idle()?;
        lock(&self.swapchain).recreate(width, height)
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            let leaked = lock(&self.render_targets).len()
                + lock(&self.framebuffer_sets).len()
                + lock(&self.buffers).len();
            if leaked > 0 {
                strata_engine::engine_warn!(SOURCE, "{} GPU resources still alive at device drop", leaked);
            }
            lock(&self.render_targets).clear();
            lock(&self.framebuffer_sets).clear();
            lock(&self.buffers).clear();
            self.descriptors.destroy(&self.ctx.device);
        }
        strata_engine::engine_debug!(SOURCE, "Vulkan device destroyed");
    }
}
