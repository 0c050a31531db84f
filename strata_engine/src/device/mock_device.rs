/// Mock GpuDevice for unit tests (no GPU required)
///
/// Hands out unique increasing handles, records every call in order and
/// tracks which handles are alive so tests can assert submission order,
/// semaphore wiring, uniform buffer contents and stale-handle use.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::{Error, Result};
use super::gpu_device::*;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    CreateSemaphore(SemaphoreHandle),
    DestroySemaphore(SemaphoreHandle),
    CreateFence(FenceHandle, bool),
    WaitFence(FenceHandle),
    ResetFence(FenceHandle),
    DestroyFence(FenceHandle),
    CreateCommandPool(CommandPoolHandle),
    ResetCommandPool(CommandPoolHandle),
    DestroyCommandPool(CommandPoolHandle),
    AllocateCommandBuffer(CommandPoolHandle, CommandBufferHandle),
    BeginCommandBuffer(CommandBufferHandle),
    EndCommandBuffer(CommandBufferHandle),
    CreateRenderPass(RenderPassHandle),
    DestroyRenderPass(RenderPassHandle),
    CreateRenderTarget { target: RenderTargetHandle, label: String, extent: Extent2D },
    DestroyRenderTarget(RenderTargetHandle),
    CreateSwapchainFramebuffers(Vec<FramebufferHandle>),
    DestroySwapchainFramebuffers(Vec<FramebufferHandle>),
    CreateBuffer(BufferHandle, u64),
    WriteBuffer { buffer: BufferHandle, offset: u64, len: usize },
    DestroyBuffer(BufferHandle),
    CreateDescriptorSetLayout(DescriptorSetLayoutHandle),
    DestroyDescriptorSetLayout(DescriptorSetLayoutHandle),
    AllocateDescriptorSet(DescriptorSetHandle),
    UpdateDescriptorSet(DescriptorSetHandle, Vec<DescriptorWrite>),
    FreeDescriptorSet(DescriptorSetHandle),
    CreatePipelineLayout(PipelineLayoutHandle),
    DestroyPipelineLayout(PipelineLayoutHandle),
    CreateGraphicsPipeline { pipeline: PipelineHandle, label: String, render_pass: RenderPassHandle },
    CreateComputePipeline(PipelineHandle),
    DestroyPipeline(PipelineHandle),
    BeginRenderPass { command_buffer: CommandBufferHandle, render_pass: RenderPassHandle, framebuffer: FramebufferHandle, extent: Extent2D },
    EndRenderPass(CommandBufferHandle),
    BindPipeline(CommandBufferHandle, PipelineHandle),
    BindDescriptorSets(CommandBufferHandle, Vec<DescriptorSetHandle>),
    BindVertexBuffer(CommandBufferHandle, BufferHandle),
    BindIndexBuffer(CommandBufferHandle, BufferHandle),
    Draw { command_buffer: CommandBufferHandle, vertex_count: u32, instance_count: u32 },
    DrawIndexed { command_buffer: CommandBufferHandle, index_count: u32, instance_count: u32 },
    Dispatch(CommandBufferHandle, u32, u32, u32),
    Acquire { signal: SemaphoreHandle, image_index: u32 },
    Submit(Submission),
    Present { image_index: u32, wait: Vec<SemaphoreHandle> },
    WaitIdle,
    RecreateSwapchain(Extent2D),
}

struct MockState {
    next_handle: u64,
    calls: Vec<MockCall>,
    live: FxHashSet<u64>,
    stale_uses: Vec<String>,
    buffers: FxHashMap<u64, Vec<u8>>,
    fences: FxHashMap<u64, bool>,
    pool_buffers: FxHashMap<u64, Vec<u64>>,
    target_children: FxHashMap<u64, Vec<u64>>,
    swapchain: SwapchainInfo,
    next_image: u32,
    acquire_script: VecDeque<Result<AcquiredImage>>,
    present_script: VecDeque<Result<PresentOutcome>>,
    supports_compute: bool,
    fail_compute_pipeline: bool,
}

impl MockState {
    fn alloc(&mut self) -> u64 {
        self.next_handle += 1;
        let raw = self.next_handle;
        self.live.insert(raw);
        raw
    }

    fn check(&mut self, what: &str, raw: u64) {
        if raw != 0 && !self.live.contains(&raw) {
            self.stale_uses.push(format!("{} {}", what, raw));
        }
    }

    fn release(&mut self, what: &str, raw: u64) {
        if !self.live.remove(&raw) {
            self.stale_uses.push(format!("double destroy of {} {}", what, raw));
        }
    }
}

/// Recording GPU device
pub struct MockDevice {
    state: Mutex<MockState>,
}

impl MockDevice {
    pub fn new(image_count: u32, extent: Extent2D) -> Self {
        Self {
            state: Mutex::new(MockState {
                next_handle: 0,
                calls: Vec::new(),
                live: FxHashSet::default(),
                stale_uses: Vec::new(),
                buffers: FxHashMap::default(),
                fences: FxHashMap::default(),
                pool_buffers: FxHashMap::default(),
                target_children: FxHashMap::default(),
                swapchain: SwapchainInfo {
                    image_count,
                    extent,
                    format: TextureFormat::B8G8R8A8_SRGB,
                },
                next_image: 0,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                supports_compute: true,
                fail_compute_pipeline: false,
            }),
        }
    }

    /// Mock plus the same device as a trait object
    pub fn shared(image_count: u32, extent: Extent2D) -> (Arc<MockDevice>, Arc<dyn GpuDevice>) {
        let mock = Arc::new(Self::new(image_count, extent));
        let device: Arc<dyn GpuDevice> = mock.clone();
        (mock, device)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: MockCall) {
        self.state().calls.push(call);
    }

    // ===== TEST CONTROLS =====

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::Submit(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn presents(&self) -> Vec<(u32, Vec<SemaphoreHandle>)> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::Present { image_index, wait } => Some((*image_index, wait.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state().buffers.get(&buffer.raw()).cloned()
    }

    pub fn stale_uses(&self) -> Vec<String> {
        self.state().stale_uses.clone()
    }

    pub fn live_handle_count(&self) -> usize {
        self.state().live.len()
    }

    pub fn is_live(&self, raw: u64) -> bool {
        self.state().live.contains(&raw)
    }

    pub fn set_supports_compute(&self, supported: bool) {
        self.state().supports_compute = supported;
    }

    pub fn fail_compute_pipeline(&self) {
        self.state().fail_compute_pipeline = true;
    }

    pub fn push_acquire_result(&self, result: Result<AcquiredImage>) {
        self.state().acquire_script.push_back(result);
    }

    pub fn push_present_result(&self, result: Result<PresentOutcome>) {
        self.state().present_script.push_back(result);
    }
}

impl GpuDevice for MockDevice {
    fn swapchain_info(&self) -> SwapchainInfo {
        self.state().swapchain
    }

    fn supports_compute(&self) -> bool {
        self.state().supports_compute
    }

    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let handle = SemaphoreHandle(self.state().alloc());
        self.record(MockCall::CreateSemaphore(handle));
        Ok(handle)
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        self.state().release("semaphore", semaphore.raw());
        self.record(MockCall::DestroySemaphore(semaphore));
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let mut state = self.state();
        let handle = FenceHandle(state.alloc());
        state.fences.insert(handle.raw(), signaled);
        state.calls.push(MockCall::CreateFence(handle, signaled));
        Ok(handle)
    }

    fn wait_for_fence(&self, fence: FenceHandle) -> Result<()> {
        let mut state = self.state();
        state.check("fence", fence.raw());
        state.calls.push(MockCall::WaitFence(fence));
        match state.fences.get(&fence.raw()) {
            Some(true) => Ok(()),
            _ => Err(Error::InvalidState(format!(
                "wait on unsignaled fence {} would block forever", fence.raw()
            ))),
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        let mut state = self.state();
        state.check("fence", fence.raw());
        state.fences.insert(fence.raw(), false);
        state.calls.push(MockCall::ResetFence(fence));
        Ok(())
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        let mut state = self.state();
        state.release("fence", fence.raw());
        state.fences.remove(&fence.raw());
        state.calls.push(MockCall::DestroyFence(fence));
    }

    fn create_command_pool(&self) -> Result<CommandPoolHandle> {
        let handle = CommandPoolHandle(self.state().alloc());
        self.record(MockCall::CreateCommandPool(handle));
        Ok(handle)
    }

    fn reset_command_pool(&self, pool: CommandPoolHandle) -> Result<()> {
        let mut state = self.state();
        state.check("command pool", pool.raw());
        state.calls.push(MockCall::ResetCommandPool(pool));
        Ok(())
    }

    fn destroy_command_pool(&self, pool: CommandPoolHandle) {
        let mut state = self.state();
        state.release("command pool", pool.raw());
        if let Some(buffers) = state.pool_buffers.remove(&pool.raw()) {
            for raw in buffers {
                state.live.remove(&raw);
            }
        }
        state.calls.push(MockCall::DestroyCommandPool(pool));
    }

    fn allocate_command_buffer(&self, pool: CommandPoolHandle) -> Result<CommandBufferHandle> {
        let mut state = self.state();
        state.check("command pool", pool.raw());
        let handle = CommandBufferHandle(state.alloc());
        state.pool_buffers.entry(pool.raw()).or_default().push(handle.raw());
        state.calls.push(MockCall::AllocateCommandBuffer(pool, handle));
        Ok(handle)
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut state = self.state();
        state.check("command buffer", command_buffer.raw());
        state.calls.push(MockCall::BeginCommandBuffer(command_buffer));
        Ok(())
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut state = self.state();
        state.check("command buffer", command_buffer.raw());
        state.calls.push(MockCall::EndCommandBuffer(command_buffer));
        Ok(())
    }

    fn create_render_pass(&self, _layout: &RenderTargetLayout) -> Result<RenderPassHandle> {
        let handle = RenderPassHandle(self.state().alloc());
        self.record(MockCall::CreateRenderPass(handle));
        Ok(handle)
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        self.state().release("render pass", render_pass.raw());
        self.record(MockCall::DestroyRenderPass(render_pass));
    }

    fn create_render_target(
        &self,
        desc: &RenderTargetDesc,
        render_pass: RenderPassHandle,
    ) -> Result<RenderTargetResources> {
        let mut state = self.state();
        state.check("render pass", render_pass.raw());
        let target = RenderTargetHandle(state.alloc());
        let framebuffer = FramebufferHandle(state.alloc());
        let output_count = desc.layout.color_formats.len().max(1);
        let mut outputs = Vec::with_capacity(output_count);
        let mut children = vec![framebuffer.raw()];
        for _ in 0..output_count {
            let view = ImageViewHandle(state.alloc());
            let sampler = SamplerHandle(state.alloc());
            children.push(view.raw());
            children.push(sampler.raw());
            outputs.push(SamplerBinding { view, sampler });
        }
        state.target_children.insert(target.raw(), children);
        state.calls.push(MockCall::CreateRenderTarget {
            target,
            label: desc.label.clone(),
            extent: desc.extent,
        });
        Ok(RenderTargetResources {
            target,
            framebuffer,
            outputs,
            extent: desc.extent,
        })
    }

    fn destroy_render_target(&self, target: RenderTargetHandle) {
        let mut state = self.state();
        state.release("render target", target.raw());
        if let Some(children) = state.target_children.remove(&target.raw()) {
            for raw in children {
                state.live.remove(&raw);
            }
        }
        state.calls.push(MockCall::DestroyRenderTarget(target));
    }

    fn create_swapchain_framebuffers(
        &self,
        render_pass: RenderPassHandle,
        _layout: &RenderTargetLayout,
    ) -> Result<Vec<FramebufferHandle>> {
        let mut state = self.state();
        state.check("render pass", render_pass.raw());
        let count = state.swapchain.image_count;
        let framebuffers: Vec<FramebufferHandle> =
            (0..count).map(|_| FramebufferHandle(state.alloc())).collect();
        state.calls.push(MockCall::CreateSwapchainFramebuffers(framebuffers.clone()));
        Ok(framebuffers)
    }

    fn destroy_swapchain_framebuffers(&self, framebuffers: &[FramebufferHandle]) {
        let mut state = self.state();
        for fb in framebuffers {
            state.release("framebuffer", fb.raw());
        }
        state.calls.push(MockCall::DestroySwapchainFramebuffers(framebuffers.to_vec()));
    }

    fn create_buffer(&self, size: u64, _usage: BufferUsage) -> Result<BufferHandle> {
        let mut state = self.state();
        let handle = BufferHandle(state.alloc());
        state.buffers.insert(handle.raw(), vec![0u8; size as usize]);
        state.calls.push(MockCall::CreateBuffer(handle, size));
        Ok(handle)
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        state.check("buffer", buffer.raw());
        let Some(contents) = state.buffers.get_mut(&buffer.raw()) else {
            return Err(Error::InvalidResource(format!("buffer {}", buffer.raw())));
        };
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(Error::InvalidResource(format!("write past end of buffer {}", buffer.raw())));
        }
        contents[start..end].copy_from_slice(data);
        state.calls.push(MockCall::WriteBuffer { buffer, offset, len: data.len() });
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state();
        state.release("buffer", buffer.raw());
        state.buffers.remove(&buffer.raw());
        state.calls.push(MockCall::DestroyBuffer(buffer));
    }

    fn create_descriptor_set_layout(&self, _bindings: &[LayoutBinding]) -> Result<DescriptorSetLayoutHandle> {
        let handle = DescriptorSetLayoutHandle(self.state().alloc());
        self.record(MockCall::CreateDescriptorSetLayout(handle));
        Ok(handle)
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        self.state().release("descriptor set layout", layout.raw());
        self.record(MockCall::DestroyDescriptorSetLayout(layout));
    }

    fn allocate_descriptor_set(&self, layout: DescriptorSetLayoutHandle) -> Result<DescriptorSetHandle> {
        let mut state = self.state();
        state.check("descriptor set layout", layout.raw());
        let handle = DescriptorSetHandle(state.alloc());
        state.calls.push(MockCall::AllocateDescriptorSet(handle));
        Ok(handle)
    }

    fn update_descriptor_set(&self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) -> Result<()> {
        let mut state = self.state();
        state.check("descriptor set", set.raw());
        for write in writes {
            match write.resource {
                DescriptorResource::Buffer { buffer, .. } => state.check("buffer", buffer.raw()),
                DescriptorResource::ImageSampler(binding) => {
                    state.check("image view", binding.view.raw());
                    state.check("sampler", binding.sampler.raw());
                }
            }
        }
        state.calls.push(MockCall::UpdateDescriptorSet(set, writes.to_vec()));
        Ok(())
    }

    fn free_descriptor_set(&self, set: DescriptorSetHandle) {
        self.state().release("descriptor set", set.raw());
        self.record(MockCall::FreeDescriptorSet(set));
    }

    fn create_pipeline_layout(&self, _set_layouts: &[DescriptorSetLayoutHandle]) -> Result<PipelineLayoutHandle> {
        let handle = PipelineLayoutHandle(self.state().alloc());
        self.record(MockCall::CreatePipelineLayout(handle));
        Ok(handle)
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        self.state().release("pipeline layout", layout.raw());
        self.record(MockCall::DestroyPipelineLayout(layout));
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<'_>) -> Result<PipelineHandle> {
        let mut state = self.state();
        state.check("render pass", desc.render_pass.raw());
        let pipeline = PipelineHandle(state.alloc());
        state.calls.push(MockCall::CreateGraphicsPipeline {
            pipeline,
            label: desc.label.to_string(),
            render_pass: desc.render_pass,
        });
        Ok(pipeline)
    }

    fn create_compute_pipeline(&self, _desc: &ComputePipelineDesc<'_>) -> Result<PipelineHandle> {
        let mut state = self.state();
        if state.fail_compute_pipeline || !state.supports_compute {
            return Err(Error::device("vkCreateComputePipelines", -13));
        }
        let pipeline = PipelineHandle(state.alloc());
        state.calls.push(MockCall::CreateComputePipeline(pipeline));
        Ok(pipeline)
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        self.state().release("pipeline", pipeline.raw());
        self.record(MockCall::DestroyPipeline(pipeline));
    }

    fn cmd_begin_render_pass(
        &self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        _clear_values: &[ClearValue],
    ) {
        let mut state = self.state();
        state.check("command buffer", command_buffer.raw());
        state.check("render pass", render_pass.raw());
        state.check("framebuffer", framebuffer.raw());
        state.calls.push(MockCall::BeginRenderPass { command_buffer, render_pass, framebuffer, extent });
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        self.record(MockCall::EndRenderPass(command_buffer));
    }

    fn cmd_bind_pipeline(
        &self,
        command_buffer: CommandBufferHandle,
        _bind_point: PipelineBindPoint,
        pipeline: PipelineHandle,
    ) {
        let mut state = self.state();
        state.check("pipeline", pipeline.raw());
        state.calls.push(MockCall::BindPipeline(command_buffer, pipeline));
    }

    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: CommandBufferHandle,
        _bind_point: PipelineBindPoint,
        layout: PipelineLayoutHandle,
        _first_set: u32,
        sets: &[DescriptorSetHandle],
    ) {
        let mut state = self.state();
        state.check("pipeline layout", layout.raw());
        for set in sets {
            state.check("descriptor set", set.raw());
        }
        state.calls.push(MockCall::BindDescriptorSets(command_buffer, sets.to_vec()));
    }

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle, _offset: u64) {
        self.record(MockCall::BindVertexBuffer(command_buffer, buffer));
    }

    fn cmd_bind_index_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        _offset: u64,
        _index_type: IndexType,
    ) {
        self.record(MockCall::BindIndexBuffer(command_buffer, buffer));
    }

    fn cmd_draw(
        &self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) {
        self.record(MockCall::Draw { command_buffer, vertex_count, instance_count });
    }

    fn cmd_draw_indexed(
        &self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.record(MockCall::DrawIndexed { command_buffer, index_count, instance_count });
    }

    fn cmd_dispatch(&self, command_buffer: CommandBufferHandle, x: u32, y: u32, z: u32) {
        self.record(MockCall::Dispatch(command_buffer, x, y, z));
    }

    fn acquire_next_image(&self, signal: SemaphoreHandle) -> Result<AcquiredImage> {
        let mut state = self.state();
        state.check("semaphore", signal.raw());
        if let Some(scripted) = state.acquire_script.pop_front() {
            if let Ok(image) = &scripted {
                state.calls.push(MockCall::Acquire { signal, image_index: image.index });
            }
            return scripted;
        }
        let image_index = state.next_image;
        state.next_image = (state.next_image + 1) % state.swapchain.image_count.max(1);
        state.calls.push(MockCall::Acquire { signal, image_index });
        Ok(AcquiredImage { index: image_index, suboptimal: false })
    }

    fn queue_submit(&self, submission: &Submission) -> Result<()> {
        let mut state = self.state();
        state.check("command buffer", submission.command_buffer.raw());
        if let Some(wait) = submission.wait {
            state.check("semaphore", wait.raw());
        }
        state.check("semaphore", submission.signal.raw());
        if let Some(fence) = submission.fence {
            state.check("fence", fence.raw());
            // GPU work completes instantly
            state.fences.insert(fence.raw(), true);
        }
        state.calls.push(MockCall::Submit(*submission));
        Ok(())
    }

    fn present(&self, image_index: u32, wait: &[SemaphoreHandle]) -> Result<PresentOutcome> {
        let mut state = self.state();
        for semaphore in wait {
            state.check("semaphore", semaphore.raw());
        }
        state.calls.push(MockCall::Present { image_index, wait: wait.to_vec() });
        state.present_script.pop_front().unwrap_or(Ok(PresentOutcome::Presented))
    }

    fn wait_idle(&self) -> Result<()> {
        self.record(MockCall::WaitIdle);
        Ok(())
    }

    fn recreate_swapchain(&self, width: u32, height: u32) -> Result<SwapchainInfo> {
        let mut state = self.state();
        state.swapchain.extent = Extent2D::new(width, height);
        state.next_image = 0;
        state.calls.push(MockCall::RecreateSwapchain(Extent2D::new(width, height)));
        Ok(state.swapchain)
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
