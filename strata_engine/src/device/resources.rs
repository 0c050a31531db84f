/// Scoped GPU resources
///
/// Each wrapper owns one device handle together with the device that created
/// it and releases the handle in `Drop`, so every exit path (early `?`
/// returns included) gives the object back to the device.

use std::fmt;
use std::sync::Arc;
use crate::error::Result;
use super::gpu_device::{
    GpuDevice, SemaphoreHandle, FenceHandle, CommandPoolHandle, BufferHandle,
    BufferUsage, DescriptorSetHandle, DescriptorSetLayoutHandle, LayoutBinding,
    PipelineLayoutHandle, PipelineHandle, RenderPassHandle, RenderTargetLayout,
    RenderTargetDesc, RenderTargetResources, FramebufferHandle, DescriptorWrite,
    GraphicsPipelineDesc, ComputePipelineDesc,
};

macro_rules! scoped_resource {
    ($(#[$meta:meta])* $name:ident, $handle:ty, $destroy:ident) => {
        $(#[$meta])*
        pub struct $name {
            device: Arc<dyn GpuDevice>,
            handle: $handle,
        }

        impl $name {
            /// Take ownership of a handle created on `device`
            pub fn from_raw(device: &Arc<dyn GpuDevice>, handle: $handle) -> Self {
                Self {
                    device: Arc::clone(device),
                    handle,
                }
            }

            pub fn handle(&self) -> $handle {
                self.handle
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.device.$destroy(self.handle);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.handle).finish()
            }
        }
    };
}

scoped_resource!(
    /// Owned semaphore
    GpuSemaphore, SemaphoreHandle, destroy_semaphore
);
scoped_resource!(
    /// Owned fence
    GpuFence, FenceHandle, destroy_fence
);
scoped_resource!(
    /// Owned command pool. Buffers allocated from it die with it.
    GpuCommandPool, CommandPoolHandle, destroy_command_pool
);
scoped_resource!(GpuDescriptorSetLayout, DescriptorSetLayoutHandle, destroy_descriptor_set_layout);
scoped_resource!(GpuDescriptorSet, DescriptorSetHandle, free_descriptor_set);
scoped_resource!(GpuPipelineLayout, PipelineLayoutHandle, destroy_pipeline_layout);
scoped_resource!(GpuPipeline, PipelineHandle, destroy_pipeline);
scoped_resource!(GpuRenderPass, RenderPassHandle, destroy_render_pass);

impl GpuSemaphore {
    pub fn new(device: &Arc<dyn GpuDevice>) -> Result<Self> {
        let handle = device.create_semaphore()?;
        Ok(Self::from_raw(device, handle))
    }
}

impl GpuFence {
    pub fn new(device: &Arc<dyn GpuDevice>, signaled: bool) -> Result<Self> {
        let handle = device.create_fence(signaled)?;
        Ok(Self::from_raw(device, handle))
    }

    pub fn wait(&self) -> Result<()> {
        self.device.wait_for_fence(self.handle)
    }

    pub fn reset(&self) -> Result<()> {
        self.device.reset_fence(self.handle)
    }
}

impl GpuCommandPool {
    pub fn new(device: &Arc<dyn GpuDevice>) -> Result<Self> {
        let handle = device.create_command_pool()?;
        Ok(Self::from_raw(device, handle))
    }
}

impl GpuDescriptorSetLayout {
    pub fn new(device: &Arc<dyn GpuDevice>, bindings: &[LayoutBinding]) -> Result<Self> {
        let handle = device.create_descriptor_set_layout(bindings)?;
        Ok(Self::from_raw(device, handle))
    }
}

impl GpuDescriptorSet {
    pub fn allocate(device: &Arc<dyn GpuDevice>, layout: DescriptorSetLayoutHandle) -> Result<Self> {
        let handle = device.allocate_descriptor_set(layout)?;
        Ok(Self::from_raw(device, handle))
    }

    pub fn write(&self, writes: &[DescriptorWrite]) -> Result<()> {
        self.device.update_descriptor_set(self.handle, writes)
    }
}

impl GpuPipelineLayout {
    pub fn new(device: &Arc<dyn GpuDevice>, set_layouts: &[DescriptorSetLayoutHandle]) -> Result<Self> {
        let handle = device.create_pipeline_layout(set_layouts)?;
        Ok(Self::from_raw(device, handle))
    }
}

impl GpuPipeline {
    pub fn graphics(device: &Arc<dyn GpuDevice>, desc: &GraphicsPipelineDesc<'_>) -> Result<Self> {
        let handle = device.create_graphics_pipeline(desc)?;
        Ok(Self::from_raw(device, handle))
    }

    pub fn compute(device: &Arc<dyn GpuDevice>, desc: &ComputePipelineDesc<'_>) -> Result<Self> {
        let handle = device.create_compute_pipeline(desc)?;
        Ok(Self::from_raw(device, handle))
    }
}

impl GpuRenderPass {
    pub fn new(device: &Arc<dyn GpuDevice>, layout: &RenderTargetLayout) -> Result<Self> {
        let handle = device.create_render_pass(layout)?;
        Ok(Self::from_raw(device, handle))
    }
}

/// Owned host-visible buffer
pub struct GpuBuffer {
    device: Arc<dyn GpuDevice>,
    handle: BufferHandle,
    size: u64,
}

impl GpuBuffer {
    pub fn new(device: &Arc<dyn GpuDevice>, size: u64, usage: BufferUsage) -> Result<Self> {
        let handle = device.create_buffer(size, usage)?;
        Ok(Self {
            device: Arc::clone(device),
            handle,
            size,
        })
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Copy `data` into the buffer at `offset`
    pub fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size {
            crate::engine_bail!("strata::GpuBuffer",
                "Write of {} bytes at offset {} overflows buffer of {} bytes",
                data.len(), offset, self.size);
        }
        self.device.write_buffer(self.handle, offset, data)
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.device.destroy_buffer(self.handle);
    }
}

impl fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("handle", &self.handle)
            .field("size", &self.size)
            .finish()
    }
}

/// Owned offscreen render target
pub struct GpuRenderTarget {
    device: Arc<dyn GpuDevice>,
    resources: RenderTargetResources,
}

impl GpuRenderTarget {
    pub fn new(
        device: &Arc<dyn GpuDevice>,
        desc: &RenderTargetDesc,
        render_pass: RenderPassHandle,
    ) -> Result<Self> {
        let resources = device.create_render_target(desc, render_pass)?;
        Ok(Self {
            device: Arc::clone(device),
            resources,
        })
    }

    pub fn resources(&self) -> &RenderTargetResources {
        &self.resources
    }
}

impl Drop for GpuRenderTarget {
    fn drop(&mut self) {
        self.device.destroy_render_target(self.resources.target);
    }
}

impl fmt::Debug for GpuRenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GpuRenderTarget").field(&self.resources).finish()
    }
}

/// Owned swapchain framebuffers (one per swapchain image)
pub struct GpuSwapchainFramebuffers {
    device: Arc<dyn GpuDevice>,
    framebuffers: Vec<FramebufferHandle>,
}

impl GpuSwapchainFramebuffers {
    pub fn new(
        device: &Arc<dyn GpuDevice>,
        render_pass: RenderPassHandle,
        layout: &RenderTargetLayout,
    ) -> Result<Self> {
        let framebuffers = device.create_swapchain_framebuffers(render_pass, layout)?;
        Ok(Self {
            device: Arc::clone(device),
            framebuffers,
        })
    }

    pub fn get(&self, image_index: u32) -> Option<FramebufferHandle> {
        self.framebuffers.get(image_index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }
}

impl Drop for GpuSwapchainFramebuffers {
    fn drop(&mut self) {
        self.device.destroy_swapchain_framebuffers(&self.framebuffers);
    }
}

impl fmt::Debug for GpuSwapchainFramebuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GpuSwapchainFramebuffers").field(&self.framebuffers).finish()
    }
}
