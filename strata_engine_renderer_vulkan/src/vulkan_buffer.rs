/// Buffer - host-visible Vulkan buffer

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;
use strata_engine::strata::{Error, Result};
use strata_engine::device::BufferUsage;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{buffer_usage_to_vk, device_error, SOURCE};

/// True if `len` bytes at `offset` fit in a buffer of `size` bytes
pub(crate) fn write_fits(size: u64, offset: u64, len: usize) -> bool {
    offset
        .checked_add(len as u64)
        .is_some_and(|end| end <= size)
}

pub(crate) struct Buffer {
    ctx: Arc<GpuContext>,
    buffer: vk::Buffer,
    /// GPU memory allocation (mapped)
    allocation: Option<Allocation>,
    size: u64,
}

impl Buffer {
    pub fn new(ctx: &Arc<GpuContext>, size: u64, usage: BufferUsage) -> Result<Self> {
        if size == 0 {
            strata_engine::engine_bail!(SOURCE, "Cannot create a zero-sized {:?} buffer", usage);
        }
        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(buffer_usage_to_vk(usage) | vk::BufferUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = ctx.device
                .create_buffer(&create_info, None)
                .map_err(|e| device_error("vkCreateBuffer", e))?;
            let mut owned = Self {
                ctx: Arc::clone(ctx),
                buffer,
                allocation: None,
                size,
            };

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = ctx.allocator()
                .allocate(&AllocationCreateDesc {
                    name: "buffer",
                    requirements,
                    location: MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    strata_engine::engine_error!(SOURCE,
                        "Out of memory for {:?} buffer of {} bytes: {:?}", usage, size, e);
                    Error::OutOfMemory
                })?;
            ctx.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| device_error("vkBindBufferMemory", e))?;
            owned.allocation = Some(allocation);
            Ok(owned)
        }
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !write_fits(self.size, offset, data.len()) {
            strata_engine::engine_bail!(SOURCE,
                "Buffer write of {} bytes at offset {} exceeds size {}", data.len(), offset, self.size);
        }
        let allocation = self.allocation.as_ref()
            .ok_or_else(|| strata_engine::engine_err!(SOURCE, "Buffer write failed: no GPU allocation"))?;
        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| strata_engine::engine_err!(SOURCE, "Buffer is not CPU-accessible"))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                self.ctx.allocator().free(allocation).ok();
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_buffer_tests.rs"]
mod tests;
