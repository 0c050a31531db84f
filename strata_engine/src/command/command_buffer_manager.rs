/// Command pool rotation
///
/// One pool per rotation slot. `reallocate` moves to the next pool and
/// bulk-resets it, which returns every buffer allocated from it to the
/// initial state; buffers are never freed one at a time. With at least N
/// pools a pool is only reset after the fence of its last frame was waited.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::device::{GpuDevice, GpuCommandPool, CommandBufferHandle};
use super::buffer_index::BufferIndex;

pub struct CommandBufferManager {
    device: Arc<dyn GpuDevice>,
    pools: Vec<GpuCommandPool>,
    caches: Vec<FxHashMap<BufferIndex, CommandBufferHandle>>,
    current: usize,
}

impl CommandBufferManager {
    /// Pools needed so no pool is reset while its frame may be in flight
    pub fn pool_count_for(image_count: u32, frames_in_flight: usize) -> usize {
        (image_count as usize).max(frames_in_flight).max(1)
    }

    pub fn new(device: &Arc<dyn GpuDevice>, pool_count: usize) -> Result<Self> {
        let mut manager = Self {
            device: Arc::clone(device),
            pools: Vec::new(),
            caches: Vec::new(),
            current: 0,
        };
        manager.create_pools(pool_count.max(1))?;
        Ok(manager)
    }

    fn create_pools(&mut self, pool_count: usize) -> Result<()> {
        self.pools.clear();
        self.caches.clear();
        for _ in 0..pool_count {
            self.pools.push(GpuCommandPool::new(&self.device)?);
            self.caches.push(FxHashMap::default());
        }
        // First reallocate lands on pool 0
        self.current = pool_count - 1;
        Ok(())
    }

    /// Command buffer for `index` in the current rotation, allocated on first use
    pub fn create_or_get(&mut self, index: BufferIndex) -> Result<CommandBufferHandle> {
        if let Some(&buffer) = self.caches[self.current].get(&index) {
            return Ok(buffer);
        }
        let buffer = self.device.allocate_command_buffer(self.pools[self.current].handle())?;
        self.caches[self.current].insert(index, buffer);
        Ok(buffer)
    }

    /// Advance the rotation and bulk-reset the pool it lands on
    pub fn reallocate(&mut self) -> Result<()> {
        self.current = (self.current + 1) % self.pools.len();
        self.device.reset_command_pool(self.pools[self.current].handle())?;
        self.caches[self.current].clear();
        Ok(())
    }

    /// Swapchain rebuilt: reset every pool, resizing the rotation if needed
    pub fn reset_all(&mut self, pool_count: usize) -> Result<()> {
        let pool_count = pool_count.max(1);
        if pool_count != self.pools.len() {
            return self.create_pools(pool_count);
        }
        for pool in &self.pools {
            self.device.reset_command_pool(pool.handle())?;
        }
        for cache in &mut self.caches {
            cache.clear();
        }
        self.current = pool_count - 1;
        Ok(())
    }

    // ===== GETTERS =====

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Rotation slot in use
    pub fn current_pool(&self) -> usize {
        self.current
    }

    /// Buffers cached for the current rotation
    pub fn cached_count(&self) -> usize {
        self.caches[self.current].len()
    }
}

#[cfg(test)]
#[path = "command_buffer_manager_tests.rs"]
mod tests;
