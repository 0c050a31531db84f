/// Descriptor sets - growing pool allocator
///
/// Sets are allocated from the newest pool; an exhausted pool is kept (its
/// sets stay valid) and a fresh one is appended. Each set remembers its pool
/// so it can be freed individually.

use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::Mutex;
use strata_engine::strata::Result;

use crate::vulkan_format::{device_error, lock, SOURCE};

const MAX_SETS_PER_POOL: u32 = 1024;

/// True if a failed allocation should be retried in a new pool
pub(crate) fn pool_exhausted(result: vk::Result) -> bool {
    matches!(result, vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL)
}

fn create_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let pool_sizes = [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 2 * MAX_SETS_PER_POOL,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: MAX_SETS_PER_POOL,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_BUFFER,
            descriptor_count: MAX_SETS_PER_POOL,
        },
    ];
    let info = vk::DescriptorPoolCreateInfo::default()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .pool_sizes(&pool_sizes)
        .max_sets(MAX_SETS_PER_POOL);
    unsafe { device.create_descriptor_pool(&info, None) }
        .map_err(|e| device_error("vkCreateDescriptorPool", e))
}

#[derive(Default)]
struct PoolState {
    pools: Vec<vk::DescriptorPool>,
    owners: FxHashMap<vk::DescriptorSet, vk::DescriptorPool>,
}

#[derive(Default)]
pub(crate) struct DescriptorAllocator {
    state: Mutex<PoolState>,
}

impl DescriptorAllocator {
    pub fn allocate(&self, device: &ash::Device, layout: vk::DescriptorSetLayout) -> Result<vk::DescriptorSet> {
        let mut state = lock(&self.state);
        let layouts = [layout];

        if let Some(&pool) = state.pools.last() {
            let info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(pool)
                .set_layouts(&layouts);
            match unsafe { device.allocate_descriptor_sets(&info) } {
                Ok(sets) => {
                    state.owners.insert(sets[0], pool);
                    return Ok(sets[0]);
                }
                Err(e) if pool_exhausted(e) => {}
                Err(e) => return Err(device_error("vkAllocateDescriptorSets", e)),
            }
        }

        let pool = create_pool(device)?;
        state.pools.push(pool);
        if state.pools.len() > 1 {
            strata_engine::engine_info!(SOURCE,
                "Descriptor pool exhausted, created new pool (total: {})", state.pools.len());
        }
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let sets = unsafe { device.allocate_descriptor_sets(&info) }
            .map_err(|e| device_error("vkAllocateDescriptorSets", e))?;
        state.owners.insert(sets[0], pool);
        Ok(sets[0])
    }

    pub fn free(&self, device: &ash::Device, set: vk::DescriptorSet) {
        let mut state = lock(&self.state);
        match state.owners.remove(&set) {
            Some(pool) => unsafe {
                device.free_descriptor_sets(pool, &[set]).ok();
            },
            None => strata_engine::engine_warn!(SOURCE, "free_descriptor_set: unknown set {:?}", set),
        }
    }

    /// Destroy every pool (and implicitly every set)
    pub unsafe fn destroy(&self, device: &ash::Device) {
        let mut state = lock(&self.state);
        state.owners.clear();
        for pool in state.pools.drain(..) {
            device.destroy_descriptor_pool(pool, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_descriptor_tests.rs"]
mod tests;
