/// In-flight frame bookkeeping
///
/// Frame `k` uses slot `k mod N`. Each slot owns a fence (created signaled so
/// the first N frames never block) and the semaphore the swapchain signals
/// when the acquired image is ready.

use std::sync::Arc;
use crate::error::Result;
use crate::device::{GpuDevice, GpuFence, GpuSemaphore, FenceHandle, SemaphoreHandle};

/// Default in-flight frame count
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;

pub struct FrameSync {
    frame_id: u64,
    fences: Vec<GpuFence>,
    image_available: Vec<GpuSemaphore>,
}

impl FrameSync {
    pub fn new(device: &Arc<dyn GpuDevice>, frames_in_flight: usize) -> Result<Self> {
        if frames_in_flight == 0 {
            return Err(crate::engine_config_err!("strata::FrameSync",
                "At least one frame in flight is required"));
        }

        let mut fences = Vec::with_capacity(frames_in_flight);
        let mut image_available = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            fences.push(GpuFence::new(device, true)?);
            image_available.push(GpuSemaphore::new(device)?);
        }

        Ok(Self {
            frame_id: 0,
            fences,
            image_available,
        })
    }

    // ===== GETTERS =====

    pub fn frames_in_flight(&self) -> usize {
        self.fences.len()
    }

    /// Id of the frame currently being prepared
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// In-flight slot of the current frame
    pub fn slot(&self) -> usize {
        (self.frame_id % self.fences.len() as u64) as usize
    }

    pub fn current_fence(&self) -> FenceHandle {
        self.fences[self.slot()].handle()
    }

    pub fn image_available(&self) -> SemaphoreHandle {
        self.image_available[self.slot()].handle()
    }

    // ===== FRAME LIFECYCLE =====

    /// Block until the GPU has finished the frame that last used this slot
    pub fn wait_current(&self) -> Result<()> {
        self.fences[self.slot()].wait()
    }

    /// Unsignal the slot fence right before the terminal submission
    pub fn reset_current(&self) -> Result<()> {
        self.fences[self.slot()].reset()
    }

    /// Move on to the next frame (and slot)
    pub fn advance(&mut self) {
        self.frame_id += 1;
    }
}

#[cfg(test)]
#[path = "frame_sync_tests.rs"]
mod tests;
