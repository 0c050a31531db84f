/// Device manager - acquire, command buffers, chained submission, present
///
/// Owns the device handle together with the in-flight frame sync, the
/// command pool rotation used by the main and compute passes, and the
/// per-frame semaphore chain every pass submits through.

use std::sync::Arc;
use crate::error::Result;
use crate::command::{BufferIndex, CommandBufferManager};
use crate::frame::FrameSync;
use crate::pass::{PassKind, PassTable, SyncChain, PassState};
use super::gpu_device::{GpuDevice, SwapchainInfo, CommandBufferHandle, PresentOutcome};

const SOURCE: &str = "strata::DeviceManager";

pub struct DeviceManager {
    device: Arc<dyn GpuDevice>,
    swapchain: SwapchainInfo,
    frame_sync: FrameSync,
    commands: CommandBufferManager,
    chain: SyncChain,
    image_index: Option<u32>,
    acquired_suboptimal: bool,
}

impl DeviceManager {
    pub fn new(
        device: Arc<dyn GpuDevice>,
        table: &PassTable,
        frames_in_flight: usize,
    ) -> Result<Self> {
        let swapchain = device.swapchain_info();
        let frame_sync = FrameSync::new(&device, frames_in_flight)?;
        let commands = CommandBufferManager::new(
            &device,
            CommandBufferManager::pool_count_for(swapchain.image_count, frames_in_flight),
        )?;

        crate::engine_info!(SOURCE,
            "Device manager ready: {} swapchain images {}x{}, {} frames in flight",
            swapchain.image_count, swapchain.extent.width, swapchain.extent.height,
            frames_in_flight);

        Ok(Self {
            device,
            swapchain,
            frame_sync,
            commands,
            chain: SyncChain::new(table),
            image_index: None,
            acquired_suboptimal: false,
        })
    }

    // ===== GETTERS =====

    pub fn device(&self) -> &Arc<dyn GpuDevice> {
        &self.device
    }

    pub fn swapchain(&self) -> SwapchainInfo {
        self.swapchain
    }

    pub fn frame_sync(&self) -> &FrameSync {
        &self.frame_sync
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_sync.frame_id()
    }

    pub fn chain(&self) -> &SyncChain {
        &self.chain
    }

    /// Swapchain image acquired for the current frame
    pub fn image_index(&self) -> Option<u32> {
        self.image_index
    }

    pub fn pool_count(&self) -> usize {
        self.commands.pool_count()
    }

    // ===== FRAME =====

    /// Wait for the slot's fence, then acquire the next swapchain image
    ///
    /// `Error::SwapchainOutOfDate` is passed through untouched: nothing was
    /// reset, so the caller may resize and try again.
    pub fn acquire_next_image(&mut self, table: &PassTable) -> Result<u32> {
        self.frame_sync.wait_current()?;

        let image_available = self.frame_sync.image_available();
        let acquired = self.device.acquire_next_image(image_available)?;

        self.chain.reset_frame(table, self.frame_sync.slot(), image_available);
        self.image_index = Some(acquired.index);
        self.acquired_suboptimal = acquired.suboptimal;

        crate::engine_trace!(SOURCE, "Frame {} acquired image {} (slot {})",
            self.frame_sync.frame_id(), acquired.index, self.frame_sync.slot());
        Ok(acquired.index)
    }

    /// Command buffer for `index` in the current pool rotation
    pub fn create_or_get_command_buffer(&mut self, index: BufferIndex) -> Result<CommandBufferHandle> {
        self.commands.create_or_get(index)
    }

    /// Advance the pool rotation, bulk-resetting the next pool
    pub fn reallocate_command_buffers(&mut self) -> Result<()> {
        self.commands.reallocate()
    }

    /// Start recording `kind` into `command_buffer`
    pub fn begin_pass(&mut self, kind: PassKind, command_buffer: CommandBufferHandle) -> Result<()> {
        self.chain.begin(kind, command_buffer)?;
        self.device.begin_command_buffer(command_buffer)
    }

    /// Finish recording `kind`
    pub fn end_pass(&mut self, kind: PassKind) -> Result<CommandBufferHandle> {
        let command_buffer = self.chain.end(kind)?;
        self.device.end_command_buffer(command_buffer)?;
        Ok(command_buffer)
    }

    /// Submit an ended pass, chained after the previous submission
    ///
    /// The terminal pass resets the slot fence right before submitting so the
    /// fence is signaled again when the frame completes.
    pub fn submit(&mut self, table: &PassTable, kind: PassKind, buffer_index: BufferIndex) -> Result<()> {
        if buffer_index.pass_kind() != Some(kind) {
            return Err(crate::engine_state_err!(SOURCE,
                "Buffer {} does not belong to pass {}", buffer_index, kind));
        }

        let submission = self.chain.submission(table, kind, self.frame_sync.current_fence())?;
        if submission.fence.is_some() {
            self.frame_sync.reset_current()?;
        }
        self.device.queue_submit(&submission)?;
        self.chain.mark_submitted(kind, &submission)?;

        crate::engine_trace!(SOURCE, "Submitted {} (buffer {})", kind, buffer_index);
        Ok(())
    }

    /// Present the acquired image after the last submission and advance the slot
    ///
    /// A suboptimal acquire or present is reported as
    /// `PresentOutcome::Suboptimal`; out-of-date surfaces as an error.
    pub fn present(&mut self) -> Result<PresentOutcome> {
        let Some(image_index) = self.image_index else {
            return Err(crate::engine_state_err!(SOURCE, "Present without an acquired image"));
        };
        if self.chain.state(PassKind::Main) != PassState::Submitted {
            return Err(crate::engine_state_err!(SOURCE,
                "Present before the main pass was submitted"));
        }

        let result = self.device.present(image_index, &[self.chain.last_signaled()]);
        self.image_index = None;
        self.frame_sync.advance();

        match result? {
            PresentOutcome::Presented if !self.acquired_suboptimal => Ok(PresentOutcome::Presented),
            _ => Ok(PresentOutcome::Suboptimal),
        }
    }

    // ===== RESIZE =====

    /// Finish all GPU work
    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    /// Global barrier: wait idle, recreate the swapchain, reset every pool
    pub fn resize(&mut self, width: u32, height: u32, table: &PassTable) -> Result<SwapchainInfo> {
        self.device.wait_idle()?;
        let swapchain = self.device.recreate_swapchain(width, height)?;
        self.commands.reset_all(CommandBufferManager::pool_count_for(
            swapchain.image_count,
            self.frame_sync.frames_in_flight(),
        ))?;
        self.rebuild_chain(table);
        self.swapchain = swapchain;

        crate::engine_info!(SOURCE, "Swapchain recreated at {}x{} ({} images)",
            swapchain.extent.width, swapchain.extent.height, swapchain.image_count);
        Ok(swapchain)
    }

    /// Follow a rebuilt pass table
    pub fn rebuild_chain(&mut self, table: &PassTable) {
        self.chain = SyncChain::new(table);
        self.image_index = None;
    }
}

#[cfg(test)]
#[path = "device_manager_tests.rs"]
mod tests;
