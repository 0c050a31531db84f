/// Per-frame semaphore chain
///
/// Linearizes the frame's passes: every submission waits on the semaphore
/// signaled by the previous submission of the same frame (the acquire
/// semaphore for the first one) and signals the pass's own semaphore for the
/// current slot.

use crate::error::Result;
use crate::device::{CommandBufferHandle, FenceHandle, SemaphoreHandle, Submission};
use super::pass_kind::PassKind;
use super::pass_table::PassTable;

const SOURCE: &str = "strata::SyncChain";

/// Lifecycle of a pass within one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    NotStarted,
    Recording,
    Ended,
    Submitted,
}

pub struct SyncChain {
    states: Vec<PassState>,
    configured: Vec<bool>,
    command_buffers: Vec<CommandBufferHandle>,
    slot: usize,
    last_signaled: SemaphoreHandle,
    submitted: Vec<PassKind>,
}

impl SyncChain {
    pub fn new(table: &PassTable) -> Self {
        let mut chain = Self {
            states: Vec::new(),
            configured: Vec::new(),
            command_buffers: Vec::new(),
            slot: 0,
            last_signaled: SemaphoreHandle::NULL,
            submitted: Vec::new(),
        };
        chain.resize_for(table);
        chain
    }

    fn resize_for(&mut self, table: &PassTable) {
        let len = table
            .order()
            .iter()
            .map(|k| k.dense_index() + 1)
            .max()
            .unwrap_or(0);
        self.states = vec![PassState::NotStarted; len];
        self.command_buffers = vec![CommandBufferHandle::NULL; len];
        self.configured = vec![false; len];
        for kind in table.order() {
            self.configured[kind.dense_index()] = true;
        }
    }

    /// Start a new frame: every pass back to `NotStarted`, chain rooted at
    /// the slot's image-available semaphore
    pub fn reset_frame(&mut self, table: &PassTable, slot: usize, image_available: SemaphoreHandle) {
        self.resize_for(table);
        self.slot = slot;
        self.last_signaled = image_available;
        self.submitted.clear();
    }

    // ===== GETTERS =====

    pub fn state(&self, kind: PassKind) -> PassState {
        self.states
            .get(kind.dense_index())
            .copied()
            .unwrap_or(PassState::NotStarted)
    }

    /// Semaphore the next submission (or the present) must wait on
    pub fn last_signaled(&self) -> SemaphoreHandle {
        self.last_signaled
    }

    /// Passes submitted this frame, in submission order
    pub fn submitted_order(&self) -> &[PassKind] {
        &self.submitted
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    // ===== LIFECYCLE =====

    /// `NotStarted -> Recording`
    pub fn begin(&mut self, kind: PassKind, command_buffer: CommandBufferHandle) -> Result<()> {
        let index = self.index_of(kind)?;
        if self.states[index] != PassState::NotStarted {
            return Err(crate::engine_state_err!(SOURCE,
                "Pass {} started twice in one frame (state {:?})", kind, self.states[index]));
        }
        self.states[index] = PassState::Recording;
        self.command_buffers[index] = command_buffer;
        Ok(())
    }

    /// `Recording -> Ended`; returns the command buffer recorded by `begin`
    pub fn end(&mut self, kind: PassKind) -> Result<CommandBufferHandle> {
        let index = self.index_of(kind)?;
        if self.states[index] != PassState::Recording {
            return Err(crate::engine_state_err!(SOURCE,
                "Pass {} ended without being started (state {:?})", kind, self.states[index]));
        }
        self.states[index] = PassState::Ended;
        Ok(self.command_buffers[index])
    }

    /// Build the submission for `kind` without changing any state
    ///
    /// Rejects a pass that is not `Ended`, and a pass submitted while an
    /// earlier pass of the chain is still unsubmitted.
    pub fn submission(
        &self,
        table: &PassTable,
        kind: PassKind,
        fence: FenceHandle,
    ) -> Result<Submission> {
        let descriptor = table.descriptor(kind)?;
        let index = self.index_of(kind)?;
        match self.states[index] {
            PassState::Ended => {}
            PassState::Submitted => {
                return Err(crate::engine_state_err!(SOURCE,
                    "Pass {} already submitted this frame", kind));
            }
            state => {
                return Err(crate::engine_state_err!(SOURCE,
                    "Pass {} submitted before being ended (state {:?})", kind, state));
            }
        }

        let mut previous = descriptor.predecessor();
        while let Some(predecessor) = previous {
            if matches!(self.state(predecessor), PassState::Recording | PassState::Ended) {
                return Err(crate::engine_state_err!(SOURCE,
                    "Pass {} submitted before its predecessor {}", kind, predecessor));
            }
            previous = table.get(predecessor).and_then(|d| d.predecessor());
        }

        Ok(Submission {
            command_buffer: self.command_buffers[index],
            wait: (!self.last_signaled.is_null()).then_some(self.last_signaled),
            signal: descriptor.semaphore(self.slot),
            fence: (kind == PassKind::Main).then_some(fence),
        })
    }

    /// Record a submission built by `submission` as done
    pub fn mark_submitted(&mut self, kind: PassKind, submission: &Submission) -> Result<()> {
        let index = self.index_of(kind)?;
        self.states[index] = PassState::Submitted;
        self.last_signaled = submission.signal;
        self.submitted.push(kind);
        Ok(())
    }

    /// Every started pass was submitted
    pub fn is_balanced(&self) -> bool {
        self.states
            .iter()
            .all(|s| matches!(s, PassState::NotStarted | PassState::Submitted))
    }

    fn index_of(&self, kind: PassKind) -> Result<usize> {
        let index = kind.dense_index();
        if !self.configured.get(index).copied().unwrap_or(false) {
            return Err(crate::engine_state_err!(SOURCE, "Pass {} is not configured", kind));
        }
        Ok(index)
    }
}

#[cfg(test)]
#[path = "sync_chain_tests.rs"]
mod tests;
