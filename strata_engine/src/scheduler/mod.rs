//! Scheduler module
//!
//! Per-frame orchestration: acquire, scene traversal, pass recording in
//! table order, chained submission and present.

mod compute_pass;
mod frame_scheduler;

pub use compute_pass::{ComputeDesc, ComputePipeline};
pub use frame_scheduler::{FrameScheduler, FrameStatus};
