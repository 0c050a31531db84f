//! Command buffer module
//!
//! Buffer-index namespace and the command pool rotation.

mod buffer_index;
mod command_buffer_manager;

pub use buffer_index::BufferIndex;
pub use command_buffer_manager::CommandBufferManager;
