//! Error types for the Strata engine
//!
//! This module defines the error types used throughout the engine:
//! device and swapchain failures, configuration mistakes caught at setup,
//! and pass lifecycle violations caught while recording a frame.

use std::fmt;

/// Result type for Strata engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Strata engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (buffer, descriptor set, instance index, etc.)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, subsystems)
    InitializationFailed(String),

    /// A GPU API call failed. `code` is the raw API result code.
    Device {
        operation: String,
        code: i32,
    },

    /// Configuration error: unknown names, missing camera, bad instance slot order
    Config(String),

    /// Pass lifecycle violation (start/end/submit out of order)
    InvalidState(String),

    /// The swapchain no longer matches the surface and must be recreated
    SwapchainOutOfDate,
}

impl Error {
    /// Build a tagged device error from an API result code
    pub fn device(operation: impl Into<String>, code: i32) -> Self {
        Error::Device {
            operation: operation.into(),
            code,
        }
    }

    /// True for errors that only ask the caller to resize
    pub fn is_resize_signal(&self) -> bool {
        matches!(self, Error::SwapchainOutOfDate)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::Device { operation, code } => {
                write!(f, "Device error during {} (result code {})", operation, code)
            }
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::SwapchainOutOfDate => write!(f, "Swapchain out of date"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
