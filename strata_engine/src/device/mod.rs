/// Device module - GPU device seam, scoped resources and the device manager

pub mod gpu_device;
pub mod resources;
mod device_manager;

#[cfg(test)]
pub(crate) mod mock_device;

pub use gpu_device::*;
pub use resources::*;
pub use device_manager::DeviceManager;
