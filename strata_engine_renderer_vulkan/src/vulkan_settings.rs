/// VulkanSettings - instance and device creation options

use strata_engine::strata::{EngineSettings, PresentMode};

/// Options consumed once by `VulkanDevice::new`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulkanSettings {
    /// Application name reported to the driver
    pub application_name: String,
    /// Enable VK_LAYER_KHRONOS_validation and the debug messenger.
    /// Ignored unless the crate is built with the `vulkan-validation` feature.
    pub validation: bool,
    /// Index into the physical device list, or `None` to pick the best GPU
    pub gpu_index: Option<usize>,
    pub present_mode: PresentMode,
}

impl Default for VulkanSettings {
    fn default() -> Self {
        Self {
            application_name: "Strata Application".to_string(),
            validation: cfg!(feature = "vulkan-validation"),
            gpu_index: None,
            present_mode: PresentMode::Fifo,
        }
    }
}

impl VulkanSettings {
    /// Backend options matching the engine settings
    pub fn from_engine(settings: &EngineSettings) -> Self {
        Self {
            application_name: settings.application_name.clone(),
            validation: settings.validation,
            gpu_index: None,
            present_mode: settings.present_mode,
        }
    }
}
