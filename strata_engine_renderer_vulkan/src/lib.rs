/*!
# Strata Engine - Vulkan Backend

Vulkan implementation of the `GpuDevice` seam of `strata_engine`.

This crate drives the GPU through the Ash bindings, allocates memory with
gpu-allocator and creates the window surface with ash-window. Every engine
handle is either the raw value of the Vulkan object it names or, for objects
that own memory (buffers, render targets, swapchain framebuffers), the key of
a backend table entry.

# Example

```no_run
use std::sync::Arc;
use strata_engine::strata::{Engine, EngineSettings};
use strata_engine_renderer_vulkan::{VulkanDevice, VulkanSettings};

# fn run(window: &winit::window::Window) -> strata_engine::strata::Result<()> {
let settings = EngineSettings::default();
let device = VulkanDevice::new(window, VulkanSettings::from_engine(&settings))?;
let engine = Engine::new(Arc::new(device), settings)?;
# engine.shutdown()
# }
```
*/

mod vulkan_context;
mod vulkan_settings;
mod vulkan_format;
mod vulkan_swapchain;
mod vulkan_render_pass;
mod vulkan_render_target;
mod vulkan_buffer;
mod vulkan_descriptor;
mod vulkan_pipeline;
mod vulkan_device;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_device::VulkanDevice;
pub use vulkan_settings::VulkanSettings;

// Validation statistics (only with the validation layers compiled in)
#[cfg(feature = "vulkan-validation")]
pub use debug::{validation_stats, print_validation_stats_report, ValidationStats};
