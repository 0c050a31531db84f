/// GpuContext - instance, logical device, queue and memory allocator
///
/// Shared (via `Arc`) by every object that owns device memory or must be
/// destroyed against the device, so the device outlives all of them. The
/// context destroys the allocator, device, debug messenger and instance in
/// that order when the last reference goes away.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CStr;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};
use strata_engine::strata::Result;

use crate::vulkan_format::{init_error, lock, SOURCE};
use crate::vulkan_settings::VulkanSettings;

/// Physical device properties relevant to selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeviceCandidate {
    pub device_type: vk::PhysicalDeviceType,
    /// Queue family supporting both graphics and present, if any
    pub queue_family: Option<u32>,
}

/// Pick a physical device: the requested index, else the first discrete GPU,
/// else the first usable one
pub(crate) fn select_physical_device(
    candidates: &[DeviceCandidate],
    gpu_index: Option<usize>,
) -> Option<usize> {
    if let Some(index) = gpu_index {
        return candidates
            .get(index)
            .filter(|c| c.queue_family.is_some())
            .map(|_| index);
    }
    let usable = || candidates.iter().enumerate().filter(|(_, c)| c.queue_family.is_some());
    usable()
        .find(|(_, c)| c.device_type == vk::PhysicalDeviceType::DISCRETE_GPU)
        .or_else(|| usable().next())
        .map(|(i, _)| i)
}

/// Surface created together with the context, handed to the swapchain
pub(crate) struct Surface {
    pub surface: vk::SurfaceKHR,
    pub loader: ash::khr::surface::Instance,
}

pub(crate) struct GpuContext {
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,
    /// Memory allocator, dropped before the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,
    /// Single graphics + present queue; submissions lock it
    queue: Mutex<vk::Queue>,
    pub queue_family: u32,
    pub supports_compute: bool,
    pub instance: ash::Instance,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<crate::debug::DebugMessenger>,
    /// Keeps the Vulkan library loaded
    _entry: ash::Entry,
}

impl GpuContext {
    /// Create the instance, surface, logical device and allocator for `window`
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        settings: &VulkanSettings,
    ) -> Result<(Self, Surface)> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_error("Failed to load Vulkan library", e))?;

            let application_name = std::ffi::CString::new(settings.application_name.as_str())
                .map_err(|e| init_error("Invalid application name", e))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&application_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Strata")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle()
                .map_err(|e| init_error("Failed to get display handle", e))?;
            #[cfg_attr(not(feature = "vulkan-validation"), allow(unused_mut))]
            let mut extension_names =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| init_error("Failed to get required extensions", e))?
                    .to_vec();
            #[cfg_attr(not(feature = "vulkan-validation"), allow(unused_mut))]
            let mut layer_names: Vec<*const std::os::raw::c_char> = Vec::new();

            let validation = Self::validation_enabled(settings);
            #[cfg(feature = "vulkan-validation")]
            if validation {
                extension_names.push(crate::debug::DebugMessenger::EXTENSION.as_ptr());
                layer_names.push(crate::debug::DebugMessenger::LAYER.as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);
            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_error("Failed to create Vulkan instance", e))?;

            #[cfg(feature = "vulkan-validation")]
            let debug_messenger = if validation {
                Some(crate::debug::DebugMessenger::new(&entry, &instance)?)
            } else {
                None
            };

            let window_handle = window.window_handle()
                .map_err(|e| init_error("Failed to get window handle", e))?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_error("Failed to create surface", e))?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, queue_family, supports_compute) =
                Self::pick_physical_device(&instance, &surface_loader, surface, settings.gpu_index)?;

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];

            let supported = instance.get_physical_device_features(physical_device);
            let device_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(supported.sampler_anisotropy == vk::TRUE)
                .geometry_shader(supported.geometry_shader == vk::TRUE)
                .image_cube_array(supported.image_cube_array == vk::TRUE);
            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);
            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_error("Failed to create logical device", e))?;
            let queue = device.get_device_queue(queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_error("Failed to create GPU allocator", e))?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy();
            strata_engine::engine_info!(SOURCE,
                "Using GPU '{}' (queue family {}, compute: {}, validation: {})",
                device_name, queue_family, supports_compute, validation);

            let context = Self {
                device,
                physical_device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                queue: Mutex::new(queue),
                queue_family,
                supports_compute,
                instance,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
                _entry: entry,
            };
            Ok((context, Surface { surface, loader: surface_loader }))
        }
    }

    fn validation_enabled(settings: &VulkanSettings) -> bool {
        if settings.validation && !cfg!(feature = "vulkan-validation") {
            strata_engine::engine_warn!(SOURCE,
                "Validation requested but the 'vulkan-validation' feature is disabled");
        }
        settings.validation && cfg!(feature = "vulkan-validation")
    }

    /// Returns (device, graphics+present queue family, compute support)
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        gpu_index: Option<usize>,
    ) -> Result<(vk::PhysicalDevice, u32, bool)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_error("Failed to enumerate physical devices", e))?;

        let candidates: Vec<DeviceCandidate> = physical_devices
            .iter()
            .map(|&physical_device| {
                let families = instance.get_physical_device_queue_family_properties(physical_device);
                let queue_family = (0..families.len() as u32).find(|&i| {
                    families[i as usize].queue_flags.contains(vk::QueueFlags::GRAPHICS)
                        && surface_loader
                            .get_physical_device_surface_support(physical_device, i, surface)
                            .unwrap_or(false)
                });
                DeviceCandidate {
                    device_type: instance.get_physical_device_properties(physical_device).device_type,
                    queue_family,
                }
            })
            .collect();

        let index = select_physical_device(&candidates, gpu_index).ok_or_else(|| {
            init_error("No usable GPU",
                format!("{} device(s), requested index {:?}", candidates.len(), gpu_index))
        })?;
        let physical_device = physical_devices[index];
        let queue_family = candidates[index].queue_family.unwrap_or_default();
        let families = instance.get_physical_device_queue_family_properties(physical_device);
        let supports_compute = families[queue_family as usize]
            .queue_flags
            .contains(vk::QueueFlags::COMPUTE);

        Ok((physical_device, queue_family, supports_compute))
    }

    pub fn allocator(&self) -> MutexGuard<'_, Allocator> {
        lock(&self.allocator)
    }

    /// Exclusive access to the queue for submit and present
    pub fn queue(&self) -> MutexGuard<'_, vk::Queue> {
        lock(&self.queue)
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // Free VkDeviceMemory pages before the device goes away
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
            #[cfg(feature = "vulkan-validation")]
            if let Some(messenger) = self.debug_messenger.take() {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_context_tests.rs"]
mod tests;
