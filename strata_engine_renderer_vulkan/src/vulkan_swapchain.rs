/// Swapchain - surface presentation
///
/// Owns the surface, the swapchain and one color view per swapchain image.
/// Acquire and present report `Error::SwapchainOutOfDate` when the surface
/// changed under the swapchain; the engine then resizes and calls `recreate`.

use ash::vk;
use std::sync::Arc;
use strata_engine::strata::{Error, PresentMode, Result};
use strata_engine::device::{AcquiredImage, Extent2D, PresentOutcome, SwapchainInfo, TextureFormat};

use crate::vulkan_context::{GpuContext, Surface};
use crate::vulkan_format::{device_error, init_error, vk_to_texture_format, SOURCE};

// ===== SELECTION =====

/// Preferred surface format: sRGB BGRA, then sRGB RGBA, then any format the
/// engine knows
pub(crate) fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
) -> Option<(vk::SurfaceFormatKHR, TextureFormat)> {
    const PREFERRED: [vk::Format; 2] = [vk::Format::B8G8R8A8_SRGB, vk::Format::R8G8B8A8_SRGB];

    let known = |f: &vk::SurfaceFormatKHR| vk_to_texture_format(f.format).map(|t| (*f, t));
    PREFERRED
        .iter()
        .find_map(|preferred| {
            available
                .iter()
                .filter(|f| f.format == *preferred)
                .find(|f| f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
                .and_then(known)
        })
        .or_else(|| available.iter().find_map(known))
}

/// Present mode for the requested mode; FIFO is always available
pub(crate) fn choose_present_mode(
    requested: PresentMode,
    available: &[vk::PresentModeKHR],
) -> vk::PresentModeKHR {
    let wanted = match requested {
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::Mailbox | PresentMode::BestAvailable => vk::PresentModeKHR::MAILBOX,
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
    };
    if available.contains(&wanted) {
        wanted
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Surface extent, or the window size clamped to the surface limits when the
/// surface lets the swapchain decide
pub(crate) fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One image more than the minimum, capped by the maximum (0 = unbounded)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

// ===== SWAPCHAIN =====

pub(crate) struct Swapchain {
    ctx: Arc<GpuContext>,
    surface: Surface,
    loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    surface_format: vk::SurfaceFormatKHR,
    format: TextureFormat,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    pub fn new(
        ctx: Arc<GpuContext>,
        surface: Surface,
        requested_mode: PresentMode,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        unsafe {
            let formats = surface.loader
                .get_physical_device_surface_formats(ctx.physical_device, surface.surface)
                .map_err(|e| init_error("Failed to query surface formats", e))?;
            let (surface_format, format) = choose_surface_format(&formats)
                .ok_or_else(|| init_error("No supported surface format", &formats))?;

            let modes = surface.loader
                .get_physical_device_surface_present_modes(ctx.physical_device, surface.surface)
                .map_err(|e| init_error("Failed to query present modes", e))?;
            let present_mode = choose_present_mode(requested_mode, &modes);
            if requested_mode != PresentMode::Fifo && present_mode == vk::PresentModeKHR::FIFO {
                strata_engine::engine_warn!(SOURCE,
                    "Present mode {:?} unavailable, falling back to FIFO", requested_mode);
            }

            let loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);
            let mut swapchain = Self {
                ctx,
                surface,
                loader,
                swapchain: vk::SwapchainKHR::null(),
                images: Vec::new(),
                views: Vec::new(),
                surface_format,
                format,
                extent: vk::Extent2D { width, height },
                present_mode,
            };
            swapchain.build(width, height)?;
            Ok(swapchain)
        }
    }

    /// (Re)create the swapchain, retiring the previous one
    unsafe fn build(&mut self, width: u32, height: u32) -> Result<()> {
        let capabilities = self.surface.loader
            .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface.surface)
            .map_err(|e| device_error("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?;
        let extent = choose_extent(&capabilities, width, height);

        let old_swapchain = self.swapchain;
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface.surface)
            .min_image_count(choose_image_count(&capabilities))
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = self.loader
            .create_swapchain(&create_info, None)
            .map_err(|e| device_error("vkCreateSwapchainKHR", e))?;

        self.destroy_views();
        if old_swapchain != vk::SwapchainKHR::null() {
            self.loader.destroy_swapchain(old_swapchain, None);
        }
        self.swapchain = swapchain;
        self.extent = extent;

        self.images = self.loader
            .get_swapchain_images(swapchain)
            .map_err(|e| device_error("vkGetSwapchainImagesKHR", e))?;
        for &image in &self.images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.surface_format.format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = self.ctx.device
                .create_image_view(&view_info, None)
                .map_err(|e| device_error("vkCreateImageView", e))?;
            self.views.push(view);
        }

        strata_engine::engine_debug!(SOURCE, "Swapchain {}x{} with {} images ({:?})",
            extent.width, extent.height, self.images.len(), self.present_mode);
        Ok(())
    }

    unsafe fn destroy_views(&mut self) {
        for view in self.views.drain(..) {
            self.ctx.device.destroy_image_view(view, None);
        }
    }

    pub fn info(&self) -> SwapchainInfo {
        SwapchainInfo {
            image_count: self.images.len() as u32,
            extent: Extent2D::new(self.extent.width, self.extent.height),
            format: self.format,
        }
    }

    pub fn views(&self) -> &[vk::ImageView] {
        &self.views
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn acquire(&mut self, signal: vk::Semaphore) -> Result<AcquiredImage> {
        let result = unsafe {
            self.loader.acquire_next_image(self.swapchain, u64::MAX, signal, vk::Fence::null())
        };
        match result {
            Ok((index, suboptimal)) => Ok(AcquiredImage { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                strata_engine::engine_debug!(SOURCE, "Swapchain out of date during acquire");
                Err(Error::SwapchainOutOfDate)
            }
            Err(e) => Err(device_error("vkAcquireNextImageKHR", e)),
        }
    }

    pub fn present(&mut self, image_index: u32, wait: &[vk::Semaphore]) -> Result<PresentOutcome> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = {
            let queue = self.ctx.queue();
            unsafe { self.loader.queue_present(*queue, &present_info) }
        };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                strata_engine::engine_debug!(SOURCE, "Swapchain out of date during present");
                Err(Error::SwapchainOutOfDate)
            }
            Err(e) => Err(device_error("vkQueuePresentKHR", e)),
        }
    }

    /// Rebuild against the current surface size. The caller waits for the GPU.
    pub fn recreate(&mut self, width: u32, height: u32) -> Result<SwapchainInfo> {
        unsafe { self.build(width, height)? };
        Ok(self.info())
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.destroy_views();
            if self.swapchain != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(self.swapchain, None);
            }
            self.surface.loader.destroy_surface(self.surface.surface, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
