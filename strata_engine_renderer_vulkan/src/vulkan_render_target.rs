/// Render targets - attachment images, framebuffers and samplers
///
/// `RenderTarget` backs one offscreen pass: its attachment images, the
/// framebuffer over them and the sampler later passes read them with.
/// `SwapchainFramebuffers` backs the presentable pass: one framebuffer per
/// swapchain image sharing a depth image (and an MSAA color image).

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;
use strata_engine::strata::{Error, Result};
use strata_engine::device::{
    Extent2D, FramebufferHandle, ImageViewHandle, RenderTargetDesc, RenderTargetHandle,
    RenderTargetLayout, RenderTargetResources, SamplerBinding, SamplerHandle, TextureFormat,
};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    attachment_aspect, device_error, raw, sample_count_to_vk, sampled_aspect,
    texture_format_to_vk, SOURCE,
};
use crate::vulkan_render_pass::{depth_is_sampled, resolves};

/// View type shaders sample a target through
pub(crate) fn sampled_view_type(layers: u32, cube: bool) -> vk::ImageViewType {
    match (cube, layers) {
        (true, 6) => vk::ImageViewType::CUBE,
        (true, _) => vk::ImageViewType::CUBE_ARRAY,
        (false, 1) => vk::ImageViewType::TYPE_2D,
        (false, _) => vk::ImageViewType::TYPE_2D_ARRAY,
    }
}

/// View type a framebuffer attaches (cube views cannot be attached)
pub(crate) fn attachment_view_type(layers: u32) -> vk::ImageViewType {
    if layers > 1 {
        vk::ImageViewType::TYPE_2D_ARRAY
    } else {
        vk::ImageViewType::TYPE_2D
    }
}

// ===== ATTACHMENT IMAGE =====

#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageSpec {
    pub format: TextureFormat,
    pub extent: vk::Extent2D,
    pub layers: u32,
    pub samples: u32,
    pub cube: bool,
    pub sampled: bool,
}

/// GPU-only image with an attachment view and, if sampled, a shader view
pub(crate) struct AttachmentImage {
    ctx: Arc<GpuContext>,
    image: vk::Image,
    allocation: Option<Allocation>,
    view: vk::ImageView,
    sampled_view: Option<vk::ImageView>,
}

impl AttachmentImage {
    pub fn new(ctx: &Arc<GpuContext>, label: &str, spec: &ImageSpec) -> Result<Self> {
        let layers = spec.layers.max(1);
        let format = texture_format_to_vk(spec.format);
        let mut usage = if spec.format.is_depth() {
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
        } else {
            vk::ImageUsageFlags::COLOR_ATTACHMENT
        };
        if spec.sampled {
            usage |= vk::ImageUsageFlags::SAMPLED;
        }
        let flags = if spec.cube && layers % 6 == 0 {
            vk::ImageCreateFlags::CUBE_COMPATIBLE
        } else {
            vk::ImageCreateFlags::empty()
        };

        let image_info = vk::ImageCreateInfo::default()
            .flags(flags)
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: spec.extent.width,
                height: spec.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(layers)
            .samples(sample_count_to_vk(spec.samples))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let image = ctx.device
                .create_image(&image_info, None)
                .map_err(|e| device_error("vkCreateImage", e))?;
            // From here on Drop releases whatever was created
            let mut attachment = Self {
                ctx: Arc::clone(ctx),
                image,
                allocation: None,
                view: vk::ImageView::null(),
                sampled_view: None,
            };

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = ctx.allocator()
                .allocate(&AllocationCreateDesc {
                    name: label,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    strata_engine::engine_error!(SOURCE,
                        "Out of GPU memory for '{}' ({}x{}, {} layers): {:?}",
                        label, spec.extent.width, spec.extent.height, layers, e);
                    Error::OutOfMemory
                })?;
            ctx.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| device_error("vkBindImageMemory", e))?;
            attachment.allocation = Some(allocation);

            attachment.view = attachment.create_view(
                format,
                attachment_view_type(layers),
                attachment_aspect(spec.format),
                layers,
            )?;
            if spec.sampled {
                attachment.sampled_view = Some(attachment.create_view(
                    format,
                    sampled_view_type(layers, spec.cube),
                    sampled_aspect(spec.format),
                    layers,
                )?);
            }
            Ok(attachment)
        }
    }

    unsafe fn create_view(
        &self,
        format: vk::Format,
        view_type: vk::ImageViewType,
        aspect_mask: vk::ImageAspectFlags,
        layers: u32,
    ) -> Result<vk::ImageView> {
        let info = vk::ImageViewCreateInfo::default()
            .image(self.image)
            .view_type(view_type)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: layers,
            });
        self.ctx.device
            .create_image_view(&info, None)
            .map_err(|e| device_error("vkCreateImageView", e))
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    pub fn sampled_view(&self) -> Option<vk::ImageView> {
        self.sampled_view
    }
}

impl Drop for AttachmentImage {
    fn drop(&mut self) {
        unsafe {
            if let Some(view) = self.sampled_view.take() {
                self.ctx.device.destroy_image_view(view, None);
            }
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }
            self.ctx.device.destroy_image(self.image, None);
            if let Some(allocation) = self.allocation.take() {
                self.ctx.allocator().free(allocation).ok();
            }
        }
    }
}

unsafe fn create_framebuffer(
    ctx: &GpuContext,
    render_pass: vk::RenderPass,
    attachments: &[vk::ImageView],
    extent: vk::Extent2D,
    layers: u32,
) -> Result<vk::Framebuffer> {
    let info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(layers.max(1));
    ctx.device
        .create_framebuffer(&info, None)
        .map_err(|e| device_error("vkCreateFramebuffer", e))
}

// ===== OFFSCREEN TARGET =====

pub(crate) struct RenderTarget {
    ctx: Arc<GpuContext>,
    framebuffer: vk::Framebuffer,
    sampler: vk::Sampler,
    /// Released after the framebuffer (Drop body runs before fields drop)
    _images: Vec<AttachmentImage>,
}

impl RenderTarget {
    /// Create the attachments, framebuffer and sampler for `desc`
    pub fn new(
        ctx: &Arc<GpuContext>,
        desc: &RenderTargetDesc,
        render_pass: vk::RenderPass,
    ) -> Result<(Self, RenderTargetResources)> {
        let layout = &desc.layout;
        let extent = vk::Extent2D {
            width: desc.extent.width,
            height: desc.extent.height,
        };
        let resolve = resolves(layout);
        let spec = |format: TextureFormat, samples: u32, sampled: bool| ImageSpec {
            format,
            extent,
            layers: layout.array_layers,
            samples,
            cube: layout.cube,
            sampled,
        };

        let mut colors = Vec::with_capacity(layout.color_formats.len());
        for (i, &format) in layout.color_formats.iter().enumerate() {
            let label = format!("{} color {}", desc.label, i);
            colors.push(AttachmentImage::new(ctx, &label, &spec(format, layout.samples, !resolve))?);
        }
        let depth = match layout.depth_format {
            Some(format) => {
                let label = format!("{} depth", desc.label);
                Some(AttachmentImage::new(ctx, &label, &spec(format, layout.samples, depth_is_sampled(layout)))?)
            }
            None => None,
        };
        let mut resolved = Vec::new();
        if resolve {
            for (i, &format) in layout.color_formats.iter().enumerate() {
                let label = format!("{} resolve {}", desc.label, i);
                resolved.push(AttachmentImage::new(ctx, &label, &spec(format, 1, true))?);
            }
        }

        let views: Vec<vk::ImageView> = colors
            .iter()
            .chain(depth.iter())
            .chain(resolved.iter())
            .map(AttachmentImage::view)
            .collect();
        let sampled_views: Vec<vk::ImageView> = if depth_is_sampled(layout) {
            depth.iter().filter_map(AttachmentImage::sampled_view).collect()
        } else if resolve {
            resolved.iter().filter_map(AttachmentImage::sampled_view).collect()
        } else {
            colors.iter().filter_map(AttachmentImage::sampled_view).collect()
        };

        let mut images = colors;
        images.extend(depth);
        images.extend(resolved);

        unsafe {
            let framebuffer = create_framebuffer(ctx, render_pass, &views, extent, layout.array_layers)?;
            let sampler = match create_sampler(ctx) {
                Ok(sampler) => sampler,
                Err(e) => {
                    ctx.device.destroy_framebuffer(framebuffer, None);
                    return Err(e);
                }
            };

            let resources = RenderTargetResources {
                target: RenderTargetHandle(raw(framebuffer)),
                framebuffer: FramebufferHandle(raw(framebuffer)),
                outputs: sampled_views
                    .into_iter()
                    .map(|view| SamplerBinding {
                        view: ImageViewHandle(raw(view)),
                        sampler: SamplerHandle(raw(sampler)),
                    })
                    .collect(),
                extent: Extent2D::new(extent.width, extent.height),
            };
            strata_engine::engine_debug!(SOURCE, "Render target '{}' {}x{} ({} attachments, {} outputs)",
                desc.label, extent.width, extent.height, views.len(), resources.outputs.len());

            Ok((
                Self {
                    ctx: Arc::clone(ctx),
                    framebuffer,
                    sampler,
                    _images: images,
                },
                resources,
            ))
        }
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
            self.ctx.device.destroy_sampler(self.sampler, None);
        }
    }
}

/// Linear, clamped sampler for reading render target outputs
unsafe fn create_sampler(ctx: &GpuContext) -> Result<vk::Sampler> {
    let info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
        .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
        .max_lod(0.0);
    ctx.device
        .create_sampler(&info, None)
        .map_err(|e| device_error("vkCreateSampler", e))
}

// ===== SWAPCHAIN FRAMEBUFFERS =====

pub(crate) struct SwapchainFramebuffers {
    ctx: Arc<GpuContext>,
    framebuffers: Vec<vk::Framebuffer>,
    /// MSAA color and depth images shared by every framebuffer
    attachments: Vec<AttachmentImage>,
}

impl SwapchainFramebuffers {
    pub fn new(
        ctx: &Arc<GpuContext>,
        render_pass: vk::RenderPass,
        layout: &RenderTargetLayout,
        swapchain_views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let resolve = resolves(layout);
        let spec = |format: TextureFormat| ImageSpec {
            format,
            extent,
            layers: 1,
            samples: layout.samples,
            cube: false,
            sampled: false,
        };

        let msaa = match layout.color_formats.first() {
            Some(&format) if resolve => Some(AttachmentImage::new(ctx, "swapchain msaa color", &spec(format))?),
            _ => None,
        };
        let depth = match layout.depth_format {
            Some(format) => Some(AttachmentImage::new(ctx, "swapchain depth", &spec(format))?),
            None => None,
        };

        let mut set = Self {
            ctx: Arc::clone(ctx),
            framebuffers: Vec::with_capacity(swapchain_views.len()),
            attachments: msaa.into_iter().chain(depth).collect(),
        };
        let msaa_view = if resolve { set.attachments.first().map(AttachmentImage::view) } else { None };
        let depth_view = if layout.depth_format.is_some() { set.attachments.last().map(AttachmentImage::view) } else { None };

        for &swapchain_view in swapchain_views {
            let attachments: Vec<vk::ImageView> = match msaa_view {
                Some(msaa_view) => [Some(msaa_view), depth_view, Some(swapchain_view)]
                    .into_iter()
                    .flatten()
                    .collect(),
                None => [Some(swapchain_view), depth_view].into_iter().flatten().collect(),
            };
            let framebuffer = unsafe { create_framebuffer(ctx, render_pass, &attachments, extent, 1)? };
            set.framebuffers.push(framebuffer);
        }
        Ok(set)
    }

    pub fn handles(&self) -> Vec<FramebufferHandle> {
        self.framebuffers.iter().map(|&fb| FramebufferHandle(raw(fb))).collect()
    }
}

impl Drop for SwapchainFramebuffers {
    fn drop(&mut self) {
        unsafe {
            for framebuffer in self.framebuffers.drain(..) {
                self.ctx.device.destroy_framebuffer(framebuffer, None);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_render_target_tests.rs"]
mod tests;
