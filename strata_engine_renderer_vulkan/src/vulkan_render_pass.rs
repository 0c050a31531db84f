/// Render pass creation from a render target layout
///
/// Attachment order is fixed: color attachments, then depth, then one resolve
/// attachment per color attachment when multisampled color is resolved.
/// Framebuffers are built in the same order.

use ash::vk;
use strata_engine::strata::Result;
use strata_engine::device::RenderTargetLayout;

use crate::vulkan_format::{device_error, sample_count_to_vk, texture_format_to_vk};

/// True if multisampled color is resolved into single-sample images.
/// A presentable multisampled target always resolves into the swapchain image.
pub(crate) fn resolves(layout: &RenderTargetLayout) -> bool {
    layout.samples > 1 && (layout.resolve || layout.presentable) && !layout.color_formats.is_empty()
}

/// Depth of a target with no color attachments is sampled by later passes
pub(crate) fn depth_is_sampled(layout: &RenderTargetLayout) -> bool {
    layout.color_formats.is_empty()
}

fn final_color_layout(presentable: bool) -> vk::ImageLayout {
    if presentable {
        vk::ImageLayout::PRESENT_SRC_KHR
    } else {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    }
}

/// Attachment descriptions in framebuffer order
pub(crate) fn attachment_descriptions(layout: &RenderTargetLayout) -> Vec<vk::AttachmentDescription> {
    let samples = sample_count_to_vk(layout.samples);
    let resolve = resolves(layout);
    let mut attachments = Vec::with_capacity(layout.attachment_count() + layout.color_formats.len());

    for &format in &layout.color_formats {
        let (store_op, final_layout) = if resolve {
            (vk::AttachmentStoreOp::DONT_CARE, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        } else {
            (vk::AttachmentStoreOp::STORE, final_color_layout(layout.presentable))
        };
        attachments.push(vk::AttachmentDescription::default()
            .format(texture_format_to_vk(format))
            .samples(samples)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(store_op)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(final_layout));
    }

    if let Some(format) = layout.depth_format {
        let (store_op, final_layout) = if depth_is_sampled(layout) {
            (vk::AttachmentStoreOp::STORE, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        } else {
            (vk::AttachmentStoreOp::DONT_CARE, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        };
        attachments.push(vk::AttachmentDescription::default()
            .format(texture_format_to_vk(format))
            .samples(samples)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(store_op)
            .stencil_load_op(vk::AttachmentLoadOp::CLEAR)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(final_layout));
    }

    if resolve {
        for &format in &layout.color_formats {
            attachments.push(vk::AttachmentDescription::default()
                .format(texture_format_to_vk(format))
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::DONT_CARE)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(final_color_layout(layout.presentable)));
        }
    }

    attachments
}

/// Dependencies ordering this pass after earlier writers and before later readers
fn subpass_dependencies() -> [vk::SubpassDependency; 2] {
    let attachment_stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
        | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    let attachment_writes = vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;

    [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(attachment_stages | vk::PipelineStageFlags::FRAGMENT_SHADER)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(attachment_stages)
            .dst_access_mask(attachment_writes),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(attachment_stages)
            .src_access_mask(attachment_writes)
            .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
            .dst_access_mask(vk::AccessFlags::SHADER_READ),
    ]
}

pub(crate) fn create_render_pass(device: &ash::Device, layout: &RenderTargetLayout) -> Result<vk::RenderPass> {
    let attachments = attachment_descriptions(layout);
    let color_count = layout.color_formats.len() as u32;

    let color_refs: Vec<vk::AttachmentReference> = (0..color_count)
        .map(|i| vk::AttachmentReference {
            attachment: i,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        })
        .collect();
    let depth_ref = vk::AttachmentReference {
        attachment: color_count,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };
    let resolve_base = color_count + u32::from(layout.depth_format.is_some());
    let resolve_refs: Vec<vk::AttachmentReference> = (0..color_count)
        .map(|i| vk::AttachmentReference {
            attachment: resolve_base + i,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        })
        .collect();

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if layout.depth_format.is_some() {
        subpass = subpass.depth_stencil_attachment(&depth_ref);
    }
    if resolves(layout) {
        subpass = subpass.resolve_attachments(&resolve_refs);
    }

    let dependencies = subpass_dependencies();
    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(&dependencies);

    unsafe { device.create_render_pass(&info, None) }
        .map_err(|e| device_error("vkCreateRenderPass", e))
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;
