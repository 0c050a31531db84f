/// Pipeline creation - graphics and compute
///
/// Graphics pipelines share one fixed-function setup: triangle lists, no
/// culling, dynamic viewport and scissor, alpha blending on every color
/// attachment, depth testing when the target has depth. Shadow (depth-only)
/// targets get a depth bias against acne.

use ash::vk;
use strata_engine::strata::Result;
use strata_engine::device::{
    ComputePipelineDesc, GraphicsPipelineDesc, RenderTargetLayout, VertexLayout,
};

use crate::vulkan_format::{
    device_error, from_raw, sample_count_to_vk, shader_stage_to_vk, vertex_format_to_vk, SOURCE,
};

const ENTRY_POINT: &std::ffi::CStr = c"main";
const SHADOW_BIAS_CONSTANT: f32 = 1.25;
const SHADOW_BIAS_SLOPE: f32 = 1.75;

/// Binding 0 and its attributes; meshes without vertex data bind nothing
pub(crate) fn vertex_input(
    layout: &VertexLayout,
) -> (Vec<vk::VertexInputBindingDescription>, Vec<vk::VertexInputAttributeDescription>) {
    if layout.stride == 0 {
        return (Vec::new(), Vec::new());
    }
    let binding = vk::VertexInputBindingDescription {
        binding: 0,
        stride: layout.stride,
        input_rate: vk::VertexInputRate::VERTEX,
    };
    let attributes = layout.attributes
        .iter()
        .map(|a| vk::VertexInputAttributeDescription {
            location: a.location,
            binding: 0,
            format: vertex_format_to_vk(a.format),
            offset: a.offset,
        })
        .collect();
    (vec![binding], attributes)
}

/// One alpha-blend state per color attachment
pub(crate) fn blend_attachments(layout: &RenderTargetLayout) -> Vec<vk::PipelineColorBlendAttachmentState> {
    let attachment = vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(true)
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::ONE)
        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
        .alpha_blend_op(vk::BlendOp::ADD)
        .color_write_mask(vk::ColorComponentFlags::RGBA);
    vec![attachment; layout.color_formats.len()]
}

fn depth_only(layout: &RenderTargetLayout) -> bool {
    layout.color_formats.is_empty() && layout.depth_format.is_some()
}

unsafe fn create_shader_module(device: &ash::Device, code: &[u32]) -> Result<vk::ShaderModule> {
    if code.is_empty() {
        strata_engine::engine_bail!(SOURCE, "Empty SPIR-V module");
    }
    let info = vk::ShaderModuleCreateInfo::default().code(code);
    device
        .create_shader_module(&info, None)
        .map_err(|e| device_error("vkCreateShaderModule", e))
}

pub(crate) fn create_graphics_pipeline(device: &ash::Device, desc: &GraphicsPipelineDesc<'_>) -> Result<vk::Pipeline> {
    unsafe {
        let mut modules = Vec::with_capacity(desc.stages.len());
        for stage in &desc.stages {
            match create_shader_module(device, stage.code) {
                Ok(module) => modules.push(module),
                Err(e) => {
                    for module in modules {
                        device.destroy_shader_module(module, None);
                    }
                    return Err(e);
                }
            }
        }
        let stages: Vec<vk::PipelineShaderStageCreateInfo> = desc.stages
            .iter()
            .zip(&modules)
            .map(|(stage, &module)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(stage.stage))
                    .module(module)
                    .name(ENTRY_POINT)
            })
            .collect();

        let (bindings, attributes) = vertex_input(desc.vertex_layout);
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport and scissor are set when the pass begins
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let target = desc.target_layout;
        let rasterization_state = {
            let info = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(vk::PolygonMode::FILL)
                .line_width(1.0)
                .cull_mode(vk::CullModeFlags::NONE)
                .front_face(vk::FrontFace::COUNTER_CLOCKWISE);
            if depth_only(target) {
                info.depth_bias_enable(true)
                    .depth_bias_constant_factor(SHADOW_BIAS_CONSTANT)
                    .depth_bias_slope_factor(SHADOW_BIAS_SLOPE)
            } else {
                info.depth_bias_enable(false)
            }
        };

        let has_depth = target.depth_format.is_some();
        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(has_depth)
            .depth_write_enable(has_depth)
            .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(sample_count_to_vk(target.samples));

        let blend = blend_attachments(target);
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(from_raw(desc.layout.raw()))
            .render_pass(from_raw(desc.render_pass.raw()))
            .subpass(0);

        let result = device.create_graphics_pipelines(
            vk::PipelineCache::null(),
            std::slice::from_ref(&create_info),
            None,
        );
        for module in modules {
            device.destroy_shader_module(module, None);
        }
        match result {
            Ok(pipelines) => {
                strata_engine::engine_debug!(SOURCE, "Graphics pipeline '{}' created", desc.label);
                Ok(pipelines[0])
            }
            Err((_, e)) => {
                strata_engine::engine_error!(SOURCE, "Graphics pipeline '{}' failed", desc.label);
                Err(device_error("vkCreateGraphicsPipelines", e))
            }
        }
    }
}

pub(crate) fn create_compute_pipeline(device: &ash::Device, desc: &ComputePipelineDesc<'_>) -> Result<vk::Pipeline> {
    unsafe {
        let module = create_shader_module(device, desc.code)?;
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(module)
            .name(ENTRY_POINT);
        let create_info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(from_raw(desc.layout.raw()));

        let result = device.create_compute_pipelines(
            vk::PipelineCache::null(),
            std::slice::from_ref(&create_info),
            None,
        );
        device.destroy_shader_module(module, None);
        match result {
            Ok(pipelines) => Ok(pipelines[0]),
            Err((_, e)) => {
                strata_engine::engine_error!(SOURCE, "Compute pipeline '{}' failed", desc.label);
                Err(device_error("vkCreateComputePipelines", e))
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
