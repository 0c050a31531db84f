//! Unit tests for Vulkan conversion functions
//!
//! Pure mappings only, no GPU required.

use super::*;
use std::sync::Arc;

// ============================================================================
// TEXTURE FORMATS
// ============================================================================

#[test]
fn test_texture_format_to_vk_color_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::B8G8R8A8_SRGB), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(
        texture_format_to_vk(TextureFormat::R16G16B16A16_SFLOAT),
        vk::Format::R16G16B16A16_SFLOAT
    );
    assert_eq!(texture_format_to_vk(TextureFormat::R32_SFLOAT), vk::Format::R32_SFLOAT);
}

#[test]
fn test_texture_format_to_vk_depth_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::D32_SFLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(
        texture_format_to_vk(TextureFormat::D24_UNORM_S8_UINT),
        vk::Format::D24_UNORM_S8_UINT
    );
}

#[test]
fn test_surface_formats_map_back() {
    assert_eq!(vk_to_texture_format(vk::Format::B8G8R8A8_SRGB), Some(TextureFormat::B8G8R8A8_SRGB));
    assert_eq!(vk_to_texture_format(vk::Format::R8G8B8A8_UNORM), Some(TextureFormat::R8G8B8A8_UNORM));
    assert_eq!(vk_to_texture_format(vk::Format::A2B10G10R10_UNORM_PACK32), None);
}

#[test]
fn test_aspects() {
    assert_eq!(
        attachment_aspect(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
    assert_eq!(sampled_aspect(TextureFormat::D24_UNORM_S8_UINT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(attachment_aspect(TextureFormat::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(attachment_aspect(TextureFormat::R8G8B8A8_SRGB), vk::ImageAspectFlags::COLOR);
    assert_eq!(sampled_aspect(TextureFormat::R32_SFLOAT), vk::ImageAspectFlags::COLOR);
}

// ============================================================================
// VERTEX FORMATS / SAMPLES
// ============================================================================

#[test]
fn test_vertex_format_to_vk() {
    assert_eq!(vertex_format_to_vk(VertexFormat::Float), vk::Format::R32_SFLOAT);
    assert_eq!(vertex_format_to_vk(VertexFormat::Float2), vk::Format::R32G32_SFLOAT);
    assert_eq!(vertex_format_to_vk(VertexFormat::Float3), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(vertex_format_to_vk(VertexFormat::Float4), vk::Format::R32G32B32A32_SFLOAT);
    // Bone indices
    assert_eq!(vertex_format_to_vk(VertexFormat::Int4), vk::Format::R32G32B32A32_SINT);
}

#[test]
fn test_sample_count_to_vk() {
    assert_eq!(sample_count_to_vk(1), vk::SampleCountFlags::TYPE_1);
    assert_eq!(sample_count_to_vk(4), vk::SampleCountFlags::TYPE_4);
    assert_eq!(sample_count_to_vk(8), vk::SampleCountFlags::TYPE_8);
    assert_eq!(sample_count_to_vk(3), vk::SampleCountFlags::TYPE_1);
    assert_eq!(sample_count_to_vk(0), vk::SampleCountFlags::TYPE_1);
}

// ============================================================================
// BUFFERS / DESCRIPTORS / PIPELINES
// ============================================================================

#[test]
fn test_buffer_usage_to_vk() {
    assert_eq!(buffer_usage_to_vk(BufferUsage::Uniform), vk::BufferUsageFlags::UNIFORM_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Storage), vk::BufferUsageFlags::STORAGE_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Vertex), vk::BufferUsageFlags::VERTEX_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Index), vk::BufferUsageFlags::INDEX_BUFFER);
}

#[test]
fn test_descriptor_type_to_vk() {
    assert_eq!(descriptor_type_to_vk(DescriptorType::UniformBuffer), vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(descriptor_type_to_vk(DescriptorType::StorageBuffer), vk::DescriptorType::STORAGE_BUFFER);
    assert_eq!(
        descriptor_type_to_vk(DescriptorType::CombinedImageSampler),
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER
    );
}

#[test]
fn test_shader_stages_to_vk() {
    assert_eq!(shader_stages_to_vk(ShaderStages::empty()), vk::ShaderStageFlags::empty());
    assert_eq!(
        shader_stages_to_vk(ShaderStages::VERTEX | ShaderStages::FRAGMENT),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(shader_stage_to_vk(ShaderStage::Geometry), vk::ShaderStageFlags::GEOMETRY);
    assert_eq!(shader_stage_to_vk(ShaderStage::Compute), vk::ShaderStageFlags::COMPUTE);
}

#[test]
fn test_bind_point_and_index_type() {
    assert_eq!(bind_point_to_vk(PipelineBindPoint::Graphics), vk::PipelineBindPoint::GRAPHICS);
    assert_eq!(bind_point_to_vk(PipelineBindPoint::Compute), vk::PipelineBindPoint::COMPUTE);
    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
    assert_eq!(index_type_to_vk(IndexType::U32), vk::IndexType::UINT32);
}

#[test]
fn test_clear_value_to_vk() {
    let color = clear_value_to_vk(&ClearValue::Color([0.1, 0.2, 0.3, 1.0]));
    let depth = clear_value_to_vk(&ClearValue::DepthStencil { depth: 1.0, stencil: 7 });
    unsafe {
        assert_eq!(color.color.float32, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(depth.depth_stencil.depth, 1.0);
        assert_eq!(depth.depth_stencil.stencil, 7);
    }
}

// ============================================================================
// HELPERS
// ============================================================================

#[test]
fn test_raw_handles_round_trip() {
    let semaphore: vk::Semaphore = from_raw(0xDEAD_BEEF);
    assert_eq!(raw(semaphore), 0xDEAD_BEEF);
    assert_eq!(raw(vk::Pipeline::null()), 0);
}

#[test]
fn test_lock_recovers_poisoned_mutex() {
    let mutex = Arc::new(Mutex::new(5));
    let poisoner = Arc::clone(&mutex);
    let _ = std::thread::spawn(move || {
        let _guard = poisoner.lock().unwrap();
        panic!("poison");
    })
    .join();

    assert!(mutex.is_poisoned());
    assert_eq!(*lock(&mutex), 5);
}

#[test]
fn test_device_error_tags_result_code() {
    let error = device_error("vkCreateFence", vk::Result::ERROR_DEVICE_LOST);
    assert_eq!(error, Error::device("vkCreateFence", vk::Result::ERROR_DEVICE_LOST.as_raw()));
    assert_eq!(device_error("vkAllocateMemory", vk::Result::ERROR_OUT_OF_DEVICE_MEMORY), Error::OutOfMemory);
}
