/// Tests for pipeline fixed-function setup

use super::*;
use strata_engine::device::{TextureFormat, VertexAttribute, VertexFormat};

// ============================================================================
// VERTEX INPUT
// ============================================================================

#[test]
fn test_vertex_input_from_layout() {
    let layout = VertexLayout {
        stride: 32,
        attributes: vec![
            VertexAttribute { location: 0, format: VertexFormat::Float3, offset: 0 },
            VertexAttribute { location: 1, format: VertexFormat::Float3, offset: 12 },
            VertexAttribute { location: 2, format: VertexFormat::Float2, offset: 24 },
        ],
    };
    let (bindings, attributes) = vertex_input(&layout);
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].stride, 32);
    assert_eq!(bindings[0].input_rate, vk::VertexInputRate::VERTEX);
    assert_eq!(attributes.len(), 3);
    assert_eq!(attributes[2].format, vk::Format::R32G32_SFLOAT);
    assert_eq!(attributes[2].offset, 24);
    assert!(attributes.iter().all(|a| a.binding == 0));
}

#[test]
fn test_vertexless_layout_binds_nothing() {
    let (bindings, attributes) = vertex_input(&VertexLayout::default());
    assert!(bindings.is_empty());
    assert!(attributes.is_empty());
}

// ============================================================================
// BLENDING / DEPTH
// ============================================================================

#[test]
fn test_one_blend_state_per_color() {
    let gbuffer = RenderTargetLayout {
        color_formats: vec![TextureFormat::R16G16B16A16_SFLOAT; 4],
        ..RenderTargetLayout::color_depth(TextureFormat::R16G16B16A16_SFLOAT, 1)
    };
    let blend = blend_attachments(&gbuffer);
    assert_eq!(blend.len(), 4);
    assert!(blend.iter().all(|b| b.blend_enable == vk::TRUE));
    assert_eq!(blend[0].src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);

    assert!(blend_attachments(&RenderTargetLayout::depth_only(1, false)).is_empty());
}

#[test]
fn test_depth_only_detection() {
    assert!(depth_only(&RenderTargetLayout::depth_only(6, true)));
    assert!(!depth_only(&RenderTargetLayout::color_depth(TextureFormat::R8G8B8A8_UNORM, 1)));
}
