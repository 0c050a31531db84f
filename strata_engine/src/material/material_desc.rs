/// Material description
///
/// What a resource loader hands the engine: shaders with their declared
/// uniform fields, the textures each stage samples, the vertex layout and the
/// passes the material draws in. Parsing shader or material files is the
/// loader's job.

use crate::device::{SamplerBinding, ShaderStage, VertexLayout};
use crate::pass::PassKind;
use crate::sampler::TextureKind;
use super::uniform_field::UniformField;

/// One shader stage of a material
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDesc {
    pub stage: ShaderStage,
    /// SPIR-V words
    pub code: Vec<u32>,
    /// Uniform block layout (binding 0), in declared order
    pub uniforms: Vec<UniformField>,
}

impl ShaderDesc {
    pub fn new(stage: ShaderStage, code: Vec<u32>, uniforms: Vec<UniformField>) -> Self {
        Self { stage, code, uniforms }
    }
}

/// One sampled texture of a stage
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub kind: TextureKind,
    /// Sub-index (MRT attachment, post effect index)
    pub sub_index: u32,
    /// Stage whose descriptor set holds the sampler
    pub stage: ShaderStage,
    /// Binding slot inside the stage's set (0 is the uniform block)
    pub binding: u32,
    /// View and sampler of a loaded image (`TextureKind::ImageFile` only)
    pub image: Option<SamplerBinding>,
}

impl TextureBinding {
    /// Texture produced by a render-target pass
    pub fn external(kind: TextureKind, sub_index: u32, stage: ShaderStage, binding: u32) -> Self {
        Self {
            kind,
            sub_index,
            stage,
            binding,
            image: None,
        }
    }

    /// Texture loaded from an image file
    pub fn image(image: SamplerBinding, stage: ShaderStage, binding: u32) -> Self {
        Self {
            kind: TextureKind::ImageFile,
            sub_index: 0,
            stage,
            binding,
            image: Some(image),
        }
    }
}

/// Everything needed to build a material
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    pub name: String,
    pub shaders: Vec<ShaderDesc>,
    pub textures: Vec<TextureBinding>,
    pub vertex_layout: VertexLayout,
    /// Passes this material has a pipeline for
    pub passes: Vec<PassKind>,
    /// Models per frame the instance storage buffer holds; `None` disables
    /// instancing
    pub instancing: Option<u32>,
}

impl MaterialDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shaders: Vec::new(),
            textures: Vec::new(),
            vertex_layout: VertexLayout::default(),
            passes: vec![PassKind::Main],
            instancing: None,
        }
    }

    pub fn with_shader(mut self, shader: ShaderDesc) -> Self {
        self.shaders.push(shader);
        self
    }

    pub fn with_texture(mut self, texture: TextureBinding) -> Self {
        self.textures.push(texture);
        self
    }

    pub fn with_passes(mut self, passes: &[PassKind]) -> Self {
        self.passes = passes.to_vec();
        self
    }

    pub fn with_vertex_layout(mut self, layout: VertexLayout) -> Self {
        self.vertex_layout = layout;
        self
    }

    pub fn with_instancing(mut self, capacity: u32) -> Self {
        self.instancing = Some(capacity);
        self
    }
}
