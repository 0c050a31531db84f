/// GpuDevice - backend-agnostic seam over an explicit GPU API
///
/// The core never touches a graphics API directly. Every device object is
/// created, recorded into and destroyed through this trait, and referred to
/// by a typed 64-bit handle. Backends keep their own mutable state behind
/// interior mutability so one device can be shared as `Arc<dyn GpuDevice>`.

use bitflags::bitflags;
use crate::error::Result;

// ===== HANDLES =====

macro_rules! define_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
            pub struct $name(pub u64);

            impl $name {
                /// The null handle
                pub const NULL: Self = Self(0);

                /// True if this is the null handle
                pub fn is_null(self) -> bool {
                    self.0 == 0
                }

                /// Raw 64-bit value (backend handle)
                pub fn raw(self) -> u64 {
                    self.0
                }
            }
        )*
    };
}

define_handle!(
    /// GPU to GPU ordering signal
    SemaphoreHandle,
    /// GPU to CPU completion signal
    FenceHandle,
    CommandPoolHandle,
    CommandBufferHandle,
    RenderPassHandle,
    FramebufferHandle,
    ImageViewHandle,
    SamplerHandle,
    BufferHandle,
    DescriptorSetLayoutHandle,
    DescriptorSetHandle,
    PipelineLayoutHandle,
    PipelineHandle,
    /// Offscreen render target (images + views + sampler + framebuffer)
    RenderTargetHandle,
);

// ===== BASIC TYPES =====

/// Width and height of a surface or image, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height (1.0 for a degenerate extent)
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Extent2D {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

/// Image formats used by render targets
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::D32_SFLOAT | TextureFormat::D24_UNORM_S8_UINT)
    }
}

/// Clear value for one attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// Swapchain state reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainInfo {
    pub image_count: u32,
    pub extent: Extent2D,
    pub format: TextureFormat,
}

// ===== RENDER TARGETS =====

/// Attachment layout of a render pass: what a pass renders into
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetLayout {
    /// Color attachment formats (empty for depth-only passes)
    pub color_formats: Vec<TextureFormat>,
    /// Depth attachment format
    pub depth_format: Option<TextureFormat>,
    /// MSAA sample count (1 = no multisampling)
    pub samples: u32,
    /// Resolve multisampled color into a single-sample image
    pub resolve: bool,
    /// Array layers (cascades, cube faces)
    pub array_layers: u32,
    /// Layers are grouped by 6 into a cube array
    pub cube: bool,
    /// Final image is presented instead of sampled
    pub presentable: bool,
}

impl RenderTargetLayout {
    /// Single color attachment + depth, sampled by later passes
    pub fn color_depth(color: TextureFormat, samples: u32) -> Self {
        Self {
            color_formats: vec![color],
            depth_format: Some(TextureFormat::D32_SFLOAT),
            samples,
            resolve: samples > 1,
            array_layers: 1,
            cube: false,
            presentable: false,
        }
    }

    /// Depth-only attachment with `layers` array layers
    pub fn depth_only(layers: u32, cube: bool) -> Self {
        Self {
            color_formats: Vec::new(),
            depth_format: Some(TextureFormat::D32_SFLOAT),
            samples: 1,
            resolve: false,
            array_layers: layers,
            cube,
            presentable: false,
        }
    }

    /// Number of clear values a render pass with this layout expects
    pub fn attachment_count(&self) -> usize {
        self.color_formats.len() + usize::from(self.depth_format.is_some())
    }

    /// Default clear values: transparent black colors, depth 1.0
    pub fn clear_values(&self) -> Vec<ClearValue> {
        let mut values: Vec<ClearValue> = self
            .color_formats
            .iter()
            .map(|_| ClearValue::Color([0.0, 0.0, 0.0, 1.0]))
            .collect();
        if self.depth_format.is_some() {
            values.push(ClearValue::DepthStencil { depth: 1.0, stencil: 0 });
        }
        values
    }
}

/// Offscreen render target creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDesc {
    pub label: String,
    pub layout: RenderTargetLayout,
    pub extent: Extent2D,
}

/// Image view + sampler pair a shader can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerBinding {
    pub view: ImageViewHandle,
    pub sampler: SamplerHandle,
}

/// Device objects backing one offscreen render target
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetResources {
    pub target: RenderTargetHandle,
    pub framebuffer: FramebufferHandle,
    /// Sampled outputs: one per color attachment (resolved when MSAA), or the
    /// depth view for depth-only targets
    pub outputs: Vec<SamplerBinding>,
    pub extent: Extent2D,
}

// ===== BUFFERS & DESCRIPTORS =====

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Uniform,
    Storage,
    Vertex,
    Index,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

bitflags! {
    /// Shader stages a binding is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const GEOMETRY = 1 << 2;
        const COMPUTE = 1 << 3;
    }
}

/// Type of a descriptor binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
    CombinedImageSampler,
}

/// One binding of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub stages: ShaderStages,
}

/// Resource written into a descriptor set binding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DescriptorResource {
    Buffer {
        buffer: BufferHandle,
        offset: u64,
        range: u64,
    },
    ImageSampler(SamplerBinding),
}

/// One descriptor write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub resource: DescriptorResource,
}

// ===== PIPELINES =====

/// Pipeline bind point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

/// Shader stage of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

impl ShaderStage {
    pub fn flags(&self) -> ShaderStages {
        match self {
            ShaderStage::Vertex => ShaderStages::VERTEX,
            ShaderStage::Fragment => ShaderStages::FRAGMENT,
            ShaderStage::Geometry => ShaderStages::GEOMETRY,
            ShaderStage::Compute => ShaderStages::COMPUTE,
        }
    }
}

/// Vertex attribute formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float,
    Float2,
    Float3,
    Float4,
    Int4,
}

/// One vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

/// Pre-parsed vertex layout of a mesh
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

/// SPIR-V module for one stage
#[derive(Debug, Clone, Copy)]
pub struct ShaderModuleDesc<'a> {
    pub stage: ShaderStage,
    pub code: &'a [u32],
}

/// Graphics pipeline creation parameters
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc<'a> {
    pub label: &'a str,
    pub stages: Vec<ShaderModuleDesc<'a>>,
    pub vertex_layout: &'a VertexLayout,
    pub render_pass: RenderPassHandle,
    pub target_layout: &'a RenderTargetLayout,
    pub layout: PipelineLayoutHandle,
}

/// Compute pipeline creation parameters
#[derive(Debug, Clone, Copy)]
pub struct ComputePipelineDesc<'a> {
    pub label: &'a str,
    pub code: &'a [u32],
    pub layout: PipelineLayoutHandle,
}

// ===== SUBMISSION =====

/// One queue submission of the semaphore chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub command_buffer: CommandBufferHandle,
    pub wait: Option<SemaphoreHandle>,
    pub signal: SemaphoreHandle,
    pub fence: Option<FenceHandle>,
}

/// Result of a successful swapchain acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredImage {
    pub index: u32,
    pub suboptimal: bool,
}

/// Result of a successful present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
}

/// Explicit GPU device
///
/// Errors from `acquire_next_image` and `present` use
/// `Error::SwapchainOutOfDate` for the non-fatal resize signal; every other
/// failure is fatal and tagged with the API result code (`Error::Device`).
pub trait GpuDevice: Send + Sync {
    // ===== DEVICE INFO =====

    /// Current swapchain image count, extent and format
    fn swapchain_info(&self) -> SwapchainInfo;

    /// Whether the device exposes a compute-capable queue
    fn supports_compute(&self) -> bool;

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&self) -> Result<SemaphoreHandle>;
    fn destroy_semaphore(&self, semaphore: SemaphoreHandle);
    fn create_fence(&self, signaled: bool) -> Result<FenceHandle>;
    /// Block until the fence is signaled
    fn wait_for_fence(&self, fence: FenceHandle) -> Result<()>;
    fn reset_fence(&self, fence: FenceHandle) -> Result<()>;
    fn destroy_fence(&self, fence: FenceHandle);

    // ===== COMMAND POOLS / BUFFERS =====

    fn create_command_pool(&self) -> Result<CommandPoolHandle>;
    /// Reset the pool; every buffer allocated from it returns to the initial state
    fn reset_command_pool(&self, pool: CommandPoolHandle) -> Result<()>;
    fn destroy_command_pool(&self, pool: CommandPoolHandle);
    fn allocate_command_buffer(&self, pool: CommandPoolHandle) -> Result<CommandBufferHandle>;
    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;
    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    // ===== RENDER PASSES / TARGETS =====

    fn create_render_pass(&self, layout: &RenderTargetLayout) -> Result<RenderPassHandle>;
    fn destroy_render_pass(&self, render_pass: RenderPassHandle);
    fn create_render_target(
        &self,
        desc: &RenderTargetDesc,
        render_pass: RenderPassHandle,
    ) -> Result<RenderTargetResources>;
    fn destroy_render_target(&self, target: RenderTargetHandle);
    /// Framebuffers (one per swapchain image) for the presentable pass,
    /// including the backend-owned depth and MSAA images
    fn create_swapchain_framebuffers(
        &self,
        render_pass: RenderPassHandle,
        layout: &RenderTargetLayout,
    ) -> Result<Vec<FramebufferHandle>>;
    fn destroy_swapchain_framebuffers(&self, framebuffers: &[FramebufferHandle]);

    // ===== BUFFERS =====

    /// Host-visible buffer of `size` bytes
    fn create_buffer(&self, size: u64, usage: BufferUsage) -> Result<BufferHandle>;
    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;
    fn destroy_buffer(&self, buffer: BufferHandle);

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(&self, bindings: &[LayoutBinding]) -> Result<DescriptorSetLayoutHandle>;
    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle);
    fn allocate_descriptor_set(&self, layout: DescriptorSetLayoutHandle) -> Result<DescriptorSetHandle>;
    fn update_descriptor_set(&self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) -> Result<()>;
    fn free_descriptor_set(&self, set: DescriptorSetHandle);

    // ===== PIPELINES =====

    fn create_pipeline_layout(&self, set_layouts: &[DescriptorSetLayoutHandle]) -> Result<PipelineLayoutHandle>;
    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle);
    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<'_>) -> Result<PipelineHandle>;
    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc<'_>) -> Result<PipelineHandle>;
    fn destroy_pipeline(&self, pipeline: PipelineHandle);

    // ===== RECORDING =====

    fn cmd_begin_render_pass(
        &self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        clear_values: &[ClearValue],
    );
    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle);
    fn cmd_bind_pipeline(
        &self,
        command_buffer: CommandBufferHandle,
        bind_point: PipelineBindPoint,
        pipeline: PipelineHandle,
    );
    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: CommandBufferHandle,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutHandle,
        first_set: u32,
        sets: &[DescriptorSetHandle],
    );
    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle, offset: u64);
    fn cmd_bind_index_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    );
    fn cmd_draw(
        &self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );
    fn cmd_draw_indexed(
        &self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
    fn cmd_dispatch(&self, command_buffer: CommandBufferHandle, x: u32, y: u32, z: u32);

    // ===== PRESENTATION =====

    /// Acquire the next swapchain image, signaling `signal` when it is ready
    fn acquire_next_image(&self, signal: SemaphoreHandle) -> Result<AcquiredImage>;
    fn queue_submit(&self, submission: &Submission) -> Result<()>;
    fn present(&self, image_index: u32, wait: &[SemaphoreHandle]) -> Result<PresentOutcome>;
    /// Finish all queued GPU work
    fn wait_idle(&self) -> Result<()>;
    /// Recreate the swapchain against the current surface
    fn recreate_swapchain(&self, width: u32, height: u32) -> Result<SwapchainInfo>;
}
