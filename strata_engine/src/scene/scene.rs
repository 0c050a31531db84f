/// Scene consumer interfaces
///
/// The frame scheduler only reads the scene through these traits. Nodes,
/// drawables and computables are owned by the caller; the engine keeps
/// nothing but `EntityKey`s between frames.

use std::sync::Arc;
use bitflags::bitflags;
use glam::Mat4;
use crate::camera::Camera;
use crate::device::{
    GpuDevice, CommandBufferHandle, BufferHandle, IndexType, PipelineBindPoint,
    PipelineLayoutHandle, DescriptorSetHandle,
};
use crate::material::MaterialKey;
use crate::uniform::EntityUniforms;
use super::light::LightSet;

/// Weak, non-owning key of a scene entity
///
/// Material instances are looked up by this key; it never keeps the entity
/// alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(pub u64);

impl EntityKey {
    /// Lowest key of the range reserved for post effects
    pub const FIRST_RESERVED: u64 = u64::MAX - u32::MAX as u64;

    /// Key reserved for the full-screen draw of post effect `index`
    pub fn post_effect(index: u32) -> Self {
        Self(u64::MAX - index as u64)
    }

    /// Whether the key lies in the post-effect range. Scene entities must
    /// not use these keys.
    pub fn is_reserved(self) -> bool {
        self.0 >= Self::FIRST_RESERVED
    }
}

bitflags! {
    /// Per-drawable flags the pass filters select on
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DrawFlags: u32 {
        /// Casts shadows (drawn into shadow maps)
        const RENDER_TO_DEPTH = 1 << 0;
        /// Drawn last in the main pass, skipped everywhere else
        const OVERLAY = 1 << 1;
        /// The water plane itself (never drawn into water targets)
        const WATER_SURFACE = 1 << 2;
        /// Drawn in the late screen-quad stage
        const LATE = 1 << 3;
    }
}

/// Horizontal water plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterSurface {
    pub height: f32,
}

/// Something attached to a scene node
#[derive(Clone, Copy)]
pub enum Capability<'a> {
    Drawable(&'a dyn Drawable),
    Computable(&'a dyn Computable),
}

/// Scene root and frame-global state
pub trait Scene {
    fn root(&self) -> &dyn SceneNode;

    /// Camera the frame is rendered from. A frame without one fails with
    /// `Error::Config` before anything is recorded.
    fn main_camera(&self) -> Option<&Camera>;

    fn main_camera_mut(&mut self) -> Option<&mut Camera>;

    fn lights(&self) -> &LightSet;

    /// Water plane, if the scene has one
    fn water(&self) -> Option<WaterSurface> {
        None
    }

    /// Drawn first in the main pass
    fn skybox(&self) -> Option<&dyn Drawable> {
        None
    }

    /// Full-screen quad compositing the screen-quad stages into the main pass
    fn composite_quad(&self) -> Option<&dyn Drawable> {
        None
    }

    /// Drawn last in the main pass
    fn overlays(&self) -> Vec<&dyn Drawable> {
        Vec::new()
    }
}

/// Node of the scene graph
pub trait SceneNode {
    fn attached(&self) -> Vec<Capability<'_>>;

    fn children(&self) -> Vec<&dyn SceneNode>;

    /// Transform relative to the parent node
    fn transform(&self) -> Mat4;

    /// Record that the node was reached in frame `frame_id`
    ///
    /// Takes `&self`: implementors keep the value in a `Cell`.
    fn mark_visited(&self, frame_id: u64);

    fn visited_frame(&self) -> u64;
}

/// Renderable entity
pub trait Drawable {
    fn entity(&self) -> EntityKey;

    fn draw_flags(&self) -> DrawFlags;

    fn material(&self) -> MaterialKey;

    /// Per-entity uniform data. The model matrix is replaced by the node's
    /// world transform before upload.
    fn entity_uniforms(&self) -> EntityUniforms;

    /// Bind geometry and issue the draw. The material is already bound.
    fn record_draw(&self, commands: &mut DrawCommands<'_>);
}

/// Entity updated by the compute pass
pub trait Computable {
    fn entity(&self) -> EntityKey;

    /// Bind the entity's buffers and dispatch. The compute pipeline is
    /// already bound.
    fn record_dispatch(&self, commands: &mut DispatchCommands<'_>);
}

/// Recording interface handed to `Drawable::record_draw`
pub struct DrawCommands<'a> {
    device: &'a Arc<dyn GpuDevice>,
    command_buffer: CommandBufferHandle,
    instance_count: u32,
    first_instance: u32,
    draws: u32,
}

impl<'a> DrawCommands<'a> {
    pub(crate) fn new(
        device: &'a Arc<dyn GpuDevice>,
        command_buffer: CommandBufferHandle,
        instance_count: u32,
        first_instance: u32,
    ) -> Self {
        Self {
            device,
            command_buffer,
            instance_count,
            first_instance,
            draws: 0,
        }
    }

    pub fn bind_vertex_buffer(&mut self, buffer: BufferHandle, offset: u64) {
        self.device.cmd_bind_vertex_buffer(self.command_buffer, buffer, offset);
    }

    pub fn bind_index_buffer(&mut self, buffer: BufferHandle, offset: u64, index_type: IndexType) {
        self.device.cmd_bind_index_buffer(self.command_buffer, buffer, offset, index_type);
    }

    /// Non-indexed draw covering every folded instance
    pub fn draw(&mut self, vertex_count: u32) {
        self.device.cmd_draw(
            self.command_buffer,
            vertex_count,
            self.instance_count,
            0,
            self.first_instance,
        );
        self.draws += 1;
    }

    /// Indexed draw covering every folded instance
    pub fn draw_indexed(&mut self, index_count: u32) {
        self.device.cmd_draw_indexed(
            self.command_buffer,
            index_count,
            self.instance_count,
            0,
            0,
            self.first_instance,
        );
        self.draws += 1;
    }

    /// Instances each draw covers (1 unless the material is instanced)
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Draw calls issued so far
    pub fn draw_count(&self) -> u32 {
        self.draws
    }
}

/// Recording interface handed to `Computable::record_dispatch`
pub struct DispatchCommands<'a> {
    device: &'a Arc<dyn GpuDevice>,
    command_buffer: CommandBufferHandle,
    layout: PipelineLayoutHandle,
}

impl<'a> DispatchCommands<'a> {
    pub(crate) fn new(
        device: &'a Arc<dyn GpuDevice>,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
    ) -> Self {
        Self {
            device,
            command_buffer,
            layout,
        }
    }

    /// Bind the entity's descriptor sets against the compute pipeline layout
    pub fn bind_descriptor_sets(&mut self, first_set: u32, sets: &[DescriptorSetHandle]) {
        self.device.cmd_bind_descriptor_sets(
            self.command_buffer,
            PipelineBindPoint::Compute,
            self.layout,
            first_set,
            sets,
        );
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.device.cmd_dispatch(self.command_buffer, x, y, z);
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
