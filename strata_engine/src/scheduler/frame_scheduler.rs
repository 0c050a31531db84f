/// Frame scheduler - records and submits every pass of one frame
///
/// A frame runs in a fixed sequence: check the camera, acquire, reallocate
/// command buffers, traverse the scene, snapshot the uniforms, then record
/// each configured pass in table order and submit it as soon as it ends.
/// The main pass is last; its submission signals the frame fence and the
/// image is presented.
///
/// Passes with nothing to render this frame (no directional light, no
/// point lights, no water, no compute pipeline) are skipped. A skipped pass
/// stays `NotStarted`, which its successor accepts as a predecessor.

use std::sync::Arc;
use glam::Mat4;
use crate::error::{Error, Result};
use crate::command::BufferIndex;
use crate::device::{CommandBufferHandle, DeviceManager, GpuDevice, PipelineBindPoint, PresentOutcome};
use crate::engine::Engine;
use crate::material::{Material, MaterialKey, MaterialManager, UniformWrite};
use crate::pass::{PassKind, PassTable};
use crate::sampler::SamplerRegistry;
use crate::scene::{
    Capability, Computable, DispatchCommands, DrawCommands, DrawFlags, Drawable, EntityKey, Scene,
    SceneNode,
};
use crate::target::{RenderTargetPass, TargetManager};
use crate::uniform::{EntityUniforms, UniformSnapshot, UniformView};
use super::compute_pass::ComputePipeline;

const SOURCE: &str = "strata::FrameScheduler";

/// Result of `FrameScheduler::render_frame`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The swapchain no longer matches the surface. Call `Engine::resize`
    /// before the next frame.
    ResizeRequired,
}

/// Drives frames through an engine
#[derive(Debug, Default)]
pub struct FrameScheduler {
    time: f32,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds accumulated over every rendered frame
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Render and present one frame of `scene`
    ///
    /// A scene without a main camera is rejected before anything is
    /// acquired. An out-of-date or suboptimal swapchain is reported as
    /// `FrameStatus::ResizeRequired`, never as an error.
    pub fn render_frame(
        &mut self,
        engine: &mut Engine,
        scene: &mut dyn Scene,
        delta_time: f32,
    ) -> Result<FrameStatus> {
        let scene: &dyn Scene = scene;

        // ========== CAMERA ==========
        let Some(camera) = scene.main_camera() else {
            return Err(crate::engine_config_err!(SOURCE, "Scene has no main camera"));
        };

        // ========== ACQUIRE ==========
        let image_index = match engine.device_manager.acquire_next_image(&engine.table) {
            Ok(index) => index,
            Err(e) if e.is_resize_signal() => {
                crate::engine_debug!(SOURCE, "Swapchain out of date at acquire");
                return Ok(FrameStatus::ResizeRequired);
            }
            Err(e) => return Err(e),
        };
        self.time += delta_time;
        // Stamps start at 1; a node that was never visited reports 0
        let frame_id = engine.device_manager.frame_id() + 1;

        // ========== COMMAND BUFFERS ==========
        engine.device_manager.reallocate_command_buffers()?;
        engine.targets.reallocate_command_buffers()?;
        engine.materials.begin_frame(frame_id, &engine.samplers)?;

        // ========== SCENE ==========
        let mut visit = SceneVisit::default();
        visit.collect(scene.root(), Mat4::IDENTITY, frame_id);
        let snapshot = UniformSnapshot::build(
            camera,
            scene.lights(),
            &engine.settings.limits,
            self.time,
            delta_time,
        );

        // ========== PASSES ==========
        let order = engine.table.order().to_vec();
        let mut recorder = FrameRecorder::new(engine, image_index, frame_id);
        for kind in order {
            recorder.record(kind, scene, &snapshot, &visit)?;
        }

        // ========== PRESENT ==========
        match engine.device_manager.present() {
            Ok(PresentOutcome::Presented) => Ok(FrameStatus::Presented),
            Ok(PresentOutcome::Suboptimal) => Ok(FrameStatus::ResizeRequired),
            Err(e) if e.is_resize_signal() => {
                crate::engine_debug!(SOURCE, "Swapchain out of date at present");
                Ok(FrameStatus::ResizeRequired)
            }
            Err(e) => Err(e),
        }
    }
}

// ===== SCENE TRAVERSAL =====

/// Drawables and computables reachable from the root, with world transforms
#[derive(Default)]
struct SceneVisit<'s> {
    drawables: Vec<(Mat4, &'s dyn Drawable)>,
    computables: Vec<&'s dyn Computable>,
}

impl<'s> SceneVisit<'s> {
    fn collect(&mut self, node: &'s dyn SceneNode, parent: Mat4, frame_id: u64) {
        node.mark_visited(frame_id);
        let world = parent * node.transform();
        for capability in node.attached() {
            match capability {
                Capability::Drawable(drawable) => self.drawables.push((world, drawable)),
                Capability::Computable(computable) => self.computables.push(computable),
            }
        }
        for child in node.children() {
            self.collect(child, world, frame_id);
        }
    }
}

// ===== RECORDING =====

/// One graphics pass being recorded
struct PassDraw<'a> {
    kind: PassKind,
    slot: u32,
    command_buffer: CommandBufferHandle,
    snapshot: &'a UniformSnapshot,
    /// First drawable of each instanced group, drawn when the pass ends
    pending: Vec<(MaterialKey, &'a dyn Drawable)>,
}

/// Engine state borrowed for the recording of one frame
struct FrameRecorder<'f> {
    device: Arc<dyn GpuDevice>,
    device_manager: &'f mut DeviceManager,
    table: &'f PassTable,
    targets: &'f mut TargetManager,
    materials: &'f mut MaterialManager,
    samplers: &'f SamplerRegistry,
    compute: Option<&'f ComputePipeline>,
    image_index: u32,
    frame_id: u64,
}

impl<'f> FrameRecorder<'f> {
    fn new(engine: &'f mut Engine, image_index: u32, frame_id: u64) -> Self {
        let device = Arc::clone(engine.device_manager.device());
        let Engine { device_manager, table, targets, materials, samplers, compute, .. } = engine;
        Self {
            device,
            device_manager,
            table,
            targets,
            materials,
            samplers,
            compute: compute.as_ref(),
            image_index,
            frame_id,
        }
    }

    fn record(
        &mut self,
        kind: PassKind,
        scene: &dyn Scene,
        snapshot: &UniformSnapshot,
        visit: &SceneVisit<'_>,
    ) -> Result<()> {
        let lights = scene.lights();
        let skip = match kind {
            PassKind::ComputeParticles => return self.record_compute(&visit.computables),
            PassKind::ShadowDirect => lights.directional.is_none(),
            PassKind::ShadowPoint => lights.points.is_empty(),
            PassKind::WaterReflection | PassKind::WaterRefraction => scene.water().is_none(),
            _ => false,
        };
        if skip {
            crate::engine_trace!(SOURCE, "{} skipped: nothing to render", kind);
            return Ok(());
        }
        self.record_graphics(kind, scene, snapshot, visit)
    }

    fn record_compute(&mut self, computables: &[&dyn Computable]) -> Result<()> {
        let Some(compute) = self.compute else {
            crate::engine_trace!(SOURCE, "Compute pass skipped: no pipeline");
            return Ok(());
        };
        let kind = PassKind::ComputeParticles;
        let buffer = BufferIndex::compute_particles();

        let command_buffer = self.device_manager.create_or_get_command_buffer(buffer)?;
        self.device_manager.begin_pass(kind, command_buffer)?;
        self.device.cmd_bind_pipeline(command_buffer, PipelineBindPoint::Compute, compute.handle());
        let mut commands = DispatchCommands::new(&self.device, command_buffer, compute.layout());
        for computable in computables {
            computable.record_dispatch(&mut commands);
        }
        self.device_manager.end_pass(kind)?;
        self.device_manager.submit(self.table, kind, buffer)
    }

    fn record_graphics(
        &mut self,
        kind: PassKind,
        scene: &dyn Scene,
        frame: &UniformSnapshot,
        visit: &SceneVisit<'_>,
    ) -> Result<()> {
        let variant = match kind {
            PassKind::ShadowDirect => Some(frame.for_shadow_direct()),
            PassKind::ShadowPoint => Some(frame.for_shadow_point()),
            PassKind::WaterReflection => scene.water().map(|w| frame.for_water_reflection(w.height)),
            PassKind::WaterRefraction => scene.water().map(|w| frame.for_water_refraction(w.height)),
            _ => None,
        };
        let snapshot = variant.as_ref().unwrap_or(frame);
        let descriptor = self.table.descriptor(kind)?;
        let filter = descriptor.filter();
        let buffer = BufferIndex::for_pass(kind, self.image_index)?;

        let command_buffer = target_for(self.targets, kind)?
            .start_pass(self.device_manager, buffer, self.image_index)?;
        let mut pass = PassDraw {
            kind,
            slot: descriptor.instance_slot(),
            command_buffer,
            snapshot,
            pending: Vec::new(),
        };

        match kind {
            PassKind::PostEffect(index) => self.draw_post_effect(&pass, index)?,
            PassKind::Main => {
                if let Some(skybox) = scene.skybox() {
                    self.draw(&mut pass, skybox, skybox.entity_uniforms())?;
                }
                let composite = scene
                    .composite_quad()
                    .filter(|_| self.table.order().iter().any(|k| k.is_screen_quad()));
                match composite {
                    Some(quad) => self.draw(&mut pass, quad, quad.entity_uniforms())?,
                    None => {
                        for &(world, drawable) in &visit.drawables {
                            if filter.accepts(drawable.draw_flags()) {
                                self.draw_placed(&mut pass, world, drawable)?;
                            }
                        }
                    }
                }
                for overlay in scene.overlays() {
                    self.draw(&mut pass, overlay, overlay.entity_uniforms())?;
                }
                for &(world, drawable) in &visit.drawables {
                    if drawable.draw_flags().contains(DrawFlags::OVERLAY) {
                        self.draw_placed(&mut pass, world, drawable)?;
                    }
                }
            }
            _ => {
                for &(world, drawable) in &visit.drawables {
                    if filter.accepts(drawable.draw_flags()) {
                        self.draw_placed(&mut pass, world, drawable)?;
                    }
                }
            }
        }
        self.flush_instanced(&mut pass)?;

        target_for(self.targets, kind)?.end_pass(self.device_manager, command_buffer)?;
        self.device_manager.submit(self.table, kind, buffer)
    }

    fn draw_placed<'a>(&mut self, pass: &mut PassDraw<'a>, world: Mat4, drawable: &'a dyn Drawable) -> Result<()> {
        let uniforms = drawable.entity_uniforms().with_model(world);
        self.draw(pass, drawable, uniforms)
    }

    fn draw<'a>(
        &mut self,
        pass: &mut PassDraw<'a>,
        drawable: &'a dyn Drawable,
        uniforms: EntityUniforms,
    ) -> Result<()> {
        let entity = drawable.entity();
        if entity.is_reserved() {
            return Err(crate::engine_config_err!(SOURCE,
                "Entity key {:#x} is reserved for post effects", entity.0));
        }
        let key = drawable.material();
        let material = material_mut(self.materials, key)?;
        if !material.draws_in(pass.kind) {
            return Ok(());
        }

        let instance = instance_for(material, entity, pass.slot, self.samplers)?;
        let view = UniformView::new(pass.snapshot, &uniforms);
        match material.set_uniform_data(instance, &view, self.image_index, self.frame_id)? {
            UniformWrite::Folded => {}
            UniformWrite::Written if material.is_instanced() => pass.pending.push((key, drawable)),
            UniformWrite::Written => {
                material.bind(pass.command_buffer, pass.kind, instance, self.image_index)?;
                let mut commands = DrawCommands::new(&self.device, pass.command_buffer, 1, 0);
                drawable.record_draw(&mut commands);
            }
        }
        Ok(())
    }

    /// Draw every instanced group collected during the pass
    fn flush_instanced(&mut self, pass: &mut PassDraw<'_>) -> Result<()> {
        for (key, drawable) in std::mem::take(&mut pass.pending) {
            let material = material_mut(self.materials, key)?;
            let Some(group) = material.finish_instanced_group() else {
                continue;
            };
            material.bind(pass.command_buffer, pass.kind, group.main, self.image_index)?;
            let mut commands = DrawCommands::new(
                &self.device,
                pass.command_buffer,
                group.instance_count,
                group.first_instance,
            );
            drawable.record_draw(&mut commands);
        }
        Ok(())
    }

    /// Full-screen triangle of post effect `index`
    fn draw_post_effect(&mut self, pass: &PassDraw<'_>, index: u32) -> Result<()> {
        let Some(effect) = self.targets.post_effects().get(index) else {
            return Err(crate::engine_state_err!(SOURCE, "Post effect {} has no target", index));
        };
        let material = material_mut(self.materials, effect.material())?;
        let instance = material.get_instance_for_entity(EntityKey::post_effect(index), 0, self.samplers)?;
        let uniforms = EntityUniforms::default();
        material.set_uniform_data(instance, &UniformView::new(pass.snapshot, &uniforms),
            self.image_index, self.frame_id)?;
        material.finish_instanced_group();
        material.bind(pass.command_buffer, pass.kind, instance, self.image_index)?;
        self.device.cmd_draw(pass.command_buffer, 3, 1, 0, 0);
        Ok(())
    }
}

fn target_for(targets: &mut TargetManager, kind: PassKind) -> Result<&mut dyn RenderTargetPass> {
    targets
        .get_mut(kind)
        .ok_or_else(|| crate::engine_state_err!(SOURCE, "No render target for {}", kind))
}

fn material_mut(materials: &mut MaterialManager, key: MaterialKey) -> Result<&mut Material> {
    materials
        .material_mut(key)
        .ok_or_else(|| Error::InvalidResource(format!("Material {:?} was removed", key)))
}

/// Instance of `entity` for `slot`, creating the lower slots first
fn instance_for(
    material: &mut Material,
    entity: EntityKey,
    slot: u32,
    samplers: &SamplerRegistry,
) -> Result<usize> {
    for lower in 0..slot {
        material.get_instance_for_entity(entity, lower, samplers)?;
    }
    material.get_instance_for_entity(entity, slot, samplers)
}

#[cfg(test)]
#[path = "frame_scheduler_tests.rs"]
mod tests;
