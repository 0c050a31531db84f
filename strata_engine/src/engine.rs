/// Strata Engine - explicit context owning every engine subsystem
///
/// One `Engine` is built per device. It owns the device manager, the pass
/// table and render pass registry, the sampler registry, the render
/// targets, the material manager and the particle compute pipeline, and is
/// handed by reference to `FrameScheduler::render_frame`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use strata_engine::strata::{Engine, EngineSettings, FrameScheduler, FrameStatus, GpuDevice, Scene};
///
/// fn run(device: Arc<dyn GpuDevice>, scene: &mut dyn Scene) -> strata_engine::strata::Result<()> {
///     let mut engine = Engine::new(device, EngineSettings::default())?;
///     let mut scheduler = FrameScheduler::new();
///     if scheduler.render_frame(&mut engine, scene, 0.016)? == FrameStatus::ResizeRequired {
///         engine.resize(1920, 1080, scene)?;
///     }
///     engine.shutdown()
/// }
/// ```

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::command::BufferIndex;
use crate::device::{DeviceManager, GpuDevice};
use crate::material::{MaterialContext, MaterialDesc, MaterialKey, MaterialManager};
use crate::pass::{PassKind, PassRegistry, PassTable};
use crate::sampler::SamplerRegistry;
use crate::scene::{EntityKey, Scene};
use crate::scheduler::{ComputeDesc, ComputePipeline};
use crate::settings::EngineSettings;
use crate::target::{TargetContext, TargetManager};

const SOURCE: &str = "strata::Engine";

pub struct Engine {
    // Fields drop in declaration order: materials and targets reference
    // render passes, passes reference the device.
    pub(crate) materials: MaterialManager,
    pub(crate) compute: Option<ComputePipeline>,
    pub(crate) targets: TargetManager,
    pub(crate) samplers: SamplerRegistry,
    pub(crate) registry: PassRegistry,
    pub(crate) table: PassTable,
    pub(crate) device_manager: DeviceManager,
    pub(crate) settings: EngineSettings,
}

impl Engine {
    /// Build the pass table, render passes and targets for `settings`
    ///
    /// Post effects listed in the settings need their materials; attach
    /// them with `load_post_effects` once the materials exist.
    pub fn new(device: Arc<dyn GpuDevice>, settings: EngineSettings) -> Result<Self> {
        settings.validate()?;

        let swapchain = device.swapchain_info();
        let table = PassTable::build(&device, &settings, 0, swapchain.format)?;
        let registry = PassRegistry::build(&device, &table)?;
        let mut samplers = SamplerRegistry::new();
        let targets = TargetManager::new(&mut TargetContext {
            device: &device,
            registry: &registry,
            table: &table,
            settings: &settings,
            swapchain,
            samplers: &mut samplers,
        })?;
        let device_manager = DeviceManager::new(device, &table, settings.frames_in_flight)?;

        crate::engine_info!(SOURCE, "Engine '{}' initialized with {} passes",
            settings.application_name, table.order().len());

        Ok(Self {
            materials: MaterialManager::new(),
            compute: None,
            targets,
            samplers,
            registry,
            table,
            device_manager,
            settings,
        })
    }

    // ===== ACCESSORS =====

    pub fn materials(&self) -> &MaterialManager {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialManager {
        &mut self.materials
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn device(&self) -> &Arc<dyn GpuDevice> {
        self.device_manager.device()
    }

    pub fn device_manager(&self) -> &DeviceManager {
        &self.device_manager
    }

    pub fn table(&self) -> &PassTable {
        &self.table
    }

    pub fn registry(&self) -> &PassRegistry {
        &self.registry
    }

    pub fn samplers(&self) -> &SamplerRegistry {
        &self.samplers
    }

    pub fn targets(&self) -> &TargetManager {
        &self.targets
    }

    /// Particle compute pipeline, if enabled and created
    pub fn compute(&self) -> Option<&ComputePipeline> {
        self.compute.as_ref()
    }

    // ===== MATERIALS =====

    /// Create a material with pipelines for every configured pass it lists
    pub fn create_material(&mut self, desc: MaterialDesc) -> Result<MaterialKey> {
        let ctx = MaterialContext {
            device: self.device_manager.device(),
            registry: &self.registry,
            table: &self.table,
            image_count: self.device_manager.swapchain().image_count,
            frames_in_flight: self.settings.frames_in_flight,
            limits: self.settings.limits,
        };
        self.materials.create_material(desc, &ctx)
    }

    /// Release every material instance of a detached entity
    ///
    /// Keys in the post-effect range are ignored.
    pub fn detach_entity(&mut self, entity: EntityKey) -> usize {
        if entity.is_reserved() {
            crate::engine_warn!(SOURCE, "Entity key {:#x} is reserved for post effects, not detached",
                entity.0);
            return 0;
        }
        self.materials.delete_instances_for_entity(entity)
    }

    // ===== PARTICLES =====

    /// Create the particle compute pipeline
    ///
    /// Returns `Ok(false)` when the device cannot run compute work or the
    /// pipeline fails to build; the compute pass is then skipped every frame.
    pub fn enable_particles(&mut self, desc: &ComputeDesc) -> Result<bool> {
        if !self.table.contains(PassKind::ComputeParticles) {
            return Err(crate::engine_config_err!(SOURCE,
                "Particles are disabled in the engine settings"));
        }
        if !self.device().supports_compute() {
            crate::engine_warn!(SOURCE, "Device has no compute support, particles disabled");
            self.compute = None;
            return Ok(false);
        }

        match ComputePipeline::new(self.device_manager.device(), desc) {
            Ok(pipeline) => {
                self.compute = Some(pipeline);
                Ok(true)
            }
            Err(e) => {
                crate::engine_warn!(SOURCE, "Compute pipeline '{}' failed, particles disabled: {}",
                    desc.name, e);
                self.compute = None;
                Ok(false)
            }
        }
    }

    // ===== POST EFFECTS =====

    /// Append post effect `PostEffect(n)` drawn with `material`
    ///
    /// Waits for the GPU, rebuilds the pass table with one more post effect
    /// and creates the new target and pipeline. Returns `n`.
    pub fn add_post_effect(
        &mut self,
        material: MaterialKey,
        name: &str,
        size: Option<(u32, u32)>,
    ) -> Result<u32> {
        if !self.settings.use_screen_quad {
            return Err(crate::engine_config_err!(SOURCE,
                "Post effect '{}' requires use_screen_quad", name));
        }
        if self.targets.post_effects().effect_index(name).is_some() {
            return Err(crate::engine_config_err!(SOURCE, "Post effect '{}' already exists", name));
        }
        if self.materials.material(material).is_none() {
            return Err(Error::InvalidResource(format!(
                "Post effect '{}': material {:?} does not exist", name, material)));
        }
        let index = self.table.post_effect_count();
        BufferIndex::post_effect(index)?;

        self.device_manager.wait_idle()?;
        let device = Arc::clone(self.device_manager.device());
        let swapchain = self.device_manager.swapchain();
        let table = PassTable::build(&device, &self.settings, index + 1, swapchain.format)?;
        self.registry.extend(&device, &table)?;
        self.table = table;
        self.device_manager.rebuild_chain(&self.table);

        let index = self.targets.add_post_effect(&mut TargetContext {
            device: &device,
            registry: &self.registry,
            table: &self.table,
            settings: &self.settings,
            swapchain,
            samplers: &mut self.samplers,
        }, material, name, size)?;

        if let Some(effect) = self.materials.material_mut(material) {
            effect.ensure_pipeline(PassKind::PostEffect(index), &self.registry, &self.table)?;
        }
        // The final alias moved to the new effect
        self.materials.refresh_external_bindings(&self.samplers)?;
        Ok(index)
    }

    /// Attach every post effect listed in the settings, by material name
    pub fn load_post_effects(&mut self) -> Result<usize> {
        let effects = self.settings.post_effects.clone();
        for effect in &effects {
            let material = self.materials.material_by_name(&effect.material)?;
            self.add_post_effect(material, &effect.name, effect.size)?;
        }
        Ok(effects.len())
    }

    // ===== RESIZE / SHUTDOWN =====

    /// Rebuild everything that depends on the swapchain
    ///
    /// A zero-sized surface (minimized window) is ignored.
    pub fn resize(&mut self, width: u32, height: u32, scene: &mut dyn Scene) -> Result<()> {
        if width == 0 || height == 0 {
            crate::engine_debug!(SOURCE, "Resize to {}x{} ignored", width, height);
            return Ok(());
        }

        let swapchain = self.device_manager.resize(width, height, &self.table)?;
        let device = Arc::clone(self.device_manager.device());
        let registry = PassRegistry::build(&device, &self.table)?;

        self.targets.recreate(&mut TargetContext {
            device: &device,
            registry: &registry,
            table: &self.table,
            settings: &self.settings,
            swapchain,
            samplers: &mut self.samplers,
        })?;
        self.materials.recreate_pipelines(&registry, &self.table)?;
        self.materials.set_image_count(swapchain.image_count, &self.samplers)?;
        let rewritten = self.materials.refresh_external_bindings(&self.samplers)?;
        self.registry = registry;

        let extent = swapchain.extent;
        if let Some(camera) = scene.main_camera_mut() {
            camera.set_aspect_ratio(extent.width as f32 / extent.height as f32);
        }

        crate::engine_info!(SOURCE, "Resized to {}x{}, {} descriptor sets rebound",
            extent.width, extent.height, rewritten);
        Ok(())
    }

    /// Wait for the GPU and release every resource
    pub fn shutdown(self) -> Result<()> {
        self.device_manager.wait_idle()?;
        crate::engine_info!(SOURCE, "Engine '{}' shut down", self.settings.application_name);
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.device_manager.wait_idle() {
            crate::engine_warn!(SOURCE, "Wait idle failed during drop: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
