/// Material - pipelines and per-entity GPU instances
///
/// A material owns one descriptor-set layout per shader stage, the pipeline
/// layout, one pipeline per pass it draws in, and an instance record per
/// (entity, slot). An instance holds, for every stage and swapchain image,
/// a uniform buffer and a descriptor set.
///
/// Instance indices only grow. Detaching an entity tombstones its slots in
/// place; the GPU objects are retired and released once every frame that may
/// still read them has completed.
///
/// Instanced materials fold every instance bound in a pass into one draw: the
/// first instance written becomes the group's main instance (it carries the
/// uniform block), later ones only append their model matrix to the shared
/// storage buffer.

use std::collections::VecDeque;
use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::{engine_bail, engine_err};
use crate::device::{
    GpuDevice, GpuBuffer, GpuDescriptorSet, GpuDescriptorSetLayout, GpuPipelineLayout,
    GpuPipeline, BufferUsage, CommandBufferHandle, DescriptorResource, DescriptorType,
    DescriptorWrite, DescriptorSetHandle, GraphicsPipelineDesc, LayoutBinding,
    PipelineBindPoint, SamplerBinding, ShaderModuleDesc, ShaderStage, ShaderStages,
    VertexLayout,
};
use crate::pass::{PassKind, PassRegistry, PassTable};
use crate::sampler::{SamplerProvider, TextureKind};
use crate::scene::EntityKey;
use crate::settings::ShaderLimits;
use crate::uniform::UniformView;
use super::material_desc::{MaterialDesc, ShaderDesc, TextureBinding};
use super::uniform_field::UniformField;

const SOURCE: &str = "strata::Material";
const MODEL_SIZE: u64 = 64;

/// Engine state a material is built against
pub struct MaterialContext<'a> {
    pub device: &'a Arc<dyn GpuDevice>,
    pub registry: &'a PassRegistry,
    pub table: &'a PassTable,
    pub image_count: u32,
    pub frames_in_flight: usize,
    pub limits: ShaderLimits,
}

/// Outcome of `Material::set_uniform_data`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformWrite {
    /// Uniform block written; the caller binds and draws (or defers the
    /// draw of an instanced group to the end of the pass)
    Written,
    /// Model appended to the current instanced group; nothing to draw
    Folded,
}

/// One instanced draw collected over a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstancedDraw {
    /// Instance whose descriptor sets are bound for the draw
    pub main: usize,
    pub first_instance: u32,
    pub instance_count: u32,
}

struct StageLayout {
    stage: ShaderStage,
    uniforms: Vec<UniformField>,
    uniform_size: u64,
    /// Indices into `Material::textures`
    textures: Vec<usize>,
    set_layout: GpuDescriptorSetLayout,
}

struct StageInstance {
    /// Per swapchain image; empty when the stage has no uniforms
    uniform_buffers: Vec<GpuBuffer>,
    descriptor_sets: Vec<GpuDescriptorSet>,
    /// Written sampler per stage texture, per image
    bound: Vec<Vec<SamplerBinding>>,
}

struct InstanceRecord {
    entity: EntityKey,
    slot: u32,
    stages: Vec<StageInstance>,
}

struct Instancing {
    capacity: u32,
    storage: Vec<GpuBuffer>,
    sets: Vec<GpuDescriptorSet>,
    set_layout: GpuDescriptorSetLayout,
    frame_id: u64,
    cursor: u32,
    group: Option<InstancedDraw>,
}

pub struct Material {
    device: Arc<dyn GpuDevice>,
    name: String,
    shaders: Vec<ShaderDesc>,
    vertex_layout: VertexLayout,
    passes: Vec<PassKind>,
    textures: Vec<TextureBinding>,
    limits: ShaderLimits,
    image_count: u32,
    frames_in_flight: usize,
    current_frame: u64,
    bound_revision: Option<u64>,

    // Declared in release order
    pipelines: FxHashMap<PassKind, GpuPipeline>,
    instances: Vec<Option<InstanceRecord>>,
    entity_slots: FxHashMap<EntityKey, Vec<usize>>,
    retired: VecDeque<(u64, InstanceRecord)>,
    instancing: Option<Instancing>,
    pipeline_layout: GpuPipelineLayout,
    stages: Vec<StageLayout>,
}

impl Material {
    pub fn new(desc: MaterialDesc, ctx: &MaterialContext<'_>) -> Result<Self> {
        Self::validate(&desc)?;

        // ========== STAGE SET LAYOUTS ==========
        let mut stages = Vec::with_capacity(desc.shaders.len());
        for shader in &desc.shaders {
            let textures: Vec<usize> = desc
                .textures
                .iter()
                .enumerate()
                .filter(|(_, t)| t.stage == shader.stage)
                .map(|(i, _)| i)
                .collect();

            let mut bindings = Vec::with_capacity(textures.len() + 1);
            if !shader.uniforms.is_empty() {
                bindings.push(LayoutBinding {
                    binding: 0,
                    descriptor_type: DescriptorType::UniformBuffer,
                    stages: shader.stage.flags(),
                });
            }
            for &t in &textures {
                bindings.push(LayoutBinding {
                    binding: desc.textures[t].binding,
                    descriptor_type: DescriptorType::CombinedImageSampler,
                    stages: shader.stage.flags(),
                });
            }

            stages.push(StageLayout {
                stage: shader.stage,
                uniforms: shader.uniforms.clone(),
                uniform_size: UniformField::block_size(&shader.uniforms, &ctx.limits),
                textures,
                set_layout: GpuDescriptorSetLayout::new(ctx.device, &bindings)?,
            });
        }

        // ========== INSTANCE STORAGE ==========
        let instancing = match desc.instancing {
            Some(capacity) => Some(Self::create_instancing(ctx.device, capacity, ctx.image_count)?),
            None => None,
        };

        // ========== PIPELINE LAYOUT ==========
        let mut set_layouts: Vec<_> = stages.iter().map(|s| s.set_layout.handle()).collect();
        if let Some(instancing) = &instancing {
            set_layouts.push(instancing.set_layout.handle());
        }
        let pipeline_layout = GpuPipelineLayout::new(ctx.device, &set_layouts)?;

        let mut material = Self {
            device: Arc::clone(ctx.device),
            name: desc.name,
            shaders: desc.shaders,
            vertex_layout: desc.vertex_layout,
            passes: Vec::new(),
            textures: desc.textures,
            limits: ctx.limits,
            image_count: ctx.image_count.max(1),
            frames_in_flight: ctx.frames_in_flight,
            current_frame: 0,
            bound_revision: None,
            pipelines: FxHashMap::default(),
            instances: Vec::new(),
            entity_slots: FxHashMap::default(),
            retired: VecDeque::new(),
            instancing,
            pipeline_layout,
            stages,
        };

        // ========== PIPELINES ==========
        for kind in desc.passes {
            material.ensure_pipeline(kind, ctx.registry, ctx.table)?;
        }

        crate::engine_debug!(SOURCE, "Material '{}' created ({} stages, pipelines for {:?})",
            material.name, material.stages.len(), material.passes);
        Ok(material)
    }

    fn validate(desc: &MaterialDesc) -> Result<()> {
        if desc.shaders.is_empty() {
            engine_bail!(SOURCE, "Material '{}' has no shader stage", desc.name);
        }
        for (i, shader) in desc.shaders.iter().enumerate() {
            if shader.stage == ShaderStage::Compute {
                engine_bail!(SOURCE, "Material '{}': compute shaders belong to the particle pass",
                    desc.name);
            }
            if desc.shaders[..i].iter().any(|s| s.stage == shader.stage) {
                engine_bail!(SOURCE, "Material '{}': duplicate {:?} stage", desc.name, shader.stage);
            }
        }

        for (i, texture) in desc.textures.iter().enumerate() {
            let Some(shader) = desc.shaders.iter().find(|s| s.stage == texture.stage) else {
                engine_bail!(SOURCE, "Material '{}': texture {} targets missing {:?} stage",
                    desc.name, texture.kind, texture.stage);
            };
            if texture.binding == 0 && !shader.uniforms.is_empty() {
                engine_bail!(SOURCE, "Material '{}': binding 0 of {:?} is the uniform block",
                    desc.name, texture.stage);
            }
            if desc.textures[..i]
                .iter()
                .any(|t| t.stage == texture.stage && t.binding == texture.binding)
            {
                engine_bail!(SOURCE, "Material '{}': binding {} of {:?} used twice",
                    desc.name, texture.binding, texture.stage);
            }
            let is_image = texture.kind == TextureKind::ImageFile;
            if is_image != texture.image.is_some() {
                engine_bail!(SOURCE,
                    "Material '{}': {} texture at binding {} must {} an image binding",
                    desc.name, texture.kind, texture.binding,
                    if is_image { "carry" } else { "not carry" });
            }
        }

        if let Some(capacity) = desc.instancing {
            if capacity == 0 {
                engine_bail!(SOURCE, "Material '{}': instancing capacity is zero", desc.name);
            }
            if !desc.shaders.iter().any(|s| s.stage == ShaderStage::Vertex) {
                engine_bail!(SOURCE, "Material '{}': instancing needs a vertex stage", desc.name);
            }
        }
        Ok(())
    }

    fn create_instancing(device: &Arc<dyn GpuDevice>, capacity: u32, image_count: u32) -> Result<Instancing> {
        let set_layout = GpuDescriptorSetLayout::new(device, &[LayoutBinding {
            binding: 0,
            descriptor_type: DescriptorType::StorageBuffer,
            stages: ShaderStages::VERTEX,
        }])?;
        let (storage, sets) = Self::create_instance_storage(device, &set_layout, capacity, image_count)?;

        Ok(Instancing {
            capacity,
            storage,
            sets,
            set_layout,
            frame_id: 0,
            cursor: 0,
            group: None,
        })
    }

    /// One model storage buffer and descriptor set per swapchain image
    fn create_instance_storage(
        device: &Arc<dyn GpuDevice>,
        set_layout: &GpuDescriptorSetLayout,
        capacity: u32,
        image_count: u32,
    ) -> Result<(Vec<GpuBuffer>, Vec<GpuDescriptorSet>)> {
        let size = MODEL_SIZE * capacity as u64;
        let mut storage = Vec::with_capacity(image_count as usize);
        let mut sets = Vec::with_capacity(image_count as usize);
        for _ in 0..image_count.max(1) {
            let buffer = GpuBuffer::new(device, size, BufferUsage::Storage)?;
            let set = GpuDescriptorSet::allocate(device, set_layout.handle())?;
            set.write(&[DescriptorWrite {
                binding: 0,
                descriptor_type: DescriptorType::StorageBuffer,
                resource: DescriptorResource::Buffer {
                    buffer: buffer.handle(),
                    offset: 0,
                    range: size,
                },
            }])?;
            storage.push(buffer);
            sets.push(set);
        }
        Ok((storage, sets))
    }

    // ===== PIPELINES =====

    /// Create the pipeline for `kind` if the pass exists and none was built yet
    ///
    /// Returns false when the pass is not configured (the material simply does
    /// not draw there).
    pub fn ensure_pipeline(&mut self, kind: PassKind, registry: &PassRegistry, table: &PassTable) -> Result<bool> {
        if !self.passes.contains(&kind) {
            self.passes.push(kind);
        }
        if self.pipelines.contains_key(&kind) {
            return Ok(true);
        }
        if !registry.contains(kind) {
            return Ok(false);
        }

        let label = format!("{}::{}", self.name, kind);
        let pipeline = GpuPipeline::graphics(&self.device, &GraphicsPipelineDesc {
            label: &label,
            stages: self
                .shaders
                .iter()
                .map(|s| ShaderModuleDesc { stage: s.stage, code: &s.code })
                .collect(),
            vertex_layout: &self.vertex_layout,
            render_pass: registry.render_pass(kind)?,
            target_layout: PassRegistry::layout(table, kind)?,
            layout: self.pipeline_layout.handle(),
        })?;
        self.pipelines.insert(kind, pipeline);
        Ok(true)
    }

    /// Rebuild every pipeline against a new pass registry (resize)
    pub fn recreate_pipelines(&mut self, registry: &PassRegistry, table: &PassTable) -> Result<()> {
        self.pipelines.clear();
        for kind in self.passes.clone() {
            self.ensure_pipeline(kind, registry, table)?;
        }
        Ok(())
    }

    /// Whether a pipeline exists for `kind`
    pub fn draws_in(&self, kind: PassKind) -> bool {
        self.pipelines.contains_key(&kind)
    }

    // ===== INSTANCES =====

    /// Instance of `entity` for `slot`, created on first request
    ///
    /// Slots are created in order: asking for slot k+1 before slot k exists
    /// is a configuration error.
    pub fn get_instance_for_entity(
        &mut self,
        entity: EntityKey,
        slot: u32,
        samplers: &dyn SamplerProvider,
    ) -> Result<usize> {
        let existing = self.entity_slots.get(&entity).map_or(0, Vec::len);
        if let Some(&index) = self.entity_slots.get(&entity).and_then(|s| s.get(slot as usize)) {
            return Ok(index);
        }
        if slot as usize > existing {
            return Err(crate::engine_config_err!(SOURCE,
                "Material '{}': slot {} requested for entity {:?} before slot {}",
                self.name, slot, entity, existing));
        }

        let stages = self.create_stage_instances(samplers)?;
        let index = self.instances.len();
        self.instances.push(Some(InstanceRecord { entity, slot, stages }));
        self.entity_slots.entry(entity).or_default().push(index);

        crate::engine_trace!(SOURCE, "Material '{}': instance {} for entity {:?} slot {}",
            self.name, index, entity, slot);
        Ok(index)
    }

    fn create_stage_instances(&self, samplers: &dyn SamplerProvider) -> Result<Vec<StageInstance>> {
        let mut stage_instances = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let mut uniform_buffers = Vec::new();
            let mut descriptor_sets = Vec::with_capacity(self.image_count as usize);
            let mut bound = vec![Vec::with_capacity(self.image_count as usize); stage.textures.len()];

            for image in 0..self.image_count as usize {
                let set = GpuDescriptorSet::allocate(&self.device, stage.set_layout.handle())?;
                let mut writes = Vec::with_capacity(stage.textures.len() + 1);

                if stage.uniform_size > 0 {
                    let buffer = GpuBuffer::new(&self.device, stage.uniform_size, BufferUsage::Uniform)?;
                    writes.push(DescriptorWrite {
                        binding: 0,
                        descriptor_type: DescriptorType::UniformBuffer,
                        resource: DescriptorResource::Buffer {
                            buffer: buffer.handle(),
                            offset: 0,
                            range: stage.uniform_size,
                        },
                    });
                    uniform_buffers.push(buffer);
                }

                for (position, &t) in stage.textures.iter().enumerate() {
                    let binding = self.resolve_texture(&self.textures[t], image, samplers)?;
                    writes.push(DescriptorWrite {
                        binding: self.textures[t].binding,
                        descriptor_type: DescriptorType::CombinedImageSampler,
                        resource: DescriptorResource::ImageSampler(binding),
                    });
                    bound[position].push(binding);
                }

                set.write(&writes)?;
                descriptor_sets.push(set);
            }

            stage_instances.push(StageInstance {
                uniform_buffers,
                descriptor_sets,
                bound,
            });
        }
        Ok(stage_instances)
    }

    fn resolve_texture(
        &self,
        texture: &TextureBinding,
        image: usize,
        samplers: &dyn SamplerProvider,
    ) -> Result<SamplerBinding> {
        if let Some(binding) = texture.image {
            return Ok(binding);
        }
        let bindings = samplers.sampler_for(texture.kind, texture.sub_index)?;
        bindings
            .get(image % bindings.len().max(1))
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Material '{}': {}[{}] has no bindings",
                self.name, texture.kind, texture.sub_index))
    }

    /// Write the uniform block of `instance` for the current image
    ///
    /// For instanced materials the first instance written since the last
    /// `finish_instanced_group` becomes the group's main instance; later
    /// instances only append their model matrix and return `Folded`.
    pub fn set_uniform_data(
        &mut self,
        instance: usize,
        view: &UniformView<'_>,
        image_index: u32,
        frame_id: u64,
    ) -> Result<UniformWrite> {
        let Some(Some(record)) = self.instances.get(instance) else {
            return Err(Error::InvalidResource(format!(
                "Material '{}': instance {} does not exist", self.name, instance)));
        };
        let image = image_index as usize;

        if let Some(instancing) = &mut self.instancing {
            if instancing.frame_id != frame_id {
                instancing.frame_id = frame_id;
                instancing.cursor = 0;
                instancing.group = None;
            }
            let folded = instancing.group.is_some();
            Self::append_model(instancing, &self.name, image, view)?;
            if folded {
                return Ok(UniformWrite::Folded);
            }
            instancing.group = Some(InstancedDraw {
                main: instance,
                first_instance: instancing.cursor - 1,
                instance_count: 1,
            });
        }

        for (stage, stage_instance) in self.stages.iter().zip(&record.stages) {
            if stage.uniforms.is_empty() {
                continue;
            }
            let Some(buffer) = stage_instance.uniform_buffers.get(image) else {
                engine_bail!(SOURCE, "Material '{}': no uniform buffer for image {}",
                    self.name, image_index);
            };
            let mut bytes = Vec::with_capacity(stage.uniform_size as usize);
            for field in &stage.uniforms {
                field.write(view, &self.limits, &mut bytes);
            }
            buffer.update(0, &bytes)?;
        }
        Ok(UniformWrite::Written)
    }

    fn append_model(instancing: &mut Instancing, name: &str, image: usize, view: &UniformView<'_>) -> Result<()> {
        if instancing.cursor >= instancing.capacity {
            engine_bail!(SOURCE, "Material '{}': more than {} instances in one frame",
                name, instancing.capacity);
        }
        let Some(storage) = instancing.storage.get(image) else {
            engine_bail!(SOURCE, "Material '{}': no instance storage for image {}", name, image);
        };
        let model = view.entity.model.to_cols_array();
        storage.update(instancing.cursor as u64 * MODEL_SIZE, bytemuck::bytes_of(&model))?;
        instancing.cursor += 1;
        if let Some(group) = &mut instancing.group {
            group.instance_count += 1;
        }
        Ok(())
    }

    /// Close the current instanced group, returning the draw it describes
    pub fn finish_instanced_group(&mut self) -> Option<InstancedDraw> {
        self.instancing.as_mut().and_then(|i| i.group.take())
    }

    pub fn is_instanced(&self) -> bool {
        self.instancing.is_some()
    }

    /// Bind the pipeline of `kind` and the descriptor sets of `instance`
    pub fn bind(
        &self,
        command_buffer: CommandBufferHandle,
        kind: PassKind,
        instance: usize,
        image_index: u32,
    ) -> Result<()> {
        let Some(pipeline) = self.pipelines.get(&kind) else {
            return Err(crate::engine_state_err!(SOURCE,
                "Material '{}' has no pipeline for {}", self.name, kind));
        };
        let Some(Some(record)) = self.instances.get(instance) else {
            return Err(Error::InvalidResource(format!(
                "Material '{}': instance {} does not exist", self.name, instance)));
        };

        let image = image_index as usize;
        let mut sets: Vec<DescriptorSetHandle> = Vec::with_capacity(record.stages.len() + 1);
        for stage in &record.stages {
            let Some(set) = stage.descriptor_sets.get(image) else {
                engine_bail!(SOURCE, "Material '{}': no descriptor set for image {}",
                    self.name, image_index);
            };
            sets.push(set.handle());
        }
        if let Some(instancing) = &self.instancing {
            if let Some(set) = instancing.sets.get(image) {
                sets.push(set.handle());
            }
        }

        self.device.cmd_bind_pipeline(command_buffer, PipelineBindPoint::Graphics, pipeline.handle());
        self.device.cmd_bind_descriptor_sets(
            command_buffer,
            PipelineBindPoint::Graphics,
            self.pipeline_layout.handle(),
            0,
            &sets,
        );
        Ok(())
    }

    /// Tombstone every instance of `entity`
    ///
    /// Returns the number of instances removed. Their GPU objects are
    /// released by `begin_frame` once no in-flight frame can use them.
    pub fn delete_instances_for_entity(&mut self, entity: EntityKey) -> usize {
        let Some(indices) = self.entity_slots.remove(&entity) else {
            return 0;
        };
        for &index in &indices {
            if let Some(record) = self.instances.get_mut(index).and_then(Option::take) {
                self.retired.push_back((self.current_frame, record));
            }
        }
        crate::engine_trace!(SOURCE, "Material '{}': {} instances of {:?} retired",
            self.name, indices.len(), entity);
        indices.len()
    }

    // ===== FRAME =====

    /// Start of frame `frame_id`: release retired instances that no
    /// in-flight frame references, then refresh external bindings
    pub fn begin_frame(&mut self, frame_id: u64, samplers: &dyn SamplerProvider) -> Result<usize> {
        self.current_frame = frame_id;
        let horizon = self.frames_in_flight as u64;
        while let Some((retired_at, _)) = self.retired.front() {
            if frame_id < retired_at + horizon {
                break;
            }
            self.retired.pop_front();
        }
        self.refresh_external_bindings(samplers)
    }

    /// Rewrite descriptor sets whose external sampler resolution changed
    ///
    /// Does nothing while the registry revision is unchanged. Returns the
    /// number of descriptors rewritten.
    pub fn refresh_external_bindings(&mut self, samplers: &dyn SamplerProvider) -> Result<usize> {
        let revision = samplers.revision();
        if self.bound_revision == Some(revision) {
            return Ok(0);
        }

        let mut rewritten = 0;
        for record in self.instances.iter_mut().flatten() {
            for (stage, stage_instance) in self.stages.iter().zip(record.stages.iter_mut()) {
                for (position, &t) in stage.textures.iter().enumerate() {
                    let texture = &self.textures[t];
                    if !texture.kind.is_external() {
                        continue;
                    }
                    let bindings = samplers.sampler_for(texture.kind, texture.sub_index)?;
                    for (image, set) in stage_instance.descriptor_sets.iter().enumerate() {
                        let Some(&binding) = bindings.get(image % bindings.len().max(1)) else {
                            continue;
                        };
                        if stage_instance.bound[position][image] == binding {
                            continue;
                        }
                        set.write(&[DescriptorWrite {
                            binding: texture.binding,
                            descriptor_type: DescriptorType::CombinedImageSampler,
                            resource: DescriptorResource::ImageSampler(binding),
                        }])?;
                        stage_instance.bound[position][image] = binding;
                        rewritten += 1;
                    }
                }
            }
        }

        self.bound_revision = Some(revision);
        if rewritten > 0 {
            crate::engine_debug!(SOURCE, "Material '{}': {} sampler bindings rewritten (revision {})",
                self.name, rewritten, revision);
        }
        Ok(rewritten)
    }

    /// Follow a new swapchain image count: rebuild the per-image objects of
    /// every live instance in place (indices are kept)
    ///
    /// Must only be called with the device idle.
    pub fn set_image_count(&mut self, image_count: u32, samplers: &dyn SamplerProvider) -> Result<()> {
        let image_count = image_count.max(1);
        if image_count == self.image_count {
            return Ok(());
        }
        self.image_count = image_count;
        self.retired.clear();

        if let Some(instancing) = &mut self.instancing {
            let (storage, sets) = Self::create_instance_storage(
                &self.device, &instancing.set_layout, instancing.capacity, image_count)?;
            instancing.storage = storage;
            instancing.sets = sets;
            instancing.cursor = 0;
            instancing.group = None;
        }

        for index in 0..self.instances.len() {
            if self.instances[index].is_some() {
                let stages = self.create_stage_instances(samplers)?;
                if let Some(record) = self.instances[index].as_mut() {
                    record.stages = stages;
                }
            }
        }
        self.bound_revision = Some(samplers.revision());
        Ok(())
    }

    // ===== GETTERS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Passes the material asked for (configured or not)
    pub fn passes(&self) -> &[PassKind] {
        &self.passes
    }

    /// Instance slots ever allocated, tombstones included
    pub fn instance_capacity(&self) -> usize {
        self.instances.len()
    }

    pub fn live_instance_count(&self) -> usize {
        self.instances.iter().flatten().count()
    }

    pub fn is_live(&self, instance: usize) -> bool {
        matches!(self.instances.get(instance), Some(Some(_)))
    }

    /// Entity and slot an instance was created for
    pub fn instance_owner(&self, instance: usize) -> Option<(EntityKey, u32)> {
        self.instances
            .get(instance)
            .and_then(Option::as_ref)
            .map(|r| (r.entity, r.slot))
    }

    /// Uniform buffer of an instance's stage for one image
    pub fn uniform_buffer(&self, instance: usize, stage: ShaderStage, image_index: u32) -> Option<&GpuBuffer> {
        let position = self.stages.iter().position(|s| s.stage == stage)?;
        self.instances
            .get(instance)?
            .as_ref()?
            .stages
            .get(position)?
            .uniform_buffers
            .get(image_index as usize)
    }

    /// Instance storage buffer for one image (instanced materials)
    pub fn instance_storage(&self, image_index: u32) -> Option<&GpuBuffer> {
        self.instancing.as_ref()?.storage.get(image_index as usize)
    }

    /// Retired instances still waiting for their frames to complete
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
