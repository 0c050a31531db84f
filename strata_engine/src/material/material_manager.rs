/// Material manager - keyed storage of every material
///
/// Materials are addressed by a generational `MaterialKey`; names are unique
/// and resolve through `material_by_name`.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::error::Result;
use crate::pass::{PassRegistry, PassTable};
use crate::sampler::SamplerProvider;
use crate::scene::EntityKey;
use super::material::{Material, MaterialContext};
use super::material_desc::MaterialDesc;

const SOURCE: &str = "strata::MaterialManager";

new_key_type! {
    /// Key of a material in the `MaterialManager`
    pub struct MaterialKey;
}

#[derive(Default)]
pub struct MaterialManager {
    materials: SlotMap<MaterialKey, Material>,
    names: FxHashMap<String, MaterialKey>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register a material. Names must be unique.
    pub fn create_material(&mut self, desc: MaterialDesc, ctx: &MaterialContext<'_>) -> Result<MaterialKey> {
        if self.names.contains_key(&desc.name) {
            return Err(crate::engine_config_err!(SOURCE,
                "Material '{}' already exists", desc.name));
        }
        let name = desc.name.clone();
        let material = Material::new(desc, ctx)?;
        let key = self.materials.insert(material);
        self.names.insert(name, key);
        Ok(key)
    }

    /// Drop a material and every instance it holds
    ///
    /// The device must be idle or the material unused by in-flight frames.
    pub fn remove_material(&mut self, key: MaterialKey) -> bool {
        match self.materials.remove(key) {
            Some(material) => {
                self.names.remove(material.name());
                true
            }
            None => false,
        }
    }

    // ===== LOOKUP =====

    pub fn material(&self, key: MaterialKey) -> Option<&Material> {
        self.materials.get(key)
    }

    pub fn material_mut(&mut self, key: MaterialKey) -> Option<&mut Material> {
        self.materials.get_mut(key)
    }

    /// Key of the material called `name`
    pub fn material_by_name(&self, name: &str) -> Result<MaterialKey> {
        self.names.get(name).copied().ok_or_else(|| crate::engine_config_err!(SOURCE,
            "Unknown material '{}'", name))
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialKey, &Material)> {
        self.materials.iter()
    }

    // ===== BULK OPERATIONS =====

    /// Frame start for every material (retired instances, sampler rebinding)
    pub fn begin_frame(&mut self, frame_id: u64, samplers: &dyn SamplerProvider) -> Result<()> {
        for material in self.materials.values_mut() {
            material.begin_frame(frame_id, samplers)?;
        }
        Ok(())
    }

    pub fn refresh_external_bindings(&mut self, samplers: &dyn SamplerProvider) -> Result<usize> {
        let mut rewritten = 0;
        for material in self.materials.values_mut() {
            rewritten += material.refresh_external_bindings(samplers)?;
        }
        Ok(rewritten)
    }

    pub fn recreate_pipelines(&mut self, registry: &PassRegistry, table: &PassTable) -> Result<()> {
        for material in self.materials.values_mut() {
            material.recreate_pipelines(registry, table)?;
        }
        Ok(())
    }

    pub fn set_image_count(&mut self, image_count: u32, samplers: &dyn SamplerProvider) -> Result<()> {
        for material in self.materials.values_mut() {
            material.set_image_count(image_count, samplers)?;
        }
        Ok(())
    }

    /// Detach an entity from every material; returns the instances retired
    pub fn delete_instances_for_entity(&mut self, entity: EntityKey) -> usize {
        self.materials
            .values_mut()
            .map(|m| m.delete_instances_for_entity(entity))
            .sum()
    }
}

#[cfg(test)]
#[path = "material_manager_tests.rs"]
mod tests;
