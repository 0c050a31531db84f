/// Compute pipeline of the particle pass
///
/// Built once from a `ComputeDesc` handed over by the particle loader.
/// Computables allocate their descriptor sets against `set_layout(i)` and
/// bind them in `record_dispatch`.

use std::sync::Arc;
use crate::error::Result;
use crate::device::{
    ComputePipelineDesc, DescriptorSetLayoutHandle, GpuDescriptorSetLayout, GpuDevice, GpuPipeline,
    GpuPipelineLayout, LayoutBinding, PipelineHandle, PipelineLayoutHandle,
};

/// Compute shader and the descriptor sets it declares
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeDesc {
    pub name: String,
    /// SPIR-V words
    pub code: Vec<u32>,
    /// Bindings of each descriptor set, set 0 first
    pub set_layouts: Vec<Vec<LayoutBinding>>,
}

pub struct ComputePipeline {
    name: String,
    // Declared in release order
    pipeline: GpuPipeline,
    layout: GpuPipelineLayout,
    set_layouts: Vec<GpuDescriptorSetLayout>,
}

impl ComputePipeline {
    pub fn new(device: &Arc<dyn GpuDevice>, desc: &ComputeDesc) -> Result<Self> {
        let set_layouts = desc
            .set_layouts
            .iter()
            .map(|bindings| GpuDescriptorSetLayout::new(device, bindings))
            .collect::<Result<Vec<_>>>()?;
        let handles: Vec<_> = set_layouts.iter().map(|l| l.handle()).collect();
        let layout = GpuPipelineLayout::new(device, &handles)?;
        let pipeline = GpuPipeline::compute(device, &ComputePipelineDesc {
            label: &desc.name,
            code: &desc.code,
            layout: layout.handle(),
        })?;

        crate::engine_debug!("strata::ComputePipeline", "Compute pipeline '{}' created ({} sets)",
            desc.name, set_layouts.len());
        Ok(Self {
            name: desc.name.clone(),
            pipeline,
            layout,
            set_layouts,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> PipelineHandle {
        self.pipeline.handle()
    }

    pub fn layout(&self) -> PipelineLayoutHandle {
        self.layout.handle()
    }

    /// Layout of descriptor set `index`
    pub fn set_layout(&self, index: usize) -> Option<DescriptorSetLayoutHandle> {
        self.set_layouts.get(index).map(|l| l.handle())
    }
}
