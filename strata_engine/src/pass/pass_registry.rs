/// Pass registry - pass kind to render pass handle
///
/// Owns one render pass per configured graphics pass. Material pipelines are
/// created against these handles, so the registry is rebuilt (and pipelines
/// recreated) whenever the swapchain changes.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::device::{GpuDevice, GpuRenderPass, RenderPassHandle, RenderTargetLayout};
use super::pass_kind::PassKind;
use super::pass_table::PassTable;

pub struct PassRegistry {
    render_passes: FxHashMap<PassKind, GpuRenderPass>,
}

impl PassRegistry {
    /// Create a render pass for every configured pass with an attachment layout
    pub fn build(device: &Arc<dyn GpuDevice>, table: &PassTable) -> Result<Self> {
        let mut render_passes = FxHashMap::default();
        for &kind in table.order() {
            if let Some(layout) = table.descriptor(kind)?.layout() {
                render_passes.insert(kind, GpuRenderPass::new(device, layout)?);
            }
        }
        Ok(Self { render_passes })
    }

    /// Create render passes for kinds added to the table since the last build
    ///
    /// Existing handles are kept, so targets and pipelines built against
    /// them stay valid.
    pub fn extend(&mut self, device: &Arc<dyn GpuDevice>, table: &PassTable) -> Result<usize> {
        let mut added = 0;
        for &kind in table.order() {
            if self.render_passes.contains_key(&kind) {
                continue;
            }
            if let Some(layout) = table.descriptor(kind)?.layout() {
                self.render_passes.insert(kind, GpuRenderPass::new(device, layout)?);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Render pass of a graphics pass
    pub fn render_pass(&self, kind: PassKind) -> Result<RenderPassHandle> {
        self.render_passes
            .get(&kind)
            .map(|rp| rp.handle())
            .ok_or_else(|| crate::engine_state_err!("strata::PassRegistry",
                "No render pass registered for {}", kind))
    }

    pub fn contains(&self, kind: PassKind) -> bool {
        self.render_passes.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.render_passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.render_passes.is_empty()
    }

    /// Layout a pass renders into, as recorded in the table
    pub fn layout<'a>(table: &'a PassTable, kind: PassKind) -> Result<&'a RenderTargetLayout> {
        table.descriptor(kind)?.layout().ok_or_else(|| crate::engine_state_err!(
            "strata::PassRegistry", "Pass {} has no attachment layout", kind))
    }
}

#[cfg(test)]
#[path = "pass_registry_tests.rs"]
mod tests;
