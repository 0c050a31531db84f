/// Pass table - one descriptor per configured pass kind
///
/// Built once from the settings (and rebuilt only when the post-effect chain
/// changes). Frame code looks descriptors up by dense index instead of
/// switching on the kind.

use std::sync::Arc;
use crate::error::Result;
use crate::device::{
    GpuDevice, GpuSemaphore, SemaphoreHandle, RenderTargetLayout, TextureFormat,
};
use crate::scene::DrawFlags;
use crate::settings::EngineSettings;
use super::pass_kind::PassKind;

/// Which drawables a pass accepts, by draw flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawFilter {
    /// Every one of these flags must be set
    pub require: DrawFlags,
    /// None of these flags may be set
    pub exclude: DrawFlags,
}

impl DrawFilter {
    /// Accepts every drawable
    pub const ALL: Self = Self {
        require: DrawFlags::empty(),
        exclude: DrawFlags::empty(),
    };

    pub fn accepts(&self, flags: DrawFlags) -> bool {
        flags.contains(self.require) && !flags.intersects(self.exclude)
    }
}

/// Static description of one pass
pub struct PassDescriptor {
    kind: PassKind,
    layout: Option<RenderTargetLayout>,
    predecessor: Option<PassKind>,
    semaphores: Vec<GpuSemaphore>,
    filter: DrawFilter,
    instance_slot: u32,
}

impl PassDescriptor {
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// Attachment layout (`None` for compute)
    pub fn layout(&self) -> Option<&RenderTargetLayout> {
        self.layout.as_ref()
    }

    /// Configured pass submitted right before this one
    pub fn predecessor(&self) -> Option<PassKind> {
        self.predecessor
    }

    /// Semaphore this pass signals in the given in-flight slot
    pub fn semaphore(&self, slot: usize) -> SemaphoreHandle {
        self.semaphores[slot % self.semaphores.len()].handle()
    }

    pub fn semaphore_count(&self) -> usize {
        self.semaphores.len()
    }

    pub fn filter(&self) -> DrawFilter {
        self.filter
    }

    /// Material instance slot entities use while drawing in this pass
    pub fn instance_slot(&self) -> u32 {
        self.instance_slot
    }
}

pub struct PassTable {
    entries: Vec<Option<PassDescriptor>>,
    order: Vec<PassKind>,
}

impl PassTable {
    /// Build the table for the kinds enabled by `settings`
    pub fn build(
        device: &Arc<dyn GpuDevice>,
        settings: &EngineSettings,
        post_effect_count: u32,
        swapchain_format: TextureFormat,
    ) -> Result<Self> {
        let order = Self::enabled_kinds(settings, post_effect_count);
        let mut entries: Vec<Option<PassDescriptor>> = Vec::new();
        entries.resize_with(PassKind::FIXED.len() + post_effect_count as usize, || None);

        let mut predecessor = None;
        let mut next_slot = 0;
        for &kind in &order {
            let instance_slot = if Self::has_own_uniforms(kind) {
                next_slot += 1;
                next_slot
            } else {
                0
            };
            let mut semaphores = Vec::with_capacity(settings.frames_in_flight);
            for _ in 0..settings.frames_in_flight {
                semaphores.push(GpuSemaphore::new(device)?);
            }
            entries[kind.dense_index()] = Some(PassDescriptor {
                kind,
                layout: Self::layout_for(kind, settings, swapchain_format),
                predecessor,
                semaphores,
                filter: Self::filter_for(kind),
                instance_slot,
            });
            predecessor = Some(kind);
        }

        crate::engine_debug!("strata::PassTable", "Pass table built: {:?}", order);

        Ok(Self { entries, order })
    }

    fn enabled_kinds(settings: &EngineSettings, post_effect_count: u32) -> Vec<PassKind> {
        let mut kinds = Vec::new();
        if settings.particles_enabled {
            kinds.push(PassKind::ComputeParticles);
        }
        if settings.init_shadows {
            kinds.push(PassKind::ShadowDirect);
            if settings.point_light_count > 0 {
                kinds.push(PassKind::ShadowPoint);
            }
        }
        if settings.init_water {
            kinds.push(PassKind::WaterReflection);
            kinds.push(PassKind::WaterRefraction);
        }
        if settings.use_screen_quad {
            kinds.extend_from_slice(&PassKind::SCREEN_QUAD_STAGES);
        }
        kinds.extend((0..post_effect_count).map(PassKind::PostEffect));
        kinds.push(PassKind::Main);
        kinds
    }

    /// Render-target layout a pass kind renders into
    pub fn layout_for(
        kind: PassKind,
        settings: &EngineSettings,
        swapchain_format: TextureFormat,
    ) -> Option<RenderTargetLayout> {
        let samples = settings.msaa_samples;
        match kind {
            PassKind::ComputeParticles => None,
            PassKind::ShadowDirect => Some(RenderTargetLayout::depth_only(
                settings.effective_cascade_count(), false)),
            PassKind::ShadowPoint => Some(RenderTargetLayout::depth_only(
                settings.point_light_count * 6, true)),
            PassKind::WaterReflection | PassKind::WaterRefraction | PassKind::ScreenQuadLate => {
                Some(RenderTargetLayout::color_depth(TextureFormat::R8G8B8A8_UNORM, samples))
            }
            PassKind::ScreenQuadDepth => Some(RenderTargetLayout::depth_only(1, false)),
            PassKind::ScreenQuadNormal => {
                Some(RenderTargetLayout::color_depth(TextureFormat::R16G16B16A16_SFLOAT, 1))
            }
            PassKind::ScreenQuadMrt => Some(RenderTargetLayout {
                color_formats: vec![
                    TextureFormat::R16G16B16A16_SFLOAT;
                    settings.mrt_attachment_count as usize
                ],
                ..RenderTargetLayout::color_depth(TextureFormat::R16G16B16A16_SFLOAT, 1)
            }),
            PassKind::PostEffect(_) => Some(RenderTargetLayout {
                depth_format: None,
                ..RenderTargetLayout::color_depth(TextureFormat::R8G8B8A8_UNORM, 1)
            }),
            PassKind::Main => Some(RenderTargetLayout {
                presentable: true,
                ..RenderTargetLayout::color_depth(swapchain_format, samples)
            }),
        }
    }

    fn filter_for(kind: PassKind) -> DrawFilter {
        match kind {
            PassKind::ShadowDirect | PassKind::ShadowPoint => DrawFilter {
                require: DrawFlags::RENDER_TO_DEPTH,
                exclude: DrawFlags::OVERLAY,
            },
            PassKind::WaterReflection | PassKind::WaterRefraction => DrawFilter {
                require: DrawFlags::empty(),
                exclude: DrawFlags::WATER_SURFACE | DrawFlags::OVERLAY,
            },
            PassKind::ScreenQuadDepth | PassKind::ScreenQuadNormal | PassKind::ScreenQuadMrt => {
                DrawFilter {
                    require: DrawFlags::empty(),
                    exclude: DrawFlags::OVERLAY | DrawFlags::LATE,
                }
            }
            PassKind::ScreenQuadLate => DrawFilter {
                require: DrawFlags::LATE,
                exclude: DrawFlags::OVERLAY,
            },
            PassKind::Main => DrawFilter {
                require: DrawFlags::empty(),
                exclude: DrawFlags::OVERLAY,
            },
            PassKind::ComputeParticles | PassKind::PostEffect(_) => DrawFilter::ALL,
        }
    }

    /// Passes that write different uniforms get their own instance slot.
    /// Slots are numbered densely over the configured passes, in order.
    fn has_own_uniforms(kind: PassKind) -> bool {
        matches!(kind,
            PassKind::ShadowDirect
            | PassKind::ShadowPoint
            | PassKind::WaterReflection
            | PassKind::WaterRefraction)
    }

    // ===== LOOKUP =====

    pub fn contains(&self, kind: PassKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn get(&self, kind: PassKind) -> Option<&PassDescriptor> {
        self.entries.get(kind.dense_index()).and_then(|e| e.as_ref())
    }

    /// Descriptor of a configured pass
    pub fn descriptor(&self, kind: PassKind) -> Result<&PassDescriptor> {
        self.get(kind).ok_or_else(|| crate::engine_state_err!("strata::PassTable",
            "Pass {} is not configured", kind))
    }

    /// Configured kinds in declared order
    pub fn order(&self) -> &[PassKind] {
        &self.order
    }

    pub fn post_effect_count(&self) -> u32 {
        self.order
            .iter()
            .filter(|k| matches!(k, PassKind::PostEffect(_)))
            .count() as u32
    }

    /// Largest instance slot any configured pass uses
    pub fn max_instance_slot(&self) -> u32 {
        self.order
            .iter()
            .filter_map(|&k| self.get(k))
            .map(|d| d.instance_slot)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "pass_table_tests.rs"]
mod tests;
