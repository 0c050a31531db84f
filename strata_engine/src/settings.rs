//! Engine settings
//!
//! Plain configuration struct consumed once by `Engine::new`. Feature
//! toggles decide which passes exist in the pass table; `ShaderLimits`
//! fixes the padded size of every list-valued uniform field.

use std::str::FromStr;
use crate::error::{Error, Result};
use crate::command::BufferIndex;

/// Swapchain presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// V-Sync, always available
    #[default]
    Fifo,
    /// Triple buffering without tearing
    Mailbox,
    /// No synchronization, may tear
    Immediate,
    /// Mailbox if supported, Fifo otherwise
    BestAvailable,
}

impl FromStr for PresentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Fifo" => Ok(PresentMode::Fifo),
            "Mailbox" => Ok(PresentMode::Mailbox),
            "Immediate" => Ok(PresentMode::Immediate),
            "BestAvailable" => Ok(PresentMode::BestAvailable),
            other => Err(crate::engine_config_err!("strata::EngineSettings",
                "Unknown present mode '{}'", other)),
        }
    }
}

/// Maximum counts declared by the shaders; list uniforms are padded to these
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderLimits {
    pub max_point_lights: u32,
    pub max_cascades: u32,
    pub max_view_projections: u32,
    pub max_bones: u32,
}

impl Default for ShaderLimits {
    fn default() -> Self {
        Self {
            max_point_lights: 4,
            max_cascades: 5,
            max_view_projections: 6,
            max_bones: 64,
        }
    }
}

/// One post effect declared up front and attached by `Engine::load_post_effects`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEffectSettings {
    /// Effect name used by `PostEffectChain::effect_index`
    pub name: String,
    /// Name of the material drawing the full-screen triangle
    pub material: String,
    /// Fixed size, or `None` to follow the swapchain extent
    pub size: Option<(u32, u32)>,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub application_name: String,
    pub present_mode: PresentMode,
    /// MSAA sample count for the main, water and late screen-quad targets
    pub msaa_samples: u32,
    pub validation: bool,
    /// In-flight frame count (N)
    pub frames_in_flight: usize,

    // ===== SCREEN QUAD =====
    pub use_screen_quad: bool,
    pub mrt_attachment_count: u32,

    // ===== SHADOWS =====
    pub init_shadows: bool,
    pub use_cascade_shadow_map: bool,
    pub cascade_count: u32,
    pub point_light_count: u32,
    pub shadow_map_size: u32,

    // ===== WATER =====
    pub init_water: bool,
    pub water_reflection_width: u32,

    // ===== PARTICLES =====
    pub particles_enabled: bool,

    pub post_effects: Vec<PostEffectSettings>,
    pub limits: ShaderLimits,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            application_name: "Strata Application".to_string(),
            present_mode: PresentMode::Fifo,
            msaa_samples: 1,
            validation: false,
            frames_in_flight: 3,
            use_screen_quad: false,
            mrt_attachment_count: 3,
            init_shadows: true,
            use_cascade_shadow_map: false,
            cascade_count: 5,
            point_light_count: 0,
            shadow_map_size: 2048,
            init_water: false,
            water_reflection_width: 300,
            particles_enabled: false,
            post_effects: Vec::new(),
            limits: ShaderLimits::default(),
        }
    }
}

impl EngineSettings {
    /// Layers of the directional shadow map (1 without cascades)
    pub fn effective_cascade_count(&self) -> u32 {
        if self.use_cascade_shadow_map {
            self.cascade_count
        } else {
            1
        }
    }

    /// Reject settings the pass table cannot represent
    pub fn validate(&self) -> Result<()> {
        const SOURCE: &str = "strata::EngineSettings";

        if self.frames_in_flight == 0 {
            return Err(crate::engine_config_err!(SOURCE, "frames_in_flight must be at least 1"));
        }
        if !self.msaa_samples.is_power_of_two() || self.msaa_samples > 64 {
            return Err(crate::engine_config_err!(SOURCE,
                "MSAA sample count {} is not a power of two up to 64", self.msaa_samples));
        }
        let cascades = self.effective_cascade_count();
        if cascades == 0 || cascades > BufferIndex::SHADOW_DIRECT_RANGE {
            return Err(crate::engine_config_err!(SOURCE,
                "Cascade count {} outside 1..={}", cascades, BufferIndex::SHADOW_DIRECT_RANGE));
        }
        if cascades > self.limits.max_cascades {
            return Err(crate::engine_config_err!(SOURCE,
                "Cascade count {} exceeds shader limit {}", cascades, self.limits.max_cascades));
        }
        if self.point_light_count > self.limits.max_point_lights {
            return Err(crate::engine_config_err!(SOURCE,
                "Point light count {} exceeds shader limit {}",
                self.point_light_count, self.limits.max_point_lights));
        }
        if self.point_light_count > BufferIndex::SHADOW_POINT_RANGE {
            return Err(crate::engine_config_err!(SOURCE,
                "Point light count {} exceeds buffer range {}",
                self.point_light_count, BufferIndex::SHADOW_POINT_RANGE));
        }
        if self.use_screen_quad && self.mrt_attachment_count == 0 {
            return Err(crate::engine_config_err!(SOURCE, "MRT stage needs at least one attachment"));
        }
        if self.post_effects.len() as u32 > BufferIndex::POST_EFFECT_RANGE {
            return Err(crate::engine_config_err!(SOURCE,
                "{} post effects exceed buffer range {}",
                self.post_effects.len(), BufferIndex::POST_EFFECT_RANGE));
        }
        if !self.post_effects.is_empty() && !self.use_screen_quad {
            return Err(crate::engine_config_err!(SOURCE, "Post effects require use_screen_quad"));
        }
        if self.water_reflection_width == 0 || self.shadow_map_size == 0 {
            return Err(crate::engine_config_err!(SOURCE, "Render target sizes must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
