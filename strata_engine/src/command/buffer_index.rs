/// Buffer-index namespace
///
/// Logical command-buffer ids live in one flat `u32` space split into
/// disjoint ranges, one per pass kind. Callers outside the core must request
/// command buffers through these constructors.

use std::fmt;
use crate::error::Result;
use crate::pass::PassKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferIndex(u32);

impl BufferIndex {
    pub const MAIN_BASE: u32 = 0;
    pub const MAIN_RANGE: u32 = 100;
    pub const SHADOW_DIRECT_BASE: u32 = 100;
    pub const SHADOW_DIRECT_RANGE: u32 = 50;
    pub const SHADOW_POINT_BASE: u32 = 150;
    pub const SHADOW_POINT_RANGE: u32 = 50;
    pub const WATER_REFLECTION: u32 = 200;
    pub const WATER_REFRACTION: u32 = 201;
    pub const SCREEN_QUAD_BASE: u32 = 300;
    pub const SCREEN_QUAD_RANGE: u32 = 4;
    pub const COMPUTE_PARTICLES: u32 = 400;
    pub const POST_EFFECT_BASE: u32 = 500;
    pub const POST_EFFECT_RANGE: u32 = 100;

    fn ranged(kind: &str, base: u32, range: u32, offset: u32) -> Result<Self> {
        if offset >= range {
            return Err(crate::engine_config_err!("strata::BufferIndex",
                "{} buffer offset {} outside 0..{}", kind, offset, range));
        }
        Ok(Self(base + offset))
    }

    /// Main pass, indexed by the raw swapchain image index
    pub fn main(image_index: u32) -> Result<Self> {
        Self::ranged("Main", Self::MAIN_BASE, Self::MAIN_RANGE, image_index)
    }

    pub fn shadow_direct(cascade: u32) -> Result<Self> {
        Self::ranged("ShadowDirect", Self::SHADOW_DIRECT_BASE, Self::SHADOW_DIRECT_RANGE, cascade)
    }

    pub fn shadow_point(light: u32) -> Result<Self> {
        Self::ranged("ShadowPoint", Self::SHADOW_POINT_BASE, Self::SHADOW_POINT_RANGE, light)
    }

    pub fn water_reflection() -> Self {
        Self(Self::WATER_REFLECTION)
    }

    pub fn water_refraction() -> Self {
        Self(Self::WATER_REFRACTION)
    }

    pub fn compute_particles() -> Self {
        Self(Self::COMPUTE_PARTICLES)
    }

    pub fn post_effect(index: u32) -> Result<Self> {
        Self::ranged("PostEffect", Self::POST_EFFECT_BASE, Self::POST_EFFECT_RANGE, index)
    }

    /// Screen-quad sub-stage (depth, normal, MRT, late)
    pub fn screen_quad(stage: PassKind) -> Result<Self> {
        match PassKind::SCREEN_QUAD_STAGES.iter().position(|&s| s == stage) {
            Some(offset) => Ok(Self(Self::SCREEN_QUAD_BASE + offset as u32)),
            None => Err(crate::engine_config_err!("strata::BufferIndex",
                "{} is not a screen-quad stage", stage)),
        }
    }

    /// First buffer of a pass kind (`image_index` only matters for Main)
    pub fn for_pass(kind: PassKind, image_index: u32) -> Result<Self> {
        match kind {
            PassKind::Main => Self::main(image_index),
            PassKind::ShadowDirect => Self::shadow_direct(0),
            PassKind::ShadowPoint => Self::shadow_point(0),
            PassKind::WaterReflection => Ok(Self::water_reflection()),
            PassKind::WaterRefraction => Ok(Self::water_refraction()),
            PassKind::ComputeParticles => Ok(Self::compute_particles()),
            PassKind::PostEffect(n) => Self::post_effect(n),
            stage => Self::screen_quad(stage),
        }
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Pass kind owning this index, or `None` for a hole in the namespace
    pub fn pass_kind(self) -> Option<PassKind> {
        let raw = self.0;
        match raw {
            r if r < Self::MAIN_BASE + Self::MAIN_RANGE => Some(PassKind::Main),
            r if (Self::SHADOW_DIRECT_BASE..Self::SHADOW_DIRECT_BASE + Self::SHADOW_DIRECT_RANGE)
                .contains(&r) => Some(PassKind::ShadowDirect),
            r if (Self::SHADOW_POINT_BASE..Self::SHADOW_POINT_BASE + Self::SHADOW_POINT_RANGE)
                .contains(&r) => Some(PassKind::ShadowPoint),
            Self::WATER_REFLECTION => Some(PassKind::WaterReflection),
            Self::WATER_REFRACTION => Some(PassKind::WaterRefraction),
            r if (Self::SCREEN_QUAD_BASE..Self::SCREEN_QUAD_BASE + Self::SCREEN_QUAD_RANGE)
                .contains(&r) => {
                Some(PassKind::SCREEN_QUAD_STAGES[(r - Self::SCREEN_QUAD_BASE) as usize])
            }
            Self::COMPUTE_PARTICLES => Some(PassKind::ComputeParticles),
            r if (Self::POST_EFFECT_BASE..Self::POST_EFFECT_BASE + Self::POST_EFFECT_RANGE)
                .contains(&r) => Some(PassKind::PostEffect(r - Self::POST_EFFECT_BASE)),
            _ => None,
        }
    }
}

impl fmt::Display for BufferIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
#[path = "buffer_index_tests.rs"]
mod tests;
