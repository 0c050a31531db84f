/// Logical pass kinds
///
/// The derived ordering is the declared submission order: compute, shadows,
/// water, screen-quad stages, post effects by index, then the main pass.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    ComputeParticles,
    ShadowDirect,
    ShadowPoint,
    WaterReflection,
    WaterRefraction,
    ScreenQuadDepth,
    ScreenQuadNormal,
    ScreenQuadMrt,
    ScreenQuadLate,
    PostEffect(u32),
    Main,
}

impl PassKind {
    /// Kinds with a fixed dense index, in declared order
    pub const FIXED: [PassKind; 10] = [
        PassKind::ComputeParticles,
        PassKind::ShadowDirect,
        PassKind::ShadowPoint,
        PassKind::WaterReflection,
        PassKind::WaterRefraction,
        PassKind::ScreenQuadDepth,
        PassKind::ScreenQuadNormal,
        PassKind::ScreenQuadMrt,
        PassKind::ScreenQuadLate,
        PassKind::Main,
    ];

    /// Screen-quad sub-stages in execution order
    pub const SCREEN_QUAD_STAGES: [PassKind; 4] = [
        PassKind::ScreenQuadDepth,
        PassKind::ScreenQuadNormal,
        PassKind::ScreenQuadMrt,
        PassKind::ScreenQuadLate,
    ];

    /// Dense table index. Post effects follow the fixed kinds.
    pub fn dense_index(self) -> usize {
        match self {
            PassKind::ComputeParticles => 0,
            PassKind::ShadowDirect => 1,
            PassKind::ShadowPoint => 2,
            PassKind::WaterReflection => 3,
            PassKind::WaterRefraction => 4,
            PassKind::ScreenQuadDepth => 5,
            PassKind::ScreenQuadNormal => 6,
            PassKind::ScreenQuadMrt => 7,
            PassKind::ScreenQuadLate => 8,
            PassKind::Main => 9,
            PassKind::PostEffect(n) => Self::FIXED.len() + n as usize,
        }
    }

    pub fn is_compute(self) -> bool {
        matches!(self, PassKind::ComputeParticles)
    }

    pub fn is_shadow(self) -> bool {
        matches!(self, PassKind::ShadowDirect | PassKind::ShadowPoint)
    }

    pub fn is_screen_quad(self) -> bool {
        Self::SCREEN_QUAD_STAGES.contains(&self)
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::PostEffect(n) => write!(f, "PostEffect({})", n),
            other => write!(f, "{:?}", other),
        }
    }
}

#[cfg(test)]
#[path = "pass_kind_tests.rs"]
mod tests;
