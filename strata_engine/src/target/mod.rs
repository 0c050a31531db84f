//! Render target module
//!
//! One target per configured graphics pass. Offscreen targets publish their
//! images into the sampler registry; the main target renders to the
//! swapchain.

mod render_target_pass;
mod offscreen_target;
mod shadow_target;
mod water_target;
mod screen_quad_target;
mod post_effect;
mod main_target;
mod target_manager;

pub use render_target_pass::{RenderTargetPass, TargetContext, TargetSize};
pub use offscreen_target::OffscreenTarget;
pub use shadow_target::ShadowTarget;
pub use water_target::WaterTarget;
pub use screen_quad_target::ScreenQuadTarget;
pub use post_effect::{PostEffectTarget, PostEffectChain};
pub use main_target::MainTarget;
pub use target_manager::TargetManager;
