//! Sampler registry module
//!
//! Typed lookup of render-target outputs by texture kind and sub-index.

mod texture_kind;
mod sampler_registry;

pub use texture_kind::TextureKind;
pub use sampler_registry::{SamplerRegistry, SamplerProvider};
