/// Texture kinds a material can sample
///
/// Every kind except `ImageFile` is produced by a render-target pass and
/// resolved through the sampler registry at instance creation time.

use std::fmt;
use std::str::FromStr;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureKind {
    /// Texture loaded from an image file, owned by the material
    ImageFile,
    ShadowMapDirect,
    ShadowMapPoint,
    Reflection,
    Refraction,
    ScreenQuadDepth,
    ScreenQuadNormal,
    /// MRT stage output; the sub-index selects the attachment
    ScreenQuadMrt,
    ScreenQuadLate,
    /// Output of post effect n (sub-index)
    PostEffect,
    /// Output of the last post effect, or the late screen-quad stage
    PostEffectFinal,
}

impl TextureKind {
    pub const ALL: [TextureKind; 11] = [
        TextureKind::ImageFile,
        TextureKind::ShadowMapDirect,
        TextureKind::ShadowMapPoint,
        TextureKind::Reflection,
        TextureKind::Refraction,
        TextureKind::ScreenQuadDepth,
        TextureKind::ScreenQuadNormal,
        TextureKind::ScreenQuadMrt,
        TextureKind::ScreenQuadLate,
        TextureKind::PostEffect,
        TextureKind::PostEffectFinal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TextureKind::ImageFile => "ImageFile",
            TextureKind::ShadowMapDirect => "ShadowMapDirect",
            TextureKind::ShadowMapPoint => "ShadowMapPoint",
            TextureKind::Reflection => "Reflection",
            TextureKind::Refraction => "Refraction",
            TextureKind::ScreenQuadDepth => "ScreenQuadDepth",
            TextureKind::ScreenQuadNormal => "ScreenQuadNormal",
            TextureKind::ScreenQuadMrt => "ScreenQuadMRT",
            TextureKind::ScreenQuadLate => "ScreenQuadLate",
            TextureKind::PostEffect => "PostEffect",
            TextureKind::PostEffectFinal => "PostEffectFinal",
        }
    }

    /// Produced by a pass (resolved through the registry)
    pub fn is_external(&self) -> bool {
        !matches!(self, TextureKind::ImageFile)
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextureKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // "ShadowMap" was the directional map before point shadows existed
        if s == "ShadowMap" {
            return Ok(TextureKind::ShadowMapDirect);
        }
        TextureKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| crate::engine_config_err!("strata::TextureKind",
                "Unknown texture kind '{}'", s))
    }
}
