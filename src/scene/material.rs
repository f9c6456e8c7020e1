//! Mesh materials.

use crate::color::Color;

/// How a mesh surface is shaded.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Material {
    /// Lambert-lit, fogged, tinted by `color`.
    Standard { color: Color },
    /// Invisible except where it darkens under a received shadow. Used for
    /// the ground plane so shadows land on an otherwise transparent floor.
    ShadowCatcher { opacity: f32 },
}

impl Material {
    /// Whether the material needs alpha blending.
    pub fn is_transparent(&self) -> bool {
        matches!(self, Material::ShadowCatcher { .. })
    }
}
