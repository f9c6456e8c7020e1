//! Lights and shadow settings.

use glamx::{Mat4, Pose3, Vec3};

use crate::color::Color;

/// Shadow map parameters for a directional light.
///
/// The light renders the scene into a square depth map through an orthographic
/// projection centered on the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShadowSettings {
    /// Side length of the square shadow map, in texels.
    pub map_size: u32,
    /// Half-extent of the orthographic frustum on x and y.
    pub extent: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: 2048,
            extent: 800.0,
            znear: 0.0,
            zfar: 5000.0,
        }
    }
}

/// What kind of light this is.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightKind {
    /// Omnidirectional tint with no position.
    Ambient,
    /// Parallel rays along the light's forward axis. Casts shadows when
    /// `shadow` is set.
    Directional { shadow: Option<ShadowSettings> },
}

/// A light in the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
    /// Position for directional lights; rays point from here to the origin.
    /// Ignored for ambient lights.
    pub position: Vec3,
}

impl Light {
    /// An ambient light with the given color and intensity.
    pub fn ambient(color: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
            intensity,
            position: Vec3::ZERO,
        }
    }

    /// A directional light shining from `position` towards the origin.
    pub fn directional(color: Color, intensity: f32, position: Vec3) -> Self {
        Self {
            kind: LightKind::Directional { shadow: None },
            color,
            intensity,
            position,
        }
    }

    /// Enables shadow casting with the given settings. Only meaningful for
    /// directional lights; ambient lights ignore it.
    pub fn with_shadow(mut self, shadow: ShadowSettings) -> Self {
        if let LightKind::Directional { shadow: ref mut s } = self.kind {
            *s = Some(shadow);
        }
        self
    }

    /// Whether this light renders a shadow map.
    pub fn casts_shadow(&self) -> bool {
        matches!(self.kind, LightKind::Directional { shadow: Some(_) })
    }

    /// Normalized direction the rays travel (from the light towards the
    /// origin). Meaningless for ambient lights.
    pub fn direction(&self) -> Vec3 {
        (-self.position).normalize_or_zero()
    }

    /// The view-projection matrix used to render this light's shadow map, or
    /// `None` when the light casts no shadows.
    pub fn shadow_view_proj(&self) -> Option<Mat4> {
        let LightKind::Directional { shadow: Some(s) } = self.kind else {
            return None;
        };
        let view = Pose3::look_at_rh(self.position, Vec3::ZERO, Vec3::Y).to_mat4();
        let proj = Mat4::orthographic_rh(-s.extent, s.extent, -s.extent, s.extent, s.znear, s.zfar);
        Some(proj * view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color;

    #[test]
    fn with_shadow_is_a_noop_on_ambient() {
        let light = Light::ambient(color::AMBIENT, 1.4).with_shadow(ShadowSettings::default());
        assert!(!light.casts_shadow());
        assert!(light.shadow_view_proj().is_none());
    }

    #[test]
    fn directional_shadow_projects_the_origin_to_center() {
        let light = Light::directional(color::KEY_LIGHT, 0.7, Vec3::new(-1000.0, 600.0, 1000.0))
            .with_shadow(ShadowSettings::default());
        let vp = light.shadow_view_proj().unwrap();
        let center = vp.project_point3(Vec3::ZERO);
        assert!(center.x.abs() < 1.0e-4);
        assert!(center.y.abs() < 1.0e-4);
    }

    #[test]
    fn direction_points_at_the_origin() {
        let light = Light::directional(color::FILL_LIGHT, 0.2, Vec3::new(1.0, 1.0, -1.0));
        let d = light.direction();
        assert!((d.length() - 1.0).abs() < 1.0e-6);
        assert!(d.x < 0.0 && d.y < 0.0 && d.z > 0.0);
    }
}
