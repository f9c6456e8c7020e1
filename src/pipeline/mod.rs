//! The frame pass chain and the renderer seam.
//!
//! The host only knows about [`RenderMode`] and the [`FrameRenderer`] trait;
//! the wgpu backend lives behind it. This keeps the pass chain and the host
//! state machine testable without a GPU.

pub use self::wgpu_renderer::WgpuFrameRenderer;

mod fxaa;
mod scene_pass;
mod wgpu_renderer;

use crate::camera::Camera3d;
use crate::color::{self, Color};
use crate::scene::SceneNode;
use crate::viewport::Viewport;

/// One step of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FramePass {
    /// Shadow pre-pass plus the forward pass over the scene tree.
    Scene,
    /// FXAA resolve of the offscreen scene target to the surface.
    AntiAlias,
}

/// How frames are composed. Fixed when the host is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderMode {
    /// The scene pass draws straight to the surface.
    Direct,
    /// The scene pass draws offscreen; an FXAA pass resolves to the surface.
    AntiAliased,
}

impl RenderMode {
    /// The ordered pass chain for one frame in this mode.
    pub fn passes(self) -> &'static [FramePass] {
        match self {
            RenderMode::Direct => &[FramePass::Scene],
            RenderMode::AntiAliased => &[FramePass::Scene, FramePass::AntiAlias],
        }
    }
}

/// Background and fog configuration handed to the renderer each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Environment {
    pub background: Color,
    pub fog_color: Color,
    pub fog_near: f32,
    pub fog_far: f32,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            background: color::BACKGROUND,
            fog_color: color::FOG,
            fog_near: 10000.0,
            fog_far: 10000.0,
        }
    }
}

/// Executes frame passes against some output.
///
/// The host drives this once per frame: `begin_frame`, then `run_pass` for
/// each pass of the selected [`RenderMode`], then `end_frame`. A `false`
/// return from `begin_frame` skips the frame (lost or outdated surface).
pub trait FrameRenderer {
    fn begin_frame(&mut self) -> bool;

    fn run_pass(
        &mut self,
        pass: FramePass,
        scene: &SceneNode,
        camera: &dyn Camera3d,
        environment: &Environment,
    );

    fn end_frame(&mut self);

    fn resize(&mut self, viewport: Viewport);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_chains_per_mode() {
        assert_eq!(RenderMode::Direct.passes(), &[FramePass::Scene]);
        assert_eq!(
            RenderMode::AntiAliased.passes(),
            &[FramePass::Scene, FramePass::AntiAlias]
        );
    }
}
