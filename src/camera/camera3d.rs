use glamx::{Mat4, Pose3, Vec3};

use crate::event::WindowEvent;

/// Trait that all camera implementations must implement.
///
/// Cameras turn input events and per-frame updates into a view and
/// projection for the render pipeline.
pub trait Camera3d {
    /// Handles a window event (pointer, scroll, resize).
    fn handle_event(&mut self, event: &WindowEvent);

    /// Advances time-based camera state (damping, auto-rotation) by `dt`
    /// seconds. Called once per frame before rendering.
    fn update(&mut self, dt: f32);

    /// The camera's position in world space.
    fn eye(&self) -> Vec3;

    /// The view transformation (world to camera space).
    fn view_transform(&self) -> Pose3;

    /// The combined projection and view matrix (world to NDC).
    fn transformation(&self) -> Mat4;

    /// The inverse of [`transformation()`](Self::transformation).
    fn inverse_transformation(&self) -> Mat4;

    /// Near and far clipping plane distances.
    fn clip_planes(&self) -> (f32, f32);

    /// The view transform and projection matrix, separately, for uniform
    /// uploads.
    fn view_proj_pair(&self) -> (Pose3, Mat4);
}
