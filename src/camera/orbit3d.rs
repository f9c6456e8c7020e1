use std::f32;

use glamx::{Mat4, Pose3, Vec2, Vec3};

use crate::camera::Camera3d;
use crate::event::{Action, MouseButton, WindowEvent};

/// One full turn per minute at 60 fps, for auto-rotate speed 1.0.
const AUTO_ROTATE_FRAME_ANGLE: f32 = 2.0 * f32::consts::PI / 60.0 / 60.0;

/// Orbital camera circling a fixed target.
///
/// Spherical coordinates around the target: `yaw` is the azimuth around +Y,
/// `polar` the angle down from +Y. Dragging with the left button feeds a
/// pending rotation that [`update`](Camera3d::update) applies with inertial
/// damping; a constant auto-rotation feeds the same pending rotation, so
/// the camera keeps drifting around the target when left alone.
///
/// # Constraints
/// The distance to the target stays within `[min_dist, max_dist]` and the
/// polar angle within `[0.01, max_polar]` after every event and update.
#[derive(Copy, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrbitCamera3d {
    target: Vec3,
    yaw: f32,
    polar: f32,
    dist: f32,

    pending_yaw: f32,
    pending_polar: f32,

    min_dist: f32,
    max_dist: f32,
    max_polar: f32,
    damping: f32,
    auto_rotate_speed: f32,
    rotate_step: f32,

    fov: f32,
    znear: f32,
    zfar: f32,
    proj: Mat4,
    view: Mat4,
    proj_view: Mat4,
    inverse_proj_view: Mat4,
    last_cursor_pos: Vec2,
    last_framebuffer_size: Vec2,
    rotate_pressed: bool,
}

impl OrbitCamera3d {
    /// Creates an orbit camera with default frustum: 45° field of view, near
    /// plane at 0.1, far plane at 1024.
    pub fn new(eye: Vec3, at: Vec3) -> OrbitCamera3d {
        OrbitCamera3d::new_with_frustum(f32::consts::PI / 4.0, 0.1, 1024.0, eye, at)
    }

    /// Creates an orbit camera with custom frustum parameters.
    pub fn new_with_frustum(
        fov: f32,
        znear: f32,
        zfar: f32,
        eye: Vec3,
        at: Vec3,
    ) -> OrbitCamera3d {
        let mut res = OrbitCamera3d {
            target: at,
            yaw: 0.0,
            polar: 0.0,
            dist: 0.0,
            pending_yaw: 0.0,
            pending_polar: 0.0,
            min_dist: 0.0,
            max_dist: f32::INFINITY,
            max_polar: f32::consts::PI - 0.01,
            damping: 1.0,
            auto_rotate_speed: 0.0,
            rotate_step: 0.005,
            fov,
            znear,
            zfar,
            proj: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            proj_view: Mat4::IDENTITY,
            inverse_proj_view: Mat4::IDENTITY,
            last_cursor_pos: Vec2::ZERO,
            last_framebuffer_size: Vec2::new(800.0, 600.0),
            rotate_pressed: false,
        };

        res.look_at(eye, at);

        res
    }

    /// Moves the camera to `eye` and points it at `at`, which becomes the
    /// new orbit target.
    pub fn look_at(&mut self, eye: Vec3, at: Vec3) {
        let rel = eye - at;
        let dist = rel.length();

        self.target = at;
        self.dist = dist;
        self.polar = if dist > 0.0 {
            (rel.y / dist).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };
        self.yaw = rel.x.atan2(rel.z);
        self.update_restrictions();
        self.update_projviews();
    }

    /// Restricts the distance to the target to `[min, max]`.
    pub fn set_dist_range(&mut self, min: f32, max: f32) {
        self.min_dist = min;
        self.max_dist = max;
        self.update_restrictions();
        self.update_projviews();
    }

    /// Restricts the polar angle (down from +Y) to at most `max` radians.
    pub fn set_max_polar(&mut self, max: f32) {
        self.max_polar = max;
        self.update_restrictions();
        self.update_projviews();
    }

    /// Sets the damping factor in `(0, 1]`: the fraction of the pending
    /// rotation applied per frame at 60 fps. 1.0 applies drags immediately.
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping.clamp(1.0e-3, 1.0);
    }

    /// Sets the auto-rotation speed. Speed 1.0 is one full turn per minute
    /// at 60 fps; 0.0 disables auto-rotation.
    pub fn set_auto_rotate_speed(&mut self, speed: f32) {
        self.auto_rotate_speed = speed;
    }

    /// The orbit target.
    #[inline]
    pub fn at(&self) -> Vec3 {
        self.target
    }

    /// Current distance to the target.
    #[inline]
    pub fn dist(&self) -> f32 {
        self.dist
    }

    /// Current polar angle, measured down from +Y.
    #[inline]
    pub fn polar(&self) -> f32 {
        self.polar
    }

    /// Current azimuth around +Y.
    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Current projection aspect ratio (width / height).
    #[inline]
    pub fn aspect(&self) -> f32 {
        self.last_framebuffer_size.x / self.last_framebuffer_size.y
    }

    fn update_restrictions(&mut self) {
        self.dist = self.dist.clamp(self.min_dist, self.max_dist);
        self.polar = self.polar.clamp(0.01, self.max_polar);
    }

    #[doc(hidden)]
    pub fn handle_left_button_displacement(&mut self, dpos: Vec2) {
        self.pending_yaw -= dpos.x * self.rotate_step;
        self.pending_polar -= dpos.y * self.rotate_step;
    }

    #[doc(hidden)]
    pub fn handle_scroll(&mut self, yoff: f32) {
        // Multiplicative dolly, 5% per scroll line.
        self.dist *= 0.95f32.powf(yoff);
        self.update_restrictions();
        self.update_projviews();
    }

    fn update_projviews(&mut self) {
        self.view = self.view_transform().to_mat4();
        let aspect = self.last_framebuffer_size.x / self.last_framebuffer_size.y;
        self.proj = Mat4::perspective_rh_gl(self.fov, aspect, self.znear, self.zfar);
        self.proj_view = self.proj * self.view;
        self.inverse_proj_view = self.proj_view.inverse();
    }
}

impl Camera3d for OrbitCamera3d {
    fn handle_event(&mut self, event: &WindowEvent) {
        match *event {
            WindowEvent::CursorPos(x, y, _) => {
                let curr_pos = Vec2::new(x as f32, y as f32);

                if self.rotate_pressed {
                    let dpos = curr_pos - self.last_cursor_pos;
                    self.handle_left_button_displacement(dpos);
                }

                self.last_cursor_pos = curr_pos;
            }
            WindowEvent::MouseButton(MouseButton::Button1, action, _) => {
                self.rotate_pressed = action == Action::Press;
            }
            WindowEvent::Scroll(_, off, _) => self.handle_scroll(off as f32),
            WindowEvent::FramebufferSize(w, h) => {
                self.last_framebuffer_size = Vec2::new(w as f32, h as f32);
                self.update_projviews();
            }
            _ => {}
        }
    }

    fn update(&mut self, dt: f32) {
        let steps = (dt * 60.0).max(0.0);

        // Auto-rotation feeds the same pending rotation as dragging.
        self.pending_yaw -= AUTO_ROTATE_FRAME_ANGLE * self.auto_rotate_speed * steps;

        // Apply the damped fraction of the pending rotation. `applied` is
        // the per-frame damping factor compounded over `steps` frames.
        let remaining = (1.0 - self.damping).powf(steps);
        let applied = 1.0 - remaining;
        self.yaw += self.pending_yaw * applied;
        self.polar += self.pending_polar * applied;
        self.pending_yaw *= remaining;
        self.pending_polar *= remaining;

        self.update_restrictions();
        self.update_projviews();
    }

    fn eye(&self) -> Vec3 {
        let dir = Vec3::new(
            self.polar.sin() * self.yaw.sin(),
            self.polar.cos(),
            self.polar.sin() * self.yaw.cos(),
        );
        self.target + dir * self.dist
    }

    fn view_transform(&self) -> Pose3 {
        Pose3::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    fn transformation(&self) -> Mat4 {
        self.proj_view
    }

    fn inverse_transformation(&self) -> Mat4 {
        self.inverse_proj_view
    }

    fn clip_planes(&self) -> (f32, f32) {
        (self.znear, self.zfar)
    }

    #[inline]
    fn view_proj_pair(&self) -> (Pose3, Mat4) {
        (self.view_transform(), self.proj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_camera() -> OrbitCamera3d {
        let mut camera = OrbitCamera3d::new_with_frustum(
            70.0f32.to_radians(),
            1.0,
            10000.0,
            Vec3::new(0.0, 300.0, 0.0),
            Vec3::ZERO,
        );
        camera.set_dist_range(100.0, 2000.0);
        camera.set_max_polar(f32::consts::FRAC_PI_2 - 0.15);
        camera.set_damping(0.4);
        camera.set_auto_rotate_speed(0.1);
        camera
    }

    fn press(camera: &mut OrbitCamera3d) {
        camera.handle_event(&WindowEvent::MouseButton(
            MouseButton::Button1,
            Action::Press,
            Default::default(),
        ));
    }

    #[test]
    fn look_at_recovers_spherical_coordinates() {
        let camera = stock_camera();
        assert_eq!(camera.dist(), 300.0);
        assert!((camera.eye() - Vec3::new(0.0, 300.0, 0.0)).length() < 4.0);
    }

    #[test]
    fn drag_only_rotates_while_pressed() {
        let mut camera = stock_camera();
        let before = camera.yaw();

        camera.handle_event(&WindowEvent::CursorPos(10.0, 10.0, Default::default()));
        camera.update(1.0 / 60.0);
        assert_eq!(camera.polar(), stock_camera().polar());

        press(&mut camera);
        camera.handle_event(&WindowEvent::CursorPos(110.0, 10.0, Default::default()));
        camera.update(1.0 / 60.0);
        assert!(camera.yaw() != before);
    }

    #[test]
    fn scroll_clamps_to_the_distance_range() {
        let mut camera = stock_camera();
        camera.handle_scroll(200.0);
        assert_eq!(camera.dist(), 100.0);
        camera.handle_scroll(-500.0);
        assert_eq!(camera.dist(), 2000.0);
    }

    #[test]
    fn auto_rotation_drifts_without_input() {
        let mut camera = stock_camera();
        let before = camera.yaw();
        for _ in 0..120 {
            camera.update(1.0 / 60.0);
        }
        assert!(camera.yaw() < before);
        // Speed 0.1: a full turn takes ten minutes, so two seconds is tiny.
        assert!((camera.yaw() - before).abs() < 0.05);
    }

    #[test]
    fn damping_keeps_rotating_after_release() {
        let mut camera = stock_camera();
        camera.set_auto_rotate_speed(0.0);

        press(&mut camera);
        camera.handle_event(&WindowEvent::CursorPos(100.0, 0.0, Default::default()));
        camera.handle_event(&WindowEvent::MouseButton(
            MouseButton::Button1,
            Action::Release,
            Default::default(),
        ));

        camera.update(1.0 / 60.0);
        let after_one = camera.yaw();
        camera.update(1.0 / 60.0);
        // The remaining pending rotation keeps draining.
        assert!((camera.yaw() - after_one).abs() > 1.0e-4);
    }
}
