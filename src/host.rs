//! The scene host: rig construction and the frame state machine.

use std::f32::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glamx::Vec3;
use log::debug;

use crate::camera::{Camera3d, OrbitCamera3d};
use crate::color;
use crate::content::SceneContent;
use crate::event::WindowEvent;
use crate::light::{Light, ShadowSettings};
use crate::pipeline::{Environment, FrameRenderer, RenderMode};
use crate::scene::SceneNode;
use crate::viewport::Viewport;

/// Cancellation handle for the render loop.
///
/// Cloned freely; cancelling any clone stops the loop. The host cancels it
/// on [`SceneHost::deactivate`], after which [`SceneHost::render`] is a
/// no-op.
#[derive(Clone, Debug, Default)]
pub struct LoopHandle(Arc<AtomicBool>);

impl LoopHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Owns the scene tree, the orbit camera and the viewport, and runs the
/// frame pass chain for the selected [`RenderMode`].
///
/// Lifecycle: [`activate`](SceneHost::activate) builds the stock rig and
/// invokes the content hook once, then the driver repeats
/// [`advance`](SceneHost::advance) and [`render`](SceneHost::render) until
/// [`deactivate`](SceneHost::deactivate). Events arriving outside the
/// active window are ignored.
pub struct SceneHost {
    scene: SceneNode,
    camera: OrbitCamera3d,
    viewport: Viewport,
    environment: Environment,
    mode: RenderMode,
    active: bool,
    loop_handle: LoopHandle,
}

impl SceneHost {
    /// A host with an empty scene. Nothing renders until
    /// [`activate`](SceneHost::activate).
    pub fn new(mode: RenderMode, viewport: Viewport) -> Self {
        let mut camera = OrbitCamera3d::new_with_frustum(
            70.0f32.to_radians(),
            1.0,
            10000.0,
            Vec3::new(0.0, 300.0, 0.0),
            Vec3::ZERO,
        );
        camera.handle_event(&WindowEvent::FramebufferSize(
            viewport.width,
            viewport.height,
        ));

        Self {
            scene: SceneNode::group("scene"),
            camera,
            viewport,
            environment: Environment::default(),
            mode,
            active: false,
            loop_handle: LoopHandle::default(),
        }
    }

    /// Builds the stock rig, runs the content hook once, and arms the render
    /// loop. Returns the loop's cancellation handle.
    ///
    /// Calling this on an already-active host rebuilds the scene from
    /// scratch and hands out a fresh handle; the previous one is cancelled.
    pub fn activate(&mut self, content: &dyn SceneContent) -> LoopHandle {
        self.loop_handle.cancel();
        self.scene = SceneNode::group("scene");

        // Lights.
        self.scene.add_light(
            "ambient-light",
            Light::ambient(color::AMBIENT, 1.4),
        );
        self.scene.add_light(
            "key-light",
            Light::directional(color::KEY_LIGHT, 0.7, Vec3::new(-1000.0, 600.0, 1000.0))
                .with_shadow(ShadowSettings::default()),
        );
        self.scene.add_light(
            "fill-light",
            Light::directional(color::FILL_LIGHT, 0.2, Vec3::new(1.0, 1.0, -1.0)),
        );

        // Camera.
        self.camera
            .look_at(Vec3::new(0.0, 300.0, 0.0), Vec3::ZERO);

        // Helpers.
        self.scene.add_grid("grid", 2000.0, 100, 0.1);
        self.scene.add_axes("axes", 100.0).set_visible(false);

        // Environment.
        self.environment = Environment::default();

        // Controls.
        self.camera.set_dist_range(100.0, 2000.0);
        self.camera.set_max_polar(FRAC_PI_2 - 0.15);
        self.camera.set_damping(0.4);
        self.camera.set_auto_rotate_speed(0.1);

        // Ground.
        self.scene.add_ground_plane("ground", 2000.0, 2000.0, 0.2);

        content.populate(&mut self.scene);
        debug!(
            "host activated: {} nodes, mode {:?}",
            self.scene.iter().count(),
            self.mode
        );

        self.active = true;
        self.loop_handle = LoopHandle::default();
        self.loop_handle.clone()
    }

    /// Cancels the render loop and stops reacting to events.
    pub fn deactivate(&mut self) {
        debug!("host deactivated");
        self.loop_handle.cancel();
        self.active = false;
    }

    /// Updates the viewport and the camera aspect. Ignored while inactive.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        if !self.active {
            return;
        }
        self.viewport = Viewport::new(width, height);
        self.camera.handle_event(&WindowEvent::FramebufferSize(
            self.viewport.width,
            self.viewport.height,
        ));
    }

    /// Forwards an event to the orbit camera. Ignored while inactive.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        if !self.active {
            return;
        }
        if let WindowEvent::FramebufferSize(w, h) = *event {
            self.handle_resize(w, h);
        } else {
            self.camera.handle_event(event);
        }
    }

    /// Steps camera damping and auto-rotation by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        self.camera.update(dt);
    }

    /// Runs one frame through the pass chain. A no-op once the loop handle
    /// is cancelled, and skips the frame when the renderer reports no
    /// surface.
    pub fn render(&mut self, renderer: &mut dyn FrameRenderer) {
        if self.loop_handle.is_cancelled() {
            return;
        }
        if !renderer.begin_frame() {
            return;
        }
        for &pass in self.mode.passes() {
            renderer.run_pass(pass, &self.scene, &self.camera, &self.environment);
        }
        renderer.end_frame();
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn scene(&self) -> &SceneNode {
        &self.scene
    }

    #[inline]
    pub fn camera(&self) -> &OrbitCamera3d {
        &self.camera
    }

    /// Mutable camera access, for drivers that need to feed it directly.
    #[inline]
    pub fn camera_mut(&mut self) -> &mut OrbitCamera3d {
        &mut self.camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{PlainBox, ShadowedBox};
    use crate::event::{Action, Modifiers, MouseButton};
    use crate::light::LightKind;
    use crate::pipeline::FramePass;
    use crate::scene::{Material, NodeKind};
    use rand::Rng;

    fn active_host(mode: RenderMode, content: &dyn SceneContent) -> (SceneHost, LoopHandle) {
        let mut host = SceneHost::new(mode, Viewport::new(1280, 720));
        let handle = host.activate(content);
        (host, handle)
    }

    /// Records the pass chain instead of rendering it.
    #[derive(Default)]
    struct RecordingRenderer {
        frames: Vec<Vec<FramePass>>,
        current: Vec<FramePass>,
        resizes: Vec<Viewport>,
    }

    impl FrameRenderer for RecordingRenderer {
        fn begin_frame(&mut self) -> bool {
            self.current.clear();
            true
        }

        fn run_pass(
            &mut self,
            pass: FramePass,
            _scene: &SceneNode,
            _camera: &dyn Camera3d,
            _environment: &Environment,
        ) {
            self.current.push(pass);
        }

        fn end_frame(&mut self) {
            self.frames.push(std::mem::take(&mut self.current));
        }

        fn resize(&mut self, viewport: Viewport) {
            self.resizes.push(viewport);
        }
    }

    #[test]
    fn activation_builds_the_stock_census() {
        let (host, _handle) = active_host(RenderMode::Direct, &ShadowedBox);
        let scene = host.scene();

        let grounds = scene
            .iter()
            .filter(|n| {
                matches!(
                    n.kind(),
                    NodeKind::Mesh {
                        material: Material::ShadowCatcher { .. },
                        ..
                    }
                )
            })
            .count();
        let lines = scene
            .iter()
            .filter(|n| matches!(n.kind(), NodeKind::Lines { .. }))
            .collect::<Vec<_>>();
        let lights = scene
            .iter()
            .filter(|n| matches!(n.kind(), NodeKind::Light(_)))
            .count();

        assert_eq!(grounds, 1);
        assert_eq!(lines.len(), 2);
        assert_eq!(lights, 3);
        assert!(scene.find("grid").unwrap().visible);
        assert!(!scene.find("axes").unwrap().visible);
        // Root + 1 ground + 2 line helpers + 3 lights + 1 content box.
        assert_eq!(scene.iter().count(), 8);
    }

    #[test]
    fn the_light_rig_matches_the_palette() {
        let (host, _handle) = active_host(RenderMode::Direct, &PlainBox);
        let scene = host.scene();

        match scene.find("ambient-light").unwrap().kind() {
            NodeKind::Light(light) => {
                assert_eq!(light.kind, LightKind::Ambient);
                assert_eq!(light.intensity, 1.4);
            }
            _ => unreachable!(),
        }
        match scene.find("key-light").unwrap().kind() {
            NodeKind::Light(light) => {
                assert!(light.casts_shadow());
                assert_eq!(light.position, Vec3::new(-1000.0, 600.0, 1000.0));
            }
            _ => unreachable!(),
        }
        match scene.find("fill-light").unwrap().kind() {
            NodeKind::Light(light) => {
                assert!(!light.casts_shadow());
                assert_eq!(light.intensity, 0.2);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn camera_aspect_tracks_the_viewport() {
        let (mut host, _handle) = active_host(RenderMode::Direct, &PlainBox);
        assert_eq!(host.camera().aspect(), host.viewport().aspect());

        for (w, h) in [(640, 480), (1920, 1080), (333, 777)] {
            host.handle_resize(w, h);
            assert_eq!(host.viewport(), Viewport::new(w, h));
            assert_eq!(host.camera().aspect(), w as f32 / h as f32);
        }
    }

    #[test]
    fn orbit_constraints_survive_random_input() {
        let (mut host, _handle) = active_host(RenderMode::Direct, &ShadowedBox);
        let mut rng = rand::rng();

        for _ in 0..2000 {
            match rng.random_range(0..4u32) {
                0 => {
                    let x = rng.random_range(-4000.0..4000.0);
                    let y = rng.random_range(-4000.0..4000.0);
                    host.handle_event(&WindowEvent::CursorPos(x, y, Modifiers::empty()));
                }
                1 => {
                    let action = if rng.random_bool(0.5) {
                        Action::Press
                    } else {
                        Action::Release
                    };
                    host.handle_event(&WindowEvent::MouseButton(
                        MouseButton::Button1,
                        action,
                        Modifiers::empty(),
                    ));
                }
                2 => {
                    let off = rng.random_range(-30.0..30.0);
                    host.handle_event(&WindowEvent::Scroll(0.0, off, Modifiers::empty()));
                }
                _ => host.advance(rng.random_range(0.0..0.1)),
            }

            let camera = host.camera();
            assert!(camera.dist() >= 100.0 && camera.dist() <= 2000.0);
            assert!(camera.polar() <= std::f32::consts::FRAC_PI_2 - 0.15 + 1.0e-6);
            assert!(camera.polar() > 0.0);
        }
    }

    #[test]
    fn deactivation_cancels_the_loop_and_freezes_state() {
        let (mut host, handle) = active_host(RenderMode::AntiAliased, &ShadowedBox);
        let mut renderer = RecordingRenderer::default();

        host.render(&mut renderer);
        assert_eq!(renderer.frames.len(), 1);

        let aspect = host.camera().aspect();
        host.deactivate();
        assert!(handle.is_cancelled());
        assert!(!host.is_active());

        host.handle_resize(10, 10);
        host.handle_event(&WindowEvent::Scroll(0.0, 3.0, Modifiers::empty()));
        host.advance(1.0);
        assert_eq!(host.camera().aspect(), aspect);
        assert_eq!(host.viewport(), Viewport::new(1280, 720));

        host.render(&mut renderer);
        assert_eq!(renderer.frames.len(), 1);
    }

    #[test]
    fn pass_chain_follows_the_render_mode() {
        let mut renderer = RecordingRenderer::default();

        let (mut host, _handle) = active_host(RenderMode::Direct, &PlainBox);
        host.render(&mut renderer);

        let (mut host, _handle) = active_host(RenderMode::AntiAliased, &PlainBox);
        host.render(&mut renderer);

        assert_eq!(renderer.frames[0], vec![FramePass::Scene]);
        assert_eq!(
            renderer.frames[1],
            vec![FramePass::Scene, FramePass::AntiAlias]
        );
    }

    #[test]
    fn reactivation_hands_out_a_fresh_handle() {
        let (mut host, first) = active_host(RenderMode::Direct, &PlainBox);
        let second = host.activate(&PlainBox);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(host.scene().iter().count(), 8);
    }
}
