//! winit-driven viewer: one window, one host, one renderer.

use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{MouseScrollDelta, WindowEvent as WinitWindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::ModifiersState;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::content::SceneContent;
use crate::event::{Action, Modifiers, MouseButton, WindowEvent};
use crate::host::{LoopHandle, SceneHost};
use crate::pipeline::{FrameRenderer, RenderMode, WgpuFrameRenderer};
use crate::viewport::Viewport;

/// Opens a window and drives a [`SceneHost`] until the window closes or the
/// host deactivates.
///
/// ```no_run
/// use stagekit::prelude::*;
///
/// Viewer::new("viewer").run(RenderMode::Direct, PlainBox);
/// ```
pub struct Viewer {
    title: String,
    width: u32,
    height: u32,
}

impl Viewer {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            width: 1024,
            height: 768,
        }
    }

    /// Sets the initial window size, in logical pixels.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Runs the render loop on the calling thread. Returns when the window
    /// closes.
    pub fn run(self, mode: RenderMode, content: impl SceneContent + 'static) {
        let event_loop = EventLoop::new().expect("Failed to create event loop");
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App {
            title: self.title,
            width: self.width,
            height: self.height,
            mode,
            content: Box::new(content),
            window: None,
            renderer: None,
            host: None,
            loop_handle: None,
            modifiers: Modifiers::empty(),
            last_frame: None,
        };

        if let Err(err) = event_loop.run_app(&mut app) {
            error!("event loop terminated: {err}");
        }
    }
}

struct App {
    title: String,
    width: u32,
    height: u32,
    mode: RenderMode,
    content: Box<dyn SceneContent>,

    window: Option<Arc<Window>>,
    renderer: Option<WgpuFrameRenderer>,
    host: Option<SceneHost>,
    loop_handle: Option<LoopHandle>,
    modifiers: Modifiers,
    last_frame: Option<Instant>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(&self.title)
            .with_inner_size(LogicalSize::new(self.width as f64, self.height as f64));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("Failed to create window"),
        );

        let renderer = pollster::block_on(WgpuFrameRenderer::new(window.clone(), self.mode));

        let size = window.inner_size();
        let mut host = SceneHost::new(self.mode, Viewport::new(size.width, size.height));
        let handle = host.activate(self.content.as_ref());
        info!("viewer up: {}x{}, {:?}", size.width, size.height, self.mode);

        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);
        self.host = Some(host);
        self.loop_handle = Some(handle);
        self.last_frame = Some(Instant::now());
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WinitWindowEvent,
    ) {
        let (Some(host), Some(renderer)) = (self.host.as_mut(), self.renderer.as_mut()) else {
            return;
        };

        match event {
            WinitWindowEvent::CloseRequested => {
                host.deactivate();
                event_loop.exit();
            }
            WinitWindowEvent::Resized(size) => {
                let viewport = Viewport::new(size.width, size.height);
                renderer.resize(viewport);
                host.handle_resize(viewport.width, viewport.height);
            }
            WinitWindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = translate_modifiers(modifiers.state());
            }
            WinitWindowEvent::CursorMoved { position, .. } => {
                host.handle_event(&WindowEvent::CursorPos(
                    position.x,
                    position.y,
                    self.modifiers,
                ));
            }
            WinitWindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = translate_mouse_button(button) {
                    host.handle_event(&WindowEvent::MouseButton(
                        button,
                        translate_action(state),
                        self.modifiers,
                    ));
                }
            }
            WinitWindowEvent::MouseWheel { delta, .. } => {
                let (x, y) = match delta {
                    MouseScrollDelta::LineDelta(dx, dy) => (dx as f64, dy as f64),
                    // Roughly one line per 10 pixels.
                    MouseScrollDelta::PixelDelta(delta) => (delta.x / 10.0, delta.y / 10.0),
                };
                host.handle_event(&WindowEvent::Scroll(x, y, self.modifiers));
            }
            WinitWindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = self
                    .last_frame
                    .map(|last| (now - last).as_secs_f32())
                    .unwrap_or(0.0);
                self.last_frame = Some(now);

                host.advance(dt);
                host.render(renderer);

                let cancelled = self
                    .loop_handle
                    .as_ref()
                    .is_some_and(LoopHandle::is_cancelled);
                if cancelled {
                    event_loop.exit();
                } else if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn translate_action(state: winit::event::ElementState) -> Action {
    match state {
        winit::event::ElementState::Pressed => Action::Press,
        winit::event::ElementState::Released => Action::Release,
    }
}

fn translate_mouse_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Button1),
        winit::event::MouseButton::Right => Some(MouseButton::Button2),
        winit::event::MouseButton::Middle => Some(MouseButton::Button3),
        _ => None,
    }
}

fn translate_modifiers(modifiers: ModifiersState) -> Modifiers {
    let mut res = Modifiers::empty();
    if modifiers.shift_key() {
        res.insert(Modifiers::SHIFT);
    }
    if modifiers.control_key() {
        res.insert(Modifiers::CONTROL);
    }
    if modifiers.alt_key() {
        res.insert(Modifiers::ALT);
    }
    if modifiers.super_key() {
        res.insert(Modifiers::SUPER);
    }
    res
}
