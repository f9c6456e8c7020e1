//! Window events as seen by cameras and the scene host.
//!
//! The viewer translates winit events into these before forwarding them, so
//! the camera layer (and the tests driving it) never depend on a real window.

use bitflags::bitflags;

bitflags! {
    /// Keyboard modifier state attached to pointer events.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Modifiers: u32 {
        const SHIFT   = 0b0001;
        const CONTROL = 0b0010;
        const ALT     = 0b0100;
        const SUPER   = 0b1000;
    }
}

/// Button or key state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    Press,
    Release,
}

/// Mouse buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MouseButton {
    Button1,
    Button2,
    Button3,
}

/// An input or surface event relevant to the scene host.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WindowEvent {
    /// Cursor moved to the given position, in physical pixels.
    CursorPos(f64, f64, Modifiers),
    /// A mouse button changed state.
    MouseButton(MouseButton, Action, Modifiers),
    /// Scroll offsets along x and y (line-based).
    Scroll(f64, f64, Modifiers),
    /// The drawable surface was resized, in physical pixels.
    FramebufferSize(u32, u32),
}
