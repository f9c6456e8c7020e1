//! The window, and things to handle the rendering loop and events.

mod viewer;

pub use viewer::Viewer;
