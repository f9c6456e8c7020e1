//! Camera trait and the orbit implementation.

pub use self::camera3d::Camera3d;
pub use self::orbit3d::OrbitCamera3d;

mod camera3d;
mod orbit3d;
