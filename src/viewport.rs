//! Viewport dimensions.

/// The drawable surface size, in physical pixels.
///
/// Drives the camera aspect ratio and the renderer's output size. Updated by
/// the host on every resize event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport, clamping both dimensions to at least one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Width / height.
    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_are_clamped() {
        let vp = Viewport::new(0, 0);
        assert_eq!((vp.width, vp.height), (1, 1));
        assert_eq!(vp.aspect(), 1.0);
    }

    #[test]
    fn aspect_is_width_over_height() {
        assert_eq!(Viewport::new(1600, 900).aspect(), 1600.0 / 900.0);
    }
}
