//! Color type and the fixed palette used by the stock rig.
//!
//! Components are f32 in [0.0, 1.0]. The palette constants are spelled out as
//! literals; [`from_hex`] exists for callers that think in `0xRRGGBB`.

pub use rgb::Rgba;

/// The color type used throughout stagekit. RGBA with f32 components in [0.0, 1.0].
pub type Color = Rgba<f32>;

/// Converts a packed `0xRRGGBB` value to an opaque [`Color`].
///
/// # Example
/// ```
/// use stagekit::color::{from_hex, WHITE};
/// assert_eq!(from_hex(0xffffff), WHITE);
/// ```
pub fn from_hex(rgb: u32) -> Color {
    Color::new(
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
        1.0,
    )
}

/// White (255, 255, 255).
pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

/// Black (0, 0, 0).
pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

/// Viewport clear color, `0x021122`. A near-black night blue.
pub const BACKGROUND: Color = Color::new(0.007843138, 0.06666667, 0.13333334, 1.0);

/// Fog color, `0x1a2050`.
pub const FOG: Color = Color::new(0.101960786, 0.1254902, 0.3137255, 1.0);

/// Ambient light color, `0xe8ecff`. Slightly blue-tinted white.
pub const AMBIENT: Color = Color::new(0.9098039, 0.9254902, 1.0, 1.0);

/// Key light color, `0xfff1f1`. Warm white.
pub const KEY_LIGHT: Color = Color::new(1.0, 0.94509804, 0.94509804, 1.0);

/// Fill light color, `0x87c0ff`. Cool sky blue.
pub const FILL_LIGHT: Color = Color::new(0.5294118, 0.7529412, 1.0, 1.0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips_the_palette() {
        for (hex, color) in [
            (0x021122, BACKGROUND),
            (0x1a2050, FOG),
            (0xe8ecff, AMBIENT),
            (0xfff1f1, KEY_LIGHT),
            (0x87c0ff, FILL_LIGHT),
        ] {
            let c = from_hex(hex);
            assert!((c.r - color.r).abs() < 1.0e-6);
            assert!((c.g - color.g).abs() < 1.0e-6);
            assert!((c.b - color.b).abs() < 1.0e-6);
            assert_eq!(c.a, 1.0);
        }
    }
}
