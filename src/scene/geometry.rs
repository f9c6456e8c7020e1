//! Procedural geometry for the stock rig.

use glamx::Vec3;

use crate::color::{self, Color};

/// Triangle-list geometry with flat per-vertex normals.
#[derive(Clone, Debug, PartialEq)]
pub struct TriGeometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
}

impl TriGeometry {
    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }
}

/// Line-list geometry. Consecutive vertex pairs form segments; each vertex
/// carries its own color.
#[derive(Clone, Debug, PartialEq)]
pub struct LineGeometry {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Color>,
}

impl LineGeometry {
    /// Number of segments.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.positions.len() / 2
    }
}

/// A box centered at the origin with the given full extents, four vertices
/// per face so normals stay flat.
pub fn cuboid(extents: Vec3) -> TriGeometry {
    let h = extents * 0.5;
    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(12);

    // (normal, up, right) with right x up = normal, so the winding below is
    // counter-clockwise seen from outside.
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Y, Vec3::Z),
        (Vec3::Y, Vec3::X, Vec3::Z),
        (Vec3::NEG_Y, Vec3::Z, Vec3::X),
        (Vec3::Z, Vec3::Y, Vec3::X),
        (Vec3::NEG_Z, Vec3::X, Vec3::Y),
    ];

    for (normal, up, right) in faces {
        let base = positions.len() as u32;
        let origin = normal * h;
        let u = up * h;
        let r = right * h;
        positions.push(origin - u - r);
        positions.push(origin - u + r);
        positions.push(origin + u + r);
        positions.push(origin + u - r);
        normals.extend([normal; 4]);
        indices.push([base, base + 1, base + 2]);
        indices.push([base, base + 2, base + 3]);
    }

    TriGeometry {
        positions,
        normals,
        indices,
    }
}

/// A rectangle on the XZ plane centered at the origin, normal +Y.
pub fn ground_plane(width: f32, depth: f32) -> TriGeometry {
    let hw = width * 0.5;
    let hd = depth * 0.5;
    TriGeometry {
        positions: vec![
            Vec3::new(-hw, 0.0, -hd),
            Vec3::new(-hw, 0.0, hd),
            Vec3::new(hw, 0.0, hd),
            Vec3::new(hw, 0.0, -hd),
        ],
        normals: vec![Vec3::Y; 4],
        indices: vec![[0, 1, 2], [0, 2, 3]],
    }
}

/// A square grid on the XZ plane centered at the origin. The two center
/// lines are darker than the rest.
pub fn grid_lines(size: f32, divisions: u32) -> LineGeometry {
    let center = color::from_hex(0x444444);
    let edge = color::from_hex(0x888888);
    let half = size * 0.5;
    let step = size / divisions as f32;

    let mut positions = Vec::with_capacity((divisions as usize + 1) * 4);
    let mut colors = Vec::with_capacity(positions.capacity());
    for i in 0..=divisions {
        let t = -half + i as f32 * step;
        let c = if i * 2 == divisions { center } else { edge };
        positions.push(Vec3::new(t, 0.0, -half));
        positions.push(Vec3::new(t, 0.0, half));
        positions.push(Vec3::new(-half, 0.0, t));
        positions.push(Vec3::new(half, 0.0, t));
        colors.extend([c; 4]);
    }

    LineGeometry { positions, colors }
}

/// The three coordinate axes from the origin: x red, y green, z blue.
pub fn axes_lines(length: f32) -> LineGeometry {
    let red = color::from_hex(0xff0000);
    let green = color::from_hex(0x00ff00);
    let blue = color::from_hex(0x0000ff);
    LineGeometry {
        positions: vec![
            Vec3::ZERO,
            Vec3::X * length,
            Vec3::ZERO,
            Vec3::Y * length,
            Vec3::ZERO,
            Vec3::Z * length,
        ],
        colors: vec![red, red, green, green, blue, blue],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_has_flat_faces() {
        let geom = cuboid(Vec3::new(100.0, 100.0, 100.0));
        assert_eq!(geom.positions.len(), 24);
        assert_eq!(geom.triangle_count(), 12);
        for p in &geom.positions {
            assert_eq!(p.abs().max_element(), 50.0);
        }
        // Each triangle's normals agree with its winding.
        for [a, b, c] in &geom.indices {
            let (a, b, c) = (*a as usize, *b as usize, *c as usize);
            let face = (geom.positions[b] - geom.positions[a])
                .cross(geom.positions[c] - geom.positions[a])
                .normalize();
            assert!(face.dot(geom.normals[a]) > 0.99);
        }
    }

    #[test]
    fn ground_plane_points_up() {
        let geom = ground_plane(2000.0, 2000.0);
        assert_eq!(geom.triangle_count(), 2);
        assert!(geom.normals.iter().all(|n| *n == Vec3::Y));
        assert!(geom.positions.iter().all(|p| p.y == 0.0));
    }

    #[test]
    fn grid_spans_the_requested_size() {
        let geom = grid_lines(2000.0, 100);
        assert_eq!(geom.segment_count(), 101 * 2);
        assert_eq!(geom.positions.len(), geom.colors.len());
        for p in &geom.positions {
            assert!(p.x.abs() <= 1000.0 && p.z.abs() <= 1000.0 && p.y == 0.0);
        }
    }

    #[test]
    fn axes_are_three_segments() {
        let geom = axes_lines(100.0);
        assert_eq!(geom.segment_count(), 3);
        assert_eq!(geom.positions[1], Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(geom.positions[3], Vec3::new(0.0, 100.0, 0.0));
        assert_eq!(geom.positions[5], Vec3::new(0.0, 0.0, 100.0));
    }
}
