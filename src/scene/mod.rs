//! Everything related to the scene tree.

pub use self::geometry::{
    axes_lines, cuboid, grid_lines, ground_plane, LineGeometry, TriGeometry,
};
pub use self::material::Material;
pub use self::node::{NodeKind, Nodes, SceneNode};

pub mod geometry;
mod material;
mod node;
