//! The owned scene tree.

use glamx::{Mat4, Pose3, Vec3};

use crate::color::{self, Color};
use crate::light::Light;
use crate::scene::geometry::{self, LineGeometry, TriGeometry};
use crate::scene::material::Material;

/// What a node contributes to the frame.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Pure grouping; only composes its transform onto its children.
    Group,
    /// Renderable triangle geometry.
    Mesh {
        geometry: TriGeometry,
        material: Material,
        cast_shadow: bool,
        receive_shadow: bool,
    },
    /// Renderable line segments, alpha-blended at `opacity`.
    Lines {
        geometry: LineGeometry,
        opacity: f32,
    },
    /// A light source. Directional lights shine from the node's world
    /// position toward the origin.
    Light(Light),
}

/// A named node of the scene tree.
///
/// Nodes own their children; the tree is built once through the `add_*`
/// methods and then only traversed. Transforms compose parent-to-child during
/// [`SceneNode::visit_world`].
#[derive(Clone, Debug)]
pub struct SceneNode {
    name: String,
    pub visible: bool,
    local: Pose3,
    scale: Vec3,
    kind: NodeKind,
    children: Vec<SceneNode>,
}

impl SceneNode {
    /// An empty, visible group node. The host uses this as the tree root.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            local: Pose3::IDENTITY,
            scale: Vec3::ONE,
            kind: NodeKind::Group,
            children: Vec::new(),
        }
    }

    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        let mut node = Self::group(name);
        node.kind = kind;
        node
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn local_transform(&self) -> Pose3 {
        self.local
    }

    #[inline]
    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    /// Translates the node by `t` in its parent's space.
    pub fn translate(&mut self, t: Vec3) -> &mut Self {
        self.local.translation += t;
        self
    }

    /// Replaces the node's local transform.
    pub fn set_local_transform(&mut self, transform: Pose3) -> &mut Self {
        self.local = transform;
        self
    }

    /// Multiplies the node's local scale.
    pub fn scale_by(&mut self, scale: Vec3) -> &mut Self {
        self.scale *= scale;
        self
    }

    pub fn set_visible(&mut self, visible: bool) -> &mut Self {
        self.visible = visible;
        self
    }

    /// Replaces the surface color of a `Standard` mesh; no-op on anything
    /// else.
    pub fn set_color(&mut self, c: Color) -> &mut Self {
        if let NodeKind::Mesh {
            material: Material::Standard { ref mut color },
            ..
        } = self.kind
        {
            *color = c;
        }
        self
    }

    /// Sets both shadow flags of a mesh node; no-op on anything else.
    pub fn set_shadows(&mut self, cast: bool, receive: bool) -> &mut Self {
        if let NodeKind::Mesh {
            ref mut cast_shadow,
            ref mut receive_shadow,
            ..
        } = self.kind
        {
            *cast_shadow = cast;
            *receive_shadow = receive;
        }
        self
    }

    fn add(&mut self, node: SceneNode) -> &mut SceneNode {
        self.children.push(node);
        self.children.last_mut().unwrap()
    }

    /// Adds an empty child group.
    pub fn add_group(&mut self, name: impl Into<String>) -> &mut SceneNode {
        self.add(Self::group(name))
    }

    /// Adds a box mesh with the given full extents, white standard material,
    /// shadow flags off.
    pub fn add_cube(&mut self, name: impl Into<String>, wx: f32, wy: f32, wz: f32) -> &mut SceneNode {
        self.add(Self::with_kind(
            name,
            NodeKind::Mesh {
                geometry: geometry::cuboid(Vec3::new(wx, wy, wz)),
                material: Material::Standard {
                    color: color::WHITE,
                },
                cast_shadow: false,
                receive_shadow: false,
            },
        ))
    }

    /// Adds a shadow-catching ground rectangle on the XZ plane. It receives
    /// shadows but never casts them.
    pub fn add_ground_plane(
        &mut self,
        name: impl Into<String>,
        width: f32,
        depth: f32,
        opacity: f32,
    ) -> &mut SceneNode {
        self.add(Self::with_kind(
            name,
            NodeKind::Mesh {
                geometry: geometry::ground_plane(width, depth),
                material: Material::ShadowCatcher { opacity },
                cast_shadow: false,
                receive_shadow: true,
            },
        ))
    }

    /// Adds a square XZ grid.
    pub fn add_grid(
        &mut self,
        name: impl Into<String>,
        size: f32,
        divisions: u32,
        opacity: f32,
    ) -> &mut SceneNode {
        self.add(Self::with_kind(
            name,
            NodeKind::Lines {
                geometry: geometry::grid_lines(size, divisions),
                opacity,
            },
        ))
    }

    /// Adds the coordinate-axes helper.
    pub fn add_axes(&mut self, name: impl Into<String>, length: f32) -> &mut SceneNode {
        self.add(Self::with_kind(
            name,
            NodeKind::Lines {
                geometry: geometry::axes_lines(length),
                opacity: 1.0,
            },
        ))
    }

    /// Adds a light at the node-local position stored in the light itself.
    pub fn add_light(&mut self, name: impl Into<String>, light: Light) -> &mut SceneNode {
        let position = light.position;
        let node = self.add(Self::with_kind(name, NodeKind::Light(light)));
        node.translate(position);
        node
    }

    /// Depth-first traversal with composed world transforms. Invisible
    /// subtrees are skipped entirely.
    pub fn visit_world<F: FnMut(&SceneNode, Pose3, Vec3)>(&self, f: &mut F) {
        self.do_visit_world(Pose3::IDENTITY, Vec3::ONE, f);
    }

    fn do_visit_world<F: FnMut(&SceneNode, Pose3, Vec3)>(
        &self,
        parent: Pose3,
        parent_scale: Vec3,
        f: &mut F,
    ) {
        if !self.visible {
            return;
        }
        let world = parent * self.local;
        let scale = parent_scale * self.scale;
        f(self, world, scale);
        for child in &self.children {
            child.do_visit_world(world, scale, f);
        }
    }

    /// The model matrix for a world pose and scale produced by
    /// [`SceneNode::visit_world`].
    pub fn model_matrix(world: Pose3, scale: Vec3) -> Mat4 {
        Mat4::from_scale_rotation_translation(scale, world.rotation, world.translation)
    }

    /// Depth-first iterator over this node and all descendants, visible or
    /// not.
    pub fn iter(&self) -> Nodes<'_> {
        Nodes { stack: vec![self] }
    }

    /// The first node (in depth-first order) with the given name.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.iter().find(|n| n.name == name)
    }

    /// Mutable name lookup.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        if self.name == name {
            return Some(self);
        }
        for child in &mut self.children {
            if let Some(found) = child.find_mut(name) {
                return Some(found);
            }
        }
        None
    }
}

/// Depth-first iterator over a scene tree. See [`SceneNode::iter`].
pub struct Nodes<'a> {
    stack: Vec<&'a SceneNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a SceneNode;

    fn next(&mut self) -> Option<&'a SceneNode> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_compose_parent_to_child() {
        let mut root = SceneNode::group("root");
        let group = root.add_group("lift");
        group.translate(Vec3::new(0.0, 100.0, 0.0));
        group
            .add_cube("box", 10.0, 10.0, 10.0)
            .translate(Vec3::new(5.0, 0.0, 0.0));

        let mut world_of_box = None;
        root.visit_world(&mut |node, world, _| {
            if node.name() == "box" {
                world_of_box = Some(world.translation);
            }
        });
        assert_eq!(world_of_box, Some(Vec3::new(5.0, 100.0, 0.0)));
    }

    #[test]
    fn invisible_subtrees_are_skipped_by_visit_but_not_iter() {
        let mut root = SceneNode::group("root");
        root.add_group("hidden")
            .set_visible(false)
            .add_cube("inner", 1.0, 1.0, 1.0);

        let mut visited = 0;
        root.visit_world(&mut |_, _, _| visited += 1);
        assert_eq!(visited, 1);
        assert_eq!(root.iter().count(), 3);
    }

    #[test]
    fn find_walks_depth_first() {
        let mut root = SceneNode::group("root");
        root.add_group("a").add_cube("target", 1.0, 1.0, 1.0);
        root.add_group("target");

        let found = root.find("target").unwrap();
        assert!(matches!(found.kind(), NodeKind::Mesh { .. }));
        root.find_mut("a").unwrap().set_visible(false);
        assert!(!root.find("a").unwrap().visible);
    }

    #[test]
    fn shadow_flags_only_touch_meshes() {
        let mut root = SceneNode::group("root");
        root.add_grid("grid", 100.0, 10, 0.1).set_shadows(true, true);
        root.add_cube("box", 1.0, 1.0, 1.0).set_shadows(true, true);

        match root.find("box").unwrap().kind() {
            NodeKind::Mesh {
                cast_shadow,
                receive_shadow,
                ..
            } => assert!(*cast_shadow && *receive_shadow),
            _ => unreachable!(),
        }
        assert!(matches!(
            root.find("grid").unwrap().kind(),
            NodeKind::Lines { .. }
        ));
    }
}
