//! The content hook.

use glamx::Vec3;

use crate::scene::SceneNode;

/// What the host shows inside its rig.
///
/// [`populate`](SceneContent::populate) is invoked exactly once per
/// activation, after the rig (lights, helpers, ground) is in place and before
/// the first frame. Implementations add their nodes under the given root.
pub trait SceneContent {
    fn populate(&self, scene: &mut SceneNode);
}

/// A single 100×100×100 box resting on the ground at the origin, casting and
/// receiving shadows.
pub struct ShadowedBox;

impl SceneContent for ShadowedBox {
    fn populate(&self, scene: &mut SceneNode) {
        scene
            .add_cube("box", 100.0, 100.0, 100.0)
            .translate(Vec3::new(0.0, 50.0, 0.0))
            .set_shadows(true, true);
    }
}

/// A single 100×100×100 box centered at the origin, no shadows.
pub struct PlainBox;

impl SceneContent for PlainBox {
    fn populate(&self, scene: &mut SceneNode) {
        scene.add_cube("box", 100.0, 100.0, 100.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeKind;

    #[test]
    fn shadowed_box_rests_on_the_ground() {
        let mut root = SceneNode::group("root");
        ShadowedBox.populate(&mut root);

        let node = root.find("box").unwrap();
        assert_eq!(node.local_transform().translation, Vec3::new(0.0, 50.0, 0.0));
        match node.kind() {
            NodeKind::Mesh {
                cast_shadow,
                receive_shadow,
                ..
            } => assert!(*cast_shadow && *receive_shadow),
            _ => unreachable!(),
        }
    }

    #[test]
    fn plain_box_sits_at_the_origin_without_shadows() {
        let mut root = SceneNode::group("root");
        PlainBox.populate(&mut root);

        let node = root.find("box").unwrap();
        assert_eq!(node.local_transform().translation, Vec3::ZERO);
        match node.kind() {
            NodeKind::Mesh {
                cast_shadow,
                receive_shadow,
                ..
            } => assert!(!*cast_shadow && !*receive_shadow),
            _ => unreachable!(),
        }
    }
}
