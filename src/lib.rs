/*!
# stagekit

Minimal scene-host scaffolding over wgpu.

**stagekit** assembles the boring 90% of a small 3D viewer once and leaves
you exactly one hook to fill in: the content. The rig is a retained scene
graph pre-populated with a ground plane, a grid, hidden axes and a
three-light rig, plus an orbit camera with sane constraints. The render
pipeline is either a direct forward pass or a forward pass composed with an
FXAA post pass.

```no_run
use stagekit::prelude::*;

fn main() {
    env_logger::init();
    Viewer::new("stagekit: box").run(RenderMode::AntiAliased, ShadowedBox);
}
```

Content is anything implementing [`SceneContent`]:

```
use stagekit::prelude::*;

struct TwoBoxes;

impl SceneContent for TwoBoxes {
    fn populate(&self, scene: &mut SceneNode) {
        scene.add_cube("left", 80.0, 80.0, 80.0).translate(Vec3::new(-120.0, 40.0, 0.0));
        scene.add_cube("right", 80.0, 80.0, 80.0).translate(Vec3::new(120.0, 40.0, 0.0));
    }
}
```

The hook runs exactly once, after the rig is built and before the first frame.
Deactivating the host cancels the render loop through a real handle; the loop
does not keep spinning after teardown.
*/
#![allow(clippy::too_many_arguments)]

pub use glamx;

pub mod camera;
pub mod color;
pub mod content;
pub mod event;
pub mod host;
pub mod light;
pub mod pipeline;
pub mod scene;
pub mod viewport;
pub mod window;

pub mod prelude {
    pub use crate::camera::*;
    pub use crate::color::*;
    pub use crate::content::*;
    pub use crate::event::*;
    pub use crate::host::*;
    pub use crate::light::*;
    pub use crate::pipeline::*;
    pub use crate::scene::*;
    pub use crate::viewport::Viewport;
    pub use crate::window::Viewer;
    pub use glamx::{Mat4, Pose3, Quat, Vec2, Vec3};
}
