//! The stock demo: one shadowed box on the ground rig.
//!
//! Pass `--direct` to skip the FXAA pass, or `--plain` for the box variant
//! without shadows.

use stagekit::prelude::*;

fn main() {
    env_logger::init();

    let mut mode = RenderMode::AntiAliased;
    let mut plain = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--direct" => mode = RenderMode::Direct,
            "--plain" => plain = true,
            other => {
                eprintln!("unknown option: {other}");
                eprintln!("usage: box_scene [--direct] [--plain]");
                std::process::exit(2);
            }
        }
    }

    let viewer = Viewer::new("stagekit: box scene").with_size(1024, 768);
    if plain {
        viewer.run(mode, PlainBox);
    } else {
        viewer.run(mode, ShadowedBox);
    }
}
