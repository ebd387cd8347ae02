//! Eden Renderer Demo Viewer
//!
//! Orbits a small scene of textured cubes above the editor grid, with an
//! overlay panel for tweaking it. Left click picks a cube.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p eden-viewer -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--mesh <PATH>`: ASCII mesh to place in the middle of the scene
//! - `--texture <NAME>`: Texture bound before drawing the cubes
//! - `--assets <DIR>`: Extra directory searched for shaders, meshes and textures
//! - `--fps <N>`: Frame rate cap (default: 120, 0 for unlimited)
//! - `-h, --help`: Print help message
//!
//! ## Controls
//!
//! - Right mouse drag: orbit
//! - Mouse wheel: zoom
//! - Left click: select the cube under the cursor
//! - Escape: quit
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod app;

use eden_app::{run_app, AppConfig};

use crate::app::{Viewer, ViewerArgs};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    let args = ViewerArgs::from_args();
    let mut config = AppConfig::new("Eden Renderer - Demo")
        .with_size(WIDTH, HEIGHT)
        .with_fps_cap(args.target_fps);
    if let Some(root) = &args.asset_root {
        config = config.with_asset_root(root.clone());
    }

    run_app::<Viewer>(config)
}

fn print_help() {
    eprintln!(
        "Eden Renderer Demo Viewer

USAGE:
    cargo run -p eden-viewer -- [OPTIONS]

OPTIONS:
    --mesh <PATH>       ASCII mesh to place in the middle of the scene
    --texture <NAME>    Texture bound before drawing the cubes
    --assets <DIR>      Extra directory searched for shaders, meshes and textures
    --fps <N>           Frame rate cap (default: 120, 0 for unlimited)
    -h, --help          Print this help message

CONTROLS:
    Right mouse drag    Orbit the camera
    Mouse wheel         Zoom
    Left click          Select the cube under the cursor
    Escape              Quit

ENVIRONMENT VARIABLES:
    RUST_LOG            Set log level (e.g., info, debug, trace)"
    );
}
