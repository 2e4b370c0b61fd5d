//! Teapot viewer demo
//!
//! Builds a procedural scene, runs a scripted interaction session against a
//! headless driver and logs what every frame drew.
//!
//! Usage: `teapot_viewer [config.toml|config.ron]`

mod console_driver;

use std::sync::Arc;

use teapot_core::config::ConfigError;
use teapot_core::foundation::logging;
use teapot_core::foundation::math::rotation_deg;
use teapot_core::prelude::*;

use console_driver::ConsoleDriver;

/// Demo application errors
#[derive(thiserror::Error, Debug)]
enum AppError {
    /// Configuration could not be loaded or is invalid
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// The driver rejected a frame
    #[error("rendering: {0}")]
    Render(#[from] RenderError),
}

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const ANIMATION_FRAMES: usize = 36;

fn load_config() -> Result<ViewerConfig, ConfigError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {path}");
            ViewerConfig::load_from_file(&path)?
        }
        None => ViewerConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn build_scene(config: &ViewerConfig) -> Scene {
    let mut scene = Scene::with_config(config.spatial);

    for i in 0..5_u8 {
        for j in 0..5_u8 {
            let center = Vec3::new(f32::from(i) * 2.0 - 4.0, 0.0, f32::from(j) * 2.0 - 4.0);
            scene.insert_node(primitives::cube(center, 1.0, Material::white()));
        }
    }

    let glass = Material::solid(Color::new(0.3, 0.5, 1.0, 0.4));
    scene.insert_node(primitives::quad(
        Vec3::new(-5.0, -0.5, 5.5),
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(0.0, 3.0, 0.0),
        Arc::clone(&glass),
    ));

    let spin: Vec<Mat4> = (0..ANIMATION_FRAMES)
        .map(|k| rotation_deg(&Vec3::y(), 360.0 * k as f32 / ANIMATION_FRAMES as f32))
        .collect();
    scene.insert_node(
        GroupNode::with_animation(spin).with_children([primitives::cube(Vec3::new(3.0, 2.0, 0.0), 0.8, Material::red())]),
    );

    let ring: Vec<Vec3> = (0..=24)
        .map(|k| {
            let a = std::f32::consts::TAU * k as f32 / 24.0;
            Vec3::new(6.0 * a.cos(), 0.6, 6.0 * a.sin())
        })
        .collect();
    scene.insert_node(primitives::polyline(&ring, Material::green()));

    scene
}

fn log_stats(label: &str, stats: &FrameStats) {
    log::info!(
        "{label}: {} draws, {} shadow, {} outline, {} translucent, {} culled",
        stats.draw_calls,
        stats.shadow_draws,
        stats.outline_draws,
        stats.translucent,
        stats.culled_tree_nodes + stats.culled_nodes + stats.culled_batches
    );
}

fn run() -> Result<(), AppError> {
    let config = load_config()?;
    let scene = build_scene(&config);
    log::info!(
        "Scene: {} nodes, tree depth {}",
        scene.len(),
        scene.tree().map_or(0, AabbTree::depth)
    );

    let mut viewport = Viewport::new(ConsoleDriver::new(WIDTH, HEIGHT), config);
    viewport.set_scene(scene, None);
    log_stats("Initial view", &viewport.draw_scene()?);

    let (cx, cy) = (WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0);
    if let Some(hit) = viewport.on_mouse_down(MouseButtons::LEFT, cx, cy) {
        log::info!("Selected {:?} at {:?}", hit.path, hit.point);
    }
    viewport.on_mouse_move(MouseButtons::LEFT, cx + 60.0, cy - 30.0);
    viewport.on_mouse_up(MouseButtons::LEFT, cx + 60.0, cy - 30.0);
    log_stats("Orbited", &viewport.draw_scene()?);

    viewport.on_mouse_down(MouseButtons::RIGHT, cx, cy);
    viewport.on_mouse_move(MouseButtons::RIGHT, cx - 40.0, cy);
    viewport.on_mouse_up(MouseButtons::RIGHT, cx - 40.0, cy);
    viewport.on_wheel(-120);
    for _ in 0..3 {
        viewport.on_key(Key::Forward);
    }
    log_stats("Panned and zoomed", &viewport.draw_scene()?);

    viewport.set_mode(ViewMode::ORTHO, true);
    log_stats("Orthographic", &viewport.draw_scene()?);
    viewport.set_mode(ViewMode::ORTHO, false);

    for _ in 0..ANIMATION_FRAMES / 4 {
        viewport.animate();
        viewport.draw_scene()?;
    }
    log_stats("Animated", &viewport.last_stats());
    log::info!("Rendered {} frames", viewport.driver().frames());
    Ok(())
}

fn main() {
    logging::init();
    log::info!("Starting teapot viewer");

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
