#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Crystals vs Trucks.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature.
//!
//! Textures are optional. When no sprite manifest is configured the backend
//! draws crystals and trucks as primitive shapes at the same anchors the
//! sprites would use.

mod sprites;

use anyhow::{Context, Result};
use crystals_vs_trucks_rendering::{
    FrameSimulationBreakdown, Presentation, RenderingBackend, Scene, ScreenLayout, SpriteInstance,
    SpriteKey,
};
use glam::Vec2;
use macroquad::{
    color::{Color as MacroquadColor, BLACK},
    input::{is_key_pressed, KeyCode},
};
use std::{
    fmt,
    path::PathBuf,
    sync::mpsc,
    time::{Duration, Instant},
};

use self::sprites::SpriteAtlas;

const CRYSTAL_BLUE: MacroquadColor = MacroquadColor::new(0.18, 0.45, 0.95, 1.0);
const CRYSTAL_RED: MacroquadColor = MacroquadColor::new(0.86, 0.16, 0.2, 1.0);
const TRUCK_BODY: MacroquadColor = MacroquadColor::new(0.96, 0.76, 0.03, 1.0);

/// Snapshot of edge-triggered keyboard shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Q` or `Escape` to quit the replay loop.
    quit_requested: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            quit_requested: is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q),
        }
    }
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug, Default)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
    sprite_manifest: Option<PathBuf>,
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend logs frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    /// Loads textures from the provided sprite manifest instead of drawing shapes.
    #[must_use]
    pub fn with_sprite_manifest(mut self, manifest: Option<PathBuf>) -> Self {
        self.sprite_manifest = manifest;
        self
    }
}

/// Frame timings averaged over roughly one second of wall-clock frames.
#[derive(Debug, Default)]
struct FpsCounter {
    window: Duration,
    frames: u32,
    outside_render: FrameSimulationBreakdown,
    render: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FpsReport {
    frames_per_second: f64,
    simulation: Duration,
    scene_population: Duration,
    render: Duration,
}

impl FpsCounter {
    /// Records one frame and returns a report whenever a full second has been covered.
    fn record(
        &mut self,
        frame: Duration,
        outside_render: FrameSimulationBreakdown,
        render: Duration,
    ) -> Option<FpsReport> {
        self.window += frame;
        self.frames += 1;
        self.outside_render.simulation += outside_render.simulation;
        self.outside_render.scene_population += outside_render.scene_population;
        self.render += render;

        if self.window < Duration::from_secs(1) {
            return None;
        }

        let counted = std::mem::take(self);
        Some(FpsReport {
            frames_per_second: f64::from(counted.frames) / counted.window.as_secs_f64(),
            simulation: counted.outside_render.simulation / counted.frames,
            scene_population: counted.outside_render.scene_population / counted.frames,
            render: counted.render / counted.frames,
        })
    }
}

impl fmt::Display for FpsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = |duration: Duration| duration.as_secs_f64() * 1_000.0;
        write!(
            f,
            "{:.1} fps, replay {:.2}ms, scene {:.2}ms, draw {:.2}ms",
            self.frames_per_second,
            millis(self.simulation),
            millis(self.scene_population),
            millis(self.render)
        )
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, &mut Scene) -> FrameSimulationBreakdown + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
            sprite_manifest,
        } = self;

        let Presentation {
            window_title,
            screen_width,
            screen_height,
            clear_color,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: i32::try_from(screen_width).context("window width exceeds i32")?,
            window_height: i32::try_from(screen_height).context("window height exceeds i32")?,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        let (atlas_init_sender, atlas_init_receiver) = mpsc::channel::<Result<()>>();

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let sprite_atlas = match sprite_manifest.map(|path| SpriteAtlas::load(&path)).transpose() {
                Ok(atlas) => atlas,
                Err(error) => {
                    let _ = atlas_init_sender.send(Err(error));
                    return;
                }
            };
            if sprite_atlas.is_none() {
                log::info!("no sprite manifest configured, drawing primitive shapes");
            }
            let _ = atlas_init_sender.send(Ok(()));

            let background = to_macroquad_color(clear_color);
            let mut fps_counter = FpsCounter::default();

            loop {
                if KeyboardShortcuts::poll().quit_requested {
                    break;
                }

                macroquad::window::clear_background(background);

                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));
                let simulation_breakdown = update_scene(frame_dt, &mut scene);

                let render_start = Instant::now();
                let screen_width = macroquad::window::screen_width().max(0.0) as u32;
                let screen_height = macroquad::window::screen_height().max(0.0) as u32;
                match ScreenLayout::new(screen_width, screen_height, scene.dimensions) {
                    Ok(layout) => {
                        for sprite in scene.sprites(&layout) {
                            draw_sprite(sprite, &layout, sprite_atlas.as_ref());
                        }
                    }
                    Err(error) => log::error!("skipping frame: {error}"),
                }
                let render_duration = render_start.elapsed();

                if show_fps {
                    if let Some(report) =
                        fps_counter.record(frame_dt, simulation_breakdown, render_duration)
                    {
                        log::info!("{report}");
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        atlas_init_receiver.recv().unwrap_or_else(|_| Ok(()))?;

        Ok(())
    }
}

fn draw_sprite(sprite: SpriteInstance, layout: &ScreenLayout, atlas: Option<&SpriteAtlas>) {
    let anchor = sprite.anchor.as_vec2();
    if let Some(atlas) = atlas {
        atlas.draw(sprite.key, anchor);
        return;
    }

    let cell = Vec2::new(layout.cell_width() as f32, layout.cell_height() as f32);
    let (size, color) = primitive_shape(sprite.key, cell);
    let top_left = sprites::sprite_top_left(anchor, size);
    match sprite.key {
        SpriteKey::CrystalBlue | SpriteKey::CrystalRed => {
            let radius = size.min_element() * 0.5;
            macroquad::shapes::draw_circle(
                top_left.x + size.x * 0.5,
                top_left.y + size.y * 0.5,
                radius,
                color,
            );
        }
        SpriteKey::Truck => {
            macroquad::shapes::draw_rectangle(top_left.x, top_left.y, size.x, size.y, color);
            macroquad::shapes::draw_rectangle_lines(top_left.x, top_left.y, size.x, size.y, 2.0, BLACK);
        }
    }
}

/// Size and colour of the shape drawn in place of a missing texture.
fn primitive_shape(key: SpriteKey, cell: Vec2) -> (Vec2, MacroquadColor) {
    let base = cell.min_element() * 0.4;
    match key {
        SpriteKey::CrystalBlue => (Vec2::splat(base), CRYSTAL_BLUE),
        SpriteKey::CrystalRed => (Vec2::splat(base), CRYSTAL_RED),
        SpriteKey::Truck => (Vec2::new(base * 1.5, base * 0.75), TRUCK_BODY),
    }
}

fn to_macroquad_color(color: crystals_vs_trucks_rendering::Color) -> MacroquadColor {
    MacroquadColor::new(color.red, color.green, color.blue, color.alpha)
}
