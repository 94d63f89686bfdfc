#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays a Crystals vs Trucks scenario.
//!
//! By default the scenario is shown in a macroquad window. With `--headless`
//! the replay is advanced with a fixed step and the final frame is printed.

mod report;

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use crystals_vs_trucks_core::WINDOW_TITLE;
use crystals_vs_trucks_rendering::{
    Color, CrystalPresentation, FrameSimulationBreakdown, Presentation, RenderingBackend, Scene,
    TruckPresentation,
};
use crystals_vs_trucks_rendering_macroquad::MacroquadBackend;
use crystals_vs_trucks_system_replay::SimulationContext;
use crystals_vs_trucks_system_scenario::Scenario;
use crystals_vs_trucks_world::query;
use env_logger::Env;

use self::report::FrameReport;

const DEFAULT_SCENARIO: &str = "seed4.sample.txt";

#[derive(Debug, Parser)]
#[command(
    name = "crystals-vs-trucks",
    about = "Replays a Crystals vs Trucks scenario",
    version
)]
struct CliArgs {
    /// Scenario file to replay.
    #[arg(default_value = DEFAULT_SCENARIO)]
    scenario: PathBuf,

    /// Synchronise presentation with the display refresh rate.
    #[arg(long)]
    vsync: bool,

    /// Log frames per second and frame timings once per second.
    #[arg(long)]
    show_fps: bool,

    /// TOML manifest listing the crystal and truck textures.
    #[arg(long, value_name = "MANIFEST")]
    sprites: Option<PathBuf>,

    /// Replay without opening a window and print the final frame.
    #[arg(long)]
    headless: bool,

    /// Clock value, in seconds, at which the headless replay stops.
    #[arg(long, value_name = "SECONDS", default_value = "10", value_parser = parse_seconds)]
    until: Duration,

    /// Clock increment, in seconds, applied per headless frame.
    #[arg(long, value_name = "SECONDS", default_value = "0.1", value_parser = parse_seconds)]
    step: Duration,

    /// Print the headless frame as JSON.
    #[arg(long, requires = "headless")]
    json: bool,
}

/// Entry point for the Crystals vs Trucks command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let scenario = Scenario::from_path(&args.scenario)
        .with_context(|| format!("failed to load scenario {}", args.scenario.display()))?;

    if args.headless {
        log::info!(
            "replaying {} headless until {:.3}s",
            args.scenario.display(),
            args.until.as_secs_f64()
        );
        let report = run_headless(scenario, args.until, args.step)?;
        if args.json {
            let json = serde_json::to_string_pretty(&report)
                .context("failed to serialise frame report")?;
            println!("{json}");
        } else {
            print!("{report}");
        }
        return Ok(());
    }

    run_windowed(scenario, &args)
}

fn run_windowed(scenario: Scenario, args: &CliArgs) -> Result<()> {
    let mut context = SimulationContext::new(scenario);
    let mut scene = Scene::new(context.scenario().dimensions());
    populate_scene(&context, &mut scene);

    let presentation = Presentation::new(WINDOW_TITLE, Color::AMAZON, scene);
    let mut backend = MacroquadBackend::new()
        .with_show_fps(args.show_fps)
        .with_sprite_manifest(args.sprites.clone());
    if args.vsync {
        backend = backend.with_vsync(true);
    }

    backend.run(presentation, move |dt, scene| {
        let simulation_start = Instant::now();
        let _ = context.advance(dt);
        let simulation = simulation_start.elapsed();

        let population_start = Instant::now();
        populate_scene(&context, scene);
        FrameSimulationBreakdown {
            simulation,
            scene_population: population_start.elapsed(),
        }
    })
}

/// Advances the replay in fixed steps until the clock reaches `until`.
fn run_headless(scenario: Scenario, until: Duration, step: Duration) -> Result<FrameReport> {
    ensure!(!step.is_zero(), "headless step must be greater than zero");

    let mut context = SimulationContext::new(scenario);
    while context.clock() < until {
        let remaining = until - context.clock();
        let _ = context.advance(step.min(remaining));
    }

    Ok(FrameReport::capture(&context))
}

fn populate_scene(context: &SimulationContext, scene: &mut Scene) {
    let state = context.state();
    scene.dimensions = query::dimensions(state);
    scene.clock = context.clock();

    scene.crystals.clear();
    scene.crystals.extend(
        query::grid(state)
            .crystals()
            .map(|(cell, count)| CrystalPresentation { cell, count }),
    );

    scene.trucks.clear();
    scene
        .trucks
        .extend(query::trucks(state).iter().map(|truck| TruckPresentation {
            id: truck.id(),
            cell: truck.cell(),
        }));
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|error| format!("`{value}` is not a number of seconds: {error}"))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|error| format!("`{value}` is not a valid duration: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crystals_vs_trucks_core::{CellCoord, TruckId};
    use crystals_vs_trucks_system_scenario::parse;

    const SCENARIO: &str = "\
trucks: 1
width: 3
height: 2
### Grid ###
120
003
### End Grid ###
0.5 MOVE 0 1 0
1.0 DIG 0 1 0
1.5 DIG 0 1 0
2.0 DIG 0 2 1
";

    #[test]
    fn arguments_default_to_the_bundled_sample() {
        let args = CliArgs::try_parse_from(["crystals-vs-trucks"]).expect("defaults should parse");

        assert_eq!(args.scenario, PathBuf::from(DEFAULT_SCENARIO));
        assert!(!args.headless);
        assert!(!args.vsync);
        assert_eq!(args.until, Duration::from_secs(10));
        assert_eq!(args.step, Duration::from_millis(100));
        assert!(args.sprites.is_none());
    }

    #[test]
    fn json_output_requires_headless_mode() {
        assert!(CliArgs::try_parse_from(["crystals-vs-trucks", "--json"]).is_err());

        let args = CliArgs::try_parse_from([
            "crystals-vs-trucks",
            "level.txt",
            "--headless",
            "--json",
            "--until",
            "2.5",
        ])
        .expect("headless json should parse");
        assert!(args.json);
        assert_eq!(args.until, Duration::from_millis(2_500));
    }

    #[test]
    fn seconds_reject_negative_and_non_numeric_values() {
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
        assert_eq!(parse_seconds(" 0.25 "), Ok(Duration::from_millis(250)));
    }

    #[test]
    fn headless_replay_stops_exactly_at_the_requested_clock() {
        let scenario = parse(SCENARIO).expect("scenario should parse");
        let report = run_headless(scenario, Duration::from_millis(1_250), Duration::from_millis(400))
            .expect("headless replay should succeed");

        assert_eq!(report.clock_seconds, 1.25);
        assert_eq!(report.grid, vec![vec![1, 1, 0], vec![0, 0, 3]]);
    }

    #[test]
    fn headless_replay_collects_rejections_of_the_final_frame() {
        let scenario = parse(SCENARIO).expect("scenario should parse");
        let report = run_headless(scenario, Duration::from_secs(3), Duration::from_millis(500))
            .expect("headless replay should succeed");

        assert_eq!(report.grid, vec![vec![1, 0, 0], vec![0, 0, 3]]);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].contains("cannot dig on non current position"));
    }

    #[test]
    fn zero_step_is_rejected() {
        let scenario = parse(SCENARIO).expect("scenario should parse");
        assert!(run_headless(scenario, Duration::from_secs(1), Duration::ZERO).is_err());
    }

    #[test]
    fn scene_mirrors_the_replayed_state() {
        let scenario = parse(SCENARIO).expect("scenario should parse");
        let mut context = SimulationContext::new(scenario);
        let _ = context.advance(Duration::from_millis(1_100));

        let mut scene = Scene::new(context.scenario().dimensions());
        populate_scene(&context, &mut scene);

        assert_eq!(scene.clock, Duration::from_millis(1_100));
        assert_eq!(
            scene.crystals,
            vec![
                CrystalPresentation {
                    cell: CellCoord::new(0, 0),
                    count: 1,
                },
                CrystalPresentation {
                    cell: CellCoord::new(1, 0),
                    count: 1,
                },
                CrystalPresentation {
                    cell: CellCoord::new(2, 1),
                    count: 3,
                },
            ]
        );
        assert_eq!(
            scene.trucks,
            vec![TruckPresentation {
                id: TruckId::new(0),
                cell: CellCoord::new(1, 0),
            }]
        );
    }
}
