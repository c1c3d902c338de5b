//! Headless sandbox
//!
//! Builds the standard sandbox scene and runs it for a fixed amount of
//! simulated time, logging step statistics once per simulated second.
//!
//! Usage: `sandbox_headless [config.toml|config.ron] [seconds]`

use rigid_engine::config::{Config, ConfigError, PhysicsConfig};
use rigid_engine::foundation::logging;
use rigid_engine::foundation::time::{FixedTimestep, Stopwatch, Timer};
use rigid_engine::physics::{PhysicsError, Scene, StepStats};
use rigid_engine::scenes;

/// Frame time fed to the accumulator; the sandbox pretends to run at 60 Hz
const FRAME_TIME: f32 = 1.0 / 60.0;

const DEFAULT_SECONDS: f32 = 10.0;

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error("invalid argument '{0}': expected a duration in seconds")]
    Duration(String),
}

struct SandboxApp {
    scene: Scene,
    timestep: FixedTimestep,
    duration: f32,
    simulated: f32,
    slowest_step_ms: f32,
}

impl SandboxApp {
    fn new(config: &PhysicsConfig, duration: f32) -> Result<Self, AppError> {
        log::info!("Building sandbox scene for {duration:.1}s of simulation...");
        let scene = scenes::sandbox(&config.simulation)?;

        Ok(Self {
            scene,
            timestep: config.stepper.timestep(),
            duration,
            simulated: 0.0,
            slowest_step_ms: 0.0,
        })
    }

    fn run(&mut self) {
        let mut timer = Timer::new();
        let mut next_report = 1.0;
        let mut totals = StepStats::default();

        while self.simulated < self.duration {
            timer.update();

            for _ in 0..self.timestep.advance(FRAME_TIME) {
                let stats = self.step();
                totals.ballistic_contacts += stats.ballistic_contacts;
                totals.dropped_contacts += stats.dropped_contacts;
            }

            if self.simulated >= next_report {
                let stats = self.scene.last_stats();
                log::info!(
                    "t = {:.1}s: {} pairs, {} resting, {} manifolds, {} ballistic so far",
                    self.simulated,
                    stats.candidate_pairs,
                    stats.resting_contacts,
                    stats.manifolds,
                    totals.ballistic_contacts
                );
                next_report += 1.0;
            }
        }

        timer.update();
        log::info!(
            "Simulated {:.1}s in {:.2}s wall time over {} frames (slowest step {:.2} ms)",
            self.simulated,
            timer.total_time(),
            timer.frame_count(),
            self.slowest_step_ms
        );
        if totals.dropped_contacts > 0 {
            log::warn!("{} ballistic contacts were dropped", totals.dropped_contacts);
        }
        self.log_bodies();
    }

    fn step(&mut self) -> StepStats {
        let mut stopwatch = Stopwatch::start_new();
        let stats = self.scene.update(self.timestep.step());
        stopwatch.stop();

        self.slowest_step_ms = self.slowest_step_ms.max(stopwatch.elapsed_millis());
        self.simulated += self.timestep.step();
        stats
    }

    fn log_bodies(&self) {
        for (handle, body) in self.scene.bodies().iter().enumerate() {
            if body.is_static() {
                continue;
            }
            let transform = body.transform();
            log::debug!(
                "body {handle}: position [{:.3}, {:.3}, {:.3}], rotated {:.1}°, speed {:.3}",
                transform.position.x,
                transform.position.y,
                transform.position.z,
                transform.rotation.angle().to_degrees(),
                body.linear_velocity.norm()
            );
        }
    }
}

fn parse_args() -> Result<(PhysicsConfig, f32), AppError> {
    let mut args = std::env::args().skip(1);

    let config = match args.next() {
        Some(path) => {
            log::info!("Loading configuration from {path}");
            PhysicsConfig::load_from_file(&path)?
        }
        None => PhysicsConfig::default(),
    };
    config.validate()?;

    let duration = match args.next() {
        Some(text) => match text.parse::<f32>() {
            Ok(seconds) if seconds.is_finite() && seconds > 0.0 => seconds,
            _ => return Err(AppError::Duration(text)),
        },
        None => DEFAULT_SECONDS,
    };

    Ok((config, duration))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default_filter("info");
    log::info!("Starting headless sandbox");

    let (config, duration) = parse_args().inspect_err(|e| log::error!("{e}"))?;

    let mut app = SandboxApp::new(&config, duration).inspect_err(|e| log::error!("Setup failed: {e}"))?;
    app.run();

    log::info!("Sandbox finished");
    Ok(())
}
