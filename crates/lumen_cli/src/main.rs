use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lumen_core::{Scene, SphereInfo};
use lumen_renderer::{Engine, EngineConfig, Key, RenderMode, RenderTask};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;

/// Run the interactive path tracer without a window.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image width in pixels
    #[arg(long, default_value_t = 1000)]
    width: u32,

    /// Image height in pixels (defaults to a 16:9 frame)
    #[arg(long)]
    height: Option<u32>,

    /// Render mode: 0 tiled, 1 single-threaded, 2 seeded
    #[arg(short, long, default_value_t = 2)]
    mode: u32,

    /// Frames to render
    #[arg(short, long, default_value_t = 30)]
    frames: u32,

    /// Samples per pixel
    #[arg(short, long, default_value_t = 1)]
    samples: u32,

    /// Disable temporal accumulation in seeded mode
    #[arg(long)]
    no_accumulate: bool,

    /// Worker threads (defaults to the number of logical CPUs)
    #[arg(short = 't', long)]
    workers: Option<usize>,

    /// Keys held down on every frame
    #[arg(long, value_enum, value_delimiter = ',')]
    drive: Vec<DriveKey>,

    /// Print the scene and tile layout as JSON and exit
    #[arg(long)]
    inspect: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DriveKey {
    Forward,
    Back,
    Left,
    Right,
}

impl From<DriveKey> for Key {
    fn from(key: DriveKey) -> Self {
        match key {
            DriveKey::Forward => Key::Forward,
            DriveKey::Back => Key::Back,
            DriveKey::Left => Key::Left,
            DriveKey::Right => Key::Right,
        }
    }
}

impl Args {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mode = RenderMode::try_from(self.mode)?;
        let height = match self.height {
            Some(height) => height,
            None => u32::try_from(u64::from(self.width) * 9 / 16).context("Default height out of range")?,
        };
        Ok(EngineConfig {
            width: self.width,
            height,
            samples_per_pixel: self.samples.max(1),
            accumulate: !self.no_accumulate,
            workers: self.workers,
            mode,
        })
    }
}

#[derive(Serialize)]
struct Inspection<'a> {
    scene: &'a str,
    controlled: Option<usize>,
    spheres: Vec<SphereInfo>,
    workers: usize,
    tasks: &'a [RenderTask],
}

fn inspect(engine: &Engine) -> Result<()> {
    let report = Inspection {
        scene: &engine.scene().name,
        controlled: engine.scene().controlled(),
        spheres: engine.scene().sphere_infos(),
        workers: engine.scheduler().thread_count(),
        tasks: engine.scheduler().tasks(),
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize inspection")?;
    println!("{}", json);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.engine_config()?;

    log::info!("Starting lumen");

    let mut engine = Engine::new(config, Scene::default_scene()).context("Failed to start engine")?;

    if args.inspect {
        return inspect(&engine);
    }

    log::info!(
        "{} workers, {} tiles per frame",
        engine.scheduler().thread_count(),
        engine.scheduler().tasks().len()
    );

    let keys: HashSet<Key> = args.drive.iter().map(|k| Key::from(*k)).collect();
    let start = Instant::now();
    let mut last_frame_time = start;

    for frame in 0..args.frames {
        let now = Instant::now();
        let dt = now.duration_since(last_frame_time).as_secs_f32();
        last_frame_time = now;

        engine.update(dt, &keys);
        engine
            .render_frame()
            .with_context(|| format!("Failed to render frame {}", frame))?;
    }

    let elapsed = start.elapsed();
    let fps = args.frames as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    log::info!(
        "Rendered {} frames in {:.2?} ({:.1} fps), {} accumulated",
        args.frames,
        elapsed,
        fps,
        engine.frame_count()
    );

    Ok(())
}
