mod scenes;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use scenes::DemoScene;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use umbra_renderer::{BvhSettings, Frame, FrameStats, MarchSettings, RenderSettings};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Offline path tracer
#[derive(Debug, Parser)]
#[command(name = "umbra", version, about)]
struct Args {
    /// Demo scene to render
    #[arg(value_enum, default_value = "default")]
    scene: DemoScene,

    /// Output image; the format follows the extension
    #[arg(short, long, default_value = "umbra.png")]
    output: PathBuf,

    /// JSON file with render, march and bvh settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Maximum samples per pixel
    #[arg(short, long)]
    samples: Option<u32>,

    /// Maximum bounce depth
    #[arg(short, long)]
    depth: Option<u32>,

    /// Worker threads (default: twice the available cores)
    #[arg(short, long)]
    workers: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Stop sampling a pixel once its noise drops below this
    #[arg(long)]
    tolerance: Option<f32>,

    /// Progress report interval in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    /// List the demo scenes and exit
    #[arg(long)]
    list: bool,

    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

/// Settings file layout. Every section is optional.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Config {
    render: RenderSettings,
    march: MarchSettings,
    bvh: BvhSettings,
}

impl Config {
    fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    fn validate(&self) -> Result<()> {
        self.render.validate().context("Invalid render settings")?;
        self.march.validate().context("Invalid march settings")?;
        Ok(())
    }

    /// Command-line values win over the file.
    fn apply(&mut self, args: &Args) {
        let render = &mut self.render;
        if let Some(width) = args.width {
            render.width = width;
        }
        if let Some(height) = args.height {
            render.height = height;
        }
        if let Some(samples) = args.samples {
            render.samples = samples;
        }
        if let Some(depth) = args.depth {
            render.max_depth = depth;
        }
        if let Some(workers) = args.workers {
            render.workers = workers;
        }
        if let Some(seed) = args.seed {
            render.seed = seed;
        }
        if let Some(tolerance) = args.tolerance {
            render.color_tolerance = tolerance;
        }
    }
}

fn report(stats: &FrameStats) {
    let eta = stats
        .time_to_finish
        .map_or_else(|| "?".to_string(), |t| format!("{:.1}s", t.as_secs_f32()));
    log::info!(
        "{:5.1}% | {}/{} jobs, {} active | elapsed {:.1}s, eta {} | {:.2} Mrays/s",
        stats.progress * 100.0,
        stats.completed_jobs,
        stats.total_jobs,
        stats.active_jobs,
        stats.elapsed.as_secs_f32(),
        eta,
        stats.rays_per_second / 1e6
    );
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level.into())
        .parse_default_env()
        .init();

    if args.list {
        for scene in DemoScene::value_variants() {
            if let Some(name) = scene.to_possible_value() {
                println!("{:14} {}", name.get_name(), scene.description());
            }
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply(&args);
    config.validate()?;

    log::info!("Building scene {:?}: {}", args.scene, args.scene.description());
    let scene = Arc::new(args.scene.build(&config.bvh, &config.march)?);
    let camera = Arc::new(args.scene.camera());

    let mut frame = Frame::start(config.render, camera, scene).context("Failed to start frame")?;
    frame.wait(Duration::from_millis(args.poll_ms.max(1)), report);
    let image = frame.finish();

    image
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    log::info!("Wrote {}", args.output.display());

    Ok(())
}
