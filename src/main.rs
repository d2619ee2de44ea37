mod app;
mod capture;
mod config;
mod error;
mod export;
mod font;
mod frame;
mod geometry;
mod grid;
mod mapper;
mod renderer;
mod settings;
mod share;
mod surface;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    cursor, execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use tracing::info;

use app::{App, AppOptions};
use config::{AspectRatio, GlyphWeight, RenderConfig};
use error::Result;
use settings::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "binary-lens",
    version,
    about = "Live camera to glyph-art renderer for the terminal"
)]
struct Args {
    /// Device index opened for the environment (rear) camera
    #[arg(long, default_value_t = 0)]
    rear_camera: u32,

    /// Device index opened for the user (front) camera
    #[arg(long, default_value_t = 1)]
    front_camera: u32,

    /// Render loop and capture rate
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Grid sampling stride in video pixels (1-64)
    #[arg(long, default_value_t = 10)]
    sample_step: usize,

    /// Glyph size in logical pixels (4-64)
    #[arg(long, default_value_t = 13)]
    glyph_size: u16,

    /// Custom glyph ramp, darkest character last; joins the preset cycle
    #[arg(long)]
    ramp: Option<String>,

    /// Glyph weight: normal, bold or italic
    #[arg(long, default_value = "normal")]
    weight: GlyphWeight,

    /// Glyph color as #RRGGBB
    #[arg(long, default_value = "#000000")]
    color: String,

    /// Background color as #RRGGBB
    #[arg(long, default_value = "#ffffff")]
    background: String,

    /// Aspect ratio as W:H; overrides the persisted selection
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Directory snapshots are saved into
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Snapshot supersampling factor (the display-density multiplier)
    #[arg(long, default_value_t = 2.0)]
    pixel_density: f32,

    /// Settings file holding the persisted aspect ratio
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log file; stdout belongs to the renderer
    #[arg(long, default_value = "binary-lens.log")]
    log_file: PathBuf,
}

fn build_config(args: &Args, settings: &Settings) -> Result<RenderConfig> {
    let mut config = RenderConfig::new();
    config.set_sample_step(args.sample_step);
    config.set_glyph_size(args.glyph_size);
    if let Some(ramp) = &args.ramp {
        config.set_ramp(ramp)?;
    }
    config.weight = args.weight;
    config.glyph_color = config::parse_hex_color(&args.color)?;
    config.background_color = config::parse_hex_color(&args.background)?;
    config.aspect_ratio = match &args.aspect_ratio {
        Some(label) => AspectRatio::parse(label)?,
        None => settings.load_aspect_ratio().unwrap_or_default(),
    };
    Ok(config)
}

/// Restores the terminal no matter how the render loop ends.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = File::create(&args.log_file)?;
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(Arc::new(log_file))
        .init();
    info!(version = env!("CARGO_PKG_VERSION"), "binary-lens starting");

    let settings = Settings::new(
        args.settings
            .clone()
            .unwrap_or_else(Settings::default_path),
    );
    let config = build_config(&args, &settings)?;
    let options = AppOptions {
        rear_camera: args.rear_camera,
        front_camera: args.front_camera,
        fps: args.fps,
        output_dir: args.output_dir.clone(),
        pixel_density: args.pixel_density,
        custom_ramp: args.ramp.clone(),
    };

    let _guard = TerminalGuard::enter()?;
    let app = App::new(config, settings, options)?;
    app.run().await
}
