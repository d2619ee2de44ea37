use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::capture::{CaptureController, CaptureEvent, SessionRequest};
use crate::config::{FacingMode, RenderConfig};
use crate::error::{LensError, Result};
use crate::export::{self, CapturedPhoto};
use crate::frame::VideoFrame;
use crate::geometry::{CropRect, Viewport};
use crate::grid::GlyphGrid;
use crate::mapper;
use crate::renderer::TermRenderer;
use crate::settings::Settings;
use crate::share;
use crate::surface::Surface;

const FRAME_CHANNEL_DEPTH: usize = 4;
const EVENT_CHANNEL_DEPTH: usize = 16;

/// Startup options resolved from the command line.
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Device index for the environment (rear) camera.
    pub rear_camera: u32,
    /// Device index for the user (front) camera.
    pub front_camera: u32,
    pub fps: u32,
    pub output_dir: PathBuf,
    pub pixel_density: f32,
    /// Extra ramp slotted into the preset cycle when given.
    pub custom_ramp: Option<String>,
}

/// Device index the current facing mode maps to.
fn camera_index(options: &AppOptions, facing: FacingMode) -> u32 {
    match facing {
        FacingMode::Environment => options.rear_camera,
        FacingMode::User => options.front_camera,
    }
}

/// Preset-cycling state for the glyph ramp.
struct RampSelect {
    presets: Vec<String>,
    at: usize,
}

impl RampSelect {
    fn new(custom: Option<&str>) -> Self {
        let mut presets = vec![
            RenderConfig::DEFAULT_RAMP.to_string(),
            RenderConfig::LETTERS_RAMP.to_string(),
        ];
        if let Some(custom) = custom {
            if !custom.is_empty() {
                presets.push(custom.to_string());
            }
        }
        Self { presets, at: 0 }
    }

    fn next(&mut self) -> &str {
        self.at = (self.at + 1) % self.presets.len();
        &self.presets[self.at]
    }
}

pub struct App {
    config: RenderConfig,
    options: AppOptions,
    settings: Settings,
    controller: CaptureController,
    frame_rx: mpsc::Receiver<VideoFrame>,
    event_rx: mpsc::Receiver<CaptureEvent>,
    renderer: TermRenderer,
    surface: Surface,
    grid: GlyphGrid,
    ramps: RampSelect,
    last_frame: Option<VideoFrame>,
    /// Crop recorded by the most recent successful geometry pass.
    last_crop: Option<CropRect>,
    photo: Option<CapturedPhoto>,
    status: Option<String>,
    running: bool,
}

impl App {
    pub fn new(config: RenderConfig, settings: Settings, options: AppOptions) -> Result<Self> {
        let (cols, rows) = crossterm::terminal::size()?;
        // bottom row is the status footer
        let grid_rows = rows.saturating_sub(1).max(1);
        let surface = Surface::new(cols, grid_rows, config.glyph_size, options.pixel_density);
        let grid = GlyphGrid::new(cols as usize, grid_rows as usize);

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_DEPTH);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
        let controller = CaptureController::new(frame_tx, event_tx);
        let ramps = RampSelect::new(options.custom_ramp.as_deref());

        Ok(Self {
            config,
            options,
            settings,
            controller,
            frame_rx,
            event_rx,
            renderer: TermRenderer::new(),
            surface,
            grid,
            ramps,
            last_frame: None,
            last_crop: None,
            photo: None,
            status: None,
            running: true,
        })
    }

    fn session_request(&self) -> SessionRequest {
        SessionRequest {
            index: camera_index(&self.options, self.config.facing),
            facing: self.config.facing,
            ratio: self.config.aspect_ratio.clone(),
            fps: self.options.fps,
        }
    }

    fn restart_capture(&mut self) {
        self.last_frame = None;
        self.controller.start(self.session_request());
        self.status = Some("starting camera...".to_string());
    }

    /// Drive the render loop until the user quits.
    pub async fn run(mut self) -> Result<()> {
        self.restart_capture();

        let frame_ms = 1000 / self.options.fps.clamp(1, 120) as u64;
        let mut ticker = time::interval(Duration::from_millis(frame_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.running {
            ticker.tick().await;
            self.poll_input()?;
            self.drain_capture_events();
            self.drain_frames();
            self.render_pass()?;
        }

        self.controller.shutdown();
        info!("render loop finished");
        Ok(())
    }

    fn poll_input(&mut self) -> Result<()> {
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                Event::Resize(cols, rows) => {
                    let grid_rows = rows.saturating_sub(1).max(1);
                    self.surface.resize(cols, grid_rows);
                    self.grid.resize(cols as usize, grid_rows as usize);
                    self.renderer.invalidate();
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('c') => {
                self.config.facing = self.config.facing.toggle();
                self.restart_capture();
            }
            KeyCode::Char('a') => {
                self.config.aspect_ratio = self.config.aspect_ratio.cycle();
                self.settings.store_aspect_ratio(&self.config.aspect_ratio);
                self.restart_capture();
            }
            KeyCode::Char(' ') => self.take_snapshot(),
            KeyCode::Char('s') => self.save_snapshot(),
            KeyCode::Char('h') => self.share_snapshot(),
            KeyCode::Char('x') => {
                if self.photo.take().is_some() {
                    self.status = Some("snapshot discarded".to_string());
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.config.adjust_sample_step(1);
                self.status = None;
            }
            KeyCode::Char('-') => {
                self.config.adjust_sample_step(-1);
                self.status = None;
            }
            KeyCode::Char(']') => {
                self.config.adjust_glyph_size(1);
                self.surface.set_glyph_size(self.config.glyph_size);
                self.status = None;
            }
            KeyCode::Char('[') => {
                self.config.adjust_glyph_size(-1);
                self.surface.set_glyph_size(self.config.glyph_size);
                self.status = None;
            }
            KeyCode::Char('w') => {
                self.config.weight = self.config.weight.cycle();
                self.status = None;
            }
            KeyCode::Char('g') => {
                let next = self.ramps.next().to_string();
                // presets are never empty, but keep the previous ramp if so
                if self.config.set_ramp(&next).is_ok() {
                    self.status = None;
                }
            }
            _ => {}
        }
    }

    fn drain_capture_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            if !self.controller.on_event(&event) {
                continue;
            }
            match event {
                CaptureEvent::Ready { .. } => self.status = None,
                CaptureEvent::Failed { error, .. } => {
                    self.status = Some(format!("{error} (c retries)"));
                }
                CaptureEvent::Stopped { .. } => {}
            }
        }
    }

    fn drain_frames(&mut self) {
        while let Ok(frame) = self.frame_rx.try_recv() {
            if self.controller.accepts(&frame) {
                self.last_frame = Some(frame);
            }
        }
    }

    /// One cooperative render step: recompute geometry, map the latest
    /// frame, flush the diff to the terminal.
    fn render_pass(&mut self) -> Result<()> {
        let mut mapped = false;

        if self.controller.is_capturing() {
            if let Some(frame) = &self.last_frame {
                match Viewport::compute(
                    self.surface.pixel_w(),
                    self.surface.pixel_h(),
                    frame.width,
                    frame.height,
                    &self.config.aspect_ratio,
                    self.config.facing,
                    self.surface.pixel_density(),
                ) {
                    Ok(viewport) => {
                        mapper::map_frame(frame, &viewport, &self.config, &self.surface, &mut self.grid);
                        self.last_crop = Some(viewport.crop_rect());
                        mapped = true;
                    }
                    // stream has no dimensions yet; background only
                    Err(LensError::StreamNotReady) => {}
                    Err(_) => {}
                }
            }
        }

        if !mapped {
            self.grid.clear();
        }

        self.renderer.render(&self.grid, &self.config)?;
        let footer = self.footer_text();
        self.renderer
            .status_line(self.surface.rows, self.surface.cols, &footer)?;
        Ok(())
    }

    fn take_snapshot(&mut self) {
        let Some(crop) = self.last_crop else {
            self.status = Some("nothing to capture yet".to_string());
            return;
        };
        match export::capture(&self.grid, &self.config, &self.surface, crop) {
            Ok(photo) => {
                self.status = Some(format!("{} - s save, h share, x discard", photo.filename));
                self.photo = Some(photo);
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn save_snapshot(&mut self) {
        let Some(photo) = &self.photo else {
            self.status = Some("no snapshot to save (space captures)".to_string());
            return;
        };
        match photo.save(&self.options.output_dir) {
            Ok(path) => self.status = Some(format!("saved {}", path.display())),
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn share_snapshot(&mut self) {
        let Some(photo) = &self.photo else {
            self.status = Some("no snapshot to share (space captures)".to_string());
            return;
        };
        let result = photo
            .save(&self.options.output_dir)
            .and_then(|path| share::share_file(&path));
        match result {
            Ok(()) => self.status = Some("snapshot shared".to_string()),
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn footer_text(&self) -> String {
        if let Some(status) = &self.status {
            return status.clone();
        }
        format!(
            "q quit  c camera:{}  a ratio:{}  space snap  +/- step:{}  [/] size:{}  w {}  g ramp",
            self.config.facing.as_str(),
            self.config.aspect_ratio.label(),
            self.config.sample_step,
            self.config.glyph_size,
            self.config.weight.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> AppOptions {
        AppOptions {
            rear_camera: 0,
            front_camera: 1,
            fps: 30,
            output_dir: PathBuf::from("."),
            pixel_density: 1.0,
            custom_ramp: None,
        }
    }

    #[test]
    fn facing_selects_the_configured_device() {
        let options = options();
        assert_eq!(camera_index(&options, FacingMode::Environment), 0);
        assert_eq!(camera_index(&options, FacingMode::User), 1);
    }

    #[test]
    fn ramp_cycle_walks_presets_and_wraps() {
        let mut ramps = RampSelect::new(Some("01"));
        assert_eq!(ramps.next(), RenderConfig::LETTERS_RAMP);
        assert_eq!(ramps.next(), "01");
        assert_eq!(ramps.next(), RenderConfig::DEFAULT_RAMP);
    }

    #[test]
    fn empty_custom_ramp_is_not_offered() {
        let mut ramps = RampSelect::new(Some(""));
        assert_eq!(ramps.next(), RenderConfig::LETTERS_RAMP);
        assert_eq!(ramps.next(), RenderConfig::DEFAULT_RAMP);
    }
}
