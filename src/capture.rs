//! Camera lifecycle: a small state machine in front of a blocking capture
//! worker thread.
//!
//! Every `start` bumps a generation counter and spawns a fresh worker; the
//! new worker joins the previous thread before touching hardware, so at
//! most one camera is ever open and teardown always precedes startup.
//! Rapid toggling resolves as last-request-wins: events and frames tagged
//! with a stale generation are discarded on arrival.

use std::thread::JoinHandle;

use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::{AspectRatio, FacingMode};
use crate::error::LensError;
use crate::frame::VideoFrame;

/// Capture source lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    Stopping,
}

/// Everything a worker needs to open the right stream.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Device index the facing mode maps to.
    pub index: u32,
    pub facing: FacingMode,
    pub ratio: AspectRatio,
    pub fps: u32,
}

/// Lifecycle notifications from the worker back to the app.
#[derive(Debug)]
pub enum CaptureEvent {
    /// Stream is open; dimensions are the negotiated camera resolution.
    Ready {
        generation: u64,
        width: u32,
        height: u32,
    },
    /// Opening or keeping the stream alive failed; terminal for this
    /// session attempt.
    Failed { generation: u64, error: LensError },
    /// Orderly shutdown finished.
    Stopped { generation: u64 },
}

impl CaptureEvent {
    pub fn generation(&self) -> u64 {
        match *self {
            CaptureEvent::Ready { generation, .. }
            | CaptureEvent::Failed { generation, .. }
            | CaptureEvent::Stopped { generation } => generation,
        }
    }
}

struct Worker {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

pub struct CaptureController {
    state: SessionState,
    generation: u64,
    worker: Option<Worker>,
    frame_tx: mpsc::Sender<VideoFrame>,
    event_tx: mpsc::Sender<CaptureEvent>,
}

impl CaptureController {
    pub fn new(frame_tx: mpsc::Sender<VideoFrame>, event_tx: mpsc::Sender<CaptureEvent>) -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            worker: None,
            frame_tx,
            event_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_capturing(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Whether a delivered frame belongs to the current session.
    pub fn accepts(&self, frame: &VideoFrame) -> bool {
        frame.generation == self.generation
    }

    /// Begin a new session: supersede whatever is running and spawn a
    /// worker for the request. Returns immediately; readiness or failure
    /// arrives as a `CaptureEvent`.
    pub fn start(&mut self, request: SessionRequest) {
        let (generation, previous) = self.begin_start();
        info!(
            generation,
            facing = request.facing.as_str(),
            ratio = request.ratio.label(),
            index = request.index,
            "starting capture session"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let frame_tx = self.frame_tx.clone();
        let event_tx = self.event_tx.clone();

        let handle = std::thread::spawn(move || {
            // serialize against the superseded session's teardown
            if let Some(previous) = previous {
                let _ = previous.join();
            }
            run_session(generation, request, shutdown_rx, frame_tx, event_tx);
        });

        self.worker = Some(Worker {
            handle,
            shutdown: shutdown_tx,
        });
    }

    /// Pure state-machine half of `start`: signal the old worker, bump the
    /// generation, transition to Starting.
    fn begin_start(&mut self) -> (u64, Option<JoinHandle<()>>) {
        let previous = self.release_worker();
        self.generation += 1;
        self.state = SessionState::Starting;
        (self.generation, previous)
    }

    /// Signal the current session to tear down. Idempotent; calling with
    /// nothing running is a no-op.
    pub fn stop(&mut self) {
        match self.worker {
            Some(ref worker) => {
                let _ = worker.shutdown.send(true);
                self.state = SessionState::Stopping;
            }
            None => self.state = SessionState::Idle,
        }
    }

    /// Blocking teardown for process exit: signal and join the worker so
    /// the camera is released before the terminal is restored.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.release_worker() {
            let _ = handle.join();
        }
        self.state = SessionState::Idle;
    }

    fn release_worker(&mut self) -> Option<JoinHandle<()>> {
        self.worker.take().map(|worker| {
            let _ = worker.shutdown.send(true);
            worker.handle
        })
    }

    /// Fold a worker event into the state machine. Returns false for
    /// stale-generation events, which callers must ignore.
    pub fn on_event(&mut self, event: &CaptureEvent) -> bool {
        if event.generation() != self.generation {
            debug!(
                event_generation = event.generation(),
                current = self.generation,
                "discarding stale capture event"
            );
            return false;
        }

        match event {
            CaptureEvent::Ready { width, height, .. } => {
                if self.state == SessionState::Starting {
                    self.state = SessionState::Active;
                    info!(width, height, "capture session active");
                }
            }
            CaptureEvent::Failed { error, .. } => {
                warn!(error = %error, "capture session failed");
                self.worker = None;
                self.state = SessionState::Idle;
            }
            CaptureEvent::Stopped { .. } => {
                self.worker = None;
                self.state = SessionState::Idle;
            }
        }
        true
    }
}

/// Worker body: open the camera, announce readiness, pump frames until
/// told to stop. Runs on its own thread since every nokhwa call blocks.
fn run_session(
    generation: u64,
    request: SessionRequest,
    shutdown: watch::Receiver<bool>,
    frame_tx: mpsc::Sender<VideoFrame>,
    event_tx: mpsc::Sender<CaptureEvent>,
) {
    let (nominal_w, nominal_h) = request.ratio.nominal_resolution();
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
        CameraFormat::new(
            Resolution::new(nominal_w, nominal_h),
            FrameFormat::MJPEG,
            request.fps,
        ),
    ));

    let mut camera = match Camera::new(CameraIndex::Index(request.index), requested) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = event_tx.try_send(CaptureEvent::Failed {
                generation,
                error: LensError::CameraUnavailable(e.to_string()),
            });
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = event_tx.try_send(CaptureEvent::Failed {
            generation,
            error: LensError::CameraUnavailable(e.to_string()),
        });
        return;
    }

    // superseded while the permission dialog / negotiation was in flight
    if *shutdown.borrow() {
        let _ = camera.stop_stream();
        let _ = event_tx.try_send(CaptureEvent::Stopped { generation });
        return;
    }

    let resolution = camera.resolution();
    let _ = event_tx.try_send(CaptureEvent::Ready {
        generation,
        width: resolution.width(),
        height: resolution.height(),
    });

    let mut consecutive_errors = 0u32;
    while !*shutdown.borrow() {
        match camera.frame() {
            Ok(buffer) => match buffer.decode_image::<RgbFormat>() {
                Ok(decoded) => {
                    consecutive_errors = 0;
                    let frame = VideoFrame::new(
                        generation,
                        decoded.width(),
                        decoded.height(),
                        decoded.into_raw(),
                    );
                    if frame_tx.try_send(frame).is_err() {
                        debug!("frame dropped (renderer behind)");
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(error = %e, "frame decode failed");
                }
            },
            Err(e) => {
                consecutive_errors += 1;
                warn!(error = %e, "frame read failed");
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
        }

        if consecutive_errors >= 10 {
            let _ = camera.stop_stream();
            let _ = event_tx.try_send(CaptureEvent::Failed {
                generation,
                error: LensError::CameraUnavailable(
                    "camera stopped delivering frames".to_string(),
                ),
            });
            return;
        }
    }

    let _ = camera.stop_stream();
    let _ = event_tx.try_send(CaptureEvent::Stopped { generation });
    info!(generation, "capture session closed");
}
