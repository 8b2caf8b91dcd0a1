//! Session engine
//!
//! Owns the camera and detection-model lifecycle and runs the periodic
//! detection tick. The host scheduler calls [`SessionEngine::tick`] at the
//! configured period; detection is two-phase (`begin`/`poll`) so a slow
//! detection spans ticks, and a single-flight flag turns overlapping ticks
//! into no-ops instead of queueing work.
//!
//! Overlay rendering is best-effort and decoupled from metrics emission: a
//! render failure is logged and the metrics callback still fires.

use crate::error::EngineError;
use crate::metrics::derive_metrics;
use crate::types::{FaceDetection, FaceMetrics};
use log::{debug, warn};

/// Default detection tick period in milliseconds
pub const DEFAULT_DETECTION_INTERVAL_MS: u64 = 120;

/// Engine construction options
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Period the host should drive [`SessionEngine::tick`] at
    pub detection_interval_ms: u64,
    /// Whether to render the detection overlay
    pub render_overlay: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            detection_interval_ms: DEFAULT_DETECTION_INTERVAL_MS,
            render_overlay: true,
        }
    }
}

/// One captured camera frame handed to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Monotonic capture counter
    pub sequence: u64,
}

/// Camera capability consumed by the engine.
///
/// `frame` returns `None` until the media source has enough data; the engine
/// skips ticks until then.
pub trait CameraSource {
    /// Acquire the camera. Fails with `CameraPermission` or
    /// `CameraUnsupported`.
    fn open(&mut self) -> Result<(), EngineError>;
    /// Latest frame, or `None` while the source is not ready
    fn frame(&mut self) -> Option<CameraFrame>;
    /// Stop all live tracks. Must be idempotent.
    fn stop(&mut self);
}

/// Poll result of an in-flight detection
#[derive(Debug, Clone)]
pub enum DetectionPoll {
    /// Detection still running; the tick skips without queueing
    Pending,
    /// Detection finished with zero or more faces
    Ready(Vec<FaceDetection>),
}

/// Face-detection capability consumed by the engine
pub trait FaceDetector {
    /// Load model weights. Fails with `ModelLoad`.
    fn load(&mut self) -> Result<(), EngineError>;
    /// Start detecting on a frame
    fn begin(&mut self, frame: &CameraFrame) -> Result<(), EngineError>;
    /// Poll the in-flight detection
    fn poll(&mut self) -> Result<DetectionPoll, EngineError>;
}

/// Overlay surface for bounding boxes, landmarks, and expression scores
pub trait OverlayRenderer {
    /// Draw the detections scaled to the frame size
    fn render(&mut self, detections: &[FaceDetection], frame: &CameraFrame)
        -> Result<(), EngineError>;
    /// Clear the surface; called on teardown
    fn clear(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Created,
    Ready,
    Failed,
    Destroyed,
}

/// Camera + model lifecycle and the periodic detection tick.
///
/// Construct, `init()`, then drive `tick()` from the host scheduler. On init
/// failure the engine is inert; retry by constructing a new engine.
pub struct SessionEngine {
    camera: Box<dyn CameraSource>,
    detector: Box<dyn FaceDetector>,
    overlay: Option<Box<dyn OverlayRenderer>>,
    on_metrics: Box<dyn FnMut(FaceMetrics, i64)>,
    options: EngineOptions,
    state: EngineState,
    in_flight: bool,
    pending_frame: Option<CameraFrame>,
    status: String,
}

impl SessionEngine {
    pub fn new(
        camera: Box<dyn CameraSource>,
        detector: Box<dyn FaceDetector>,
        overlay: Option<Box<dyn OverlayRenderer>>,
        options: EngineOptions,
        on_metrics: Box<dyn FnMut(FaceMetrics, i64)>,
    ) -> Self {
        let overlay = if options.render_overlay { overlay } else { None };
        Self {
            camera,
            detector,
            overlay,
            on_metrics,
            options,
            state: EngineState::Created,
            in_flight: false,
            pending_frame: None,
            status: String::new(),
        }
    }

    /// Acquire the detection model, then the camera.
    ///
    /// Either failure leaves the engine inert with an operator-facing status
    /// line; the error is also returned for the caller.
    pub fn init(&mut self) -> Result<(), EngineError> {
        self.set_status("Loading models...");
        if let Err(err) = self.detector.load() {
            self.fail(&err);
            return Err(err);
        }

        self.set_status("Models ready. Requesting camera access...");
        if let Err(err) = self.camera.open() {
            self.fail(&err);
            return Err(err);
        }

        self.set_status("Camera started. Detecting expressions...");
        self.state = EngineState::Ready;
        Ok(())
    }

    /// One detection tick.
    ///
    /// No-op unless initialized. Skips while the media source is not ready
    /// or while a detection is already in flight (single-flight: dropped, not
    /// queued). Tick-level failures are recovered and logged; the loop
    /// continues.
    pub fn tick(&mut self, now_ms: i64) {
        if self.state != EngineState::Ready {
            return;
        }

        if self.in_flight {
            self.poll_in_flight(now_ms);
            return;
        }

        let Some(frame) = self.camera.frame() else {
            return;
        };

        match self.detector.begin(&frame) {
            Ok(()) => {
                self.in_flight = true;
                self.pending_frame = Some(frame);
                // A synchronous detector completes within the same tick.
                self.poll_in_flight(now_ms);
            }
            Err(err) => self.recover_tick(&err),
        }
    }

    fn poll_in_flight(&mut self, now_ms: i64) {
        match self.detector.poll() {
            Ok(DetectionPoll::Pending) => {}
            Ok(DetectionPoll::Ready(detections)) => {
                self.in_flight = false;
                self.complete_tick(&detections, now_ms);
            }
            Err(err) => {
                self.in_flight = false;
                self.pending_frame = None;
                self.recover_tick(&err);
            }
        }
    }

    /// Derive metrics and emit them exactly once; render the overlay
    /// best-effort.
    fn complete_tick(&mut self, detections: &[FaceDetection], now_ms: i64) {
        if let (Some(overlay), Some(frame)) = (self.overlay.as_mut(), self.pending_frame.as_ref()) {
            if let Err(err) = overlay.render(detections, frame) {
                debug!("overlay render skipped: {err}");
            }
        }
        self.pending_frame = None;

        let metrics = derive_metrics(detections);
        (self.on_metrics)(metrics, now_ms);
    }

    fn recover_tick(&mut self, err: &EngineError) {
        warn!("detection tick recovered: {err}");
        self.set_status(EngineError::DetectionTick(err.to_string()).status_line());
    }

    fn fail(&mut self, err: &EngineError) {
        warn!("engine init failed: {err}");
        self.status = err.status_line().to_string();
        self.state = EngineState::Failed;
    }

    fn set_status(&mut self, text: &str) {
        self.status = text.to_string();
    }

    /// Scoped teardown: stops the camera, drops the in-flight slot, releases
    /// the overlay. Idempotent and safe from an unload handler.
    pub fn destroy(&mut self) {
        if self.state == EngineState::Destroyed {
            return;
        }
        self.camera.stop();
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.clear();
        }
        self.overlay = None;
        self.in_flight = false;
        self.pending_frame = None;
        self.state = EngineState::Destroyed;
        self.set_status("Session engine stopped.");
    }

    /// Current operator-facing status line
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Whether the engine finished init and is serving ticks
    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    /// Tick period the host should schedule at
    pub fn detection_interval_ms(&self) -> u64 {
        self.options.detection_interval_ms
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}
