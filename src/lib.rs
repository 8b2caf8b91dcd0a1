//! MoodLens Interview - session core for camera-assisted interview practice
//!
//! Turns raw face detections and typed/spoken answers into a structured
//! coaching report through a deterministic pipeline: detection tick → metrics
//! derivation → session aggregation → report synthesis, with integrity
//! guarding and cross-context sync along the way.
//!
//! ## Modules
//!
//! - **SessionEngine**: camera/model lifecycle and the single-flight
//!   detection tick
//! - **SessionAggregator**: per-session state machine, report and risk
//!   synthesis
//! - **IntegrityGuard** / **SyncChannel** / **ResponseEvaluator**: proctoring
//!   signals, cross-context pub/sub, and answer scoring

pub mod aggregator;
pub mod channel;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod guard;
pub mod metrics;
pub mod questions;
pub mod report;
pub mod session;
pub mod types;

pub use aggregator::{SessionAggregator, SessionPhase};
pub use channel::{BroadcastHub, StorageCell, SyncChannel, SyncMessage};
pub use engine::{SessionEngine, EngineOptions};
pub use error::{EngineError, EvalError, SessionError};
pub use evaluator::{LanguageModel, ResponseEvaluator};
pub use guard::{GuardOutcome, IntegrityGuard, IntegritySignal};
pub use metrics::derive_metrics;
pub use report::SessionReport;
pub use session::{PracticeSession, SubmitOutcome};
pub use types::{FaceMetrics, MetricsSample, SessionConfig};

/// Core version embedded in reports and CLI output
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report payloads
pub const PRODUCER_NAME: &str = "moodlens-interview";
