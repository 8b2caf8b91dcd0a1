//! Error types for the MoodLens interview session core

use thiserror::Error;

/// Errors raised by the session engine.
///
/// Initialization errors (`ModelLoad`, `CameraPermission`,
/// `CameraUnsupported`) are terminal for the engine instance: the caller must
/// construct a fresh engine to retry. `DetectionTick` and `Overlay` are
/// recovered inside the tick and never abort the loop.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load detection model: {0}")]
    ModelLoad(String),

    #[error("camera permission denied: {0}")]
    CameraPermission(String),

    #[error("camera capture is not supported: {0}")]
    CameraUnsupported(String),

    #[error("detection tick failed: {0}")]
    DetectionTick(String),

    #[error("overlay rendering failed: {0}")]
    Overlay(String),
}

impl EngineError {
    /// Operator-facing status text for this error.
    ///
    /// Initialization failures surface as actionable text, not stack traces.
    pub fn status_line(&self) -> &'static str {
        match self {
            EngineError::ModelLoad(_) => {
                "Failed to load detection models. Ensure model assets are reachable and reload."
            }
            EngineError::CameraPermission(_) => {
                "Unable to access camera. Allow permission and reload."
            }
            EngineError::CameraUnsupported(_) => "Camera API is not supported in this browser.",
            EngineError::DetectionTick(_) => "Detection failed. Check logs and reload.",
            EngineError::Overlay(_) => "Overlay rendering failed.",
        }
    }
}

/// Errors raised by session-level operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is not running")]
    NotRunning,

    #[error("session has already ended")]
    SessionEnded,

    #[error("an answer is required before moving to the next question")]
    EmptyAnswer,

    #[error("question {0} already has a recorded response")]
    DuplicateResponse(u32),
}

/// Internal evaluation failures.
///
/// Never surfaced to callers: every variant degrades to the heuristic
/// fallback inside the evaluator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("language model capability is unavailable")]
    Unavailable,

    #[error("language model did not answer within the deadline")]
    Timeout,

    #[error("language model response was malformed: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines_are_actionable() {
        let err = EngineError::CameraPermission("denied by user".to_string());
        assert!(err.status_line().contains("Allow permission"));

        let err = EngineError::ModelLoad("404".to_string());
        assert!(err.status_line().contains("model"));
    }

    #[test]
    fn test_error_display_includes_detail() {
        let err = EngineError::DetectionTick("tensor shape mismatch".to_string());
        assert_eq!(
            err.to_string(),
            "detection tick failed: tensor shape mismatch"
        );
    }
}
