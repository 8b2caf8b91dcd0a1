//! Core types for the MoodLens interview session core
//!
//! This module defines the data that flows through a session: raw face
//! detections, per-tick metrics samples, integrity policy events, evaluated
//! question responses, and the session configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interview category selected in the setup survey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewType {
    Behavioral,
    Technical,
    Hr,
}

impl InterviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewType::Behavioral => "behavioral",
            InterviewType::Technical => "technical",
            InterviewType::Hr => "hr",
        }
    }
}

/// Question difficulty selected in the setup survey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// How an answer was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Text,
    Audio,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Text => "text",
            ResponseMode::Audio => "audio",
        }
    }
}

/// Session configuration captured from the setup survey.
///
/// Immutable after the session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Interview category
    pub interview_type: InterviewType,
    /// Topic key within the category (e.g. "communication", "react")
    pub topic: String,
    /// Free-form topic used to frame questions when set
    #[serde(default)]
    pub custom_topic: Option<String>,
    /// Question difficulty
    pub difficulty: Difficulty,
    /// Number of questions in the session
    pub question_count: u32,
}

impl SessionConfig {
    /// Topic label shown in the report (custom topic wins when present)
    pub fn topic_label(&self) -> &str {
        match &self.custom_topic {
            Some(custom) if !custom.is_empty() => custom,
            _ => &self.topic,
        }
    }
}

/// Axis-aligned bounding box of a detected face, in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Center point of the box
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A single landmark point, in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
}

/// One face detection returned by the opaque detection capability.
///
/// `expressions` keeps the detector's iteration order, which is what breaks
/// ties when two labels share the maximal score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceDetection {
    /// Face bounding box
    pub bounding_box: BoundingBox,
    /// Landmark points; the reference point used for attention tracking is
    /// selected by [`crate::metrics`]
    pub landmarks: Vec<LandmarkPoint>,
    /// Per-label expression scores in detector iteration order
    pub expressions: Vec<(String, f64)>,
}

/// Metrics derived from one completed detection tick (no session context)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMetrics {
    /// Whether at least one face was detected
    pub has_face: bool,
    /// Total number of detected faces
    pub face_count: u32,
    /// Label with the maximal expression score, or the no-face sentinel
    pub dominant_expression: String,
    /// Score of the dominant expression (0-1)
    pub confidence: f64,
    /// Whether the primary face's gaze reference point drifted off-center
    pub attention_away: bool,
    /// Background motion estimate (0-1), when the host supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_motion_score: Option<f64>,
}

/// One appended sample in the session's metrics sequence.
///
/// Produced exactly once per completed detection tick; immutable once
/// appended. Timestamps are strictly increasing within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    /// Sample time (epoch milliseconds)
    pub timestamp: i64,
    /// Index of the question that was active when the sample was taken
    pub question_index: u32,
    /// Derived metrics for this tick
    #[serde(flatten)]
    pub metrics: FaceMetrics,
}

/// A discrete integrity-rule breach accepted by the guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEvent {
    /// When the violation was accepted (epoch milliseconds)
    pub timestamp: i64,
    /// Human-readable violation reason
    pub reason: String,
    /// Session-scoped monotonic violation count (1-based)
    pub sequence_number: u32,
}

/// Where an evaluation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationSource {
    Ai,
    Heuristic,
}

impl EvaluationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationSource::Ai => "ai",
            EvaluationSource::Heuristic => "heuristic",
        }
    }
}

/// Quality evaluation of one answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Quality score (0-100)
    pub score: u32,
    /// What worked (at most 3 entries, never empty from the heuristic path)
    pub strengths: Vec<String>,
    /// Improvement suggestions (at most 3 entries)
    pub improvements: Vec<String>,
    /// One-line summary
    pub summary: String,
    /// Which evaluation path produced this
    pub source: EvaluationSource,
}

/// One answered question with its evaluation.
///
/// Created once per answered question; exactly one per question index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    /// 1-based question number
    pub question_number: u32,
    /// Question text as presented (after difficulty/topic framing)
    pub question: String,
    /// Non-empty answer text
    pub answer: String,
    /// Quality evaluation
    pub evaluation: Evaluation,
    /// How the answer was captured
    pub response_mode: ResponseMode,
}

/// Categorical proctoring risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
        }
    }
}

/// Expression labels the detection capability commonly reports.
///
/// The deriver itself is label-agnostic; these exist for hosts that want to
/// validate or display the distribution.
pub const KNOWN_EXPRESSIONS: &[&str] = &[
    "neutral", "happy", "sad", "angry", "fearful", "disgusted", "surprised",
];

/// Raw map form accepted from hosts that report expressions as an object
pub type ExpressionScores = HashMap<String, f64>;

/// Builds a centered single-landmark detection from label/score pairs.
///
/// Used by simulations and tests that only care about expression handling.
pub fn detection_from_scores(scores: &[(&str, f64)]) -> FaceDetection {
    FaceDetection {
        bounding_box: BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        },
        landmarks: vec![LandmarkPoint { x: 50.0, y: 50.0 }],
        expressions: scores
            .iter()
            .map(|(label, score)| (label.to_string(), *score))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interview_type_serialization() {
        let json = serde_json::to_string(&InterviewType::Behavioral).unwrap();
        assert_eq!(json, "\"behavioral\"");

        let parsed: InterviewType = serde_json::from_str("\"hr\"").unwrap();
        assert_eq!(parsed, InterviewType::Hr);
    }

    #[test]
    fn test_metrics_sample_flattens_face_metrics() {
        let sample = MetricsSample {
            timestamp: 1_700_000_000_000,
            question_index: 2,
            metrics: FaceMetrics {
                has_face: true,
                face_count: 1,
                dominant_expression: "happy".to_string(),
                confidence: 0.87,
                attention_away: false,
                background_motion_score: None,
            },
        };

        let value: serde_json::Value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["timestamp"], 1_700_000_000_000_i64);
        assert_eq!(value["has_face"], true);
        assert_eq!(value["dominant_expression"], "happy");
        // Absent optional fields are omitted from the wire form
        assert!(value.get("background_motion_score").is_none());

        let round: MetricsSample = serde_json::from_value(value).unwrap();
        assert_eq!(round, sample);
    }

    #[test]
    fn test_topic_label_prefers_custom_topic() {
        let mut config = SessionConfig {
            interview_type: InterviewType::Technical,
            topic: "react".to_string(),
            custom_topic: None,
            difficulty: Difficulty::Medium,
            question_count: 4,
        };
        assert_eq!(config.topic_label(), "react");

        config.custom_topic = Some("payments platform".to_string());
        assert_eq!(config.topic_label(), "payments platform");

        config.custom_topic = Some(String::new());
        assert_eq!(config.topic_label(), "react");
    }

    #[test]
    fn test_bounding_box_center() {
        let bbox = BoundingBox {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(bbox.center(), (60.0, 45.0));
    }
}
