//! Metrics derivation
//!
//! Pure transform from a raw detection list to [`FaceMetrics`]. No state, no
//! side effects: the engine calls [`derive_metrics`] once per completed
//! detection tick and stamps the result into a session sample downstream.

use crate::types::{FaceDetection, FaceMetrics, LandmarkPoint};

/// Sentinel label emitted when no face is present in the frame
pub const NO_FACE_LABEL: &str = "No face detected";

/// Normalized offset beyond which the gaze reference point counts as
/// attention-away. Strictly greater-than: an offset of exactly 0.20 is still
/// attentive.
pub const ATTENTION_OFFSET_THRESHOLD: f64 = 0.20;

/// Index of the nose-tip landmark in a 68-point landmark set
const NOSE_TIP_INDEX: usize = 30;

/// Derive metrics from a detection list.
///
/// Zero detections yield the no-face record. Otherwise only the primary
/// (first) detection contributes expression and attention metrics;
/// `face_count` still reports the full list length.
pub fn derive_metrics(detections: &[FaceDetection]) -> FaceMetrics {
    let Some(primary) = detections.first() else {
        return FaceMetrics {
            has_face: false,
            face_count: 0,
            dominant_expression: NO_FACE_LABEL.to_string(),
            confidence: 0.0,
            attention_away: false,
            background_motion_score: None,
        };
    };

    // Argmax over the label→score pairs; ties keep the first-seen label.
    let mut dominant_expression = "neutral".to_string();
    let mut confidence = 0.0;
    for (label, score) in &primary.expressions {
        if *score > confidence {
            dominant_expression = label.clone();
            confidence = *score;
        }
    }

    FaceMetrics {
        has_face: true,
        face_count: detections.len() as u32,
        dominant_expression,
        confidence,
        attention_away: attention_away(primary),
        background_motion_score: None,
    }
}

/// Attention heuristic on the primary detection.
///
/// Computes the horizontal and vertical offset of the gaze reference point
/// (nose tip) from the bounding-box center, normalized by the corresponding
/// box dimension. Away iff either offset exceeds
/// [`ATTENTION_OFFSET_THRESHOLD`].
pub fn attention_away(detection: &FaceDetection) -> bool {
    let Some(reference) = reference_landmark(detection) else {
        return false;
    };

    let bbox = &detection.bounding_box;
    if bbox.width <= 0.0 || bbox.height <= 0.0 {
        return false;
    }

    let (center_x, center_y) = bbox.center();
    let horizontal_offset = (reference.x - center_x).abs() / bbox.width;
    let vertical_offset = (reference.y - center_y).abs() / bbox.height;

    horizontal_offset > ATTENTION_OFFSET_THRESHOLD || vertical_offset > ATTENTION_OFFSET_THRESHOLD
}

/// Gaze reference point: the nose tip in a full 68-point landmark set, else
/// the first landmark the detector provided.
fn reference_landmark(detection: &FaceDetection) -> Option<&LandmarkPoint> {
    detection
        .landmarks
        .get(NOSE_TIP_INDEX)
        .or_else(|| detection.landmarks.first())
}

/// Live coaching hint for the most recent metrics record
pub fn coaching_hint(metrics: &FaceMetrics) -> &'static str {
    if !metrics.has_face {
        return "Keep your face centered in frame while answering.";
    }
    if metrics.confidence < 0.45 {
        return "Slow down and speak in short structured points.";
    }
    if metrics.dominant_expression == "neutral" {
        return "Add energy in tone and facial expression to improve engagement.";
    }
    if metrics.attention_away {
        return "Try maintaining eye-line focus with the camera.";
    }
    "Good presence. Continue with concise and confident delivery."
}
