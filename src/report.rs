//! Session report synthesis
//!
//! Pure functions over the collections a session accumulated. The aggregator
//! calls [`build_report`] exactly once at session end; everything here is
//! display-ready string lists plus the structured numbers they were computed
//! from, so a UI layer renders without recomputing.

use crate::guard::MAX_POLICY_VIOLATIONS;
use crate::types::{
    EvaluationSource, MetricsSample, PolicyEvent, QuestionResponse, ResponseMode, RiskBand,
    SessionConfig,
};
use chrono::{Local, TimeZone};
use serde::Serialize;

/// Average-quality floor below which the report recommends repeating the topic
pub const QUALITY_TARGET_SCORE: u32 = 60;
/// Average-confidence floor (percent) for delivery-stability advice
pub const CONFIDENCE_TARGET_PCT: u32 = 55;
/// Face-presence floor (percent) for framing advice
pub const FACE_PRESENCE_TARGET_PCT: u32 = 85;

/// Deduplicated strength/improvement entries shown per pool
pub const MAX_FEEDBACK_POOL_ITEMS: usize = 4;
/// Most recent policy events listed in the integrity section
pub const MAX_INTEGRITY_EVENT_ITEMS: usize = 5;

// Risk weighting. Empirical tuning values, kept as-is.
pub const RISK_WEIGHT_MULTI_FACE: u32 = 2;
pub const RISK_WEIGHT_ATTENTION_AWAY: u32 = 1;
pub const RISK_WEIGHT_MOTION_SPIKE: u32 = 1;
pub const RISK_WEIGHT_TAB_HIDDEN: u32 = 3;
/// Background-motion score above which a sample counts as a motion spike
pub const MOTION_SPIKE_THRESHOLD: f64 = 0.5;
/// Weighted-signal percentage at which risk becomes High
pub const RISK_HIGH_PCT: f64 = 25.0;
/// Weighted-signal percentage at which risk becomes Medium
pub const RISK_MEDIUM_PCT: f64 = 10.0;
/// Tab-hidden event count that forces High regardless of percentage
pub const RISK_TAB_HIDDEN_OVERRIDE: u32 = 1;
/// Multi-face sample count that forces High regardless of percentage
pub const RISK_MULTI_FACE_OVERRIDE: u32 = 3;

/// Inputs to report synthesis, borrowed from the aggregator's accumulated
/// state
pub struct ReportInput<'a> {
    pub config: &'a SessionConfig,
    pub questions_total: usize,
    pub samples: &'a [MetricsSample],
    pub responses: &'a [QuestionResponse],
    pub policy_events: &'a [PolicyEvent],
    pub violation_count: u32,
    pub clipboard_attempts: u32,
    /// Tab-hidden events observed over the sync channel (proctoring runs)
    pub tab_hidden_events: u32,
    pub duration_ms: i64,
    /// Whether to compute the proctoring risk section
    pub proctoring: bool,
}

/// Proctoring risk assessment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub band: RiskBand,
    pub weighted_pct: f64,
    pub multi_face_samples: u32,
    pub attention_away_samples: u32,
    pub motion_spike_samples: u32,
    pub tab_hidden_events: u32,
}

/// Read-only structured report, computed once at session end
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub duration_sec: i64,
    pub avg_confidence_pct: u32,
    pub face_presence_pct: u32,
    pub avg_score: u32,
    pub summary: Vec<String>,
    pub expressions: Vec<String>,
    pub insights: Vec<String>,
    pub quality: Vec<String>,
    pub integrity: Vec<String>,
    pub risk: Option<RiskAssessment>,
    pub risk_items: Vec<String>,
    pub next_step: String,
}

struct QualitySummary {
    avg_score: u32,
    strengths: Vec<String>,
    improvements: Vec<String>,
    audio_responses: usize,
}

fn quality_summary(responses: &[QuestionResponse]) -> QualitySummary {
    if responses.is_empty() {
        return QualitySummary {
            avg_score: 0,
            strengths: vec!["No answer evaluations captured.".to_string()],
            improvements: vec![
                "Attempt at least one full answer before ending session.".to_string(),
            ],
            audio_responses: 0,
        };
    }

    let total: u32 = responses.iter().map(|r| r.evaluation.score).sum();
    let avg_score =
        ((total as f64 / responses.len() as f64).round()) as u32;

    QualitySummary {
        avg_score,
        strengths: dedup_pool(responses.iter().flat_map(|r| &r.evaluation.strengths)),
        improvements: dedup_pool(responses.iter().flat_map(|r| &r.evaluation.improvements)),
        audio_responses: responses
            .iter()
            .filter(|r| r.response_mode == ResponseMode::Audio)
            .count(),
    }
}

/// First-seen dedup, capped at [`MAX_FEEDBACK_POOL_ITEMS`]
fn dedup_pool<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut pool: Vec<String> = Vec::new();
    for item in items {
        if !pool.contains(item) {
            pool.push(item.clone());
            if pool.len() == MAX_FEEDBACK_POOL_ITEMS {
                break;
            }
        }
    }
    pool
}

/// Expression distribution as "label: pct%" lines, sorted descending by share
fn expression_items(samples: &[MetricsSample]) -> Vec<String> {
    let face_samples: Vec<_> = samples.iter().filter(|s| s.metrics.has_face).collect();
    if face_samples.is_empty() {
        return vec!["No expression trend available.".to_string()];
    }

    let mut distribution: Vec<(String, usize)> = Vec::new();
    for sample in &face_samples {
        match distribution
            .iter_mut()
            .find(|(label, _)| *label == sample.metrics.dominant_expression)
        {
            Some((_, count)) => *count += 1,
            None => distribution.push((sample.metrics.dominant_expression.clone(), 1)),
        }
    }
    distribution.sort_by(|a, b| b.1.cmp(&a.1));

    distribution
        .into_iter()
        .map(|(label, count)| {
            let pct = (count as f64 / face_samples.len() as f64 * 100.0).round();
            format!("{label}: {pct}%")
        })
        .collect()
}

fn integrity_items(input: &ReportInput<'_>) -> Vec<String> {
    let mut items = vec![
        format!(
            "Policy violations: {}/{}",
            input.violation_count, MAX_POLICY_VIOLATIONS
        ),
        format!("Copy/paste attempts blocked: {}", input.clipboard_attempts),
    ];

    if input.policy_events.is_empty() {
        items.push("No integrity violations detected.".to_string());
    } else {
        let skip = input
            .policy_events
            .len()
            .saturating_sub(MAX_INTEGRITY_EVENT_ITEMS);
        for event in &input.policy_events[skip..] {
            items.push(format!(
                "{} - {}",
                format_event_time(event.timestamp),
                event.reason
            ));
        }
    }
    items
}

fn format_event_time(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// Weighted risk assessment over the accumulated samples and signals.
///
/// Weighted percentage is `(multi×2 + attention×1 + motion×1 + tab×3) /
/// samples × 100`. The override rules fire even when no samples exist.
pub fn assess_risk(samples: &[MetricsSample], tab_hidden_events: u32) -> RiskAssessment {
    let multi_face_samples = samples.iter().filter(|s| s.metrics.face_count > 1).count() as u32;
    let attention_away_samples =
        samples.iter().filter(|s| s.metrics.attention_away).count() as u32;
    let motion_spike_samples = samples
        .iter()
        .filter(|s| {
            s.metrics
                .background_motion_score
                .is_some_and(|score| score > MOTION_SPIKE_THRESHOLD)
        })
        .count() as u32;

    let weighted = multi_face_samples * RISK_WEIGHT_MULTI_FACE
        + attention_away_samples * RISK_WEIGHT_ATTENTION_AWAY
        + motion_spike_samples * RISK_WEIGHT_MOTION_SPIKE
        + tab_hidden_events * RISK_WEIGHT_TAB_HIDDEN;
    let weighted_pct = if samples.is_empty() {
        0.0
    } else {
        weighted as f64 / samples.len() as f64 * 100.0
    };

    let band = if tab_hidden_events > RISK_TAB_HIDDEN_OVERRIDE
        || multi_face_samples > RISK_MULTI_FACE_OVERRIDE
        || weighted_pct >= RISK_HIGH_PCT
    {
        RiskBand::High
    } else if weighted_pct >= RISK_MEDIUM_PCT {
        RiskBand::Medium
    } else {
        RiskBand::Low
    };

    RiskAssessment {
        band,
        weighted_pct,
        multi_face_samples,
        attention_away_samples,
        motion_spike_samples,
        tab_hidden_events,
    }
}

fn risk_items(risk: &RiskAssessment) -> Vec<String> {
    vec![
        format!("Proctoring risk: {}", risk.band.as_str()),
        format!("Weighted signal rate: {:.0}%", risk.weighted_pct),
        format!("Multiple faces detected: {} samples", risk.multi_face_samples),
        format!("Attention away: {} samples", risk.attention_away_samples),
        format!("Background motion spikes: {} samples", risk.motion_spike_samples),
        format!("Tab hidden events: {}", risk.tab_hidden_events),
    ]
}

fn next_step(
    risk: Option<&RiskAssessment>,
    avg_score: u32,
    avg_confidence_pct: u32,
    face_presence_pct: u32,
) -> String {
    if risk.is_some_and(|r| r.band == RiskBand::High) {
        return "Review the flagged proctoring signals and repeat the session in a quiet, single-screen environment.".to_string();
    }
    if avg_score < QUALITY_TARGET_SCORE {
        return "Run another session on the same topic and answer with STAR structure plus one measurable outcome in each response.".to_string();
    }
    if avg_confidence_pct < CONFIDENCE_TARGET_PCT {
        return "Keep current answer quality and focus next session on delivery stability, eye-line, and deliberate pace.".to_string();
    }
    if face_presence_pct < FACE_PRESENCE_TARGET_PCT {
        return "Run the next session with eye-line alignment and brighter front lighting for cleaner tracking.".to_string();
    }
    "Move to harder questions in the same topic and introduce constraint-based follow-up prompts for depth.".to_string()
}

/// Synthesize the full report. Pure over its input.
pub fn build_report(input: &ReportInput<'_>) -> SessionReport {
    let duration_sec = (input.duration_ms as f64 / 1000.0).round().max(1.0) as i64;

    let face_samples: Vec<_> = input
        .samples
        .iter()
        .filter(|s| s.metrics.has_face)
        .collect();
    let no_face_samples = input.samples.len() - face_samples.len();

    let avg_confidence_pct = if face_samples.is_empty() {
        0
    } else {
        let total: f64 = face_samples.iter().map(|s| s.metrics.confidence).sum();
        (total / face_samples.len() as f64 * 100.0).round() as u32
    };
    let face_presence_pct = if input.samples.is_empty() {
        0
    } else {
        (face_samples.len() as f64 / input.samples.len() as f64 * 100.0).round() as u32
    };

    let quality = quality_summary(input.responses);

    let summary = vec![
        format!("Practice duration: {duration_sec}s"),
        format!("Interview type: {}", input.config.interview_type.as_str()),
        format!("Topic: {}", input.config.topic_label()),
        format!("Difficulty: {}", input.config.difficulty.as_str()),
        format!(
            "Questions attempted: {}/{}",
            input.responses.len(),
            input.questions_total
        ),
        format!("Average confidence: {avg_confidence_pct}%"),
        format!("Face in frame: {face_presence_pct}%"),
        format!("No-face intervals: {no_face_samples}"),
    ];

    let any_ai = input
        .responses
        .iter()
        .any(|r| r.evaluation.source == EvaluationSource::Ai);
    let mut quality_items = vec![
        format!("Average response quality score: {}/100", quality.avg_score),
        format!(
            "Questions evaluated: {}/{}",
            input.responses.len(),
            input.questions_total
        ),
        format!(
            "Audio responses: {}/{}",
            quality.audio_responses,
            input.responses.len()
        ),
        format!(
            "Evaluation source: {}",
            if any_ai { "AI + fallback" } else { "Heuristic fallback" }
        ),
    ];
    quality_items.extend(quality.strengths.iter().map(|s| format!("Strength: {s}")));
    quality_items.extend(quality.improvements.iter().map(|s| format!("Improve: {s}")));

    let mut insights = Vec::new();
    if quality.avg_score < QUALITY_TARGET_SCORE {
        insights.push(
            "Response quality is below target. Expand examples and add measurable outcomes."
                .to_string(),
        );
    } else {
        insights.push(
            "Response quality trend is healthy. Keep clarity and impact framing consistent."
                .to_string(),
        );
    }
    if avg_confidence_pct < CONFIDENCE_TARGET_PCT {
        insights.push(
            "Confidence dropped in multiple intervals. Use slower pacing and controlled pauses."
                .to_string(),
        );
    }
    if face_presence_pct < FACE_PRESENCE_TARGET_PCT {
        insights.push(
            "Face framing consistency needs improvement. Reposition camera and maintain eye-line."
                .to_string(),
        );
    }

    let risk = input
        .proctoring
        .then(|| assess_risk(input.samples, input.tab_hidden_events));
    let risk_item_list = risk.as_ref().map(risk_items).unwrap_or_default();

    let next = next_step(
        risk.as_ref(),
        quality.avg_score,
        avg_confidence_pct,
        face_presence_pct,
    );

    SessionReport {
        duration_sec,
        avg_confidence_pct,
        face_presence_pct,
        avg_score: quality.avg_score,
        summary,
        expressions: expression_items(input.samples),
        insights,
        quality: quality_items,
        integrity: integrity_items(input),
        risk,
        risk_items: risk_item_list,
        next_step: next,
    }
}
