//! Response evaluation
//!
//! Scores one answer against its question. The opaque language-model
//! capability is tried first under a deadline budget; any unavailability,
//! timeout, or parse failure silently degrades to a deterministic heuristic.
//! Evaluation never fails from the caller's perspective.

use crate::error::EvalError;
use crate::types::{Evaluation, EvaluationSource, SessionConfig};
use serde::Deserialize;

/// Deadline budget for the language-model call (milliseconds).
///
/// This is a race, not a hard cancel: an implementation may let the
/// underlying call keep running, but a result arriving past the deadline is
/// reported as [`EvalError::Timeout`] and discarded.
pub const AI_EVALUATION_TIMEOUT_MS: u64 = 8000;

/// Maximum strength/improvement entries kept from a model response
pub const MAX_FEEDBACK_ITEMS: usize = 3;

// Heuristic scoring constants. Empirical tuning values carried over as-is.
pub const HEURISTIC_BASE_SCORE: f64 = 35.0;
pub const HEURISTIC_WORD_WEIGHT: f64 = 0.8;
pub const HEURISTIC_WORD_CAP: f64 = 35.0;
pub const HEURISTIC_STRUCTURE_BONUS: f64 = 15.0;
pub const HEURISTIC_NUMBER_BONUS: f64 = 8.0;
pub const HEURISTIC_SHORT_PENALTY: f64 = 18.0;
pub const HEURISTIC_SHORT_WORD_COUNT: usize = 25;
pub const HEURISTIC_MIN_SCORE: u32 = 10;
pub const HEURISTIC_MAX_SCORE: u32 = 95;

/// Structure-marker vocabulary rewarded by the heuristic (STAR framing)
pub const STRUCTURE_MARKERS: &[&str] = &["situation", "task", "action", "result", "impact"];

/// Word count at which an answer counts as having adequate depth
const DEPTH_WORD_COUNT: usize = 45;

/// Opaque AI text capability.
///
/// Absence is a normal, non-error condition: `availability` is probed before
/// each use and an unavailable model simply routes to the heuristic.
pub trait LanguageModel {
    /// Whether the capability can serve prompts right now
    fn is_available(&self) -> bool;

    /// Run a prompt with a deadline budget. Implementations must report
    /// [`EvalError::Timeout`] instead of returning a result past the
    /// deadline.
    fn prompt(&mut self, prompt: &str, deadline_ms: u64) -> Result<String, EvalError>;
}

/// Evaluates answers, preferring the language model with heuristic fallback
pub struct ResponseEvaluator {
    model: Option<Box<dyn LanguageModel>>,
}

impl ResponseEvaluator {
    /// Heuristic-only evaluator
    pub fn heuristic_only() -> Self {
        Self { model: None }
    }

    /// Evaluator that tries the given model first
    pub fn with_model(model: Box<dyn LanguageModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Evaluate one answer. Never fails: every model-path problem degrades
    /// to the heuristic.
    pub fn evaluate(&mut self, question: &str, answer: &str, config: &SessionConfig) -> Evaluation {
        match self.try_model(question, answer, config) {
            Ok(evaluation) => evaluation,
            Err(_) => heuristic_evaluate(question, answer),
        }
    }

    fn try_model(
        &mut self,
        question: &str,
        answer: &str,
        config: &SessionConfig,
    ) -> Result<Evaluation, EvalError> {
        let model = self.model.as_mut().ok_or(EvalError::Unavailable)?;
        if !model.is_available() {
            return Err(EvalError::Unavailable);
        }

        let prompt = build_prompt(question, answer, config);
        let response = model.prompt(&prompt, AI_EVALUATION_TIMEOUT_MS)?;
        parse_model_response(&response)
    }
}

/// Prompt sent to the language model
fn build_prompt(question: &str, answer: &str, config: &SessionConfig) -> String {
    [
        "You are an interview answer evaluator.".to_string(),
        format!("Interview Type: {}", config.interview_type.as_str()),
        format!("Topic: {}", config.topic_label()),
        format!("Difficulty: {}", config.difficulty.as_str()),
        format!("Question: {question}"),
        format!("Answer: {answer}"),
        "Return strict JSON only with keys:".to_string(),
        r#"{"score": number 0-100, "strengths": string[], "improvements": string[], "summary": string}"#
            .to_string(),
    ]
    .join("\n")
}

#[derive(Deserialize)]
struct ModelEvaluation {
    score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// Parse the model's free text into an [`Evaluation`].
///
/// The response must contain a single well-formed JSON object with a numeric
/// score; anything else is malformed and routes to the heuristic.
fn parse_model_response(text: &str) -> Result<Evaluation, EvalError> {
    let object =
        extract_json_object(text).ok_or_else(|| EvalError::Malformed("no JSON object".into()))?;
    let parsed: ModelEvaluation =
        serde_json::from_str(object).map_err(|err| EvalError::Malformed(err.to_string()))?;

    let mut strengths = parsed.strengths;
    strengths.truncate(MAX_FEEDBACK_ITEMS);
    let mut improvements = parsed.improvements;
    improvements.truncate(MAX_FEEDBACK_ITEMS);

    Ok(Evaluation {
        score: parsed.score.round().clamp(0.0, 100.0) as u32,
        strengths,
        improvements,
        summary: parsed
            .summary
            .unwrap_or_else(|| "AI quality evaluation completed.".to_string()),
        source: EvaluationSource::Ai,
    })
}

/// Substring from the first `{` to the last `}`, when both exist
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Deterministic fallback scorer.
///
/// Base 35, plus `min(35, words × 0.8)`, +15 for a structure marker, +8 for
/// any digit, −18 under 25 words, rounded and clamped to 10..=95.
pub fn heuristic_evaluate(question: &str, answer: &str) -> Evaluation {
    let word_count = answer.split_whitespace().count();
    let lower = answer.to_lowercase();
    let has_structure = STRUCTURE_MARKERS
        .iter()
        .any(|marker| lower.contains(marker));
    let has_numbers = answer.chars().any(|c| c.is_ascii_digit());

    let mut score = HEURISTIC_BASE_SCORE;
    score += (word_count as f64 * HEURISTIC_WORD_WEIGHT).min(HEURISTIC_WORD_CAP);
    if has_structure {
        score += HEURISTIC_STRUCTURE_BONUS;
    }
    if has_numbers {
        score += HEURISTIC_NUMBER_BONUS;
    }
    if word_count < HEURISTIC_SHORT_WORD_COUNT {
        score -= HEURISTIC_SHORT_PENALTY;
    }
    let score = (score.round() as i64)
        .clamp(HEURISTIC_MIN_SCORE as i64, HEURISTIC_MAX_SCORE as i64) as u32;

    let mut strengths = Vec::new();
    let mut improvements = Vec::new();

    if word_count >= DEPTH_WORD_COUNT {
        strengths.push("Response had adequate depth.".to_string());
    } else {
        improvements.push("Add more detail with concrete examples.".to_string());
    }

    if has_structure {
        strengths.push("Answer showed a structured narrative.".to_string());
    } else {
        improvements.push("Use STAR format to improve answer flow.".to_string());
    }

    if has_numbers {
        strengths.push("Included measurable impact.".to_string());
    } else {
        improvements.push("Include metrics or outcomes where possible.".to_string());
    }

    if strengths.is_empty() {
        strengths.push("You attempted a complete response to the question.".to_string());
    }

    Evaluation {
        score,
        strengths,
        improvements,
        summary: format!("Heuristic review for: {question}"),
        source: EvaluationSource::Heuristic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, InterviewType};
    use pretty_assertions::assert_eq;

    fn config() -> SessionConfig {
        SessionConfig {
            interview_type: InterviewType::Behavioral,
            topic: "general".to_string(),
            custom_topic: None,
            difficulty: Difficulty::Medium,
            question_count: 4,
        }
    }

    fn words(count: usize) -> String {
        vec!["delivered"; count].join(" ")
    }

    struct ScriptedModel {
        available: bool,
        result: Result<String, EvalError>,
        seen_prompts: Vec<String>,
    }

    impl LanguageModel for ScriptedModel {
        fn is_available(&self) -> bool {
            self.available
        }

        fn prompt(&mut self, prompt: &str, _deadline_ms: u64) -> Result<String, EvalError> {
            self.seen_prompts.push(prompt.to_string());
            self.result.clone()
        }
    }

    #[test]
    fn test_heuristic_twenty_plain_words_scores_33() {
        let evaluation = heuristic_evaluate("Q", &words(20));
        // 35 + 16 - 18 = 33, above the floor of 10
        assert_eq!(evaluation.score, 33);
        assert_eq!(evaluation.source, EvaluationSource::Heuristic);
    }

    #[test]
    fn test_heuristic_sixty_structured_numeric_words_scores_93() {
        let answer = format!("{} situation improved by 40 percent", words(55));
        assert!(answer.split_whitespace().count() >= 60);
        let evaluation = heuristic_evaluate("Q", &answer);
        // min(95, 35 + 35 + 15 + 8) = 93
        assert_eq!(evaluation.score, 93);
    }

    #[test]
    fn test_heuristic_floor_and_ceiling() {
        let tiny = heuristic_evaluate("Q", "no");
        assert!(tiny.score >= HEURISTIC_MIN_SCORE);

        let huge = format!("{} situation task action result 12345", words(200));
        let max = heuristic_evaluate("Q", &huge);
        assert!(max.score <= HEURISTIC_MAX_SCORE);
    }

    #[test]
    fn test_heuristic_always_has_a_strength() {
        let evaluation = heuristic_evaluate("Q", "short vague reply");
        assert!(!evaluation.strengths.is_empty());
        assert_eq!(
            evaluation.strengths[0],
            "You attempted a complete response to the question."
        );
        assert_eq!(evaluation.improvements.len(), 3);
    }

    #[test]
    fn test_model_result_preferred_when_valid() {
        let model = ScriptedModel {
            available: true,
            result: Ok(r#"Here is my verdict: {"score": 88, "strengths": ["Clear framing"], "improvements": [], "summary": "Strong answer."} hope that helps"#.to_string()),
            seen_prompts: Vec::new(),
        };
        let mut evaluator = ResponseEvaluator::with_model(Box::new(model));
        let evaluation = evaluator.evaluate("Q", &words(30), &config());

        assert_eq!(evaluation.source, EvaluationSource::Ai);
        assert_eq!(evaluation.score, 88);
        assert_eq!(evaluation.strengths, vec!["Clear framing".to_string()]);
        assert_eq!(evaluation.summary, "Strong answer.");
    }

    #[test]
    fn test_model_feedback_truncated_to_three() {
        let model = ScriptedModel {
            available: true,
            result: Ok(r#"{"score": 70, "strengths": ["a","b","c","d","e"], "improvements": ["1","2","3","4"]}"#.to_string()),
            seen_prompts: Vec::new(),
        };
        let mut evaluator = ResponseEvaluator::with_model(Box::new(model));
        let evaluation = evaluator.evaluate("Q", &words(30), &config());

        assert_eq!(evaluation.strengths.len(), 3);
        assert_eq!(evaluation.improvements.len(), 3);
    }

    #[test]
    fn test_model_score_clamped_to_0_100() {
        let model = ScriptedModel {
            available: true,
            result: Ok(r#"{"score": 240}"#.to_string()),
            seen_prompts: Vec::new(),
        };
        let mut evaluator = ResponseEvaluator::with_model(Box::new(model));
        assert_eq!(evaluator.evaluate("Q", &words(30), &config()).score, 100);
    }

    #[test]
    fn test_timeout_falls_back_to_heuristic() {
        let model = ScriptedModel {
            available: true,
            result: Err(EvalError::Timeout),
            seen_prompts: Vec::new(),
        };
        let mut evaluator = ResponseEvaluator::with_model(Box::new(model));
        let evaluation = evaluator.evaluate("Q", &words(20), &config());
        assert_eq!(evaluation.source, EvaluationSource::Heuristic);
        assert_eq!(evaluation.score, 33);
    }

    #[test]
    fn test_malformed_model_response_falls_back() {
        for bad in [
            "no json here",
            r#"{"score": "high"}"#,
            r#"{"strengths": []}"#,
            "{unbalanced",
        ] {
            let model = ScriptedModel {
                available: true,
                result: Ok(bad.to_string()),
                seen_prompts: Vec::new(),
            };
            let mut evaluator = ResponseEvaluator::with_model(Box::new(model));
            let evaluation = evaluator.evaluate("Q", &words(20), &config());
            assert_eq!(evaluation.source, EvaluationSource::Heuristic, "case: {bad}");
        }
    }

    #[test]
    fn test_unavailable_model_is_not_an_error() {
        let model = ScriptedModel {
            available: false,
            result: Ok(r#"{"score": 99}"#.to_string()),
            seen_prompts: Vec::new(),
        };
        let mut evaluator = ResponseEvaluator::with_model(Box::new(model));
        let evaluation = evaluator.evaluate("Q", &words(20), &config());
        assert_eq!(evaluation.source, EvaluationSource::Heuristic);
    }

    #[test]
    fn test_prompt_carries_config_context() {
        let prompt = build_prompt("Why this role?", "Because impact.", &config());
        assert!(prompt.contains("Interview Type: behavioral"));
        assert!(prompt.contains("Topic: general"));
        assert!(prompt.contains("Difficulty: medium"));
        assert!(prompt.contains("Question: Why this role?"));
    }

    #[test]
    fn test_extract_json_object_spans_first_to_last_brace() {
        assert_eq!(
            extract_json_object(r#"x {"a": {"b": 1}} y"#),
            Some(r#"{"a": {"b": 1}}"#)
        );
        assert_eq!(extract_json_object("no braces"), None);
        assert_eq!(extract_json_object("} {"), None);
    }
}
