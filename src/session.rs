//! Practice session orchestration
//!
//! Wires the question set, evaluator, integrity guard, and aggregator into
//! one interviewee-facing session. The host feeds it answers, metrics
//! samples, and integrity signals; the session advances questions, enforces
//! the violation ceiling, and hands back the final report.

use crate::aggregator::{SessionAggregator, SessionPhase};
use crate::error::SessionError;
use crate::evaluator::ResponseEvaluator;
use crate::guard::{GuardOutcome, IntegrityGuard, IntegritySignal, KeyChord, CEILING_MESSAGE};
use crate::questions::build_question_set;
use crate::report::SessionReport;
use crate::types::{MetricsSample, QuestionResponse, ResponseMode, SessionConfig};
use log::info;

/// Result of submitting one answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Answer evaluated; the next question is up
    NextQuestion,
    /// Answer evaluated and it was the last question; end the session to get
    /// the report
    AllQuestionsEvaluated,
}

/// One interviewee practice session from configuration to report
pub struct PracticeSession {
    questions: Vec<String>,
    question_index: usize,
    evaluator: ResponseEvaluator,
    guard: IntegrityGuard,
    aggregator: SessionAggregator,
    end_reason: Option<String>,
}

impl PracticeSession {
    /// Build a session from its configuration. `proctoring` enables the risk
    /// section of the final report.
    pub fn new(config: SessionConfig, evaluator: ResponseEvaluator, proctoring: bool) -> Self {
        let questions = build_question_set(&config);
        let aggregator = SessionAggregator::new(config, questions.len(), proctoring);
        Self {
            questions,
            question_index: 0,
            evaluator,
            guard: IntegrityGuard::new(),
            aggregator,
            end_reason: None,
        }
    }

    /// Start the session: accepts input and arms the integrity guard
    pub fn start(&mut self, now_ms: i64) -> Result<(), SessionError> {
        self.aggregator.start(now_ms)?;
        self.guard.arm();
        Ok(())
    }

    pub fn phase(&self) -> SessionPhase {
        self.aggregator.phase()
    }

    pub fn guard(&self) -> &IntegrityGuard {
        &self.guard
    }

    /// Dismiss the current integrity notification, if one is shown
    pub fn dismiss_notification(&mut self) -> Option<String> {
        self.guard.dismiss_notification()
    }

    /// Question currently awaiting an answer, `None` once all are answered
    pub fn current_question(&self) -> Option<&str> {
        self.questions.get(self.question_index).map(String::as_str)
    }

    /// "Question n of m" progress label
    pub fn question_progress(&self) -> String {
        format!(
            "Question {} of {}",
            (self.question_index + 1).min(self.questions.len()),
            self.questions.len()
        )
    }

    /// Why the session ended, when it was forced rather than user-requested
    pub fn end_reason(&self) -> Option<&str> {
        self.end_reason.as_deref()
    }

    /// Record one detection-tick metrics sample
    pub fn record_sample(&mut self, mut sample: MetricsSample) -> Result<(), SessionError> {
        sample.question_index = self.question_index as u32;
        self.aggregator.record_sample(sample)
    }

    /// Submit the answer for the current question.
    ///
    /// The answer is trimmed; an empty answer is rejected without advancing.
    /// Evaluation itself never fails (the evaluator degrades internally), so
    /// a successful submit always records a response and advances.
    pub fn submit_answer(
        &mut self,
        answer: &str,
        mode: ResponseMode,
        _now_ms: i64,
    ) -> Result<SubmitOutcome, SessionError> {
        if self.phase() == SessionPhase::Ended {
            return Err(SessionError::SessionEnded);
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(SessionError::EmptyAnswer);
        }
        let question = self
            .current_question()
            .ok_or(SessionError::SessionEnded)?
            .to_string();

        let evaluation = self
            .evaluator
            .evaluate(&question, answer, self.aggregator.config());
        self.aggregator.record_response(QuestionResponse {
            question_number: self.question_index as u32 + 1,
            question,
            answer: answer.to_string(),
            evaluation,
            response_mode: mode,
        })?;

        if self.question_index + 1 < self.questions.len() {
            self.question_index += 1;
            Ok(SubmitOutcome::NextQuestion)
        } else {
            self.question_index = self.questions.len();
            Ok(SubmitOutcome::AllQuestionsEvaluated)
        }
    }

    /// Route one integrity signal through the guard. Accepted violations are
    /// recorded; a ceiling breach force-ends the session.
    pub fn observe_integrity(
        &mut self,
        signal: IntegritySignal,
        now_ms: i64,
    ) -> Result<GuardOutcome, SessionError> {
        let outcome = self.guard.observe(signal, now_ms);
        self.apply_guard_outcome(&outcome, now_ms)?;
        Ok(outcome)
    }

    /// Route one keyboard chord through the guard
    pub fn observe_key_chord(
        &mut self,
        chord: &KeyChord<'_>,
        now_ms: i64,
    ) -> Result<GuardOutcome, SessionError> {
        let outcome = self.guard.observe_key_chord(chord, now_ms);
        self.apply_guard_outcome(&outcome, now_ms)?;
        Ok(outcome)
    }

    fn apply_guard_outcome(
        &mut self,
        outcome: &GuardOutcome,
        now_ms: i64,
    ) -> Result<(), SessionError> {
        match outcome {
            GuardOutcome::Accepted(event) => {
                self.aggregator.record_policy_event(event.clone())
            }
            GuardOutcome::CeilingReached(event) => {
                self.aggregator.record_policy_event(event.clone())?;
                info!("violation ceiling reached, force-ending session");
                self.end_reason = Some(CEILING_MESSAGE.to_string());
                self.end(now_ms);
                Ok(())
            }
            GuardOutcome::Ignored | GuardOutcome::Debounced => Ok(()),
        }
    }

    /// End the session and synthesize the report. Idempotent.
    pub fn end(&mut self, now_ms: i64) -> &SessionReport {
        self.guard.disarm();
        self.aggregator
            .set_clipboard_attempts(self.guard.clipboard_attempts());
        self.aggregator.end(now_ms)
    }

    /// The final report, once ended
    pub fn report(&self) -> Option<&SessionReport> {
        self.aggregator.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::MAX_POLICY_VIOLATIONS;
    use crate::types::{Difficulty, FaceMetrics, InterviewType};
    use pretty_assertions::assert_eq;

    fn config(question_count: u32) -> SessionConfig {
        SessionConfig {
            interview_type: InterviewType::Behavioral,
            topic: "general".to_string(),
            custom_topic: None,
            difficulty: Difficulty::Medium,
            question_count,
        }
    }

    fn session(question_count: u32) -> PracticeSession {
        let mut session = PracticeSession::new(
            config(question_count),
            ResponseEvaluator::heuristic_only(),
            false,
        );
        session.start(1_000).unwrap();
        session
    }

    fn strong_answer() -> String {
        let filler = vec!["delivered"; 55].join(" ");
        format!("{filler} situation improved by 40 percent")
    }

    fn sample(timestamp: i64) -> MetricsSample {
        MetricsSample {
            timestamp,
            question_index: 0,
            metrics: FaceMetrics {
                has_face: true,
                face_count: 1,
                dominant_expression: "happy".to_string(),
                confidence: 0.8,
                attention_away: false,
                background_motion_score: None,
            },
        }
    }

    #[test]
    fn test_empty_answer_rejected_without_advancing() {
        let mut session = session(2);
        let first_question = session.current_question().unwrap().to_string();
        assert_eq!(
            session.submit_answer("   ", ResponseMode::Text, 2_000),
            Err(SessionError::EmptyAnswer)
        );
        assert_eq!(session.current_question(), Some(first_question.as_str()));
    }

    #[test]
    fn test_answers_advance_until_all_evaluated() {
        let mut session = session(2);
        assert_eq!(session.question_progress(), "Question 1 of 2");
        assert_eq!(
            session
                .submit_answer(&strong_answer(), ResponseMode::Text, 2_000)
                .unwrap(),
            SubmitOutcome::NextQuestion
        );
        assert_eq!(session.question_progress(), "Question 2 of 2");
        assert_eq!(
            session
                .submit_answer(&strong_answer(), ResponseMode::Text, 3_000)
                .unwrap(),
            SubmitOutcome::AllQuestionsEvaluated
        );
        assert_eq!(session.current_question(), None);
    }

    #[test]
    fn test_end_to_end_strong_answers_reach_harder_questions_next_step() {
        let mut session = session(4);
        for i in 0..4 {
            session.record_sample(sample(1_000 + i * 120)).unwrap();
            session
                .submit_answer(&strong_answer(), ResponseMode::Text, 2_000 + i)
                .unwrap();
        }
        let report = session.end(120_000);

        assert!(report.avg_score >= 90);
        assert!(report.next_step.contains("harder questions"));
        assert!(report
            .summary
            .contains(&"Questions attempted: 4/4".to_string()));
    }

    #[test]
    fn test_ceiling_breach_force_ends_with_message() {
        let mut session = session(4);
        let mut now = 10_000;
        for _ in 0..MAX_POLICY_VIOLATIONS {
            session
                .observe_integrity(IntegritySignal::ContextMenu, now)
                .unwrap();
            session.dismiss_notification();
            now += 5_000;
        }

        assert_eq!(session.phase(), SessionPhase::Ended);
        assert_eq!(session.end_reason(), Some(CEILING_MESSAGE));
        let report = session.report().unwrap();
        assert!(report.integrity[0].starts_with("Policy violations: 3/3"));
    }

    #[test]
    fn test_two_violations_leave_session_running() {
        let mut session = session(4);
        session
            .observe_integrity(IntegritySignal::ContextMenu, 10_000)
            .unwrap();
        session.dismiss_notification();
        session
            .observe_integrity(IntegritySignal::TabHidden, 15_000)
            .unwrap();

        assert_eq!(session.phase(), SessionPhase::Running);
        assert_eq!(session.end_reason(), None);
    }

    #[test]
    fn test_clipboard_attempts_flow_into_report() {
        let mut session = session(4);
        let ctrl_v = KeyChord {
            ctrl: true,
            meta: false,
            alt: false,
            key: "v",
        };
        session.observe_key_chord(&ctrl_v, 10_000).unwrap();
        let report = session.end(20_000);
        assert!(report
            .integrity
            .contains(&"Copy/paste attempts blocked: 1".to_string()));
    }

    #[test]
    fn test_submit_after_end_rejected() {
        let mut session = session(1);
        session.end(5_000);
        assert_eq!(
            session.submit_answer("answer", ResponseMode::Text, 6_000),
            Err(SessionError::SessionEnded)
        );
    }

    #[test]
    fn test_samples_stamped_with_current_question_index() {
        let mut session = session(2);
        session
            .submit_answer(&strong_answer(), ResponseMode::Text, 2_000)
            .unwrap();
        // Sample arrives while question 2 (index 1) is active.
        let mut raw = sample(3_000);
        raw.question_index = 99;
        session.record_sample(raw).unwrap();
        let report = session.end(10_000);
        assert_eq!(report.face_presence_pct, 100);
    }

    #[test]
    fn test_guard_disarmed_after_end() {
        let mut session = session(1);
        session.end(5_000);
        let outcome = session
            .observe_integrity(IntegritySignal::TabHidden, 6_000)
            .unwrap();
        assert_eq!(outcome, GuardOutcome::Ignored);
    }
}
