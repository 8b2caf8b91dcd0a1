//! Session aggregation
//!
//! Top-level per-session state machine: `Configuring → Running → Ended`, with
//! `Ended` terminal. While running it accumulates metrics samples, policy
//! events, question responses, and proctor signals arriving over the sync
//! channel; on end it synthesizes the report exactly once.

use crate::channel::{Envelope, ProctorSignal, SyncMessage};
use crate::error::SessionError;
use crate::report::{build_report, ReportInput, SessionReport};
use crate::types::{MetricsSample, PolicyEvent, QuestionResponse, SessionConfig};
use log::{debug, info};
use uuid::Uuid;

/// Lifecycle phase of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Configuring,
    Running,
    /// Terminal. No further input is accepted.
    Ended,
}

/// Accumulates one session's observations and synthesizes its report
pub struct SessionAggregator {
    session_id: Uuid,
    config: SessionConfig,
    phase: SessionPhase,
    questions_total: usize,
    started_at: i64,
    samples: Vec<MetricsSample>,
    responses: Vec<QuestionResponse>,
    policy_events: Vec<PolicyEvent>,
    violation_count: u32,
    clipboard_attempts: u32,
    tab_hidden_events: u32,
    last_interviewee_status: Option<String>,
    proctoring: bool,
    report: Option<SessionReport>,
}

impl SessionAggregator {
    pub fn new(config: SessionConfig, questions_total: usize, proctoring: bool) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            config,
            phase: SessionPhase::Configuring,
            questions_total,
            started_at: 0,
            samples: Vec::new(),
            responses: Vec::new(),
            policy_events: Vec::new(),
            violation_count: 0,
            clipboard_attempts: 0,
            tab_hidden_events: 0,
            last_interviewee_status: None,
            proctoring,
            report: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Latest status text relayed from the interviewee context
    pub fn last_interviewee_status(&self) -> Option<&str> {
        self.last_interviewee_status.as_deref()
    }

    /// Leave `Configuring` and start accepting input
    pub fn start(&mut self, now_ms: i64) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Configuring => {
                self.phase = SessionPhase::Running;
                self.started_at = now_ms;
                info!("session {} started", self.session_id);
                Ok(())
            }
            SessionPhase::Ended => Err(SessionError::SessionEnded),
            SessionPhase::Running => Ok(()),
        }
    }

    /// Record a metrics sample. Samples with a timestamp at or before the
    /// latest recorded one are dropped.
    pub fn record_sample(&mut self, sample: MetricsSample) -> Result<(), SessionError> {
        self.ensure_running()?;
        if let Some(last) = self.samples.last() {
            if sample.timestamp <= last.timestamp {
                debug!(
                    "dropping out-of-order sample at {} (latest {})",
                    sample.timestamp, last.timestamp
                );
                return Ok(());
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Record an accepted policy violation
    pub fn record_policy_event(&mut self, event: PolicyEvent) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.violation_count += 1;
        self.policy_events.push(event);
        Ok(())
    }

    /// Mirror the guard's blocked clipboard-attempt counter into the report
    pub fn set_clipboard_attempts(&mut self, attempts: u32) {
        self.clipboard_attempts = attempts;
    }

    /// Record an evaluated answer. Each question number is answered at most
    /// once.
    pub fn record_response(&mut self, response: QuestionResponse) -> Result<(), SessionError> {
        self.ensure_running()?;
        if self
            .responses
            .iter()
            .any(|r| r.question_number == response.question_number)
        {
            return Err(SessionError::DuplicateResponse(response.question_number));
        }
        self.responses.push(response);
        Ok(())
    }

    /// Consume one inbound sync-channel envelope.
    ///
    /// Tolerates loss and disorder per the channel contract; messages that do
    /// not concern aggregation are ignored. A `session:end` from the peer is
    /// surfaced to the caller rather than ending locally, so the caller can
    /// run its own teardown path.
    pub fn handle_message(&mut self, envelope: Envelope) -> Result<(), SessionError> {
        self.ensure_running()?;
        match envelope.message {
            SyncMessage::MetricsUpdate { metrics } => self.record_sample(metrics),
            SyncMessage::ProctorEvent {
                signal,
                policy_event,
            } => {
                if signal == ProctorSignal::TabHidden {
                    self.tab_hidden_events += 1;
                }
                if let Some(event) = policy_event {
                    self.record_policy_event(event)?;
                }
                Ok(())
            }
            SyncMessage::IntervieweeStatus { status_text } => {
                self.last_interviewee_status = Some(status_text);
                Ok(())
            }
            SyncMessage::QuestionUpdate { .. } | SyncMessage::SessionEnd => Ok(()),
        }
    }

    /// Transition to `Ended` and synthesize the report. Idempotent: a second
    /// call returns the already-built report.
    pub fn end(&mut self, now_ms: i64) -> &SessionReport {
        if self.report.is_none() {
            self.phase = SessionPhase::Ended;
            let input = ReportInput {
                config: &self.config,
                questions_total: self.questions_total,
                samples: &self.samples,
                responses: &self.responses,
                policy_events: &self.policy_events,
                violation_count: self.violation_count,
                clipboard_attempts: self.clipboard_attempts,
                tab_hidden_events: self.tab_hidden_events,
                duration_ms: now_ms - self.started_at,
                proctoring: self.proctoring,
            };
            let report = build_report(&input);
            info!(
                "session {} ended: {} samples, {} responses, {} violations",
                self.session_id,
                self.samples.len(),
                self.responses.len(),
                self.violation_count
            );
            return self.report.insert(report);
        }
        self.report.as_ref().expect("report synthesized on first end")
    }

    /// The synthesized report, once the session has ended
    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Running => Ok(()),
            SessionPhase::Configuring => Err(SessionError::NotRunning),
            SessionPhase::Ended => Err(SessionError::SessionEnded),
        }
    }
}
