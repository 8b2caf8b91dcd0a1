//! Integrity guard
//!
//! Observes window/document-level signals during an armed session and turns
//! them into debounced policy-violation events. Armed only while the setup
//! screen is hidden and the session has not ended. Three accepted violations
//! force the session to end.
//!
//! Accepted violations queue one modal-style notification each; the queue is
//! FIFO with no collapsing, and the next notification shows on dismissal.

use crate::types::PolicyEvent;
use std::collections::VecDeque;

/// Minimum gap between any two accepted violations (milliseconds)
pub const VIOLATION_DEBOUNCE_MS: i64 = 1200;

/// Minimum gap between two accepted violations with the same reason
/// (milliseconds)
pub const SAME_REASON_DEBOUNCE_MS: i64 = 3500;

/// Accepted violations before the session is force-ended
pub const MAX_POLICY_VIOLATIONS: u32 = 3;

/// Status text used when the ceiling forces the session to end
pub const CEILING_MESSAGE: &str = "Session ended due to repeated integrity violations.";

/// Clipboard interaction kinds the guard blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardAction {
    Copy,
    Cut,
    Paste,
    Drop,
}

/// Window/document-level signal observed by the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegritySignal {
    /// Tab or window became hidden
    TabHidden,
    /// Window lost focus
    WindowBlur,
    /// Clipboard interaction on the answer input
    Clipboard(ClipboardAction),
    /// A restricted keyboard shortcut was used
    BlockedShortcut,
    /// Context menu was opened
    ContextMenu,
}

impl IntegritySignal {
    /// Violation reason text for this signal
    pub fn reason(&self) -> &'static str {
        match self {
            IntegritySignal::TabHidden => "Tab or window switch detected.",
            IntegritySignal::WindowBlur => "Window focus lost.",
            IntegritySignal::Clipboard(ClipboardAction::Copy) => "Copy is disabled during session.",
            IntegritySignal::Clipboard(ClipboardAction::Cut) => "Cut is disabled during session.",
            IntegritySignal::Clipboard(ClipboardAction::Paste) => "Paste is disabled.",
            IntegritySignal::Clipboard(ClipboardAction::Drop) => {
                "Drag and drop input is disabled."
            }
            IntegritySignal::BlockedShortcut => "Restricted keyboard shortcut used.",
            IntegritySignal::ContextMenu => "Context menu is disabled during session.",
        }
    }
}

/// A keyboard chord as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord<'a> {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    /// Lowercased key name ("c", "tab", ...)
    pub key: &'a str,
}

/// Whether a chord is on the restricted-shortcut list.
///
/// Blocked: Ctrl/Cmd + C/V/X/T/N/W, Ctrl+Tab, Alt+Tab.
pub fn is_blocked_shortcut(chord: &KeyChord<'_>) -> bool {
    let clipboard_or_window = matches!(chord.key, "c" | "v" | "x" | "t" | "n" | "w");
    (chord.ctrl && (clipboard_or_window || chord.key == "tab"))
        || (chord.meta && clipboard_or_window)
        || (chord.alt && chord.key == "tab")
}

/// Whether a blocked chord is a clipboard shortcut (counted separately)
pub fn is_clipboard_shortcut(chord: &KeyChord<'_>) -> bool {
    matches!(chord.key, "c" | "v" | "x") && (chord.ctrl || chord.meta)
}

/// Outcome of observing one signal
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// Guard disarmed, or the signal is suppressed while a notification modal
    /// is open
    Ignored,
    /// Accepted too recently; no event raised
    Debounced,
    /// A violation was accepted
    Accepted(PolicyEvent),
    /// The accepted violation reached the ceiling; the session must end
    CeilingReached(PolicyEvent),
}

/// Debouncing violation state machine with a FIFO notification queue
pub struct IntegrityGuard {
    armed: bool,
    violation_count: u32,
    clipboard_attempts: u32,
    last_violation_at: i64,
    last_reason: &'static str,
    notifications: VecDeque<String>,
}

impl Default for IntegrityGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegrityGuard {
    /// New guard in the `Disarmed` state
    pub fn new() -> Self {
        Self {
            armed: false,
            violation_count: 0,
            clipboard_attempts: 0,
            last_violation_at: 0,
            last_reason: "",
            notifications: VecDeque::new(),
        }
    }

    /// Arm the guard (setup hidden, session running)
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Disarm the guard (setup screen shown, or session ended)
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Observe one signal at `now_ms`.
    ///
    /// Debounce policy: suppressed when fewer than
    /// [`VIOLATION_DEBOUNCE_MS`] elapsed since the previous accepted
    /// violation of any reason, and when the same reason recurs within
    /// [`SAME_REASON_DEBOUNCE_MS`]. Focus-loss signals are suppressed while a
    /// notification modal is open, since the modal itself steals focus.
    pub fn observe(&mut self, signal: IntegritySignal, now_ms: i64) -> GuardOutcome {
        if !self.armed {
            return GuardOutcome::Ignored;
        }

        let focus_signal = matches!(
            signal,
            IntegritySignal::TabHidden | IntegritySignal::WindowBlur
        );
        if focus_signal && self.notification().is_some() {
            return GuardOutcome::Ignored;
        }

        if let IntegritySignal::Clipboard(_) = signal {
            self.clipboard_attempts += 1;
        }

        let reason = signal.reason();
        if self.violation_count > 0 {
            if now_ms - self.last_violation_at < VIOLATION_DEBOUNCE_MS {
                return GuardOutcome::Debounced;
            }
            if reason == self.last_reason
                && now_ms - self.last_violation_at < SAME_REASON_DEBOUNCE_MS
            {
                return GuardOutcome::Debounced;
            }
        }

        self.last_violation_at = now_ms;
        self.last_reason = reason;
        self.violation_count += 1;

        let event = PolicyEvent {
            timestamp: now_ms,
            reason: reason.to_string(),
            sequence_number: self.violation_count,
        };

        let remaining = MAX_POLICY_VIOLATIONS.saturating_sub(self.violation_count);
        let mut warning = format!(
            "Warning {}/{}: {}",
            self.violation_count, MAX_POLICY_VIOLATIONS, reason
        );
        if remaining > 0 {
            warning.push_str(&format!(" {remaining} attempts left."));
        }
        self.notifications.push_back(warning);

        if self.violation_count >= MAX_POLICY_VIOLATIONS {
            self.disarm();
            GuardOutcome::CeilingReached(event)
        } else {
            GuardOutcome::Accepted(event)
        }
    }

    /// Observe a keyboard chord; raises a violation only for blocked chords.
    /// Clipboard chords also count toward the clipboard-attempt total.
    pub fn observe_key_chord(&mut self, chord: &KeyChord<'_>, now_ms: i64) -> GuardOutcome {
        if !self.armed || !is_blocked_shortcut(chord) {
            return GuardOutcome::Ignored;
        }
        if is_clipboard_shortcut(chord) {
            self.clipboard_attempts += 1;
        }
        self.observe(IntegritySignal::BlockedShortcut, now_ms)
    }

    /// Currently displayed notification, if any
    pub fn notification(&self) -> Option<&str> {
        self.notifications.front().map(String::as_str)
    }

    /// Dismiss the current notification; the next queued one (if any)
    /// becomes current
    pub fn dismiss_notification(&mut self) -> Option<String> {
        self.notifications.pop_front()
    }

    /// Accepted violations so far
    pub fn violation_count(&self) -> u32 {
        self.violation_count
    }

    /// Blocked clipboard interactions (including clipboard shortcuts)
    pub fn clipboard_attempts(&self) -> u32 {
        self.clipboard_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn armed_guard() -> IntegrityGuard {
        let mut guard = IntegrityGuard::new();
        guard.arm();
        guard
    }

    #[test]
    fn test_disarmed_guard_ignores_signals() {
        let mut guard = IntegrityGuard::new();
        let outcome = guard.observe(IntegritySignal::TabHidden, 1_000);
        assert_eq!(outcome, GuardOutcome::Ignored);
        assert_eq!(guard.violation_count(), 0);
    }

    #[test]
    fn test_same_reason_1000ms_apart_counts_once() {
        let mut guard = armed_guard();
        assert!(matches!(
            guard.observe(IntegritySignal::TabHidden, 10_000),
            GuardOutcome::Accepted(_)
        ));
        guard.dismiss_notification();
        assert_eq!(
            guard.observe(IntegritySignal::TabHidden, 11_000),
            GuardOutcome::Debounced
        );
        assert_eq!(guard.violation_count(), 1);
    }

    #[test]
    fn test_same_reason_4000ms_apart_counts_twice() {
        let mut guard = armed_guard();
        guard.observe(IntegritySignal::TabHidden, 10_000);
        guard.dismiss_notification();
        assert!(matches!(
            guard.observe(IntegritySignal::TabHidden, 14_000),
            GuardOutcome::Accepted(_)
        ));
        assert_eq!(guard.violation_count(), 2);
    }

    #[test]
    fn test_different_reasons_1300ms_apart_count_twice() {
        let mut guard = armed_guard();
        guard.observe(IntegritySignal::ContextMenu, 10_000);
        assert!(matches!(
            guard.observe(IntegritySignal::BlockedShortcut, 11_300),
            GuardOutcome::Accepted(_)
        ));
        assert_eq!(guard.violation_count(), 2);
    }

    #[test]
    fn test_different_reasons_1000ms_apart_debounced() {
        let mut guard = armed_guard();
        guard.observe(IntegritySignal::ContextMenu, 10_000);
        assert_eq!(
            guard.observe(IntegritySignal::BlockedShortcut, 11_000),
            GuardOutcome::Debounced
        );
    }

    #[test]
    fn test_ceiling_forces_end_at_three() {
        let mut guard = armed_guard();
        guard.observe(IntegritySignal::ContextMenu, 10_000);
        guard.observe(IntegritySignal::BlockedShortcut, 12_000);
        assert_eq!(guard.violation_count(), 2);

        let outcome = guard.observe(IntegritySignal::ContextMenu, 14_000);
        match outcome {
            GuardOutcome::CeilingReached(event) => {
                assert_eq!(event.sequence_number, 3);
            }
            other => panic!("expected ceiling, got {other:?}"),
        }
        assert!(!guard.is_armed());
    }

    #[test]
    fn test_two_violations_do_not_force_end() {
        let mut guard = armed_guard();
        guard.observe(IntegritySignal::ContextMenu, 10_000);
        let outcome = guard.observe(IntegritySignal::BlockedShortcut, 12_000);
        assert!(matches!(outcome, GuardOutcome::Accepted(_)));
        assert!(guard.is_armed());
    }

    #[test]
    fn test_sequence_numbers_are_monotonic() {
        let mut guard = armed_guard();
        let first = guard.observe(IntegritySignal::ContextMenu, 10_000);
        let second = guard.observe(IntegritySignal::BlockedShortcut, 12_000);
        match (first, second) {
            (GuardOutcome::Accepted(a), GuardOutcome::Accepted(b)) => {
                assert_eq!(a.sequence_number, 1);
                assert_eq!(b.sequence_number, 2);
            }
            other => panic!("expected two accepted events, got {other:?}"),
        }
    }

    #[test]
    fn test_notifications_queue_fifo_without_collapsing() {
        let mut guard = armed_guard();
        guard.observe(IntegritySignal::ContextMenu, 10_000);
        guard.observe(IntegritySignal::BlockedShortcut, 12_000);

        let first = guard.notification().unwrap().to_string();
        assert!(first.starts_with("Warning 1/3"));
        assert!(first.ends_with("2 attempts left."));

        guard.dismiss_notification();
        let second = guard.notification().unwrap();
        assert!(second.starts_with("Warning 2/3"));

        guard.dismiss_notification();
        assert_eq!(guard.notification(), None);
    }

    #[test]
    fn test_focus_signals_suppressed_while_modal_open() {
        let mut guard = armed_guard();
        guard.observe(IntegritySignal::ContextMenu, 10_000);
        assert!(guard.notification().is_some());

        // The modal steals focus; blur must not cascade into a violation.
        assert_eq!(
            guard.observe(IntegritySignal::WindowBlur, 15_000),
            GuardOutcome::Ignored
        );

        guard.dismiss_notification();
        assert!(matches!(
            guard.observe(IntegritySignal::WindowBlur, 16_000),
            GuardOutcome::Accepted(_)
        ));
    }

    #[test]
    fn test_clipboard_attempts_counted_even_when_debounced() {
        let mut guard = armed_guard();
        guard.observe(IntegritySignal::Clipboard(ClipboardAction::Paste), 10_000);
        guard.observe(IntegritySignal::Clipboard(ClipboardAction::Copy), 10_500);
        assert_eq!(guard.violation_count(), 1);
        assert_eq!(guard.clipboard_attempts(), 2);
    }

    #[test]
    fn test_blocked_shortcut_classifier() {
        let ctrl_c = KeyChord {
            ctrl: true,
            meta: false,
            alt: false,
            key: "c",
        };
        assert!(is_blocked_shortcut(&ctrl_c));
        assert!(is_clipboard_shortcut(&ctrl_c));

        let alt_tab = KeyChord {
            ctrl: false,
            meta: false,
            alt: true,
            key: "tab",
        };
        assert!(is_blocked_shortcut(&alt_tab));
        assert!(!is_clipboard_shortcut(&alt_tab));

        let meta_tab = KeyChord {
            ctrl: false,
            meta: true,
            alt: false,
            key: "tab",
        };
        assert!(!is_blocked_shortcut(&meta_tab));

        let plain_c = KeyChord {
            ctrl: false,
            meta: false,
            alt: false,
            key: "c",
        };
        assert!(!is_blocked_shortcut(&plain_c));
    }

    #[test]
    fn test_key_chord_observation_counts_clipboard() {
        let mut guard = armed_guard();
        let ctrl_v = KeyChord {
            ctrl: true,
            meta: false,
            alt: false,
            key: "v",
        };
        assert!(matches!(
            guard.observe_key_chord(&ctrl_v, 10_000),
            GuardOutcome::Accepted(_)
        ));
        assert_eq!(guard.clipboard_attempts(), 1);

        let plain = KeyChord {
            ctrl: false,
            meta: false,
            alt: false,
            key: "a",
        };
        assert_eq!(guard.observe_key_chord(&plain, 20_000), GuardOutcome::Ignored);
    }
}
