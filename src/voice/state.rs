//! Voice interaction states and their transition table

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the assistant is doing right now
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceState {
    #[default]
    Idle,
    Listening,
    Processing,
    Speaking,
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Speaking => "speaking",
        })
    }
}

/// Inputs that can move the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceInput {
    /// Capture was started after a tap
    ListenStarted,
    /// A transcript or typed query was accepted
    QueryAccepted,
    /// The query produced an answer
    Answered,
    /// A playback resource started playing
    PlaybackStarted,
    /// The live playback ended on its own or was stopped
    PlaybackEnded,
    /// Capture ended without a usable transcript
    CaptureEnded,
    /// User interrupt (tap or stop)
    Interrupt,
    /// Any terminal error
    Failed,
}

/// Next state for `input`, or `state` unchanged when the input does not apply
#[must_use]
pub const fn next_state(state: VoiceState, input: VoiceInput) -> VoiceState {
    use VoiceInput as I;
    use VoiceState as S;

    match (state, input) {
        (S::Idle, I::ListenStarted) => S::Listening,
        (S::Idle | S::Listening | S::Speaking, I::QueryAccepted) => S::Processing,
        (S::Processing, I::Answered) => S::Idle,
        (S::Idle | S::Speaking, I::PlaybackStarted) => S::Speaking,
        (S::Speaking, I::PlaybackEnded) | (S::Listening, I::CaptureEnded) => S::Idle,
        // Processing cannot be interrupted
        (S::Listening | S::Speaking, I::Interrupt) => S::Idle,
        (_, I::Failed) => S::Idle,
        (s, _) => s,
    }
}

/// Pure voice state machine: transitions only, no I/O
#[derive(Debug, Default)]
pub struct VoiceStateMachine {
    state: VoiceState,
}

impl VoiceStateMachine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: VoiceState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> VoiceState {
        self.state
    }

    /// Apply an input and return the resulting state
    pub fn advance(&mut self, input: VoiceInput) -> VoiceState {
        let next = next_state(self.state, input);
        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, ?input, "voice state");
        }
        self.state = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [VoiceState; 4] = [
        VoiceState::Idle,
        VoiceState::Listening,
        VoiceState::Processing,
        VoiceState::Speaking,
    ];

    #[test]
    fn test_query_round_trip() {
        let mut sm = VoiceStateMachine::new();
        assert_eq!(sm.advance(VoiceInput::ListenStarted), VoiceState::Listening);
        assert_eq!(sm.advance(VoiceInput::QueryAccepted), VoiceState::Processing);
        assert_eq!(sm.advance(VoiceInput::Answered), VoiceState::Idle);
        assert_eq!(sm.advance(VoiceInput::PlaybackStarted), VoiceState::Speaking);
        assert_eq!(sm.advance(VoiceInput::PlaybackEnded), VoiceState::Idle);
    }

    #[test]
    fn test_interrupt_from_idle_is_noop() {
        assert_eq!(next_state(VoiceState::Idle, VoiceInput::Interrupt), VoiceState::Idle);
    }

    #[test]
    fn test_processing_ignores_interrupt() {
        assert_eq!(
            next_state(VoiceState::Processing, VoiceInput::Interrupt),
            VoiceState::Processing
        );
        assert_eq!(
            next_state(VoiceState::Processing, VoiceInput::PlaybackStarted),
            VoiceState::Processing
        );
    }

    #[test]
    fn test_failure_always_returns_to_idle() {
        for state in ALL_STATES {
            assert_eq!(next_state(state, VoiceInput::Failed), VoiceState::Idle);
        }
    }

    #[test]
    fn test_interrupts() {
        assert_eq!(next_state(VoiceState::Listening, VoiceInput::Interrupt), VoiceState::Idle);
        assert_eq!(next_state(VoiceState::Speaking, VoiceInput::Interrupt), VoiceState::Idle);
    }

    #[test]
    fn test_capture_end_only_leaves_listening() {
        assert_eq!(next_state(VoiceState::Listening, VoiceInput::CaptureEnded), VoiceState::Idle);
        assert_eq!(
            next_state(VoiceState::Processing, VoiceInput::CaptureEnded),
            VoiceState::Processing
        );
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&VoiceState::Speaking).unwrap(), "\"speaking\"");
    }
}
