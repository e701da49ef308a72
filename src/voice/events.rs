//! Controller inputs and user-facing outputs

use tokio::sync::mpsc;

use super::capture::CaptureEvent;
use super::playback::{AudioClip, PlaybackEnd, PlaybackOrigin};
use super::state::VoiceState;
use crate::client::BackendError;
use crate::navigation::NavigationReply;
use crate::protocol::ChatReply;
use crate::transcript::{ChatMessage, MessageId};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A short titled message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    #[must_use]
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Where the controller sends everything the user should see
///
/// All methods default to doing nothing.
pub trait Presenter: Send {
    fn state_changed(&mut self, _state: VoiceState) {}

    fn message_appended(&mut self, _message: &ChatMessage) {}

    fn notice(&mut self, _notice: &Notice) {}

    /// Which message, if any, is currently being spoken
    fn playing_changed(&mut self, _message: Option<MessageId>) {}
}

/// Everything that can drive the controller
#[derive(Debug)]
pub enum ControllerEvent {
    /// Microphone button pressed
    Tap,
    /// Text typed and sent
    Submit(String),
    /// Speaker button on an assistant message
    PlayMessage(MessageId),
    /// Stop button
    Stop,
    /// Something happened on the speech capture side
    Capture(CaptureEvent),
    /// A general query was answered or failed
    Answer(Result<ChatReply, BackendError>),
    /// A navigation query was resolved
    Directions(NavigationReply),
    /// A synthesis request finished
    SpeechReady {
        ticket: u64,
        message_id: MessageId,
        origin: PlaybackOrigin,
        result: Result<AudioClip, BackendError>,
    },
    /// The live playback finished
    PlaybackEnded { ticket: u64, end: PlaybackEnd },
    /// Tear everything down and leave the run loop
    Shutdown,
}

/// Cloneable handle for feeding events to a running controller
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::UnboundedSender<ControllerEvent>);

impl EventSender {
    /// Queue an event; returns false once the controller has shut down
    pub fn send(&self, event: ControllerEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

/// Create a controller event channel
#[must_use]
pub fn channel() -> (EventSender, mpsc::UnboundedReceiver<ControllerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender(tx), rx)
}
