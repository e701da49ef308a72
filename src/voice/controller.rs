//! Voice interaction controller
//!
//! Single owner of the state machine, the transcript, the capture session
//! and the playback strategy. Everything slow (completions, synthesis,
//! geolocation, playback completion) runs in spawned tasks that post a
//! [`ControllerEvent`] back, so the controller itself never shares state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::capture::{CaptureEvent, SpeechCapture};
use super::events::{ControllerEvent, EventSender, Notice, Presenter};
use super::geolocation::Geolocator;
use super::playback::{AudioClip, PlaybackEnd, PlaybackError, PlaybackOrigin, PlaybackStrategy};
use super::state::{VoiceInput, VoiceState, VoiceStateMachine};
use crate::client::{AssistantBackend, BackendError};
use crate::language::Language;
use crate::navigation::{NavigationReply, is_location_query, resolve_destination};
use crate::protocol::ChatReply;
use crate::transcript::{ChatMessage, MessageId, Role, Transcript};

/// Number of previous messages sent as conversation history
pub const HISTORY_TURNS: usize = 10;

/// An autonomous utterance the platform refused to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAudio {
    pub message_id: MessageId,
    pub clip: AudioClip,
}

/// Collaborators the controller drives
pub struct ControllerParts {
    pub backend: Arc<dyn AssistantBackend>,
    pub capture: Box<dyn SpeechCapture>,
    pub playback: Box<dyn PlaybackStrategy>,
    pub geolocator: Arc<dyn Geolocator>,
    pub presenter: Box<dyn Presenter>,
    /// Pause between tearing one playback down and acquiring the next
    pub teardown_grace: Duration,
}

/// Drives the voice state machine from [`ControllerEvent`]s
pub struct VoiceController {
    machine: VoiceStateMachine,
    transcript: Transcript,
    backend: Arc<dyn AssistantBackend>,
    capture: Box<dyn SpeechCapture>,
    playback: Box<dyn PlaybackStrategy>,
    geolocator: Arc<dyn Geolocator>,
    presenter: Box<dyn Presenter>,
    events: EventSender,
    teardown_grace: Duration,
    pending: Option<PendingAudio>,
    playing: Option<(MessageId, PlaybackOrigin)>,
    playback_ticket: u64,
    speech_ticket: u64,
}

impl VoiceController {
    /// Create a controller that posts background results into `events`
    #[must_use]
    pub fn new(parts: ControllerParts, events: EventSender) -> Self {
        tracing::debug!(strategy = parts.playback.name(), "voice controller created");
        Self {
            machine: VoiceStateMachine::new(),
            transcript: Transcript::new(),
            backend: parts.backend,
            capture: parts.capture,
            playback: parts.playback,
            geolocator: parts.geolocator,
            presenter: parts.presenter,
            events,
            teardown_grace: parts.teardown_grace,
            pending: None,
            playing: None,
            playback_ticket: 0,
            speech_ticket: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> VoiceState {
        self.machine.state()
    }

    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub const fn pending_audio(&self) -> Option<&PendingAudio> {
        self.pending.as_ref()
    }

    /// Message currently being spoken
    #[must_use]
    pub fn playing(&self) -> Option<MessageId> {
        self.playing.map(|(id, _)| id)
    }

    /// Whether the playback strategy holds a live output
    #[must_use]
    pub fn is_playback_active(&self) -> bool {
        self.playback.is_active()
    }

    /// Consume events until shutdown or until every sender is gone
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ControllerEvent>) {
        while let Some(event) = rx.recv().await {
            if !self.handle(event).await {
                break;
            }
        }
        self.shutdown();
        tracing::debug!("voice controller stopped");
    }

    /// Apply one event; returns false after shutdown
    pub async fn handle(&mut self, event: ControllerEvent) -> bool {
        match event {
            ControllerEvent::Tap => self.on_tap().await,
            ControllerEvent::Submit(text) => self.on_submit(&text),
            ControllerEvent::PlayMessage(id) => self.on_play_message(id).await,
            ControllerEvent::Stop => self.on_stop(),
            ControllerEvent::Capture(event) => self.on_capture(event),
            ControllerEvent::Answer(result) => self.on_answer(result),
            ControllerEvent::Directions(reply) => self.on_directions(&reply),
            ControllerEvent::SpeechReady {
                ticket,
                message_id,
                origin,
                result,
            } => self.on_speech_ready(ticket, message_id, origin, result).await,
            ControllerEvent::PlaybackEnded { ticket, end } => self.on_playback_ended(ticket, end),
            ControllerEvent::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    async fn on_tap(&mut self) {
        // Must happen inside the gesture, before anything is awaited
        self.playback.unlock();

        match self.state() {
            VoiceState::Processing => tracing::debug!("tap ignored while processing"),
            VoiceState::Speaking => {
                self.stop_playback();
                self.transition(VoiceInput::Interrupt);
            }
            VoiceState::Listening => {
                self.capture.stop();
                self.transition(VoiceInput::Interrupt);
            }
            VoiceState::Idle => {
                if let Some(pending) = self.pending.take() {
                    tracing::debug!(message = %pending.message_id, "playing parked audio");
                    self.start_playback(pending.clip, pending.message_id, PlaybackOrigin::User)
                        .await;
                } else {
                    self.start_listening().await;
                }
            }
        }
    }

    async fn start_listening(&mut self) {
        if self.capture.is_active() {
            self.capture.stop();
        }

        match self.capture.start(self.events.clone()).await {
            Ok(()) => {
                self.transition(VoiceInput::ListenStarted);
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not start speech capture");
                if let Some(notice) = e.notice() {
                    self.notify(&notice);
                }
                self.transition(VoiceInput::Failed);
            }
        }
    }

    fn on_submit(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match self.state() {
            VoiceState::Listening | VoiceState::Processing => {
                tracing::debug!(state = %self.state(), "typed query ignored while busy");
            }
            VoiceState::Speaking => {
                self.stop_playback();
                self.transition(VoiceInput::Interrupt);
                self.process_query(text);
            }
            VoiceState::Idle => self.process_query(text),
        }
    }

    fn on_capture(&mut self, event: CaptureEvent) {
        if self.state() != VoiceState::Listening {
            tracing::trace!(?event, state = %self.state(), "stale capture event ignored");
            return;
        }

        match event {
            CaptureEvent::Started => tracing::debug!("listening"),
            CaptureEvent::Transcript(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return;
                }
                self.capture.stop();
                self.process_query(&text);
            }
            CaptureEvent::Failed(e) => {
                tracing::warn!(error = %e, "speech capture failed");
                self.capture.stop();
                if let Some(notice) = e.notice() {
                    self.notify(&notice);
                }
                self.transition(VoiceInput::Failed);
            }
            CaptureEvent::Ended => {
                self.capture.stop();
                self.transition(VoiceInput::CaptureEnded);
            }
        }
    }

    /// Append the query and start answering it in the background
    fn process_query(&mut self, text: &str) {
        let history = self.transcript.history(HISTORY_TURNS);
        self.transition(VoiceInput::QueryAccepted);
        self.append(ChatMessage::user(text));

        let events = self.events.clone();
        if is_location_query(text) {
            let destination = resolve_destination(text);
            tracing::debug!(destination = destination.key, "navigation query");
            let geolocator = Arc::clone(&self.geolocator);
            tokio::spawn(async move {
                let position = match geolocator.locate().await {
                    Ok(position) => Some(position),
                    Err(e) => {
                        tracing::debug!(error = %e, "answering without user position");
                        None
                    }
                };
                events.send(ControllerEvent::Directions(NavigationReply::compose(
                    destination,
                    position,
                )));
            });
        } else {
            let backend = Arc::clone(&self.backend);
            let message = text.to_string();
            tokio::spawn(async move {
                let result = backend.complete(&message, &history).await;
                events.send(ControllerEvent::Answer(result));
            });
        }
    }

    fn on_directions(&mut self, reply: &NavigationReply) {
        if self.state() != VoiceState::Processing {
            return;
        }

        let destination = reply.destination;
        let message = ChatMessage::assistant(reply.display_text(), Language::English)
            .with_location(destination.name, destination.maps_link);
        let id = self.append(message);
        self.transition(VoiceInput::Answered);
        self.request_speech(id, reply.spoken.clone(), Language::English, PlaybackOrigin::Autonomous);
    }

    fn on_answer(&mut self, result: Result<ChatReply, BackendError>) {
        if self.state() != VoiceState::Processing {
            return;
        }

        match result {
            Ok(reply) => {
                let id = self.append(ChatMessage::assistant(
                    reply.response.clone(),
                    reply.detected_language,
                ));
                self.transition(VoiceInput::Answered);
                self.request_speech(
                    id,
                    reply.response,
                    reply.detected_language,
                    PlaybackOrigin::Autonomous,
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "query failed");
                self.notify(&e.notice());
                self.transition(VoiceInput::Failed);
            }
        }
    }

    /// Fetch speech for a message; only the latest request is honored
    fn request_speech(
        &mut self,
        message_id: MessageId,
        text: String,
        language: Language,
        origin: PlaybackOrigin,
    ) {
        self.speech_ticket += 1;
        let ticket = self.speech_ticket;
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        tokio::spawn(async move {
            let result = backend.synthesize(&text, language).await;
            events.send(ControllerEvent::SpeechReady {
                ticket,
                message_id,
                origin,
                result,
            });
        });
    }

    async fn on_speech_ready(
        &mut self,
        ticket: u64,
        message_id: MessageId,
        origin: PlaybackOrigin,
        result: Result<AudioClip, BackendError>,
    ) {
        if ticket != self.speech_ticket {
            tracing::debug!(ticket, latest = self.speech_ticket, "stale speech ignored");
            return;
        }

        let clip = match result {
            Ok(clip) => clip,
            Err(e) => {
                tracing::warn!(error = %e, ?origin, "speech synthesis failed");
                if origin == PlaybackOrigin::User {
                    self.notify(&audio_error());
                }
                return;
            }
        };

        match (origin, self.state()) {
            (PlaybackOrigin::Autonomous, VoiceState::Listening | VoiceState::Processing) => {
                tracing::debug!(message = %message_id, "busy, parking speech");
                self.pending = Some(PendingAudio { message_id, clip });
            }
            (PlaybackOrigin::User, VoiceState::Listening | VoiceState::Processing) => {
                tracing::debug!("user speech dropped while busy");
            }
            _ => self.start_playback(clip, message_id, origin).await,
        }
    }

    async fn on_play_message(&mut self, id: MessageId) {
        self.playback.unlock();

        let Some(message) = self.transcript.get(id) else {
            return;
        };
        if message.role != Role::Assistant {
            return;
        }
        let text = message.content.clone();
        let language = message.language.unwrap_or(Language::English);

        match self.state() {
            VoiceState::Listening | VoiceState::Processing => {
                tracing::debug!("replay ignored while busy");
                return;
            }
            VoiceState::Speaking => {
                let same = self.playing() == Some(id);
                self.stop_playback();
                self.transition(VoiceInput::Interrupt);
                if same {
                    // Second press on the playing message stops it
                    return;
                }
            }
            VoiceState::Idle => {}
        }

        if let Some(pending) = self.pending.take_if(|p| p.message_id == id) {
            self.start_playback(pending.clip, id, PlaybackOrigin::User).await;
        } else {
            self.request_speech(id, text, language, PlaybackOrigin::User);
        }
    }

    fn on_stop(&mut self) {
        match self.state() {
            VoiceState::Speaking => {
                self.stop_playback();
                self.transition(VoiceInput::Interrupt);
            }
            VoiceState::Listening => {
                self.capture.stop();
                self.transition(VoiceInput::Interrupt);
            }
            VoiceState::Idle | VoiceState::Processing => {}
        }
    }

    /// Tear down any live playback, wait the grace period, then start `clip`
    async fn start_playback(&mut self, clip: AudioClip, message_id: MessageId, origin: PlaybackOrigin) {
        if self.stop_playback() {
            self.transition(VoiceInput::PlaybackEnded);
        }
        tokio::time::sleep(self.teardown_grace).await;

        self.playback_ticket += 1;
        let ticket = self.playback_ticket;

        match self.playback.start(&clip).await {
            Ok(done) => {
                self.pending = None;
                self.playing = Some((message_id, origin));
                self.presenter.playing_changed(Some(message_id));
                self.transition(VoiceInput::PlaybackStarted);

                let events = self.events.clone();
                tokio::spawn(async move {
                    // A halted output drops its sender and reports nothing
                    if let Ok(end) = done.await {
                        events.send(ControllerEvent::PlaybackEnded { ticket, end });
                    }
                });
            }
            Err(PlaybackError::Blocked) if origin == PlaybackOrigin::Autonomous => {
                tracing::info!(message = %message_id, "autoplay blocked, waiting for a tap");
                self.playback.stop();
                self.pending = Some(PendingAudio { message_id, clip });
                self.notify(&Notice::info(
                    "Tap to play audio",
                    "Tap the speaker button to hear the response.",
                ));
            }
            Err(e) => {
                tracing::warn!(error = %e, ?origin, "playback failed");
                self.playback.stop();
                if origin == PlaybackOrigin::User {
                    self.notify(&audio_error());
                }
                self.transition(VoiceInput::Failed);
            }
        }
    }

    fn on_playback_ended(&mut self, ticket: u64, end: PlaybackEnd) {
        if ticket != self.playback_ticket || self.playing.is_none() {
            tracing::trace!(ticket, "stale playback end ignored");
            return;
        }

        let origin = self.playing.map(|(_, origin)| origin);
        self.stop_playback();

        match end {
            PlaybackEnd::Completed => {
                tracing::debug!("playback finished");
                self.transition(VoiceInput::PlaybackEnded);
            }
            PlaybackEnd::Failed(reason) => {
                tracing::warn!(%reason, "playback error");
                if origin == Some(PlaybackOrigin::User) {
                    self.notify(&audio_error());
                }
                self.transition(VoiceInput::Failed);
            }
        }
    }

    /// Halt and release the live playback; returns whether one was live
    fn stop_playback(&mut self) -> bool {
        let was_active = self.playback.is_active();
        if was_active {
            self.playback.stop();
        }
        // Anything still in flight from the old playback is now stale
        self.playback_ticket += 1;
        if self.playing.take().is_some() {
            self.presenter.playing_changed(None);
        }
        was_active
    }

    fn shutdown(&mut self) {
        self.capture.stop();
        self.stop_playback();
        self.transition(VoiceInput::Failed);
    }

    fn append(&mut self, message: ChatMessage) -> MessageId {
        self.presenter.message_appended(&message);
        self.transcript.push(message)
    }

    fn notify(&mut self, notice: &Notice) {
        self.presenter.notice(notice);
    }

    fn transition(&mut self, input: VoiceInput) {
        let before = self.state();
        let after = self.machine.advance(input);
        if after != before {
            self.presenter.state_changed(after);
        }
    }
}

fn audio_error() -> Notice {
    Notice::error("Audio Error", "Failed to play audio response. Please try again.")
}
