//! Voice interaction
//!
//! The [`VoiceController`] owns a four-state machine and drives speech
//! capture, remote answers, speech synthesis and exactly one playback
//! resource at a time.

mod capture;
mod controller;
mod endpoint;
mod events;
mod geolocation;
mod playback;
mod speaker;
mod state;
mod stt;

pub use capture::{
    CaptureError, CaptureEvent, MicCapture, NoCapture, SAMPLE_RATE, SpeechCapture, samples_to_wav,
};
pub use controller::{ControllerParts, HISTORY_TURNS, PendingAudio, VoiceController};
pub use endpoint::{Endpoint, Endpointer, calculate_energy};
pub use events::{ControllerEvent, EventSender, Notice, NoticeLevel, Presenter, channel};
pub use geolocation::{
    CachedGeolocator, FixedPosition, GeoError, Geolocator, NoPosition, PositionSource,
};
pub use playback::{
    AudioClip, AudioFormat, AudioOutput, FreshOutput, OutputDevice, PersistentOutput,
    PlaybackDone, PlaybackEnd, PlaybackError, PlaybackMode, PlaybackOrigin, PlaybackStrategy,
    select_strategy,
};
pub use speaker::{CpalDevice, decode, resample};
pub use state::{VoiceInput, VoiceState, VoiceStateMachine, next_state};
pub use stt::{SpeechToText, WHISPER_URL};
