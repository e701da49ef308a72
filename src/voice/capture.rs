//! Speech capture
//!
//! A capture session records one utterance and reports it as a single
//! transcript. The controller only sees [`CaptureEvent`]s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use tokio::sync::oneshot;

use super::endpoint::{Endpoint, Endpointer};
use super::events::{ControllerEvent, EventSender, Notice};
use super::stt::SpeechToText;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// How often the session drains the microphone buffer
const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// How long the microphone thread may take to open its stream
const MIC_START_TIMEOUT: Duration = Duration::from_secs(2);

/// Events emitted by a capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The microphone is live
    Started,
    /// The recognized text of the utterance
    Transcript(String),
    Failed(CaptureError),
    /// The session ended on its own
    Ended,
}

/// Why a capture session failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("network error during recognition")]
    Network,

    #[error("recognition language not supported")]
    LanguageUnsupported,

    #[error("recognition service unavailable")]
    ServiceUnavailable,

    /// No capture backend on this system
    #[error("speech capture not supported")]
    Unsupported,

    #[error("recognition aborted")]
    Aborted,

    #[error("no speech detected")]
    NoSpeech,

    #[error("recognition failed: {0}")]
    Other(String),
}

impl CaptureError {
    /// Map a recognizer error code such as `not-allowed` or `no-speech`
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" => Self::PermissionDenied,
            "network" => Self::Network,
            "language-not-supported" => Self::LanguageUnsupported,
            "service-not-allowed" | "audio-capture" => Self::ServiceUnavailable,
            "aborted" => Self::Aborted,
            "no-speech" => Self::NoSpeech,
            other => Self::Other(other.to_string()),
        }
    }

    /// Failures the user caused or expects, which get no notice
    #[must_use]
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::Aborted | Self::NoSpeech)
    }

    /// What to tell the user, if anything
    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        let (title, description) = match self {
            Self::Aborted | Self::NoSpeech => return None,
            Self::PermissionDenied => (
                "Microphone Permission Required",
                "Please allow microphone access to use voice input.",
            ),
            Self::Network => (
                "Network Error",
                "Speech recognition requires an internet connection.",
            ),
            Self::LanguageUnsupported => (
                "Language Not Supported",
                "Malayalam language is not supported on this device. Please try English or use text input.",
            ),
            Self::ServiceUnavailable => (
                "Service Unavailable",
                "Speech recognition service is not available. Please try again.",
            ),
            Self::Unsupported => (
                "Voice Not Supported",
                "Voice input is not available on this device. Please use text input.",
            ),
            Self::Other(_) => ("Voice Error", "Could not recognize speech. Please try again."),
        };
        Some(Notice::error(title, description))
    }
}

/// A source of single-utterance transcripts
#[async_trait]
pub trait SpeechCapture: Send {
    /// Start a session that reports into `events`
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot start
    async fn start(&mut self, events: EventSender) -> std::result::Result<(), CaptureError>;

    /// End the current session without reporting anything further
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// Capture for systems with no microphone support
#[derive(Debug, Default)]
pub struct NoCapture;

#[async_trait]
impl SpeechCapture for NoCapture {
    async fn start(&mut self, _events: EventSender) -> std::result::Result<(), CaptureError> {
        Err(CaptureError::Unsupported)
    }

    fn stop(&mut self) {}

    fn is_active(&self) -> bool {
        false
    }
}

/// Microphone capture with energy endpointing and Whisper transcription
pub struct MicCapture {
    stt: Arc<SpeechToText>,
    session: Option<Session>,
}

/// Flags shared with one running session
struct Session {
    /// Set by [`SpeechCapture::stop`]; the session reports nothing after it
    cancelled: Arc<AtomicBool>,
    /// Set once the microphone should close
    mic_off: Arc<AtomicBool>,
}

impl MicCapture {
    #[must_use]
    pub fn new(stt: SpeechToText) -> Self {
        Self {
            stt: Arc::new(stt),
            session: None,
        }
    }
}

#[async_trait]
impl SpeechCapture for MicCapture {
    async fn start(&mut self, events: EventSender) -> std::result::Result<(), CaptureError> {
        self.stop();

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let session = Session {
            cancelled: Arc::new(AtomicBool::new(false)),
            mic_off: Arc::new(AtomicBool::new(false)),
        };
        let (ready_tx, ready_rx) = oneshot::channel();

        {
            let buffer = Arc::clone(&buffer);
            let mic_off = Arc::clone(&session.mic_off);
            std::thread::Builder::new()
                .name("microphone".to_string())
                .spawn(move || run_microphone(&buffer, &mic_off, ready_tx))
                .map_err(|e| CaptureError::Other(e.to_string()))?;
        }

        match tokio::time::timeout(MIC_START_TIMEOUT, ready_rx).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "microphone failed to start");
                return Err(CaptureError::ServiceUnavailable);
            }
            Ok(Err(_)) | Err(_) => {
                tracing::warn!("microphone did not start in time");
                session.mic_off.store(true, Ordering::SeqCst);
                return Err(CaptureError::ServiceUnavailable);
            }
        }

        let stt = Arc::clone(&self.stt);
        let cancelled = Arc::clone(&session.cancelled);
        let mic_off = Arc::clone(&session.mic_off);
        tokio::spawn(async move {
            let reporter = Reporter {
                events,
                cancelled: &cancelled,
            };
            reporter.send(CaptureEvent::Started);
            run_session(&buffer, &mic_off, &stt, &reporter).await;
            mic_off.store(true, Ordering::SeqCst);
        });

        self.session = Some(session);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancelled.store(true, Ordering::SeqCst);
            session.mic_off.store(true, Ordering::SeqCst);
            tracing::debug!("audio capture stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.mic_off.load(Ordering::SeqCst))
    }
}

/// Forwards session events unless the session was cancelled
struct Reporter<'a> {
    events: EventSender,
    cancelled: &'a AtomicBool,
}

impl Reporter<'_> {
    fn send(&self, event: CaptureEvent) {
        if self.cancelled.load(Ordering::SeqCst) {
            tracing::trace!(?event, "dropping event from cancelled capture");
            return;
        }
        self.events.send(ControllerEvent::Capture(event));
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Endpoint the microphone buffer and transcribe the utterance
async fn run_session(
    buffer: &Mutex<Vec<f32>>,
    mic_off: &AtomicBool,
    stt: &SpeechToText,
    reporter: &Reporter<'_>,
) {
    let mut endpointer = Endpointer::new();

    let utterance = loop {
        tokio::time::sleep(DRAIN_INTERVAL).await;
        if reporter.is_cancelled() {
            return;
        }

        let block = buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();
        if block.is_empty() {
            continue;
        }

        match endpointer.push(&block) {
            Endpoint::Pending => {}
            Endpoint::Utterance(samples) => break samples,
            Endpoint::NoSpeech => {
                tracing::debug!("no speech before timeout");
                mic_off.store(true, Ordering::SeqCst);
                reporter.send(CaptureEvent::Failed(CaptureError::NoSpeech));
                reporter.send(CaptureEvent::Ended);
                return;
            }
        }
    };

    // Microphone off before the network round trip
    mic_off.store(true, Ordering::SeqCst);

    let result = match samples_to_wav(&utterance, SAMPLE_RATE) {
        Ok(wav) => stt.transcribe(&wav).await,
        Err(e) => Err(e),
    };

    let event = match result {
        Ok(text) if text.is_empty() => CaptureEvent::Failed(CaptureError::NoSpeech),
        Ok(text) => CaptureEvent::Transcript(text),
        Err(Error::Http(e)) => {
            tracing::warn!(error = %e, "transcription request failed");
            CaptureEvent::Failed(CaptureError::Network)
        }
        Err(e) => {
            tracing::warn!(error = %e, "transcription failed");
            CaptureEvent::Failed(CaptureError::Other(e.to_string()))
        }
    };
    reporter.send(event);
    reporter.send(CaptureEvent::Ended);
}

/// Body of the microphone thread: keep an input stream alive until stopped
fn run_microphone(
    buffer: &Arc<Mutex<Vec<f32>>>,
    mic_off: &AtomicBool,
    ready: oneshot::Sender<std::result::Result<(), String>>,
) {
    let stream = match open_input(Arc::clone(buffer)) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready.send(Err(e.to_string()));
        return;
    }
    if ready.send(Ok(())).is_err() {
        // The caller gave up waiting
        return;
    }
    tracing::debug!("audio capture started");

    while !mic_off.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(20));
    }
    drop(stream);
}

fn open_input(buffer: Arc<Mutex<Vec<f32>>>) -> Result<cpal::Stream> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

    let supported_config = device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        })
        .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

    let config: StreamConfig = supported_config
        .with_sample_rate(SampleRate(SAMPLE_RATE))
        .config();

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = SAMPLE_RATE,
        "opening microphone"
    );

    device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            |err| {
                tracing::error!(error = %err, "audio capture error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
