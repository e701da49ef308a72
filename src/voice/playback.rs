//! Playback strategies
//!
//! The controller owns exactly one [`PlaybackStrategy`]. Each strategy owns
//! the output handles it acquires and decides how a clip gets from bytes to
//! sound:
//!
//! - [`PersistentOutput`] keeps one long-lived output for the whole session,
//!   unlocks it with a silent clip during a user gesture, and waits for the
//!   clip to load before playing.
//! - [`FreshOutput`] opens a new output per clip, gives it a short settle
//!   delay, and releases it as soon as the clip stops.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio::sync::oneshot;

use crate::config::VoiceConfig;
use crate::{Error, Result};

/// 44-byte WAV header followed by a single silent sample
const SILENT_WAV: [u8; 46] = [
    0x52, 0x49, 0x46, 0x46, 0x26, 0x00, 0x00, 0x00, 0x57, 0x41, 0x56, 0x45, 0x66, 0x6d, 0x74,
    0x20, 0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x44, 0xac, 0x00, 0x00, 0x88, 0x58,
    0x01, 0x00, 0x02, 0x00, 0x10, 0x00, 0x64, 0x61, 0x74, 0x61, 0x02, 0x00, 0x00, 0x00, 0x00,
    0x00,
];

/// Container format of an audio clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

/// Encoded audio ready to hand to an output
#[derive(Clone, PartialEq, Eq)]
pub struct AudioClip {
    bytes: Arc<[u8]>,
    format: AudioFormat,
}

impl fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioClip")
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl AudioClip {
    /// Wrap encoded bytes, detecting WAV or MP3 from the header
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are neither WAV nor MP3
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let format = sniff_format(&bytes)
            .ok_or_else(|| Error::Audio("unrecognized audio format".to_string()))?;
        Ok(Self {
            bytes: bytes.into(),
            format,
        })
    }

    /// Decode a base64 payload as returned by the TTS endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the payload is not base64 or not a known format
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Self::from_bytes(STANDARD.decode(encoded.trim())?)
    }

    /// A near-empty WAV used to unlock outputs
    #[must_use]
    pub fn silent() -> Self {
        Self {
            bytes: Arc::from(&SILENT_WAV[..]),
            format: AudioFormat::Wav,
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }
}

fn sniff_format(bytes: &[u8]) -> Option<AudioFormat> {
    match bytes {
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some(AudioFormat::Wav),
        [b'I', b'D', b'3', ..] => Some(AudioFormat::Mp3),
        [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some(AudioFormat::Mp3),
        _ => None,
    }
}

/// Who asked for a playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOrigin {
    /// Started directly by a user gesture
    User,
    /// Started by the assistant after an answer arrived
    Autonomous,
}

/// How a started playback finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEnd {
    Completed,
    Failed(String),
}

/// Why a playback could not start
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// The platform refused to play without a fresh user gesture
    #[error("playback blocked until the next user gesture")]
    Blocked,

    /// The clip did not finish loading in time
    #[error("audio load timed out")]
    LoadTimeout,

    /// The output device failed
    #[error("audio output error: {0}")]
    Output(String),
}

/// One platform output handle
///
/// Completion is reported through the sender passed to [`AudioOutput::play`].
/// [`AudioOutput::halt`] drops that sender without reporting anything.
#[async_trait]
pub trait AudioOutput: Send {
    /// Point the output at a clip, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns error if the clip cannot be attached
    fn set_source(&mut self, clip: &AudioClip) -> std::result::Result<(), PlaybackError>;

    /// Resolve once the current source is ready to play
    ///
    /// # Errors
    ///
    /// Returns error if the source fails to load
    async fn loaded(&mut self) -> std::result::Result<(), PlaybackError>;

    /// Start playing the current source
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::Blocked`] if the platform refuses autoplay
    fn play(&mut self, done: oneshot::Sender<PlaybackEnd>) -> std::result::Result<(), PlaybackError>;

    /// Stop, rewind and detach the completion sender
    fn halt(&mut self);

    /// Free the decoded buffer and any device handle
    fn release(&mut self);
}

/// Opens output handles
pub trait OutputDevice: Send + Sync {
    /// Acquire a new output handle
    ///
    /// # Errors
    ///
    /// Returns error if no output is available
    fn open(&self) -> std::result::Result<Box<dyn AudioOutput>, PlaybackError>;
}

/// Completion channel for a started playback
pub type PlaybackDone = oneshot::Receiver<PlaybackEnd>;

/// A way of turning clips into sound with at most one live output
#[async_trait]
pub trait PlaybackStrategy: Send {
    fn name(&self) -> &'static str;

    /// Best-effort unlock; must be called while handling a user gesture
    fn unlock(&mut self);

    /// Start a clip on a fresh or reused output
    ///
    /// # Errors
    ///
    /// Returns error if the output cannot load or play the clip
    async fn start(&mut self, clip: &AudioClip) -> std::result::Result<PlaybackDone, PlaybackError>;

    /// Halt the live output and release what this strategy does not keep
    fn stop(&mut self);

    /// Whether an output is currently playing
    fn is_active(&self) -> bool;
}

/// Which strategy to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    Persistent,
    Fresh,
    /// Persistent on platforms with strict autoplay rules, fresh elsewhere
    #[default]
    Auto,
}

impl PlaybackMode {
    /// Resolve `Auto` for the current platform
    #[must_use]
    pub const fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(target_os = "ios") => Self::Persistent,
            Self::Auto => Self::Fresh,
            other => other,
        }
    }
}

impl FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "persistent" => Ok(Self::Persistent),
            "fresh" => Ok(Self::Fresh),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown playback mode: {other}")),
        }
    }
}

/// Build the strategy for a mode
#[must_use]
pub fn select_strategy(
    mode: PlaybackMode,
    device: Arc<dyn OutputDevice>,
    config: &VoiceConfig,
) -> Box<dyn PlaybackStrategy> {
    match mode.resolve() {
        PlaybackMode::Persistent => Box::new(PersistentOutput::new(device, config.load_timeout)),
        _ => Box::new(FreshOutput::new(device, config.settle_delay)),
    }
}

/// One reused output, unlocked once per session
pub struct PersistentOutput {
    device: Arc<dyn OutputDevice>,
    output: Option<Box<dyn AudioOutput>>,
    load_timeout: Duration,
    unlocked: bool,
    active: bool,
}

impl PersistentOutput {
    #[must_use]
    pub fn new(device: Arc<dyn OutputDevice>, load_timeout: Duration) -> Self {
        Self {
            device,
            output: None,
            load_timeout,
            unlocked: false,
            active: false,
        }
    }

    /// Whether the silent unlock clip has played successfully
    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    fn output(&mut self) -> std::result::Result<&mut Box<dyn AudioOutput>, PlaybackError> {
        if self.output.is_none() {
            self.output = Some(self.device.open()?);
            tracing::debug!("persistent audio output created");
        }
        self.output
            .as_mut()
            .ok_or_else(|| PlaybackError::Output("output unavailable".to_string()))
    }
}

#[async_trait]
impl PlaybackStrategy for PersistentOutput {
    fn name(&self) -> &'static str {
        "persistent"
    }

    fn unlock(&mut self) {
        if self.unlocked || self.active {
            return;
        }

        let output = match self.output() {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(error = %e, "audio unlock skipped");
                return;
            }
        };

        let (done, _ignored) = oneshot::channel();
        let result = output
            .set_source(&AudioClip::silent())
            .and_then(|()| output.play(done));
        output.halt();

        match result {
            Ok(()) => {
                self.unlocked = true;
                tracing::debug!("audio output unlocked");
            }
            Err(e) => tracing::debug!(error = %e, "audio unlock failed, will retry on next gesture"),
        }
    }

    async fn start(&mut self, clip: &AudioClip) -> std::result::Result<PlaybackDone, PlaybackError> {
        if self.active {
            self.stop();
        }

        let load_timeout = self.load_timeout;
        let output = self.output()?;
        output.set_source(clip)?;

        match tokio::time::timeout(load_timeout, output.loaded()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                output.halt();
                return Err(e);
            }
            Err(_) => {
                tracing::warn!(timeout_ms = load_timeout.as_millis(), "audio load timed out");
                output.halt();
                return Err(PlaybackError::LoadTimeout);
            }
        }

        let (done, rx) = oneshot::channel();
        if let Err(e) = output.play(done) {
            output.halt();
            return Err(e);
        }

        self.active = true;
        Ok(rx)
    }

    fn stop(&mut self) {
        // The output itself is kept for the next clip
        if let Some(output) = self.output.as_mut() {
            output.halt();
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for PersistentOutput {
    fn drop(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.halt();
            output.release();
        }
    }
}

/// A new output per clip, released when the clip stops
pub struct FreshOutput {
    device: Arc<dyn OutputDevice>,
    current: Option<Box<dyn AudioOutput>>,
    settle_delay: Duration,
}

impl FreshOutput {
    #[must_use]
    pub fn new(device: Arc<dyn OutputDevice>, settle_delay: Duration) -> Self {
        Self {
            device,
            current: None,
            settle_delay,
        }
    }
}

#[async_trait]
impl PlaybackStrategy for FreshOutput {
    fn name(&self) -> &'static str {
        "fresh"
    }

    fn unlock(&mut self) {
        // Fresh outputs are opened per clip; nothing to prime
        tracing::trace!("fresh output needs no unlock");
    }

    async fn start(&mut self, clip: &AudioClip) -> std::result::Result<PlaybackDone, PlaybackError> {
        self.stop();

        let mut output = self.device.open()?;
        if let Err(e) = output.set_source(clip) {
            output.release();
            return Err(e);
        }

        tokio::time::sleep(self.settle_delay).await;

        let (done, rx) = oneshot::channel();
        if let Err(e) = output.play(done) {
            output.halt();
            output.release();
            return Err(e);
        }

        self.current = Some(output);
        Ok(rx)
    }

    fn stop(&mut self) {
        if let Some(mut output) = self.current.take() {
            output.halt();
            output.release();
        }
    }

    fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for FreshOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory output device that records every handle it hands out

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Shared counters and the completion senders of playing outputs
    #[derive(Default)]
    pub struct DeviceLog {
        pub opened: AtomicUsize,
        pub released: AtomicUsize,
        pub halted: AtomicUsize,
        pub played: AtomicUsize,
        /// Number of upcoming `play` calls to reject as blocked
        pub block_next: AtomicUsize,
        /// Senders of outputs currently playing, newest last
        pub playing: Mutex<Vec<oneshot::Sender<PlaybackEnd>>>,
        /// Every clip length that reached `play`
        pub clips: Mutex<Vec<usize>>,
    }

    impl DeviceLog {
        pub fn live(&self) -> usize {
            self.opened.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
        }

        /// Finish the newest playing output
        pub fn finish_latest(&self, end: PlaybackEnd) -> bool {
            self.playing
                .lock()
                .unwrap()
                .pop()
                .is_some_and(|tx| tx.send(end).is_ok())
        }
    }

    pub struct MockDevice {
        pub log: Arc<DeviceLog>,
        pub load_delay: Duration,
    }

    impl MockDevice {
        pub fn new() -> (Arc<Self>, Arc<DeviceLog>) {
            let log = Arc::new(DeviceLog::default());
            (
                Arc::new(Self {
                    log: Arc::clone(&log),
                    load_delay: Duration::ZERO,
                }),
                log,
            )
        }
    }

    impl OutputDevice for MockDevice {
        fn open(&self) -> std::result::Result<Box<dyn AudioOutput>, PlaybackError> {
            self.log.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockOutput {
                log: Arc::clone(&self.log),
                source: None,
                load_delay: self.load_delay,
            }))
        }
    }

    struct MockOutput {
        log: Arc<DeviceLog>,
        source: Option<usize>,
        load_delay: Duration,
    }

    #[async_trait]
    impl AudioOutput for MockOutput {
        fn set_source(&mut self, clip: &AudioClip) -> std::result::Result<(), PlaybackError> {
            self.source = Some(clip.bytes().len());
            Ok(())
        }

        async fn loaded(&mut self) -> std::result::Result<(), PlaybackError> {
            tokio::time::sleep(self.load_delay).await;
            Ok(())
        }

        fn play(&mut self, done: oneshot::Sender<PlaybackEnd>) -> std::result::Result<(), PlaybackError> {
            let blocked = self
                .log
                .block_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if blocked {
                return Err(PlaybackError::Blocked);
            }
            self.log.played.fetch_add(1, Ordering::SeqCst);
            self.log.clips.lock().unwrap().push(self.source.unwrap_or_default());
            self.log.playing.lock().unwrap().push(done);
            Ok(())
        }

        fn halt(&mut self) {
            self.log.halted.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&mut self) {
            self.source = None;
            self.log.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::MockDevice;
    use super::*;

    fn clip() -> AudioClip {
        AudioClip::silent()
    }

    #[test]
    fn test_sniff_formats() {
        assert_eq!(AudioClip::silent().format(), AudioFormat::Wav);
        let mp3 = AudioClip::from_bytes(b"ID3\x04\x00rest".to_vec()).unwrap();
        assert_eq!(mp3.format(), AudioFormat::Mp3);
        let frame = AudioClip::from_bytes(vec![0xFF, 0xFB, 0x90, 0x00]).unwrap();
        assert_eq!(frame.format(), AudioFormat::Mp3);
        assert!(AudioClip::from_bytes(b"not audio".to_vec()).is_err());
    }

    #[test]
    fn test_from_base64() {
        let encoded = STANDARD.encode(SILENT_WAV);
        let clip = AudioClip::from_base64(&encoded).unwrap();
        assert_eq!(clip.bytes(), &SILENT_WAV[..]);
        assert!(AudioClip::from_base64("!!!").is_err());
    }

    #[test]
    fn test_playback_mode_parse() {
        assert_eq!("Persistent".parse::<PlaybackMode>().unwrap(), PlaybackMode::Persistent);
        assert_eq!("fresh".parse::<PlaybackMode>().unwrap(), PlaybackMode::Fresh);
        assert!("loud".parse::<PlaybackMode>().is_err());
        assert_ne!(PlaybackMode::Auto.resolve(), PlaybackMode::Auto);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_releases_previous_output() {
        let (device, log) = MockDevice::new();
        let mut strategy = FreshOutput::new(device, Duration::from_millis(150));

        let _first = strategy.start(&clip()).await.unwrap();
        let _second = strategy.start(&clip()).await.unwrap();

        assert_eq!(log.opened.load(Ordering::SeqCst), 2);
        assert_eq!(log.live(), 1);
        assert!(strategy.is_active());

        strategy.stop();
        assert_eq!(log.live(), 0);
        assert!(!strategy.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_blocked_releases_output() {
        let (device, log) = MockDevice::new();
        log.block_next.store(1, Ordering::SeqCst);
        let mut strategy = FreshOutput::new(device, Duration::from_millis(150));

        let result = strategy.start(&clip()).await;
        assert!(matches!(result, Err(PlaybackError::Blocked)));
        assert_eq!(log.live(), 0);
        assert!(!strategy.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_halted_output_never_completes() {
        let (device, log) = MockDevice::new();
        let mut strategy = FreshOutput::new(device, Duration::ZERO);

        let done = strategy.start(&clip()).await.unwrap();
        strategy.stop();
        // The sender is still held by the log, but the strategy let go of it
        drop(log.playing.lock().unwrap().pop());
        assert!(done.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_reuses_one_output() {
        let (device, log) = MockDevice::new();
        let mut strategy = PersistentOutput::new(device, Duration::from_secs(15));

        strategy.unlock();
        assert!(strategy.is_unlocked());
        let _first = strategy.start(&clip()).await.unwrap();
        let _second = strategy.start(&clip()).await.unwrap();

        assert_eq!(log.opened.load(Ordering::SeqCst), 1);
        assert_eq!(log.released.load(Ordering::SeqCst), 0);

        drop(strategy);
        assert_eq!(log.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_unlock_retries_after_block() {
        let (device, log) = MockDevice::new();
        log.block_next.store(1, Ordering::SeqCst);
        let mut strategy = PersistentOutput::new(device, Duration::from_secs(15));

        strategy.unlock();
        assert!(!strategy.is_unlocked());
        strategy.unlock();
        assert!(strategy.is_unlocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_load_timeout() {
        let log = std::sync::Arc::new(testing::DeviceLog::default());
        let device = Arc::new(MockDevice {
            log: Arc::clone(&log),
            load_delay: Duration::from_secs(30),
        });
        let mut strategy = PersistentOutput::new(device, Duration::from_secs(15));

        let result = strategy.start(&clip()).await;
        assert!(matches!(result, Err(PlaybackError::LoadTimeout)));
        assert!(!strategy.is_active());
        assert_eq!(log.played.load(Ordering::SeqCst), 0);
    }
}
