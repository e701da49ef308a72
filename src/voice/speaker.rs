//! Speaker output through cpal
//!
//! cpal streams are not `Send`, so every playback runs its stream on a
//! dedicated thread and reports back through the completion channel.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::oneshot;

use super::playback::{AudioClip, AudioFormat, AudioOutput, OutputDevice, PlaybackEnd, PlaybackError};
use crate::{Error, Result};

/// How long to wait for the playback thread to report the stream running
const STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Completion poll interval
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Grace after the last sample so the device drains its buffer
const DRAIN_DELAY: Duration = Duration::from_millis(100);

/// The default system output
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalDevice;

impl CpalDevice {
    /// Check that a default output device exists
    ///
    /// # Errors
    ///
    /// Returns error if no output device or config is available
    pub fn probe() -> Result<Self> {
        let (sample_rate, channels) = output_format()?;
        tracing::debug!(sample_rate, channels, "speaker output available");
        Ok(Self)
    }
}

impl OutputDevice for CpalDevice {
    fn open(&self) -> std::result::Result<Box<dyn AudioOutput>, PlaybackError> {
        let (sample_rate, channels) =
            output_format().map_err(|e| PlaybackError::Output(e.to_string()))?;
        Ok(Box::new(CpalOutput {
            sample_rate,
            channels,
            samples: None,
            stop: None,
        }))
    }
}

/// Sample rate and channel count of the default output config
fn output_format() -> Result<(u32, u16)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;
    let config = device
        .default_output_config()
        .map_err(|e| Error::Audio(e.to_string()))?;
    Ok((config.sample_rate().0, config.channels()))
}

/// One output handle: a decoded clip plus the stop flag of its playback thread
struct CpalOutput {
    sample_rate: u32,
    channels: u16,
    samples: Option<Arc<Vec<f32>>>,
    stop: Option<Arc<AtomicBool>>,
}

#[async_trait]
impl AudioOutput for CpalOutput {
    fn set_source(&mut self, clip: &AudioClip) -> std::result::Result<(), PlaybackError> {
        self.halt();
        let (samples, rate) = decode(clip).map_err(|e| PlaybackError::Output(e.to_string()))?;
        let samples = if rate == self.sample_rate {
            samples
        } else {
            resample(&samples, rate, self.sample_rate)
                .map_err(|e| PlaybackError::Output(e.to_string()))?
        };
        self.samples = Some(Arc::new(samples));
        Ok(())
    }

    async fn loaded(&mut self) -> std::result::Result<(), PlaybackError> {
        // Decoding happens eagerly in set_source
        if self.samples.is_some() {
            Ok(())
        } else {
            Err(PlaybackError::Output("no source loaded".to_string()))
        }
    }

    fn play(&mut self, done: oneshot::Sender<PlaybackEnd>) -> std::result::Result<(), PlaybackError> {
        let samples = self
            .samples
            .clone()
            .ok_or_else(|| PlaybackError::Output("no source loaded".to_string()))?;
        self.halt();

        let stop = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = mpsc::sync_channel(1);
        let thread_stop = Arc::clone(&stop);
        let channels = usize::from(self.channels);
        let sample_rate = self.sample_rate;

        std::thread::Builder::new()
            .name("speaker".to_string())
            .spawn(move || {
                run_stream(&samples, sample_rate, channels, &thread_stop, &started_tx, done);
            })
            .map_err(|e| PlaybackError::Output(e.to_string()))?;

        match started_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(())) => {
                self.stop = Some(stop);
                Ok(())
            }
            Ok(Err(message)) => Err(PlaybackError::Output(message)),
            Err(_) => {
                stop.store(true, Ordering::SeqCst);
                Err(PlaybackError::Output("speaker did not start".to_string()))
            }
        }
    }

    fn halt(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::SeqCst);
        }
    }

    fn release(&mut self) {
        self.halt();
        self.samples = None;
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Body of the playback thread
fn run_stream(
    samples: &Arc<Vec<f32>>,
    sample_rate: u32,
    channels: usize,
    stop: &AtomicBool,
    started: &mpsc::SyncSender<std::result::Result<(), String>>,
    done: oneshot::Sender<PlaybackEnd>,
) {
    let position = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(AtomicBool::new(false));
    let failure = Arc::new(Mutex::new(None::<String>));

    let stream = {
        let samples = Arc::clone(samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);
        let failure = Arc::clone(&failure);

        let host = cpal::default_host();
        let Some(device) = host.default_output_device() else {
            let _ = started.send(Err("no output device".to_string()));
            return;
        };
        let config = cpal::StreamConfig {
            channels: u16::try_from(channels).unwrap_or(1),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut pos) = position.lock() else {
                    return;
                };
                for frame in data.chunks_mut(channels) {
                    let sample = samples.get(*pos).copied().unwrap_or_else(|| {
                        finished.store(true, Ordering::SeqCst);
                        0.0
                    });
                    frame.fill(sample);
                    if *pos < samples.len() {
                        *pos += 1;
                    }
                }
            },
            move |err| {
                tracing::error!(error = %err, "speaker stream error");
                if let Ok(mut slot) = failure.lock() {
                    *slot = Some(err.to_string());
                }
            },
            None,
        )
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = started.send(Err(e.to_string()));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = started.send(Err(e.to_string()));
        return;
    }
    let _ = started.send(Ok(()));

    let duration_ms = (samples.len() as u64 * 1000) / u64::from(sample_rate.max(1));
    let deadline = Instant::now() + Duration::from_millis(duration_ms) + Duration::from_secs(1);

    let end = loop {
        if stop.load(Ordering::SeqCst) {
            break None;
        }
        if let Some(message) = failure.lock().ok().and_then(|mut slot| slot.take()) {
            break Some(PlaybackEnd::Failed(message));
        }
        if finished.load(Ordering::SeqCst) || Instant::now() > deadline {
            std::thread::sleep(DRAIN_DELAY);
            break Some(PlaybackEnd::Completed);
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    drop(stream);

    // A halted output reports nothing
    match end {
        Some(end) if !stop.load(Ordering::SeqCst) => {
            tracing::debug!(samples = samples.len(), "speaker playback finished");
            let _ = done.send(end);
        }
        _ => tracing::debug!("speaker playback halted"),
    }
}

/// Decode a clip to mono f32 samples and its sample rate
///
/// # Errors
///
/// Returns error if the clip cannot be decoded
pub fn decode(clip: &AudioClip) -> Result<(Vec<f32>, u32)> {
    match clip.format() {
        AudioFormat::Wav => decode_wav(clip.bytes()),
        AudioFormat::Mp3 => decode_mp3(clip.bytes()),
    }
}

#[allow(clippy::cast_precision_loss)]
fn decode_wav(data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::new(Cursor::new(data)).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(e.to_string()))?
        }
    };

    Ok((downmix(&interleaved, channels), spec.sample_rate))
}

fn decode_mp3(data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();
    let mut sample_rate = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate).unwrap_or(sample_rate);
                let pcm: Vec<f32> = frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                samples.extend(downmix(&pcm, frame.channels.max(1)));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if sample_rate == 0 {
        return Err(Error::Audio("MP3 contained no frames".to_string()));
    }
    Ok((samples, sample_rate))
}

/// Average interleaved channels down to mono
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        1 => interleaved.to_vec(),
        2 => interleaved
            .chunks(2)
            .map(|pair| f32::midpoint(pair[0], pair.get(1).copied().unwrap_or(pair[0])))
            .collect(),
        n => interleaved
            .chunks(n)
            .map(|frame| {
                #[allow(clippy::cast_precision_loss)]
                let len = frame.len() as f32;
                frame.iter().sum::<f32>() / len
            })
            .collect(),
    }
}

/// Resample mono audio, zero-padding the final partial chunk
///
/// # Errors
///
/// Returns error if the resampler rejects the rates
#[allow(clippy::cast_possible_truncation)]
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    let chunk_size = 1024;
    let sub_chunks = 2;

    let mut resampler =
        FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, sub_chunks, 1)
            .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let input: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
    let mut output = Vec::with_capacity(samples.len() * to_rate as usize / from_rate.max(1) as usize);

    for chunk in input.chunks(chunk_size) {
        let mut block = chunk.to_vec();
        block.resize(chunk_size, 0.0);
        let result = resampler
            .process(&[block], None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        output.extend_from_slice(&result[0]);
    }

    Ok(output.iter().map(|&s| s as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_silent_clip() {
        let (samples, rate) = decode(&AudioClip::silent()).unwrap();
        assert_eq!(rate, 44_100);
        assert_eq!(samples.len(), 1);
        assert!(samples[0].abs() < f32::EPSILON);
    }

    #[test]
    fn test_decode_wav_downmixes_stereo() {
        let bytes = wav_bytes(&[16384, 0, -16384, -16384], 16_000, 2);
        let clip = AudioClip::from_bytes(bytes).unwrap();
        let (samples, rate) = decode(&clip).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 0.25).abs() < 1e-6);
        assert!((samples[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_garbage_mp3() {
        let clip = AudioClip::from_bytes(b"ID3garbage".to_vec()).unwrap();
        assert!(decode(&clip).is_err());
    }

    #[test]
    fn test_resample_keeps_tail() {
        let samples = vec![0.1_f32; 1500];
        let output = resample(&samples, 16_000, 48_000).unwrap();
        // Two padded chunks at 3x
        assert_eq!(output.len(), 2 * 3 * 1024);
    }

    #[test]
    fn test_downmix_multichannel() {
        let mono = downmix(&[0.3, 0.3, 0.3, 0.0, 0.0, 0.0], 3);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!(mono[1].abs() < 1e-6);
    }
}
