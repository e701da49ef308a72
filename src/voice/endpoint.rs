//! Energy-based utterance endpointing
//!
//! Decides when a single spoken query has started and finished so capture
//! can stop on its own after the first utterance.

/// Minimum RMS energy to count a block as speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum amount of speech for an utterance (0.3 s at 16 kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends an utterance (0.8 s at 16 kHz)
const SILENCE_SAMPLES: usize = 12_800;

/// Give up if nobody speaks for this long (8 s at 16 kHz)
const NO_SPEECH_SAMPLES: usize = 128_000;

/// Outcome of feeding one block of samples
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// Keep listening
    Pending,
    /// A complete utterance, including its leading speech
    Utterance(Vec<f32>),
    /// Nothing that looked like speech arrived in time
    NoSpeech,
}

/// Tracks speech and silence across incoming blocks
#[derive(Debug, Default)]
pub struct Endpointer {
    speech: Vec<f32>,
    in_speech: bool,
    speech_samples: usize,
    silence: usize,
    waited: usize,
}

impl Endpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next block of mono samples
    pub fn push(&mut self, samples: &[f32]) -> Endpoint {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        if !self.in_speech {
            if is_speech {
                self.in_speech = true;
                self.speech.extend_from_slice(samples);
                self.speech_samples = samples.len();
                self.silence = 0;
                tracing::trace!(energy, "speech started");
            } else {
                self.waited += samples.len();
                if self.waited > NO_SPEECH_SAMPLES {
                    return Endpoint::NoSpeech;
                }
            }
            return Endpoint::Pending;
        }

        self.speech.extend_from_slice(samples);
        if is_speech {
            self.speech_samples += samples.len();
            self.silence = 0;
        } else {
            self.silence += samples.len();
        }

        if self.silence > SILENCE_SAMPLES {
            if self.speech_samples >= MIN_SPEECH_SAMPLES {
                tracing::debug!(samples = self.speech.len(), "utterance complete");
                return Endpoint::Utterance(std::mem::take(&mut self.speech));
            }
            // A click or cough, not a query
            tracing::trace!("speech too short, resetting");
            self.reset();
        }

        Endpoint::Pending
    }

    /// Whatever speech has been collected so far, if it is long enough
    #[must_use]
    pub fn flush(&mut self) -> Option<Vec<f32>> {
        if self.in_speech && self.speech_samples >= MIN_SPEECH_SAMPLES {
            Some(std::mem::take(&mut self.speech))
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.speech.clear();
        self.in_speech = false;
        self.speech_samples = 0;
        self.silence = 0;
    }
}

/// RMS energy of a block
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: usize = 1600;

    fn loud() -> Vec<f32> {
        vec![0.2; BLOCK]
    }

    fn quiet() -> Vec<f32> {
        vec![0.0; BLOCK]
    }

    #[test]
    fn test_energy() {
        assert!(calculate_energy(&[]).abs() < f32::EPSILON);
        assert!((calculate_energy(&[0.5, -0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_utterance_after_silence() {
        let mut endpointer = Endpointer::new();
        for _ in 0..4 {
            assert_eq!(endpointer.push(&loud()), Endpoint::Pending);
        }
        let mut result = Endpoint::Pending;
        for _ in 0..10 {
            result = endpointer.push(&quiet());
            if result != Endpoint::Pending {
                break;
            }
        }
        let Endpoint::Utterance(samples) = result else {
            panic!("expected utterance, got {result:?}");
        };
        assert!(samples.len() >= 4 * BLOCK);
    }

    #[test]
    fn test_short_blip_is_ignored() {
        let mut endpointer = Endpointer::new();
        endpointer.push(&loud());
        for _ in 0..10 {
            assert_eq!(endpointer.push(&quiet()), Endpoint::Pending);
        }
        assert!(endpointer.flush().is_none());
    }

    #[test]
    fn test_no_speech_timeout() {
        let mut endpointer = Endpointer::new();
        let mut result = Endpoint::Pending;
        for _ in 0..100 {
            result = endpointer.push(&quiet());
            if result != Endpoint::Pending {
                break;
            }
        }
        assert_eq!(result, Endpoint::NoSpeech);
    }

    #[test]
    fn test_flush_partial_utterance() {
        let mut endpointer = Endpointer::new();
        for _ in 0..4 {
            endpointer.push(&loud());
        }
        assert_eq!(endpointer.flush().map(|s| s.len()), Some(4 * BLOCK));
    }
}
