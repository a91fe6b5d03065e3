//! fundamental frequency estimation over a single [`AudioFrame`]
//!
//! Two interchangeable methods.  The time domain autocorrelation search is
//! the one the scoring semantics were built around; the FFT magnitude peak is
//! cheaper but happily lands on a harmonic, so it is offered for comparison
//! and for hosts that cannot afford the lag scan.
use crate::dsp::windower::AudioFrame;
use crate::utils::get_frame_rms;
use rustfft::{num_complex::Complex, FftPlanner};

/// Below this frame RMS the autocorrelation method reports silence.
const RMS_FLOOR: f64 = 0.01;
/// A lag has to correlate this well before the peak follower engages.
const GOOD_CORRELATION: f64 = 0.9;
/// Weakest correlation the whole-lag fallback will still report.
const MIN_CORRELATION: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchAlgorithm {
    AutoCorrelation,
    FftPeak,
}

impl PitchAlgorithm {
    pub fn from_name(name: &str) -> Option<PitchAlgorithm> {
        match name {
            "autocorrelation" => Some(PitchAlgorithm::AutoCorrelation),
            "fft" => Some(PitchAlgorithm::FftPeak),
            _ => None,
        }
    }
}

/// A candidate frequency and the correlation/magnitude strength behind it.
#[derive(Debug, Clone, Copy)]
pub struct PitchEstimate {
    pub frequency: f64,
    pub strength: f64,
}

pub struct PitchDetector {
    algorithm: PitchAlgorithm,
    planner: FftPlanner<f32>,
}

impl PitchDetector {
    pub fn new(algorithm: PitchAlgorithm) -> PitchDetector {
        PitchDetector {
            algorithm,
            planner: FftPlanner::new(),
        }
    }

    pub fn get_algorithm(&self) -> PitchAlgorithm {
        self.algorithm
    }

    pub fn set_algorithm(&mut self, algorithm: PitchAlgorithm) -> () {
        self.algorithm = algorithm;
    }

    /// Estimate the fundamental of one frame.  None means "no pitch": too
    /// little energy, no periodicity, or an empty frame.  Never an error.
    pub fn estimate(&mut self, frame: &AudioFrame) -> Option<PitchEstimate> {
        if frame.samples.len() < 2 {
            return None;
        }
        match self.algorithm {
            PitchAlgorithm::AutoCorrelation => {
                auto_correlate(&frame.samples, frame.sample_rate as f64)
            }
            PitchAlgorithm::FftPeak => self.fft_peak(frame),
        }
    }

    fn fft_peak(&mut self, frame: &AudioFrame) -> Option<PitchEstimate> {
        let size = frame.samples.len();
        let fft = self.planner.plan_fft_forward(size);
        let mut buffer: Vec<Complex<f32>> = frame
            .samples
            .iter()
            .map(|s| Complex { re: *s, im: 0.0 })
            .collect();
        fft.process(&mut buffer);

        // scan the positive frequency bins, skipping DC
        let mut best_bin = 0;
        let mut best_mag = 0.0f64;
        for (bin, value) in buffer.iter().enumerate().take(size / 2 + 1).skip(1) {
            let mag = value.norm() as f64;
            if mag > best_mag {
                best_mag = mag;
                best_bin = bin;
            }
        }
        if best_mag <= 0.0 {
            return None;
        }
        Some(PitchEstimate {
            frequency: best_bin as f64 * frame.sample_rate as f64 / size as f64,
            strength: best_mag,
        })
    }
}

/// Normalized autocorrelation with the "first good peak" search.
///
/// Walks candidate lags, arms once a correlation clears [`GOOD_CORRELATION`]
/// while still improving, and declares the running best the moment
/// correlation declines.  That first-decline policy (rather than a global
/// maximum) is intentional: the match scores were tuned against it.
fn auto_correlate(samples: &[f32], sample_rate: f64) -> Option<PitchEstimate> {
    let size = samples.len();
    let max_lag = size / 2;

    if get_frame_rms(samples) < RMS_FLOOR {
        // not enough signal
        return None;
    }

    let mut best_offset: usize = 0;
    let mut best_correlation = 0.0f64;
    let mut found_good_correlation = false;
    let mut correlations = vec![0.0f64; max_lag];

    let mut last_correlation = 1.0f64;
    for offset in 0..max_lag {
        let mut correlation = 0.0f64;
        for i in 0..max_lag {
            correlation += (samples[i] - samples[i + offset]).abs() as f64;
        }
        correlation = 1.0 - correlation / max_lag as f64;
        correlations[offset] = correlation;

        if correlation > GOOD_CORRELATION && correlation > last_correlation {
            found_good_correlation = true;
            if correlation > best_correlation {
                best_correlation = correlation;
                best_offset = offset;
            }
        } else if found_good_correlation {
            // the peak just rolled over; refine it with the neighboring lags
            if best_offset >= 1 && best_offset + 1 < max_lag {
                let shift = (correlations[best_offset + 1] - correlations[best_offset - 1])
                    / correlations[best_offset];
                return Some(PitchEstimate {
                    frequency: sample_rate / (best_offset as f64 + 8.0 * shift),
                    strength: best_correlation,
                });
            }
            return Some(PitchEstimate {
                frequency: sample_rate / best_offset as f64,
                strength: best_correlation,
            });
        }
        last_correlation = correlation;
    }

    if best_correlation > MIN_CORRELATION && best_offset > 0 {
        return Some(PitchEstimate {
            frequency: sample_rate / best_offset as f64,
            strength: best_correlation,
        });
    }
    None
}

#[cfg(test)]
mod test_pitch_detector {
    use super::*;
    use rand::Rng;

    const SAMPLE_RATE: u32 = 48_000;

    fn sine_frame(freq: f32, size: usize) -> AudioFrame {
        let samples = (0..size)
            .map(|i| f32::sin(i as f32 * 2.0 * std::f32::consts::PI * freq / SAMPLE_RATE as f32))
            .collect();
        AudioFrame {
            samples,
            sample_rate: SAMPLE_RATE,
        }
    }

    fn silent_frame(size: usize) -> AudioFrame {
        AudioFrame {
            samples: vec![0.0; size],
            sample_rate: SAMPLE_RATE,
        }
    }

    #[test]
    fn silence_has_no_pitch() {
        let mut auto = PitchDetector::new(PitchAlgorithm::AutoCorrelation);
        let mut fft = PitchDetector::new(PitchAlgorithm::FftPeak);
        assert!(auto.estimate(&silent_frame(2048)).is_none());
        assert!(fft.estimate(&silent_frame(2048)).is_none());
    }

    #[test]
    fn noise_has_no_pitch() {
        let mut rng = rand::thread_rng();
        let samples: Vec<f32> = (0..2048).map(|_| rng.gen_range(-0.005..0.005)).collect();
        let frame = AudioFrame {
            samples,
            sample_rate: SAMPLE_RATE,
        };
        // below the rms floor, so the gate should reject it
        let mut detector = PitchDetector::new(PitchAlgorithm::AutoCorrelation);
        assert!(detector.estimate(&frame).is_none());
    }

    #[test]
    fn sine_within_two_percent() {
        let mut detector = PitchDetector::new(PitchAlgorithm::AutoCorrelation);
        for freq in [110.0, 220.0, 440.0, 453.0] {
            let est = detector.estimate(&sine_frame(freq, 2048)).unwrap();
            let err = (est.frequency - freq as f64).abs() / freq as f64;
            assert!(
                err < 0.02,
                "freq {} estimated {} (err {})",
                freq,
                est.frequency,
                err
            );
        }
    }

    #[test]
    fn fft_peak_lands_on_a_bin() {
        let mut detector = PitchDetector::new(PitchAlgorithm::FftPeak);
        // bin width is 48000/2048 = 23.4 Hz; 468.75 sits exactly on bin 20
        let est = detector.estimate(&sine_frame(468.75, 2048)).unwrap();
        assert!((est.frequency - 468.75).abs() < 0.001);
        assert!(est.strength > 0.0);
    }

    #[test]
    fn tiny_frame_has_no_pitch() {
        let mut detector = PitchDetector::new(PitchAlgorithm::AutoCorrelation);
        let frame = AudioFrame {
            samples: vec![0.5],
            sample_rate: SAMPLE_RATE,
        };
        assert!(detector.estimate(&frame).is_none());
    }

    #[test]
    fn algorithm_from_name() {
        assert_eq!(
            PitchAlgorithm::from_name("autocorrelation"),
            Some(PitchAlgorithm::AutoCorrelation)
        );
        assert_eq!(PitchAlgorithm::from_name("fft"), Some(PitchAlgorithm::FftPeak));
        assert_eq!(PitchAlgorithm::from_name("bogus"), None);
    }
}
