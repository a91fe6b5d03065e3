//! damps frame to frame jitter in the raw pitch estimates
//!
//! Raw estimates wobble a few Hz per frame and occasionally jump an octave
//! for a single frame.  The smoother averages a short history and then runs
//! an exponential filter over that average.  Silence clears the filter state
//! so a quiet gap never drags the next note attack toward zero.
use crate::dsp::moving_avg::MovingAverage;
use crate::dsp::pitch_detector::PitchEstimate;

pub struct PitchSmoother {
    factor: f64,
    min_frequency: f64,
    max_frequency: f64,
    history: MovingAverage,
    last_output: Option<f64>,
}

impl PitchSmoother {
    /// `factor` is the exponential weight on the previous output (0.8 for
    /// low latency mic tracking, 0.98 for backing track analysis).
    pub fn new(factor: f64, history_size: usize, min_frequency: f64, max_frequency: f64) -> PitchSmoother {
        PitchSmoother {
            factor: factor.clamp(0.0, 1.0),
            min_frequency,
            max_frequency,
            history: MovingAverage::new(history_size),
            last_output: None,
        }
    }

    pub fn set_factor(&mut self, factor: f64) -> () {
        self.factor = factor.clamp(0.0, 1.0);
    }

    pub fn get_last_output(&self) -> Option<f64> {
        self.last_output
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Feed one estimate, get the smoothed frequency back.  A missing or
    /// out-of-band estimate counts as silence: it clears the last output
    /// (but not the history) and yields None.
    pub fn get(&mut self, estimate: Option<PitchEstimate>) -> Option<f64> {
        let frequency = match estimate {
            Some(est)
                if est.frequency >= self.min_frequency && est.frequency <= self.max_frequency =>
            {
                est.frequency
            }
            _ => {
                self.last_output = None;
                return None;
            }
        };
        self.history.add_sample(frequency);
        let average = self.history.get_mean();
        let smoothed = match self.last_output {
            Some(last) => last * self.factor + average * (1.0 - self.factor),
            None => average,
        };
        self.last_output = Some(smoothed);
        self.last_output
    }

    pub fn reset(&mut self) -> () {
        self.history.clear();
        self.last_output = None;
    }
}

#[cfg(test)]
mod test_pitch_smoother {
    use super::*;

    fn est(frequency: f64) -> Option<PitchEstimate> {
        Some(PitchEstimate {
            frequency,
            strength: 1.0,
        })
    }

    #[test]
    fn first_estimate_passes_through() {
        let mut smoother = PitchSmoother::new(0.98, 10, 50.0, 2000.0);
        assert_eq!(smoother.get(est(440.0)), Some(440.0));
    }

    #[test]
    fn heavy_factor_moves_slowly() {
        let mut smoother = PitchSmoother::new(0.98, 10, 50.0, 2000.0);
        smoother.get(est(440.0));
        let second = smoother.get(est(880.0)).unwrap();
        // 0.98 * 440 + 0.02 * 660 = 444.4
        assert!((second - 444.4).abs() < 1e-9);
    }

    #[test]
    fn silence_clears_last_output_only() {
        let mut smoother = PitchSmoother::new(0.8, 10, 50.0, 2000.0);
        smoother.get(est(440.0));
        assert_eq!(smoother.get(None), None);
        assert_eq!(smoother.get_last_output(), None);
        assert_eq!(smoother.history_len(), 1);
        // next attack starts from the history average, not from zero
        let next = smoother.get(est(440.0)).unwrap();
        assert!((next - 440.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_band_is_silence() {
        let mut smoother = PitchSmoother::new(0.8, 10, 50.0, 2000.0);
        smoother.get(est(440.0));
        assert_eq!(smoother.get(est(3000.0)), None);
        assert_eq!(smoother.get(est(10.0)), None);
        assert_eq!(smoother.get_last_output(), None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut smoother = PitchSmoother::new(0.8, 10, 50.0, 2000.0);
        smoother.get(est(440.0));
        smoother.reset();
        assert_eq!(smoother.get_last_output(), None);
        assert_eq!(smoother.history_len(), 0);
    }
}
