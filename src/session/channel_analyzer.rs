//! one channel's analysis pipeline: windower -> pitch detector -> smoother
//!
//! The engine owns one of these per channel.  Samples go in whenever the
//! host delivers them; a smoothed frequency comes out at most once per
//! analysis interval.
use crate::common::config::EngineSettings;
use crate::dsp::pitch_detector::{PitchAlgorithm, PitchDetector};
use crate::dsp::smoothing_filter::PitchSmoother;
use crate::dsp::windower::Windower;
use crate::score::note_trace::ChannelId;
use log::warn;

pub struct ChannelAnalyzer {
    channel: ChannelId,
    windower: Windower,
    detector: PitchDetector,
    smoother: PitchSmoother,
}

impl ChannelAnalyzer {
    pub fn new(
        channel: ChannelId,
        settings: &EngineSettings,
        sample_rate: u32,
        now: u128,
    ) -> ChannelAnalyzer {
        let algorithm = match PitchAlgorithm::from_name(&settings.algorithm) {
            Some(a) => a,
            None => {
                warn!(
                    "unknown pitch algorithm '{}', using autocorrelation",
                    settings.algorithm
                );
                PitchAlgorithm::AutoCorrelation
            }
        };
        // the mic gets the light smoothing so attacks track quickly
        let factor = match channel {
            ChannelId::Mic => settings.mic_smoothing_factor,
            ChannelId::Reference => settings.ref_smoothing_factor,
        };
        ChannelAnalyzer {
            channel,
            windower: Windower::new(
                settings.frame_size,
                settings.overlap,
                settings.analysis_interval_ms,
                sample_rate,
                now,
            ),
            detector: PitchDetector::new(algorithm),
            smoother: PitchSmoother::new(
                factor,
                settings.history_size,
                settings.min_frequency,
                settings.max_frequency,
            ),
        }
    }

    pub fn get_channel(&self) -> ChannelId {
        self.channel
    }

    /// Feed a batch of samples and run the pipeline.  None until a full
    /// frame is ready, the interval has elapsed, and a pitch survived the
    /// smoother's gates.
    pub fn process(&mut self, input: &[f32], now: u128) -> Option<f64> {
        self.windower.add_samples(input);
        let frame = self.windower.get_frame(now)?;
        let estimate = self.detector.estimate(&frame);
        self.smoother.get(estimate)
    }

    pub fn set_algorithm(&mut self, algorithm: PitchAlgorithm) -> () {
        self.detector.set_algorithm(algorithm);
    }

    pub fn set_smoothing_factor(&mut self, factor: f64) -> () {
        self.smoother.set_factor(factor);
    }

    pub fn set_interval_ms(&mut self, interval_ms: u32) -> () {
        self.windower.set_interval_ms(interval_ms);
    }

    /// Drop all buffered signal and smoothing state so the next session
    /// starts clean.
    pub fn reset(&mut self) -> () {
        self.windower.clear();
        self.smoother.reset();
    }
}

#[cfg(test)]
mod test_channel_analyzer {
    use super::*;

    const SAMPLE_RATE: u32 = 48_000;

    fn sine(freq: f32, count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| f32::sin(i as f32 * 2.0 * std::f32::consts::PI * freq / SAMPLE_RATE as f32))
            .collect()
    }

    fn analyzer() -> ChannelAnalyzer {
        let settings = EngineSettings::default();
        ChannelAnalyzer::new(ChannelId::Mic, &settings, SAMPLE_RATE, 0)
    }

    #[test]
    fn detects_a_sine_after_one_frame() {
        let mut a = analyzer();
        // not enough samples yet
        assert!(a.process(&sine(440.0, 1024), 300_000).is_none());
        let freq = a.process(&sine(440.0, 2048), 600_000);
        assert!(freq.is_some());
        let freq = freq.unwrap();
        assert!((freq - 440.0).abs() / 440.0 < 0.02, "got {}", freq);
    }

    #[test]
    fn silence_yields_nothing() {
        let mut a = analyzer();
        assert!(a.process(&vec![0.0; 4096], 300_000).is_none());
    }

    #[test]
    fn reset_clears_pipeline_state() {
        let mut a = analyzer();
        a.process(&sine(440.0, 4096), 300_000);
        a.reset();
        // a full fresh frame is required again after reset
        assert!(a.process(&sine(440.0, 1024), 600_000).is_none());
    }
}
