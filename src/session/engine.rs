//! the KaraokeEngine aggregates all the analysis components into a single
//! structure.
//!
//! The engine drives off the [`KaraokeEngine::process`] function: the host
//! calls it off its real time clock (passing the current microsecond stamp),
//! and everything inside is synchronous and bounded.  Per call the engine
//! polls the command channel, pulls whatever audio each channel has ready,
//! runs the per channel pipelines, records labeled notes, and lets the
//! scorer sweep the traces.
//!
//! Status flows the other way over an mpsc Sender of json values: one
//! noteEvent per successful analysis tick (the U/X paints these live) and a
//! throttled scoreEvent.
use std::sync::mpsc;

use log::{debug, warn};
use serde_json::json;

use crate::common::{box_error::BoxError, config::EngineSettings, micro_timer::MicroTimer};
use crate::dsp::pitch_detector::PitchAlgorithm;
use crate::score::note_table::NOTE_TABLE;
use crate::score::note_trace::{ChannelId, ChannelTrace, NoteSample, TraceRecorder};
use crate::score::scorer::{Scorer, ScorerSettings, ScorerState};
use crate::session::channel_analyzer::ChannelAnalyzer;
use crate::session::param_message::{EngineParam, ParamMessage};
use crate::session::AudioSource;

/// how often the throttled score event goes out
pub const SCORE_REFRESH: u128 = 1_000_000; // 1 second
/// the source pages ran their analysis loops between these bounds
pub const MIN_ANALYSIS_INTERVAL_MS: u32 = 100;
pub const MAX_ANALYSIS_INTERVAL_MS: u32 = 400;

const CHANNELS: [ChannelId; 2] = [ChannelId::Mic, ChannelId::Reference];

pub struct KaraokeEngine<S: AudioSource> {
    source: S,
    settings: EngineSettings,
    status_data_tx: mpsc::Sender<serde_json::Value>,
    command_rx: mpsc::Receiver<ParamMessage>,
    analyzers: Vec<ChannelAnalyzer>,
    recorder: TraceRecorder,
    scorer: Scorer,
    update_timer: MicroTimer,
    in_session: bool,
    start_time: u128,
    now: u128,
}

impl<S: AudioSource> KaraokeEngine<S> {
    /// Build an engine around an audio source.  The Sender carries json
    /// status events to the U/X; the Receiver delivers [`ParamMessage`]
    /// commands.  No audio resources are touched until a session starts.
    pub fn new(
        source: S,
        settings: EngineSettings,
        tx: mpsc::Sender<serde_json::Value>,
        rx: mpsc::Receiver<ParamMessage>,
        now: u128,
    ) -> KaraokeEngine<S> {
        let scorer_settings = ScorerSettings {
            time_window: settings.time_window,
            accuracy_threshold: settings.accuracy_threshold,
            perfect_match_score: settings.perfect_match_score,
            near_match_score: settings.near_match_score,
        };
        KaraokeEngine {
            source,
            settings,
            status_data_tx: tx,
            command_rx: rx,
            analyzers: vec![],
            recorder: TraceRecorder::new(),
            scorer: Scorer::new(scorer_settings),
            update_timer: MicroTimer::new(now, SCORE_REFRESH),
            in_session: false,
            start_time: now,
            now,
        }
    }

    pub fn in_session(&self) -> bool {
        self.in_session
    }

    pub fn current_score(&self) -> u64 {
        self.scorer.get_score()
    }

    pub fn trace(&self, channel: ChannelId) -> &ChannelTrace {
        self.recorder.trace(channel)
    }

    /// Acquire the audio source and start a fresh session.  Acquisition
    /// failure is recoverable: the error goes back to the caller and the
    /// engine can be started again once the device shows up.
    pub fn start_session(&mut self, now: u128) -> Result<(), BoxError> {
        if self.in_session {
            return Ok(());
        }
        self.source.acquire()?;
        self.reset();
        self.analyzers = CHANNELS
            .iter()
            .map(|channel| {
                ChannelAnalyzer::new(
                    *channel,
                    &self.settings,
                    self.source.sample_rate(*channel),
                    now,
                )
            })
            .collect();
        self.start_time = now;
        self.now = now;
        self.in_session = true;
        debug!("session started at {}", now);
        self.send_session_event();
        Ok(())
    }

    /// Stop the session.  The source is released synchronously; when this
    /// returns the devices are closed and no analysis state survives into
    /// the next session.  Traces and score stay readable until reset.
    pub fn stop_session(&mut self) -> () {
        if !self.in_session {
            return;
        }
        self.source.release();
        self.analyzers.clear();
        self.scorer.set_playing(false);
        self.in_session = false;
        debug!("session stopped");
        self.send_session_event();
    }

    /// Clear all per-session state: traces, smoother history, score.  The
    /// note table is process wide and is not rebuilt.
    pub fn reset(&mut self) -> () {
        self.recorder.clear();
        self.scorer.reset();
        for analyzer in &mut self.analyzers {
            analyzer.reset();
        }
    }

    /// One cooperative tick.  `now` is the host's microsecond clock.
    pub fn process(&mut self, now: u128) -> Result<(), BoxError> {
        self.now = now;
        self.check_command();
        if !self.in_session {
            return Ok(());
        }
        self.scorer.set_playing(self.source.is_reference_playing());
        for index in 0..self.analyzers.len() {
            let channel = self.analyzers[index].get_channel();
            let input = match self.source.pull_samples(channel) {
                Some(samples) => samples,
                None => continue, // device had nothing this tick
            };
            if let Some(frequency) = self.analyzers[index].process(&input, now) {
                let sample = NoteSample {
                    time: self.elapsed_seconds(now),
                    frequency,
                    note: String::from(NOTE_TABLE.quantize(frequency)),
                };
                self.send_note_event(channel, &sample);
                self.recorder.append(channel, sample)?;
            }
        }
        self.scorer.update(
            self.recorder.trace(ChannelId::Mic),
            self.recorder.trace(ChannelId::Reference),
        );
        self.send_status();
        Ok(())
    }

    fn elapsed_seconds(&self, now: u128) -> f64 {
        now.saturating_sub(self.start_time) as f64 / 1_000_000.0
    }

    // This is where we check for any commands we need to process
    fn check_command(&mut self) -> () {
        match self.command_rx.try_recv() {
            Ok(msg) => {
                self.process_param_command(msg);
            }
            Err(_) => (),
        }
    }

    fn process_param_command(&mut self, msg: ParamMessage) -> () {
        match msg.param {
            EngineParam::StartSession => {
                let now = self.now;
                if let Err(e) = self.start_session(now) {
                    warn!("could not start session: {}", e);
                    let _res = self.status_data_tx.send(json!({
                        "speaker": "SingUnit",
                        "errorEvent": { "message": e.to_string() },
                    }));
                }
            }
            EngineParam::StopSession => {
                self.stop_session();
            }
            EngineParam::ResetSession => {
                self.reset();
            }
            EngineParam::SetAlgorithm => match PitchAlgorithm::from_name(&msg.svalue) {
                Some(algorithm) => {
                    self.settings.algorithm = msg.svalue.clone();
                    for analyzer in &mut self.analyzers {
                        analyzer.set_algorithm(algorithm);
                    }
                }
                None => {
                    warn!("unknown algorithm requested: {}", msg.svalue);
                }
            },
            EngineParam::SetMicSmoothing => {
                self.settings.mic_smoothing_factor = msg.fvalue;
                self.set_smoothing(ChannelId::Mic, msg.fvalue);
            }
            EngineParam::SetRefSmoothing => {
                self.settings.ref_smoothing_factor = msg.fvalue;
                self.set_smoothing(ChannelId::Reference, msg.fvalue);
            }
            EngineParam::SetAnalysisInterval => {
                let interval =
                    (msg.ivalue as u32).clamp(MIN_ANALYSIS_INTERVAL_MS, MAX_ANALYSIS_INTERVAL_MS);
                self.settings.analysis_interval_ms = interval;
                for analyzer in &mut self.analyzers {
                    analyzer.set_interval_ms(interval);
                }
            }
            EngineParam::GetScore => {
                self.send_score_event();
            }
        }
    }

    fn set_smoothing(&mut self, channel: ChannelId, factor: f64) -> () {
        for analyzer in &mut self.analyzers {
            if analyzer.get_channel() == channel {
                analyzer.set_smoothing_factor(factor);
            }
        }
    }

    fn send_status(&mut self) -> () {
        // give any clients on the status channel a periodic score update
        if self.update_timer.expired(self.now) {
            self.update_timer.reset(self.now);
            self.send_score_event();
        }
    }

    fn send_note_event(&self, channel: ChannelId, sample: &NoteSample) -> () {
        let _res = self.status_data_tx.send(json!({
            "speaker": "SingUnit",
            "noteEvent": {
                "channel": channel.label(),
                "time": sample.time,
                "frequency": sample.frequency,
                "note": sample.note,
            }
        }));
    }

    fn send_score_event(&self) -> () {
        let _res = self.status_data_tx.send(json!({
            "speaker": "SingUnit",
            "scoreEvent": {
                "score": self.scorer.get_score(),
                "recording": self.scorer.get_state() == ScorerState::Recording,
                "micSamples": self.recorder.trace(ChannelId::Mic).len(),
                "refSamples": self.recorder.trace(ChannelId::Reference).len(),
            }
        }));
    }

    fn send_session_event(&self) -> () {
        let _res = self.status_data_tx.send(json!({
            "speaker": "SingUnit",
            "sessionEvent": { "active": self.in_session },
        }));
    }
}

#[cfg(test)]
mod test_karaoke_engine {
    use super::*;
    use crate::session::MockAudioSource;
    use simple_error::simple_error;

    fn channels() -> (
        mpsc::Sender<serde_json::Value>,
        mpsc::Receiver<serde_json::Value>,
        mpsc::Sender<ParamMessage>,
        mpsc::Receiver<ParamMessage>,
    ) {
        let (status_tx, status_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();
        (status_tx, status_rx, command_tx, command_rx)
    }

    fn sine_chunk(freq: f32, count: usize, offset: usize) -> Vec<f32> {
        (offset..offset + count)
            .map(|i| f32::sin(i as f32 * 2.0 * std::f32::consts::PI * freq / 48_000.0))
            .collect()
    }

    #[test]
    fn acquire_failure_is_recoverable() {
        let (status_tx, _status_rx, _command_tx, command_rx) = channels();
        let mut source = MockAudioSource::new();
        source
            .expect_acquire()
            .times(1)
            .returning(|| Err(simple_error!("no mic").into()));
        let mut engine =
            KaraokeEngine::new(source, EngineSettings::default(), status_tx, command_rx, 0);
        assert!(engine.start_session(0).is_err());
        assert!(!engine.in_session());
        // engine still ticks over without a session
        assert!(engine.process(1_000).is_ok());
    }

    #[test]
    fn full_tick_records_and_scores() {
        let (status_tx, status_rx, _command_tx, command_rx) = channels();
        let mut source = MockAudioSource::new();
        source.expect_acquire().returning(|| Ok(()));
        source.expect_sample_rate().returning(|_| 48_000);
        source.expect_is_reference_playing().returning(|| true);
        let mut tick = 0usize;
        source.expect_pull_samples().returning(move |_| {
            // same phase-continuous sine on both channels
            let chunk = sine_chunk(440.0, 2048, tick / 2 * 2048);
            tick += 1;
            Some(chunk)
        });
        source.expect_release().times(1).return_const(());

        let mut engine =
            KaraokeEngine::new(source, EngineSettings::default(), status_tx, command_rx, 0);
        engine.start_session(0).unwrap();
        let mut now = 0u128;
        for _ in 0..5 {
            now += 300_000; // one analysis interval per tick
            engine.process(now).unwrap();
        }
        assert!(engine.trace(ChannelId::Mic).len() > 0);
        assert!(engine.trace(ChannelId::Reference).len() > 0);
        // identical streams land well inside the accuracy window
        assert!(engine.current_score() > 0);
        // the U/X got at least one note event
        let mut saw_note_event = false;
        while let Ok(event) = status_rx.try_recv() {
            if !event["noteEvent"].is_null() {
                saw_note_event = true;
            }
        }
        assert!(saw_note_event);
        engine.stop_session();
        assert!(!engine.in_session());
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let (status_tx, _status_rx, _command_tx, command_rx) = channels();
        let mut source = MockAudioSource::new();
        source.expect_acquire().returning(|| Ok(()));
        source.expect_sample_rate().returning(|_| 48_000);
        source.expect_is_reference_playing().returning(|| true);
        let mut tick = 0usize;
        source.expect_pull_samples().returning(move |_| {
            let chunk = sine_chunk(440.0, 2048, tick / 2 * 2048);
            tick += 1;
            Some(chunk)
        });

        let mut engine =
            KaraokeEngine::new(source, EngineSettings::default(), status_tx, command_rx, 0);
        engine.start_session(0).unwrap();
        engine.process(300_000).unwrap();
        engine.process(600_000).unwrap();
        assert!(engine.current_score() > 0);
        engine.reset();
        assert_eq!(engine.current_score(), 0);
        assert!(engine.trace(ChannelId::Mic).is_empty());
        assert!(engine.trace(ChannelId::Reference).is_empty());
    }

    #[test]
    fn commands_drive_the_engine() {
        let (status_tx, status_rx, command_tx, command_rx) = channels();
        let mut source = MockAudioSource::new();
        source.expect_acquire().returning(|| Ok(()));
        source.expect_sample_rate().returning(|_| 48_000);
        source.expect_is_reference_playing().returning(|| false);
        source.expect_pull_samples().returning(|_| None);
        source.expect_release().return_const(());

        let mut engine =
            KaraokeEngine::new(source, EngineSettings::default(), status_tx, command_rx, 0);
        command_tx
            .send(ParamMessage::new(EngineParam::StartSession, 0, 0.0, ""))
            .unwrap();
        engine.process(1_000).unwrap();
        assert!(engine.in_session());

        command_tx
            .send(ParamMessage::new(EngineParam::GetScore, 0, 0.0, ""))
            .unwrap();
        engine.process(2_000).unwrap();
        let mut saw_score_event = false;
        while let Ok(event) = status_rx.try_recv() {
            if !event["scoreEvent"].is_null() {
                saw_score_event = true;
            }
        }
        assert!(saw_score_event);

        command_tx
            .send(ParamMessage::new(EngineParam::StopSession, 0, 0.0, ""))
            .unwrap();
        engine.process(3_000).unwrap();
        assert!(!engine.in_session());
    }

    #[test]
    fn paused_reference_means_no_score() {
        let (status_tx, _status_rx, _command_tx, command_rx) = channels();
        let mut source = MockAudioSource::new();
        source.expect_acquire().returning(|| Ok(()));
        source.expect_sample_rate().returning(|_| 48_000);
        source.expect_is_reference_playing().returning(|| false);
        let mut tick = 0usize;
        source.expect_pull_samples().returning(move |_| {
            let chunk = sine_chunk(440.0, 2048, tick / 2 * 2048);
            tick += 1;
            Some(chunk)
        });

        let mut engine =
            KaraokeEngine::new(source, EngineSettings::default(), status_tx, command_rx, 0);
        engine.start_session(0).unwrap();
        for i in 1..=4 {
            engine.process(i * 300_000).unwrap();
        }
        // notes were recorded but nothing was scored
        assert!(engine.trace(ChannelId::Mic).len() > 0);
        assert_eq!(engine.current_score(), 0);
    }
}
