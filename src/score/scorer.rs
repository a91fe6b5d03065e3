//! time aligns the mic trace against the reference trace and keeps score
//!
//! The scorer is a tiny state machine: Idle until the backing track is
//! playing, Recording while it is, back to Idle when it pauses, re-enterable.
//! While Recording every update sweeps the mic trace for samples that have
//! not yet been consumed, pairs each with the closest-in-time reference
//! sample inside the match window, and awards points on frequency agreement.
//! A mic sample is consumed the moment a window partner is found, whether or
//! not it earned points, so nothing is ever counted twice.  The score only
//! ever grows until an explicit reset.
use crate::score::note_trace::ChannelTrace;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerState {
    Idle,
    Recording,
}

#[derive(Debug, Clone)]
pub struct ScorerSettings {
    /// seconds of clock skew allowed between a mic and reference sample
    pub time_window: f64,
    /// Hz of frequency error that still earns the near match award
    pub accuracy_threshold: f64,
    pub perfect_match_score: u64,
    pub near_match_score: u64,
}

impl Default for ScorerSettings {
    fn default() -> ScorerSettings {
        ScorerSettings {
            time_window: 0.4,
            accuracy_threshold: 100.0,
            perfect_match_score: 100,
            near_match_score: 50,
        }
    }
}

pub struct Scorer {
    settings: ScorerSettings,
    state: ScorerState,
    score: u64,
    matched: Vec<bool>,
}

impl Scorer {
    pub fn new(settings: ScorerSettings) -> Scorer {
        Scorer {
            settings,
            state: ScorerState::Idle,
            score: 0,
            matched: vec![],
        }
    }

    pub fn get_score(&self) -> u64 {
        self.score
    }

    pub fn get_state(&self) -> ScorerState {
        self.state
    }

    /// Track the external "reference is playing" signal.  Recording is only
    /// active while the backing track runs.
    pub fn set_playing(&mut self, playing: bool) -> () {
        let next = if playing {
            ScorerState::Recording
        } else {
            ScorerState::Idle
        };
        if next != self.state {
            debug!("scorer state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Run a matching pass over the two traces.  Called after either trace
    /// grows; does nothing unless Recording.
    pub fn update(&mut self, mic: &ChannelTrace, reference: &ChannelTrace) -> () {
        if self.state != ScorerState::Recording {
            return;
        }
        if self.matched.len() < mic.len() {
            self.matched.resize(mic.len(), false);
        }
        for (index, mic_sample) in mic.samples().iter().enumerate() {
            if self.matched[index] {
                continue;
            }
            // closest reference sample inside the window, if any
            let mut best: Option<(f64, f64)> = None; // (time diff, ref frequency)
            for ref_sample in reference.samples() {
                let time_diff = (mic_sample.time - ref_sample.time).abs();
                if time_diff > self.settings.time_window {
                    continue;
                }
                match best {
                    Some((best_diff, _)) if time_diff >= best_diff => (),
                    _ => best = Some((time_diff, ref_sample.frequency)),
                }
            }
            if let Some((_, ref_frequency)) = best {
                let frequency_diff = (mic_sample.frequency - ref_frequency).abs();
                if frequency_diff <= self.settings.accuracy_threshold {
                    if frequency_diff == 0.0 {
                        self.score += self.settings.perfect_match_score;
                    } else {
                        self.score += self.settings.near_match_score;
                    }
                }
                // consumed either way; later passes must not rescore it
                self.matched[index] = true;
            }
        }
    }

    pub fn reset(&mut self) -> () {
        self.score = 0;
        self.matched.clear();
        self.state = ScorerState::Idle;
    }
}
