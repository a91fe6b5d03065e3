//! assembles a continuous sample stream into fixed size analysis frames
//!
//! The windower does two jobs: it holds back analysis until a full frame of
//! samples has arrived, and it throttles emission so estimation never runs
//! faster than the analysis interval, no matter how fast the host pushes
//! audio at us.
use crate::common::micro_timer::MicroTimer;

/// One frame of audio ready for pitch estimation.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

pub struct Windower {
    frame_size: usize,
    overlap: usize,
    sample_rate: u32,
    interval: MicroTimer,
    buffer: Vec<f32>,
    fresh: usize,
}

impl Windower {
    pub fn new(frame_size: usize, overlap: usize, interval_ms: u32, sample_rate: u32, now: u128) -> Windower {
        // overlap beyond the frame would mean no fresh data is ever required
        let overlap = overlap.min(frame_size.saturating_sub(1));
        Windower {
            frame_size,
            overlap,
            sample_rate,
            interval: MicroTimer::new(now, interval_ms as u128 * 1000),
            buffer: vec![],
            fresh: 0,
        }
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_interval_ms(&mut self, interval_ms: u32) -> () {
        self.interval.set_interval(interval_ms as u128 * 1000);
    }

    /// Push whatever the audio device delivered this tick.
    pub fn add_samples(&mut self, input: &[f32]) -> () {
        self.buffer.extend_from_slice(input);
        self.fresh += input.len();
        // keep memory bounded; only the newest frame worth of backlog matters
        if self.buffer.len() > self.frame_size * 2 {
            let excess = self.buffer.len() - self.frame_size * 2;
            self.buffer.drain(0..excess);
        }
    }

    /// Emit a frame when enough fresh samples are in and the interval has
    /// elapsed.  Returns None until both conditions hold.
    pub fn get_frame(&mut self, now: u128) -> Option<AudioFrame> {
        if self.buffer.len() < self.frame_size {
            return None;
        }
        if self.fresh < self.frame_size - self.overlap {
            return None;
        }
        if !self.interval.expired(now) {
            return None;
        }
        self.interval.reset(now);
        self.fresh = 0;
        let start = self.buffer.len() - self.frame_size;
        let samples = self.buffer[start..].to_vec();
        // retain only the overlap tail for the next frame
        let keep = self.buffer.len() - self.overlap;
        self.buffer.drain(0..keep);
        Some(AudioFrame {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    pub fn clear(&mut self) -> () {
        self.buffer.clear();
        self.fresh = 0;
    }
}
