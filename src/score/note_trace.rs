//! per channel, append-only record of the labeled note stream
//!
//! One trace per channel, stamped with seconds from analysis start.  A trace
//! only ever grows at non-decreasing time; an append that runs backwards
//! means the host fed us a broken clock and is rejected as an error rather
//! than silently reordered.
use crate::common::box_error::BoxError;
use serde::{Deserialize, Serialize};
use simple_error::bail;
use std::fmt;

/// The two audio sources a session analyzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ChannelId {
    Mic = 0,
    Reference = 1,
}

pub const NUM_CHANNELS: usize = 2;

impl ChannelId {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelId::Mic => "mic",
            ChannelId::Reference => "reference",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One analyzed tick: when it happened, what frequency we heard, and the
/// note label it quantized to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSample {
    pub time: f64,
    pub frequency: f64,
    pub note: String,
}

/// Ordered, append-only sequence of note samples for one channel.
#[derive(Debug, Default)]
pub struct ChannelTrace {
    samples: Vec<NoteSample>,
}

impl ChannelTrace {
    pub fn new() -> ChannelTrace {
        ChannelTrace { samples: vec![] }
    }

    pub fn append(&mut self, sample: NoteSample) -> Result<(), BoxError> {
        if let Some(last) = self.samples.last() {
            if sample.time < last.time {
                bail!(
                    "out of order note sample: {} after {}",
                    sample.time,
                    last.time
                );
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn samples(&self) -> &[NoteSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) -> () {
        self.samples.clear();
    }
}

/// Owns the trace for each channel for the lifetime of one session.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    traces: [ChannelTrace; NUM_CHANNELS],
}

impl TraceRecorder {
    pub fn new() -> TraceRecorder {
        TraceRecorder {
            traces: [ChannelTrace::new(), ChannelTrace::new()],
        }
    }

    pub fn append(&mut self, channel: ChannelId, sample: NoteSample) -> Result<(), BoxError> {
        self.traces[channel as usize].append(sample)
    }

    pub fn trace(&self, channel: ChannelId) -> &ChannelTrace {
        &self.traces[channel as usize]
    }

    pub fn clear(&mut self) -> () {
        for trace in &mut self.traces {
            trace.clear();
        }
    }
}
