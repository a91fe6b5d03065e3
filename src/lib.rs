//! rtsing - Real Time Sing library
//!
//! provides the pitch detection and note matching engine behind a karaoke
//! scoring unit.  A host audio layer feeds the engine raw sample frames for
//! the microphone and the backing track; the engine turns those into a
//! labeled note stream per channel and an accumulating match score.
#[macro_use]
extern crate num_derive;

pub mod common;
pub mod dsp;
pub mod score;
pub mod session;
pub mod utils;

pub use session::engine::KaraokeEngine;
pub use session::param_message::ParamMessage;
pub use session::AudioSource;
