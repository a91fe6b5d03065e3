//! components used to run a karaoke scoring session
use crate::common::box_error::BoxError;
use crate::score::note_trace::ChannelId;

/// Seam between the engine and the host audio layer.
///
/// The host owns the actual capture/playback plumbing (sound card, media
/// element, whatever).  The engine only ever sees this trait: it pulls
/// sample batches per channel, asks for the sample rate, and watches the
/// "reference is playing" flag that gates scoring.
///
/// `acquire` grabs the underlying devices and may fail (mic unplugged); the
/// engine reports that once and stays usable so the host can retry.
/// `release` must tear the devices down synchronously - when it returns the
/// session is stopped and nothing will call `pull_samples` again.
#[cfg_attr(test, mockall::automock)]
pub trait AudioSource {
    fn acquire(&mut self) -> Result<(), BoxError>;
    fn release(&mut self) -> ();
    fn pull_samples(&mut self, channel: ChannelId) -> Option<Vec<f32>>;
    fn sample_rate(&self, channel: ChannelId) -> u32;
    fn is_reference_playing(&self) -> bool;
}

pub mod channel_analyzer;
pub mod engine;
pub mod param_message;
