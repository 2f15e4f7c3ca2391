//! Audio sources: asset decoding, live microphone capture and decoded-file
//! playback. All variants deliver mono PCM chunks to the analysis worker
//! over a channel, straight from the device/decoder callback.

pub mod capture;
pub mod decode;
pub mod playback;

pub use capture::MicCapture;
pub use decode::{decode_asset, DecodedAudio};
pub use playback::FilePlayer;

/// What a source sends into its analysis channel. `Finished` is only ever
/// emitted by non-looping playback, after the final sample chunk.
#[derive(Debug)]
pub enum SourceMessage {
    Samples(Vec<f32>),
    Finished,
}
