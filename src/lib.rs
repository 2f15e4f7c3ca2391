//! Real-time audio spectral analysis and haptic mapping.
//!
//! Captured or decoded PCM flows one way through the pipeline:
//! device/decoder callback -> per-source analysis worker (FFT, banding,
//! per-frame normalization) -> spectrogram history and the shared haptic
//! engine. Control flows the other way: the presentation layer issues
//! start/pause/resume/stop/toggle commands into [`pipeline::SourcePipeline`]
//! and one-shot triggers into [`haptics::HapticEngine`].

pub mod analysis;
pub mod config;
pub mod error;
pub mod haptics;
pub mod pipeline;
pub mod session;
pub mod source;

pub use analysis::{PipelineEvent, SpectralAnalyzer, SpectralFrame, SpectralHistory};
pub use config::Config;
pub use error::{Error, Result};
pub use haptics::{HapticEngine, LogDriver, NullDriver, OneShot, SourceId};
pub use pipeline::SourcePipeline;
pub use session::{SessionState, TransportAction};
