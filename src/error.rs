use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures this core can surface to callers. Everything else (missing
/// haptic hardware, missing input device, dropped parameter sends) degrades
/// to an inert no-op instead of erroring.
#[derive(Debug, Error)]
pub enum Error {
    #[error("audio asset not found or unreadable: {}", path.display())]
    UnresolvableAsset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode audio asset")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("unsupported audio asset: {0}")]
    Unsupported(&'static str),

    #[error("no usable audio output device")]
    NoOutputDevice,

    #[error("audio stream error: {0}")]
    Stream(String),
}
