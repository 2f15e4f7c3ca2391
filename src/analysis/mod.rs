//! Windowed spectral analysis: the FFT core, the display history ring and
//! the per-source analysis worker.

pub mod history;
pub mod spectral;
pub mod worker;

pub use history::SpectralHistory;
pub use spectral::{SpectralAnalyzer, SpectralFrame};
pub use worker::{AnalysisWorker, FrameChunker, PipelineEvent, EVENT_QUEUE_CAPACITY};
