use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::history::SpectralHistory;
use super::spectral::{SpectralAnalyzer, SpectralFrame};
use crate::config::AnalysisConfig;
use crate::haptics::{HapticEngine, SourceId};
use crate::session::{SessionState, StateCell};
use crate::source::SourceMessage;

/// Asynchronous output of a source pipeline, delivered in capture order.
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    Spectral(SpectralFrame),
    StateChanged(SessionState),
}

/// Bound on the pipeline event queue. A drained subscriber never comes
/// close; without a subscriber, events past the bound are dropped instead
/// of accumulating for the life of the pipeline.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Accumulates arbitrarily-sized callback chunks into exact analysis
/// windows. Device callbacks rarely align with the window size.
pub struct FrameChunker {
    window_size: usize,
    pending: Vec<f32>,
}

impl FrameChunker {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            pending: Vec::with_capacity(window_size * 2),
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        self.pending.extend_from_slice(samples);
    }

    pub fn next_frame(&mut self) -> Option<Vec<f32>> {
        if self.pending.len() < self.window_size {
            return None;
        }
        Some(self.pending.drain(..self.window_size).collect())
    }
}

/// Dedicated serial analysis context for one audio source.
///
/// The FFT never runs on the device callback; chunks are handed off here so
/// the real-time thread only copies and sends. Each source gets its own
/// worker, so concurrent sources do not serialize against each other.
pub struct AnalysisWorker {
    handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    pub fn spawn(
        config: AnalysisConfig,
        rx: Receiver<SourceMessage>,
        state: StateCell,
        history: Arc<Mutex<SpectralHistory>>,
        events: Sender<PipelineEvent>,
        haptics: HapticEngine,
        source: SourceId,
    ) -> Self {
        let spawned = thread::Builder::new()
            .name("spectral-analysis".into())
            .spawn(move || {
                run_worker(config, rx, state, history, events, haptics, source);
            });

        match spawned {
            Ok(handle) => Self {
                handle: Some(handle),
            },
            Err(err) => {
                log::error!("failed to spawn analysis worker: {err}");
                Self { handle: None }
            }
        }
    }

    /// Block until the worker has drained and exited. The channel sender
    /// must already be torn down or this will wait for it.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_worker(
    config: AnalysisConfig,
    rx: Receiver<SourceMessage>,
    state: StateCell,
    history: Arc<Mutex<SpectralHistory>>,
    events: Sender<PipelineEvent>,
    haptics: HapticEngine,
    source: SourceId,
) {
    let mut analyzer = SpectralAnalyzer::new(config.window_size, config.output_bands);
    let mut chunker = FrameChunker::new(config.window_size);
    let mut analyzed = 0usize;

    while let Ok(message) = rx.recv() {
        match message {
            SourceMessage::Samples(chunk) => {
                chunker.push(&chunk);
                while let Some(frame) = chunker.next_frame() {
                    // Frames arriving while paused or ended are discarded
                    // here, not inside the analyzer.
                    if state.get() != SessionState::Playing {
                        continue;
                    }
                    if let Some(spectral) = analyzer.analyze(&frame) {
                        analyzed += 1;
                        history.lock().append(spectral.clone());
                        haptics.update(source, &spectral);
                        let _ = events.try_send(PipelineEvent::Spectral(spectral));
                    }
                }
            }
            SourceMessage::Finished => {
                state.set(SessionState::Ended);
                haptics.stop_continuous(source);
                let _ = events.try_send(PipelineEvent::StateChanged(SessionState::Ended));
                break;
            }
        }
    }

    log::debug!("analysis worker exiting after {analyzed} frames");
}
