use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::worker::{AnalysisWorker, PipelineEvent, EVENT_QUEUE_CAPACITY};
use crate::analysis::{SpectralFrame, SpectralHistory};
use crate::config::{AnalysisConfig, Config};
use crate::error::Result;
use crate::haptics::{HapticEngine, SourceId};
use crate::session::{SessionState, StateCell, TransportAction};
use crate::source::{decode_asset, FilePlayer, MicCapture};

#[derive(Clone, Debug)]
enum SourceSpec {
    File { path: PathBuf, looped: bool },
    Mic,
}

enum Source {
    File(FilePlayer),
    Mic(MicCapture),
}

/// One audio source instance: capture or playback, its dedicated analysis
/// worker, the display history and the session state machine.
///
/// Pipelines are explicitly constructed and owned by the screen or session
/// using them; several can run concurrently (comparison cards), sharing one
/// [`HapticEngine`] clone, which keeps a single continuous handle alive via
/// last-writer-wins.
pub struct SourcePipeline {
    analysis: AnalysisConfig,
    haptics: HapticEngine,
    source_id: SourceId,
    state: StateCell,
    history: Arc<Mutex<SpectralHistory>>,
    events_tx: Sender<PipelineEvent>,
    events_rx: Receiver<PipelineEvent>,
    source: Option<Source>,
    worker: Option<AnalysisWorker>,
    last_spec: Option<SourceSpec>,
}

impl SourcePipeline {
    pub fn new(config: &Config, haptics: HapticEngine) -> Self {
        let (events_tx, events_rx) = bounded(EVENT_QUEUE_CAPACITY);
        Self {
            analysis: config.analysis,
            haptics,
            source_id: SourceId::next(),
            state: StateCell::new(),
            history: Arc::new(Mutex::new(SpectralHistory::new(config.history.capacity))),
            events_tx,
            events_rx,
            source: None,
            worker: None,
            last_spec: None,
        }
    }

    /// Play a decoded asset once; transitions to `Ended` on completion.
    pub fn start_file(&mut self, path: &Path) -> Result<()> {
        self.begin(SourceSpec::File {
            path: path.to_path_buf(),
            looped: false,
        })
    }

    /// Play a decoded asset in a seamless loop; never completes on its own.
    pub fn start_file_looped(&mut self, path: &Path) -> Result<()> {
        self.begin(SourceSpec::File {
            path: path.to_path_buf(),
            looped: true,
        })
    }

    /// Capture from the default microphone. Inert (no frames) when no input
    /// device is available.
    pub fn start_mic(&mut self) -> Result<()> {
        self.begin(SourceSpec::Mic)
    }

    fn begin(&mut self, spec: SourceSpec) -> Result<()> {
        // Starting a new session always stops any previous one first.
        self.stop();

        let (tx, rx) = unbounded();

        // Build the source before mutating any state: a failed start leaves
        // no tap installed and no haptics running.
        let source = match &spec {
            SourceSpec::File { path, looped } => {
                let audio = decode_asset(path)?;
                Source::File(FilePlayer::prepare(audio, *looped, tx)?)
            }
            SourceSpec::Mic => Source::Mic(MicCapture::prepare(tx)?),
        };

        let worker = AnalysisWorker::spawn(
            self.analysis,
            rx,
            self.state.clone(),
            Arc::clone(&self.history),
            self.events_tx.clone(),
            self.haptics.clone(),
            self.source_id,
        );

        self.state.set(SessionState::Playing);
        let started = match &source {
            Source::File(player) => player.play(),
            Source::Mic(capture) => capture.play(),
        };
        if let Err(err) = started {
            // Roll back: drop the stream (its sender with it), drain the
            // worker, and leave the session as it was.
            drop(source);
            worker.join();
            self.state.set(SessionState::Ended);
            return Err(err);
        }

        self.haptics.start_continuous(self.source_id);
        let _ = self
            .events_tx
            .try_send(PipelineEvent::StateChanged(SessionState::Playing));

        self.source = Some(source);
        self.worker = Some(worker);
        self.last_spec = Some(spec);
        Ok(())
    }

    /// Suspend file playback. No-op while not playing and for live capture.
    pub fn pause(&mut self) {
        if self.state.get() != SessionState::Playing {
            return;
        }
        let Some(Source::File(player)) = &self.source else {
            return;
        };
        match player.pause() {
            Ok(()) => {
                self.state.set(SessionState::Paused);
                let _ = self
                    .events_tx
                    .try_send(PipelineEvent::StateChanged(SessionState::Paused));
            }
            Err(err) => log::warn!("pause failed: {err}"),
        }
    }

    /// Continue from the suspension point. No-op unless paused.
    pub fn resume(&mut self) {
        if self.state.get() != SessionState::Paused {
            return;
        }
        let Some(Source::File(player)) = &self.source else {
            return;
        };
        match player.play() {
            Ok(()) => {
                self.state.set(SessionState::Playing);
                let _ = self
                    .events_tx
                    .try_send(PipelineEvent::StateChanged(SessionState::Playing));
            }
            Err(err) => log::warn!("resume failed: {err}"),
        }
    }

    /// Tear down the session. After this returns, no analysis callback or
    /// haptic update for this source will fire: the tap is removed and the
    /// worker joined before the state flips to `Ended`. Idempotent.
    pub fn stop(&mut self) {
        let had_session = self.source.is_some() || self.worker.is_some();

        if let Some(mut source) = self.source.take() {
            match &mut source {
                Source::File(player) => player.stop(),
                Source::Mic(capture) => capture.stop(),
            }
        }
        if let Some(worker) = self.worker.take() {
            worker.join();
        }
        if had_session {
            // Scoped to this pipeline's id: if another source has since
            // taken over the continuous handle, its haptics keep running.
            self.haptics.stop_continuous(self.source_id);
        }

        let prior = self.state.get();
        self.state.set(SessionState::Ended);
        if prior != SessionState::Ended {
            let _ = self
                .events_tx
                .try_send(PipelineEvent::StateChanged(SessionState::Ended));
        }
    }

    /// Restart the last source from the beginning, clearing stale history
    /// before the first new frame lands.
    pub fn replay(&mut self) -> Result<()> {
        let Some(spec) = self.last_spec.clone() else {
            return Ok(());
        };
        self.stop();
        self.history.lock().clear();
        self.begin(spec)
    }

    /// The single UI-facing transport control: replay from ended, pause
    /// while playing, resume while paused.
    pub fn toggle(&mut self) -> Result<()> {
        match self.state.get().toggle_action() {
            TransportAction::Replay => self.replay(),
            TransportAction::Pause => {
                self.pause();
                Ok(())
            }
            TransportAction::Resume => {
                self.resume();
                Ok(())
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Subscribe to spectral frames and state changes. Events are delivered
    /// in capture order to a single consumer context; the queue is bounded,
    /// so a subscriber that stops draining loses events rather than growing
    /// the queue without limit.
    pub fn subscribe(&self) -> Receiver<PipelineEvent> {
        self.events_rx.clone()
    }

    /// Snapshot of the spectrogram history, oldest first.
    pub fn history(&self) -> Vec<SpectralFrame> {
        self.history.lock().frames()
    }
}

impl Drop for SourcePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::NullDriver;

    fn pipeline() -> SourcePipeline {
        SourcePipeline::new(&Config::default(), HapticEngine::new(NullDriver))
    }

    #[test]
    fn pause_while_ended_is_a_no_op() {
        let mut p = pipeline();
        let events = p.subscribe();

        p.pause();

        assert_eq!(p.state(), SessionState::Ended);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut p = pipeline();
        let events = p.subscribe();

        p.stop();
        p.stop();

        assert_eq!(p.state(), SessionState::Ended);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn toggle_with_no_prior_source_does_nothing() {
        let mut p = pipeline();
        assert!(p.toggle().is_ok());
        assert_eq!(p.state(), SessionState::Ended);
    }

    #[test]
    fn replay_clears_history_before_starting() {
        let mut p = pipeline();
        for i in 0..10 {
            p.history
                .lock()
                .append(SpectralFrame { bands: vec![i as f32] });
        }
        p.last_spec = Some(SourceSpec::File {
            path: PathBuf::from("/nonexistent/birdsong.wav"),
            looped: false,
        });

        // The asset is unresolvable, so the restart fails cleanly, but the
        // stale history is gone before any new frame could land.
        assert!(p.toggle().is_err());
        assert!(p.history().is_empty());
        assert_eq!(p.state(), SessionState::Ended);
    }

    #[test]
    fn start_failure_has_no_side_effects() {
        let mut p = pipeline();
        let events = p.subscribe();

        let err = p.start_file(Path::new("/nonexistent/birdsong.wav"));
        assert!(err.is_err());
        assert_eq!(p.state(), SessionState::Ended);
        assert!(events.try_recv().is_err());
        assert!(p.history().is_empty());
    }
}
