use parking_lot::Mutex;
use std::sync::Arc;

/// Playback/capture lifecycle for one audio source instance.
///
/// `Ended` doubles as the idle state before the first start. `Paused` only
/// ever occurs for file playback; live capture goes straight between
/// `Playing` and `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ended,
    Playing,
    Paused,
}

/// What a UI-facing toggle should do given the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    Replay,
    Pause,
    Resume,
}

impl SessionState {
    pub fn toggle_action(self) -> TransportAction {
        match self {
            SessionState::Ended => TransportAction::Replay,
            SessionState::Playing => TransportAction::Pause,
            SessionState::Paused => TransportAction::Resume,
        }
    }

    pub fn is_playing(self) -> bool {
        self == SessionState::Playing
    }
}

/// Session state shared between the pipeline facade and its analysis worker.
#[derive(Clone)]
pub struct StateCell(Arc<Mutex<SessionState>>);

impl StateCell {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(SessionState::Ended)))
    }

    pub fn get(&self) -> SessionState {
        *self.0.lock()
    }

    pub fn set(&self, state: SessionState) {
        *self.0.lock() = state;
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_mapping() {
        assert_eq!(SessionState::Ended.toggle_action(), TransportAction::Replay);
        assert_eq!(SessionState::Playing.toggle_action(), TransportAction::Pause);
        assert_eq!(SessionState::Paused.toggle_action(), TransportAction::Resume);
    }

    #[test]
    fn state_cell_starts_ended_and_is_shared() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), SessionState::Ended);

        let alias = cell.clone();
        alias.set(SessionState::Playing);
        assert!(cell.get().is_playing());
    }
}
