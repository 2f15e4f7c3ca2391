use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::driver::{DriverError, HapticDriver};
use super::patterns::OneShot;
use crate::analysis::spectral::SpectralFrame;

/// Minimum interval between continuous parameter sends (20 Hz). Updates
/// arriving faster are dropped, never reordered.
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(50);

const DEFAULT_INTENSITY: f32 = 0.5;
const DEFAULT_SHARPNESS: f32 = 0.5;
const LEVEL_FLOOR: f32 = 0.1;
const INTENSITY_GAIN: f32 = 1.5;
const BALANCE_EPSILON: f32 = 1e-6;

/// Continuous actuation parameters derived from one spectral frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HapticParams {
    pub intensity: f32,
    pub sharpness: f32,
}

/// Identifies one audio source instance at the shared engine so that
/// last-writer-wins ownership of the continuous handle can be enforced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Map band magnitudes to continuous actuation parameters.
///
/// Bands are split into low (first 25%), mid (next 50%) and high (last 25%)
/// groups. Bass-dominant audio yields low sharpness (deep rumble),
/// treble-dominant audio high sharpness (crisp taps); the 1.5x gain and the
/// 0.1 floor keep feedback perceptible without saturating.
pub fn derive_params(bands: &[f32]) -> HapticParams {
    let n = bands.len();
    let low = mean(&bands[..n / 4]);
    let mid = mean(&bands[n / 4..n * 3 / 4]);
    let high = mean(&bands[n * 3 / 4..]);

    let overall = 0.5 * low + 0.3 * mid + 0.2 * high;
    let balance = (0.6 * high + 0.3 * mid) / (low + mid + high).max(BALANCE_EPSILON);

    HapticParams {
        intensity: (overall * INTENSITY_GAIN).clamp(LEVEL_FLOOR, 1.0),
        sharpness: balance.clamp(LEVEL_FLOOR, 1.0),
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

enum Command {
    StartContinuous(SourceId),
    Update(SourceId, Vec<f32>),
    StopContinuous(SourceId),
    OneShot(OneShot),
    Shutdown,
}

/// Serial-queue front to a [`HapticDriver`].
///
/// All handle access is funneled through one command thread, so parameter
/// updates and one-shot triggers from different audio sources never
/// interleave on the shared continuous effect. Handles are cheap to clone;
/// every operation is a fire-and-forget enqueue.
#[derive(Clone)]
pub struct HapticEngine {
    tx: Option<Sender<Command>>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl HapticEngine {
    /// Probes the driver once; without haptic support the engine is inert
    /// and every operation is a no-op.
    pub fn new<D: HapticDriver>(driver: D) -> Self {
        if !driver.supports_haptics() {
            log::info!("haptic hardware unsupported, engine inert");
            return Self {
                tx: None,
                worker: Arc::new(Mutex::new(None)),
            };
        }

        let (tx, rx) = unbounded();
        let spawned = thread::Builder::new()
            .name("haptic-engine".into())
            .spawn(move || {
                let mut core = EngineCore::new(driver);
                while let Ok(command) = rx.recv() {
                    match command {
                        Command::StartContinuous(source) => core.start_continuous(source),
                        Command::Update(source, bands) => core.update(source, &bands),
                        Command::StopContinuous(source) => core.stop_continuous(source),
                        Command::OneShot(pattern) => core.one_shot(pattern),
                        Command::Shutdown => break,
                    }
                }
                core.release();
            });

        match spawned {
            Ok(handle) => Self {
                tx: Some(tx),
                worker: Arc::new(Mutex::new(Some(handle))),
            },
            Err(err) => {
                log::error!("failed to spawn haptic engine thread: {err}");
                Self {
                    tx: None,
                    worker: Arc::new(Mutex::new(None)),
                }
            }
        }
    }

    fn send(&self, command: Command) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(command);
        }
    }

    /// Begin continuous actuation for `source`, stopping any other source's
    /// handle first. No-op if `source` already owns the handle.
    pub fn start_continuous(&self, source: SourceId) {
        self.send(Command::StartContinuous(source));
    }

    /// Feed one spectral frame into the continuous effect. Ignored unless
    /// `source` owns the handle; throttled to [`UPDATE_INTERVAL`].
    pub fn update(&self, source: SourceId, frame: &SpectralFrame) {
        self.send(Command::Update(source, frame.bands.clone()));
    }

    /// Halt and release the continuous handle, but only if `source` still
    /// owns it. A stop from a source that was already displaced leaves the
    /// current owner's handle untouched. Safe when already stopped.
    pub fn stop_continuous(&self, source: SourceId) {
        self.send(Command::StopContinuous(source));
    }

    pub fn notify_correct(&self) {
        self.send(Command::OneShot(OneShot::Correct));
    }

    pub fn notify_wrong(&self) {
        self.send(Command::OneShot(OneShot::Wrong));
    }

    pub fn notify_badge_earned(&self) {
        self.send(Command::OneShot(OneShot::BadgeEarned));
    }

    pub fn notify_selection(&self) {
        self.send(Command::OneShot(OneShot::Selection));
    }

    /// Drain pending commands and join the worker. Used for deterministic
    /// teardown; later operations on any clone are no-ops.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

/// Single-threaded engine state, owned by the command thread.
struct EngineCore<D: HapticDriver> {
    driver: D,
    active: Option<SourceId>,
    last_update: Option<Instant>,
    inert: bool,
}

impl<D: HapticDriver> EngineCore<D> {
    fn new(driver: D) -> Self {
        Self {
            driver,
            active: None,
            last_update: None,
            inert: false,
        }
    }

    fn start_continuous(&mut self, source: SourceId) {
        if self.active == Some(source) {
            return;
        }
        if self.active.take().is_some() {
            // Last writer wins: the prior source's handle stops first.
            self.driver.stop_continuous();
        }
        // An explicit start clears the inert latch from a failed restart.
        self.inert = false;
        if self.try_driver(|d| d.start_continuous(DEFAULT_INTENSITY, DEFAULT_SHARPNESS)) {
            self.active = Some(source);
            self.last_update = None;
        }
    }

    fn update(&mut self, source: SourceId, bands: &[f32]) {
        if self.inert || self.active != Some(source) {
            return;
        }
        let now = Instant::now();
        if let Some(last) = self.last_update {
            if now.duration_since(last) < UPDATE_INTERVAL {
                return;
            }
        }
        self.last_update = Some(now);

        let params = derive_params(bands);
        self.try_driver(|d| d.update_continuous(params.intensity, params.sharpness));
    }

    fn stop_continuous(&mut self, source: SourceId) {
        if self.active != Some(source) {
            // The handle changed hands; the late stop must not kill it.
            return;
        }
        self.active = None;
        self.driver.stop_continuous();
        self.last_update = None;
    }

    /// Unscoped stop, used only on engine shutdown.
    fn release(&mut self) {
        if self.active.take().is_some() {
            self.driver.stop_continuous();
        }
        self.last_update = None;
    }

    fn one_shot(&mut self, pattern: OneShot) {
        if self.inert {
            return;
        }
        self.try_driver(|d| d.play_transients(pattern.transients()));
    }

    /// Run one driver call. On an unexpected reset, attempt a single
    /// restart and re-issue the call; if the restart fails the engine goes
    /// inert until the next explicit start. Plain send failures are
    /// swallowed (they would otherwise spam at the update rate).
    fn try_driver(&mut self, op: impl Fn(&mut D) -> Result<(), DriverError>) -> bool {
        match op(&mut self.driver) {
            Ok(()) => true,
            Err(DriverError::EngineReset) => {
                log::warn!("haptic engine reset, attempting restart");
                match self.driver.restart() {
                    Ok(()) => {
                        if self.active.is_some() {
                            // The reset dropped the continuous handle.
                            let _ = self
                                .driver
                                .start_continuous(DEFAULT_INTENSITY, DEFAULT_SHARPNESS);
                        }
                        op(&mut self.driver).is_ok()
                    }
                    Err(err) => {
                        log::warn!("haptic engine restart failed: {err}");
                        self.inert = true;
                        self.active = None;
                        false
                    }
                }
            }
            Err(err) => {
                log::trace!("haptic send dropped: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::driver::{NullDriver, Transient};
    use approx::assert_relative_eq;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Call {
        Start,
        Update(f32, f32),
        Stop,
        Transients(usize),
        Restart,
    }

    #[derive(Default)]
    struct Script {
        calls: Vec<Call>,
        fail_next_with_reset: bool,
        restart_fails: bool,
    }

    #[derive(Clone, Default)]
    struct MockDriver(Arc<Mutex<Script>>);

    impl MockDriver {
        fn calls(&self) -> Vec<Call> {
            self.0.lock().calls.clone()
        }

        fn updates(&self) -> usize {
            self.0
                .lock()
                .calls
                .iter()
                .filter(|c| matches!(c, Call::Update(..)))
                .count()
        }
    }

    impl HapticDriver for MockDriver {
        fn start_continuous(&mut self, _: f32, _: f32) -> Result<(), DriverError> {
            let mut s = self.0.lock();
            if std::mem::take(&mut s.fail_next_with_reset) {
                return Err(DriverError::EngineReset);
            }
            s.calls.push(Call::Start);
            Ok(())
        }

        fn update_continuous(&mut self, intensity: f32, sharpness: f32) -> Result<(), DriverError> {
            let mut s = self.0.lock();
            if std::mem::take(&mut s.fail_next_with_reset) {
                return Err(DriverError::EngineReset);
            }
            s.calls.push(Call::Update(intensity, sharpness));
            Ok(())
        }

        fn stop_continuous(&mut self) {
            self.0.lock().calls.push(Call::Stop);
        }

        fn play_transients(&mut self, events: &[Transient]) -> Result<(), DriverError> {
            self.0.lock().calls.push(Call::Transients(events.len()));
            Ok(())
        }

        fn restart(&mut self) -> Result<(), DriverError> {
            let mut s = self.0.lock();
            if s.restart_fails {
                return Err(DriverError::Send("restart refused".into()));
            }
            s.calls.push(Call::Restart);
            Ok(())
        }
    }

    fn bands(low: f32, mid: f32, high: f32) -> Vec<f32> {
        let mut v = vec![low; 2];
        v.extend(vec![mid; 4]);
        v.extend(vec![high; 2]);
        v
    }

    #[test]
    fn derive_params_bass_heavy_is_dull() {
        let p = derive_params(&bands(1.0, 0.0, 0.0));
        assert_relative_eq!(p.intensity, 0.75, epsilon = 1e-6);
        assert_relative_eq!(p.sharpness, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn derive_params_treble_heavy_is_crisp() {
        let p = derive_params(&bands(0.0, 0.0, 1.0));
        assert_relative_eq!(p.intensity, 0.3, epsilon = 1e-6);
        assert_relative_eq!(p.sharpness, 0.6, epsilon = 1e-6);
    }

    #[test]
    fn derive_params_clamps_to_floor_and_ceiling() {
        let silent = derive_params(&bands(0.0, 0.0, 0.0));
        assert_relative_eq!(silent.intensity, 0.1, epsilon = 1e-6);
        assert_relative_eq!(silent.sharpness, 0.1, epsilon = 1e-6);

        let loud = derive_params(&bands(1.0, 1.0, 1.0));
        assert_relative_eq!(loud.intensity, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn derive_params_tolerates_degenerate_group_boundaries() {
        // With 3 bands the low group is empty (3/4 == 0).
        let p = derive_params(&[0.25, 1.0, 0.125]);
        assert!((0.1..=1.0).contains(&p.intensity));
        assert!((0.1..=1.0).contains(&p.sharpness));
    }

    #[test]
    fn updates_are_throttled_to_the_update_interval() {
        let driver = MockDriver::default();
        let mut core = EngineCore::new(driver.clone());
        let source = SourceId::next();
        core.start_continuous(source);

        let deadline = Instant::now() + Duration::from_millis(50);
        let mut fed = 0;
        while fed < 100 {
            core.update(source, &bands(0.5, 0.5, 0.5));
            fed += 1;
            if Instant::now() > deadline {
                break;
            }
        }

        let sends = driver.updates();
        assert!(sends >= 1, "expected at least one send");
        assert!(sends <= 3, "throttle leaked: {sends} sends");
    }

    #[test]
    fn second_source_stops_the_prior_handle_first() {
        let driver = MockDriver::default();
        let mut core = EngineCore::new(driver.clone());
        let a = SourceId::next();
        let b = SourceId::next();

        core.start_continuous(a);
        core.start_continuous(b);

        assert_eq!(driver.calls(), vec![Call::Start, Call::Stop, Call::Start]);
    }

    #[test]
    fn restarting_the_same_source_is_a_no_op() {
        let driver = MockDriver::default();
        let mut core = EngineCore::new(driver.clone());
        let source = SourceId::next();

        core.start_continuous(source);
        core.start_continuous(source);

        assert_eq!(driver.calls(), vec![Call::Start]);
    }

    #[test]
    fn updates_from_non_owner_are_ignored() {
        let driver = MockDriver::default();
        let mut core = EngineCore::new(driver.clone());
        let owner = SourceId::next();
        let other = SourceId::next();

        core.start_continuous(owner);
        core.update(other, &bands(1.0, 1.0, 1.0));

        assert_eq!(driver.updates(), 0);
    }

    #[test]
    fn stop_is_idempotent() {
        let driver = MockDriver::default();
        let mut core = EngineCore::new(driver.clone());
        let source = SourceId::next();

        core.start_continuous(source);
        core.stop_continuous(source);
        core.stop_continuous(source);

        assert_eq!(driver.calls(), vec![Call::Start, Call::Stop]);
    }

    #[test]
    fn stop_from_a_displaced_source_leaves_the_handle_alive() {
        let driver = MockDriver::default();
        let mut core = EngineCore::new(driver.clone());
        let a = SourceId::next();
        let b = SourceId::next();

        core.start_continuous(a);
        core.start_continuous(b);
        // a's teardown arrives after b took over; b's handle survives it.
        core.stop_continuous(a);

        assert_eq!(driver.calls(), vec![Call::Start, Call::Stop, Call::Start]);
        core.update(b, &bands(1.0, 1.0, 1.0));
        assert_eq!(driver.updates(), 1);
    }

    #[test]
    fn reset_triggers_one_restart_and_reissues() {
        let driver = MockDriver::default();
        let mut core = EngineCore::new(driver.clone());
        let source = SourceId::next();
        core.start_continuous(source);

        driver.0.lock().fail_next_with_reset = true;
        core.update(source, &bands(0.5, 0.5, 0.5));

        let calls = driver.calls();
        assert!(calls.contains(&Call::Restart));
        assert!(matches!(calls.last(), Some(Call::Update(..))));
    }

    #[test]
    fn failed_restart_goes_inert_until_next_start() {
        let driver = MockDriver::default();
        let mut core = EngineCore::new(driver.clone());
        let source = SourceId::next();
        core.start_continuous(source);

        {
            let mut s = driver.0.lock();
            s.fail_next_with_reset = true;
            s.restart_fails = true;
        }
        core.update(source, &bands(0.5, 0.5, 0.5));

        // Inert: one-shots and updates drop silently.
        let before = driver.calls().len();
        core.one_shot(OneShot::Selection);
        core.update(source, &bands(0.5, 0.5, 0.5));
        assert_eq!(driver.calls().len(), before);

        // An explicit start recovers.
        core.start_continuous(source);
        core.one_shot(OneShot::Selection);
        assert!(driver.calls().contains(&Call::Transients(1)));
    }

    #[test]
    fn unsupported_hardware_yields_inert_engine() {
        let engine = HapticEngine::new(NullDriver);
        let source = SourceId::next();
        engine.start_continuous(source);
        engine.notify_correct();
        engine.shutdown();
    }

    #[test]
    fn engine_thread_processes_commands_in_order() {
        let driver = MockDriver::default();
        let engine = HapticEngine::new(driver.clone());
        let source = SourceId::next();

        engine.start_continuous(source);
        engine.notify_wrong();
        engine.stop_continuous(source);
        engine.shutdown();

        assert_eq!(
            driver.calls(),
            vec![Call::Start, Call::Transients(2), Call::Stop]
        );
    }
}
