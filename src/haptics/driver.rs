use thiserror::Error;

/// A single tap within a one-shot pattern: seconds from pattern start plus
/// the actuation parameters for that tap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transient {
    pub time: f32,
    pub intensity: f32,
    pub sharpness: f32,
}

#[derive(Debug, Error)]
pub enum DriverError {
    /// The underlying actuation engine stopped or reset unexpectedly
    /// (e.g. the app was backgrounded). The engine attempts one restart.
    #[error("haptic engine reset unexpectedly")]
    EngineReset,

    /// A parameter send failed. Expected occasionally under load; dropped
    /// without surfacing to callers.
    #[error("haptic parameter send failed: {0}")]
    Send(String),
}

/// Seam to the actuation hardware. One continuous effect handle at most is
/// live per driver; transients play independently of it.
pub trait HapticDriver: Send + 'static {
    /// Capability probe, checked once at engine construction.
    fn supports_haptics(&self) -> bool {
        true
    }

    fn start_continuous(&mut self, intensity: f32, sharpness: f32) -> Result<(), DriverError>;

    fn update_continuous(&mut self, intensity: f32, sharpness: f32) -> Result<(), DriverError>;

    fn stop_continuous(&mut self);

    fn play_transients(&mut self, events: &[Transient]) -> Result<(), DriverError>;

    /// Bring the engine back after an unexpected reset.
    fn restart(&mut self) -> Result<(), DriverError>;
}

/// Driver for hardware without haptic support; the probe fails and the
/// engine stays inert.
pub struct NullDriver;

impl HapticDriver for NullDriver {
    fn supports_haptics(&self) -> bool {
        false
    }

    fn start_continuous(&mut self, _intensity: f32, _sharpness: f32) -> Result<(), DriverError> {
        Ok(())
    }

    fn update_continuous(&mut self, _intensity: f32, _sharpness: f32) -> Result<(), DriverError> {
        Ok(())
    }

    fn stop_continuous(&mut self) {}

    fn play_transients(&mut self, _events: &[Transient]) -> Result<(), DriverError> {
        Ok(())
    }

    fn restart(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Debug driver that logs actuation instead of driving hardware. Used by
/// the demo binary.
pub struct LogDriver;

impl HapticDriver for LogDriver {
    fn start_continuous(&mut self, intensity: f32, sharpness: f32) -> Result<(), DriverError> {
        log::debug!(
            "haptics: continuous start (intensity={intensity:.2}, sharpness={sharpness:.2})"
        );
        Ok(())
    }

    fn update_continuous(&mut self, intensity: f32, sharpness: f32) -> Result<(), DriverError> {
        log::debug!("haptics: intensity={intensity:.2} sharpness={sharpness:.2}");
        Ok(())
    }

    fn stop_continuous(&mut self) {
        log::debug!("haptics: continuous stop");
    }

    fn play_transients(&mut self, events: &[Transient]) -> Result<(), DriverError> {
        log::debug!("haptics: one-shot pattern, {} transients", events.len());
        Ok(())
    }

    fn restart(&mut self) -> Result<(), DriverError> {
        log::debug!("haptics: restart");
        Ok(())
    }
}
