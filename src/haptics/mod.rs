//! Haptic actuation: driver seam, serial command engine and the
//! hand-authored one-shot patterns.

pub mod driver;
pub mod engine;
pub mod patterns;

pub use driver::{DriverError, HapticDriver, LogDriver, NullDriver, Transient};
pub use engine::{derive_params, HapticEngine, HapticParams, SourceId, UPDATE_INTERVAL};
pub use patterns::OneShot;
