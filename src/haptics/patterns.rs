use super::driver::Transient;

/// Discrete feedback patterns for UI events. Each is a short, hand-authored
/// transient sequence, played independently of the continuous effect and of
/// each other. The curves are product constants, not derived from audio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OneShot {
    Correct,
    Wrong,
    BadgeEarned,
    Selection,
}

// Three rising taps ending in a strong confirmation thud.
const CORRECT: &[Transient] = &[
    Transient { time: 0.00, intensity: 0.45, sharpness: 0.60 },
    Transient { time: 0.08, intensity: 0.60, sharpness: 0.70 },
    Transient { time: 0.16, intensity: 0.75, sharpness: 0.80 },
    Transient { time: 0.28, intensity: 1.00, sharpness: 0.45 },
];

// Two dull taps.
const WRONG: &[Transient] = &[
    Transient { time: 0.00, intensity: 0.60, sharpness: 0.25 },
    Transient { time: 0.16, intensity: 0.50, sharpness: 0.20 },
];

// Five-step rising celebratory ramp.
const BADGE_EARNED: &[Transient] = &[
    Transient { time: 0.00, intensity: 0.40, sharpness: 0.40 },
    Transient { time: 0.10, intensity: 0.55, sharpness: 0.50 },
    Transient { time: 0.20, intensity: 0.70, sharpness: 0.60 },
    Transient { time: 0.30, intensity: 0.85, sharpness: 0.70 },
    Transient { time: 0.40, intensity: 1.00, sharpness: 0.80 },
];

// Single mid tap.
const SELECTION: &[Transient] = &[
    Transient { time: 0.00, intensity: 0.55, sharpness: 0.50 },
];

impl OneShot {
    pub fn transients(self) -> &'static [Transient] {
        match self {
            OneShot::Correct => CORRECT,
            OneShot::Wrong => WRONG,
            OneShot::BadgeEarned => BADGE_EARNED,
            OneShot::Selection => SELECTION,
        }
    }
}
