//! Inharmonic mode-set presets.
//!
//! Mode tables for struck bars, bells and drums after Perry Cook's *Real
//! Sound Synthesis* and the STK `ModalBar` instrument. A positive `ratio` is
//! a multiple of the fundamental; a negative one is a fixed partial at
//! `-ratio` Hz that does not follow the played note.

/// Most modes any preset uses.
pub const MAX_PRESET_MODES: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresetMode {
    pub ratio: f64,
    pub resonance: f64,
    pub gain: f64,
}

impl PresetMode {
    const fn new(ratio: f64, resonance: f64, gain: f64) -> Self {
        Self { ratio, resonance, gain }
    }

    /// Partial frequency for a given fundamental.
    pub fn frequency(&self, fundamental_hz: f64) -> f64 {
        if self.ratio > 0.0 {
            self.ratio * fundamental_hz
        } else {
            -self.ratio
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.ratio <= 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub modes: &'static [PresetMode],
}

const fn m(ratio: f64, resonance: f64, gain: f64) -> PresetMode {
    PresetMode::new(ratio, resonance, gain)
}

pub const PRESETS: [Preset; 10] = [
    Preset {
        name: "Drum",
        modes: &[
            m(1.0, 0.9997, 1.0),
            m(1.58, 0.9997, 1.0),
            m(2.0, 0.9997, 1.0),
            m(2.24, 0.9997, 1.0),
            m(2.92, 0.9997, 1.0),
        ],
    },
    Preset {
        name: "Marimba",
        modes: &[
            m(1.0, 0.9996, 1.0),
            m(3.99, 0.9994, 0.25),
            m(10.65, 0.9994, 0.25),
            m(-2443.0, 0.999, 0.2),
        ],
    },
    Preset {
        name: "Vibraphone",
        modes: &[
            m(1.0, 0.99995, 1.0),
            m(2.01, 0.99991, 0.6),
            m(3.9, 0.99992, 0.6),
            m(14.37, 0.9999, 0.6),
        ],
    },
    Preset {
        name: "Agogo",
        modes: &[
            m(1.0, 0.999, 1.0),
            m(4.08, 0.999, 0.83333),
            m(6.669, 0.999, 0.5),
            m(-3725.0, 0.999, 0.33333),
        ],
    },
    Preset {
        name: "Wood1",
        modes: &[
            m(1.0, 0.996, 1.0),
            m(2.777, 0.994, 0.25),
            m(7.378, 0.994, 0.25),
            m(15.377, 0.99, 0.2),
        ],
    },
    Preset {
        name: "Wood2",
        modes: &[
            m(1.0, 0.996, 1.0),
            m(1.777, 0.994, 0.25),
            m(2.378, 0.994, 0.25),
            m(3.377, 0.99, 0.2),
        ],
    },
    Preset {
        name: "Reso",
        modes: &[
            m(1.0, 0.99996, 1.0),
            m(2.777, 0.99994, 0.25),
            m(7.378, 0.99994, 0.25),
            m(15.377, 0.9999, 0.2),
        ],
    },
    Preset {
        name: "Beats",
        modes: &[
            m(1.0, 0.9999, 1.0),
            m(1.004, 0.9999, 0.25),
            m(1.013, 0.9999, 0.25),
            m(2.377, 0.999, 0.2),
        ],
    },
    Preset {
        name: "2Fix",
        modes: &[
            m(1.0, 0.9996, 1.0),
            m(4.0, 0.999, 0.25),
            m(-1320.0, 0.9994, 0.25),
            m(-3960.0, 0.999, 0.2),
        ],
    },
    Preset {
        name: "Clump",
        modes: &[
            m(1.0, 0.999, 1.0),
            m(1.217, 0.999, 1.0),
            m(1.475, 0.999, 1.0),
            m(1.729, 0.999, 1.0),
        ],
    },
];

pub const NUM_PRESETS: usize = PRESETS.len();

/// Preset lookup; out-of-range indices wrap.
pub fn preset(index: usize) -> &'static Preset {
    &PRESETS[index % NUM_PRESETS]
}

/// Index of the preset with this name (case-insensitive).
pub fn find(name: &str) -> Option<usize> {
    PRESETS.iter().position(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_fit_capacity() {
        for p in &PRESETS {
            assert!(!p.modes.is_empty(), "{} has no modes", p.name);
            assert!(p.modes.len() <= MAX_PRESET_MODES, "{} has too many modes", p.name);
        }
    }

    #[test]
    fn test_baseline_resonances_are_stable() {
        for p in &PRESETS {
            for mode in p.modes {
                assert!(mode.resonance > 0.0 && mode.resonance < 1.0);
            }
        }
    }

    #[test]
    fn test_index_wraps() {
        assert_eq!(preset(0).name, "Drum");
        assert_eq!(preset(NUM_PRESETS + 1).name, "Marimba");
    }

    #[test]
    fn test_fixed_partials() {
        let marimba = preset(1);
        let fixed = marimba.modes[3];
        assert!(fixed.is_fixed());
        assert_eq!(fixed.frequency(220.0), 2443.0);
        assert_eq!(fixed.frequency(880.0), 2443.0);
        assert_eq!(marimba.modes[1].frequency(220.0), 3.99 * 220.0);
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(find("vibraphone"), Some(2));
        assert_eq!(find("2Fix"), Some(8));
        assert_eq!(find("kazoo"), None);
    }
}
