//! Bipolar triangle LFO.
//!
//! The phase walks linearly between -1 and +1 and bounces off each end by
//! reflecting the overshoot and reversing direction. The sign of the phase
//! increment carries the current direction, so retuning mid-cycle keeps the
//! waveform continuous.
//!
//! The LFO has no notion of audio samples: `update_rate` is however often
//! `process()` gets called per second. The engine advances it once per
//! control block.

/// Largest phase increment per update: a full cycle takes at least 8 updates.
const MAX_INCREMENT: f64 = 0.25;

const DEFAULT_FREQ_HZ: f64 = 0.3;

#[derive(Clone, Debug)]
pub struct TriangleLfo {
    update_rate: f64,
    /// Phase in -1..1
    phase: f64,
    /// Signed phase increment per update
    increment: f64,
    /// 0.0 = silent, 1.0 = full range
    depth: f64,
    /// Output span at full depth, in the units of the modulated parameter
    range: f64,
    output: f64,
}

impl TriangleLfo {
    pub fn new(update_rate: f64) -> Self {
        let mut lfo = Self {
            update_rate,
            phase: 0.0,
            increment: 0.0,
            depth: 0.0,
            range: 0.0,
            output: 0.0,
        };
        lfo.set_freq(DEFAULT_FREQ_HZ);
        lfo
    }

    /// Set the LFO frequency in Hz. Direction of travel is preserved.
    pub fn set_freq(&mut self, freq_hz: f64) {
        let mut inc = 4.0 * freq_hz.abs() / self.update_rate;
        if self.increment < 0.0 {
            inc = -inc;
        }
        self.increment = inc.clamp(-MAX_INCREMENT, MAX_INCREMENT);
    }

    pub fn set_depth(&mut self, depth: f64) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    pub fn set_range(&mut self, range: f64) {
        self.range = range;
    }

    pub fn process(&mut self) -> f64 {
        self.phase += self.increment;

        if self.phase > 1.0 {
            self.phase = 1.0 - (self.phase - 1.0);
            self.increment = -self.increment;
        } else if self.phase < -1.0 {
            self.phase = -1.0 - (self.phase + 1.0);
            self.increment = -self.increment;
        }

        self.output = self.phase * self.range * self.depth;
        self.output
    }

    /// Last computed output, without advancing.
    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn frequency(&self) -> f64 {
        self.increment.abs() * self.update_rate / 4.0
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.increment = self.increment.abs();
        self.output = 0.0;
    }
}
