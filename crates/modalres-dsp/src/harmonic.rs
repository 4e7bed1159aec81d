//! Harmonic modal voice: a bank of resonators whose partials derive from a
//! fundamental.
//!
//! For harmonic index `i` (0-based):
//!
//!   f_i = (i+1)·fc·√(1 + stiffness·i²)
//!   g_i = g / (i+1)^mgf
//!   r_i = clamp(r - i·mrf, 0, R_MAX)
//!
//! Every index with `i mod beta == 0` is skipped (a strike/pluck-position
//! null). Index 0 is always such an index, so the lowest sounding partial is
//! `2·fc` stretched by stiffness. Partials at or above Nyquist are never
//! instantiated.

use crate::filters::{Resonator, R_MAX};

/// Construction parameters for a `HarmonicVoice`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HarmonicParams {
    pub fundamental_hz: f64,
    /// Base pole radius before per-mode falloff.
    pub resonance: f64,
    pub gain_db: f64,
    pub stiffness: f64,
    pub beta: u32,
    /// Mode-gain falloff exponent.
    pub mgf: f64,
    /// Mode-resonance falloff per harmonic index.
    pub mrf: f64,
}

impl Default for HarmonicParams {
    fn default() -> Self {
        Self {
            fundamental_hz: 220.0,
            resonance: 0.9999,
            gain_db: 0.0,
            stiffness: 0.00001,
            beta: 2,
            mgf: 0.0,
            mrf: 0.0,
        }
    }
}

pub struct HarmonicVoice {
    /// One resonator per slot; only `modes[..active]` sound.
    modes: Vec<Resonator>,
    /// Harmonic index each active slot renders.
    indices: Vec<usize>,
    active: usize,
    sample_rate: f64,
    fc: f64,
    r: f64,
    gain: f64,
    stiffness: f64,
    beta: u32,
    mgf: f64,
    mrf: f64,
}

impl HarmonicVoice {
    /// Allocate a voice with room for `capacity` partials.
    pub fn new(capacity: usize, sample_rate: f64, params: &HarmonicParams) -> Self {
        let mut voice = Self {
            modes: (0..capacity)
                .map(|_| Resonator::new(sample_rate, 0.0, 0.0, 0.0))
                .collect(),
            indices: vec![0; capacity],
            active: 0,
            sample_rate,
            fc: params.fundamental_hz,
            r: params.resonance,
            gain: 10f64.powf(params.gain_db / 20.0),
            stiffness: params.stiffness.max(0.0),
            beta: params.beta.max(1),
            mgf: params.mgf,
            mrf: params.mrf,
        };
        voice.layout();
        voice
    }

    fn mode_freq(&self, i: usize) -> f64 {
        let i = i as f64;
        (i + 1.0) * self.fc * (1.0 + self.stiffness * i * i).sqrt()
    }

    fn mode_gain(&self, i: usize) -> f64 {
        self.gain / ((i + 1) as f64).powf(self.mgf)
    }

    fn mode_r(&self, i: usize) -> f64 {
        (self.r - i as f64 * self.mrf).clamp(0.0, R_MAX)
    }

    /// Re-walk the skip/alias rule from index 0 and reassign every slot.
    ///
    /// Slots that were silent before this walk get their memory cleared so
    /// they start from rest.
    fn layout(&mut self) {
        let previously_active = self.active;
        let nyquist = self.sample_rate / 2.0;
        let capacity = self.modes.len();
        let beta = self.beta as usize;

        let mut slot = 0;
        if beta > 1 {
            let mut i = 0;
            while slot < capacity {
                let freq = self.mode_freq(i);
                if freq >= nyquist {
                    break;
                }
                if i % beta != 0 {
                    let (r, g) = (self.mode_r(i), self.mode_gain(i));
                    let mode = &mut self.modes[slot];
                    mode.set(freq, r, g);
                    if slot >= previously_active {
                        mode.reset();
                    }
                    self.indices[slot] = i;
                    slot += 1;
                }
                i += 1;
            }
        }
        self.active = slot;
    }

    /// Recompute gains and radii of the active slots; frequencies unchanged.
    fn refresh_levels(&mut self) {
        for slot in 0..self.active {
            let i = self.indices[slot];
            let (r, g) = (self.mode_r(i), self.mode_gain(i));
            let mode = &mut self.modes[slot];
            mode.update_r(r);
            mode.update_gain(g);
        }
    }

    pub fn update_fc(&mut self, fc: f64) {
        if fc != self.fc {
            self.fc = fc;
            self.layout();
        }
    }

    pub fn update_stiffness(&mut self, stiffness: f64) {
        let stiffness = stiffness.max(0.0);
        if stiffness != self.stiffness {
            self.stiffness = stiffness;
            self.layout();
        }
    }

    pub fn update_beta(&mut self, beta: u32) {
        let beta = beta.max(1);
        if beta != self.beta {
            self.beta = beta;
            self.layout();
        }
    }

    pub fn update_r(&mut self, r: f64) {
        if r != self.r {
            self.r = r;
            self.refresh_levels();
        }
    }

    /// Linear gain.
    pub fn update_gain(&mut self, gain: f64) {
        if gain != self.gain {
            self.gain = gain;
            self.refresh_levels();
        }
    }

    pub fn update_mgf(&mut self, mgf: f64) {
        if mgf != self.mgf {
            self.mgf = mgf;
            self.refresh_levels();
        }
    }

    pub fn update_mrf(&mut self, mrf: f64) {
        if mrf != self.mrf {
            self.mrf = mrf;
            self.refresh_levels();
        }
    }

    /// Unweighted average of all active modes. Not clamped.
    pub fn process(&mut self, input: f64) -> f64 {
        if self.active == 0 {
            return 0.0;
        }
        let mut sum = 0.0;
        for mode in &mut self.modes[..self.active] {
            sum += mode.process(input);
        }
        sum / self.active as f64
    }

    pub fn reset(&mut self) {
        for mode in &mut self.modes {
            mode.reset();
        }
    }

    pub fn active_modes(&self) -> usize {
        self.active
    }

    pub fn capacity(&self) -> usize {
        self.modes.len()
    }

    /// The sounding resonators, lowest harmonic first.
    pub fn modes(&self) -> &[Resonator] {
        &self.modes[..self.active]
    }

    pub fn harmonic_indices(&self) -> &[usize] {
        &self.indices[..self.active]
    }

    pub fn fundamental(&self) -> f64 {
        self.fc
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn resonance(&self) -> f64 {
        self.r
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    pub fn beta(&self) -> u32 {
        self.beta
    }
}
