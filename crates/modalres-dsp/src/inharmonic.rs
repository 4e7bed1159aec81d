//! Inharmonic modal voice: partials from an explicit preset table.
//!
//! Signal flow: input -> one-pole LPF -> resonator bank -> average
//!
//! The preset gives each partial a ratio (or fixed Hz), a baseline pole
//! radius and a baseline gain. Resonance and gain are modulated relative to
//! those baselines, so dialing an amount back to zero always recovers the
//! preset's own voicing.

use crate::filters::{OnePoleLpf, R_MAX, Resonator};
use crate::presets::{MAX_PRESET_MODES, Preset, PresetMode};

/// Ceiling for per-mode gain under `modulate_gain`.
pub const GAIN_MAX: f64 = 2.0;

pub const DEFAULT_INPUT_CUTOFF_HZ: f64 = 220.0;

pub struct InharmonicVoice {
    modes: [Resonator; MAX_PRESET_MODES],
    /// Baseline table of the loaded preset; `table[..table_len]` is valid.
    table: [PresetMode; MAX_PRESET_MODES],
    table_len: usize,
    /// Table index each active slot renders.
    slots: [usize; MAX_PRESET_MODES],
    active: usize,
    input_filter: OnePoleLpf,
    sample_rate: f64,
    fc: f64,
    mgf: f64,
    r_amount: f64,
    gain_amount: f64,
}

impl InharmonicVoice {
    pub fn new(sample_rate: f64, fundamental_hz: f64, preset: &Preset) -> Self {
        let mut voice = Self {
            modes: std::array::from_fn(|_| Resonator::new(sample_rate, 0.0, 0.0, 0.0)),
            table: [PresetMode {
                ratio: 1.0,
                resonance: 0.0,
                gain: 0.0,
            }; MAX_PRESET_MODES],
            table_len: 0,
            slots: [0; MAX_PRESET_MODES],
            active: 0,
            input_filter: OnePoleLpf::new(DEFAULT_INPUT_CUTOFF_HZ, sample_rate),
            sample_rate,
            fc: fundamental_hz,
            mgf: 0.0,
            r_amount: 0.0,
            gain_amount: 0.0,
        };
        voice.load_preset(preset);
        voice
    }

    /// Swap in a new mode table. Modulation amounts and `mgf` carry over.
    pub fn load_preset(&mut self, preset: &Preset) {
        let len = preset.modes.len().min(MAX_PRESET_MODES);
        self.table[..len].copy_from_slice(&preset.modes[..len]);
        self.table_len = len;
        self.layout();
    }

    fn mode_r(&self, i: usize) -> f64 {
        let base = self.table[i].resonance;
        (base + self.r_amount * (R_MAX - base)).clamp(0.0, R_MAX)
    }

    fn mode_gain(&self, i: usize) -> f64 {
        let base = self.table[i].gain;
        let g = base + self.gain_amount * (GAIN_MAX - base);
        g / ((i + 1) as f64).powf(self.mgf)
    }

    /// Assign table entries to slots, skipping any entry at or above Nyquist.
    ///
    /// Table ratios are not sorted (fixed-Hz entries sit anywhere), so an
    /// aliasing entry is dropped on its own rather than ending the walk.
    fn layout(&mut self) {
        let previously_active = self.active;
        let nyquist = self.sample_rate / 2.0;

        let mut slot = 0;
        for i in 0..self.table_len {
            let freq = self.table[i].frequency(self.fc);
            if freq >= nyquist || freq <= 0.0 {
                continue;
            }
            let (r, g) = (self.mode_r(i), self.mode_gain(i));
            let mode = &mut self.modes[slot];
            mode.set(freq, r, g);
            if slot >= previously_active {
                mode.reset();
            }
            self.slots[slot] = i;
            slot += 1;
        }
        self.active = slot;
    }

    fn refresh_levels(&mut self) {
        for slot in 0..self.active {
            let i = self.slots[slot];
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

    pub fn update_mgf(&mut self, mgf: f64) {
        if mgf != self.mgf {
            self.mgf = mgf;
            self.refresh_levels();
        }
    }

    /// Push every mode's radius from its baseline towards `R_MAX`.
    /// `amt` in 0..1; 0 restores the preset baseline.
    pub fn modulate_r(&mut self, amt: f64) {
        let amt = amt.clamp(0.0, 1.0);
        if amt != self.r_amount {
            self.r_amount = amt;
            self.refresh_levels();
        }
    }

    /// Push every mode's gain from its baseline towards `GAIN_MAX`.
    /// `amt` in 0..1; 0 restores the preset baseline.
    pub fn modulate_gain(&mut self, amt: f64) {
        let amt = amt.clamp(0.0, 1.0);
        if amt != self.gain_amount {
            self.gain_amount = amt;
            self.refresh_levels();
        }
    }

    pub fn update_input_cutoff(&mut self, cutoff_hz: f64) {
        self.input_filter.update_fc(cutoff_hz);
    }

    /// Filter the excitation, then average all active modes. Not clamped.
    pub fn process(&mut self, input: f64) -> f64 {
        let filtered = self.input_filter.process(input);
        if self.active == 0 {
            return 0.0;
        }
        let mut sum = 0.0;
        for mode in &mut self.modes[..self.active] {
            sum += mode.process(filtered);
        }
        sum / self.active as f64
    }

    pub fn reset(&mut self) {
        for mode in &mut self.modes {
            mode.reset();
        }
        self.input_filter.reset();
    }

    pub fn active_modes(&self) -> usize {
        self.active
    }

    pub fn modes(&self) -> &[Resonator] {
        &self.modes[..self.active]
    }

    /// Preset-table index behind each active mode.
    pub fn table_indices(&self) -> &[usize] {
        &self.slots[..self.active]
    }

    pub fn fundamental(&self) -> f64 {
        self.fc
    }

    pub fn resonance_amount(&self) -> f64 {
        self.r_amount
    }

    pub fn gain_amount(&self) -> f64 {
        self.gain_amount
    }

    pub fn input_cutoff(&self) -> f64 {
        self.input_filter.cutoff_hz()
    }
}
