//! Filter primitives for the modal voices.
//!
//! `Resonator` is the two-pole/two-zero section every mode of every voice is
//! built from. `OnePoleLpf` shapes excitation before it reaches a mode bank.
//! Both recompute coefficients in place: filter memory is never touched by a
//! parameter change.

use std::f64::consts::PI;

/// Stability ceiling for the pole radius.
pub const R_MAX: f64 = 0.99999;

/// Two-pole/two-zero resonator (Direct Form I).
///
/// Poles at `r·e^(±jωc)`, zeros at DC and Nyquist:
///
///   a1 = -2·r·cos(ωc),  a2 = r²
///   b0 = g·r,  b1 = 0,  b2 = -b0
///
/// The resonator does not clamp `r`; callers keep it within `[0, R_MAX]`.
#[derive(Clone, Debug)]
pub struct Resonator {
    sample_rate: f64,
    fc: f64,
    r: f64,
    gain: f64,
    b0: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    // Feed-forward history, then feedback history.
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Resonator {
    pub fn new(sample_rate: f64, fc: f64, r: f64, gain: f64) -> Self {
        let mut res = Self {
            sample_rate,
            fc,
            r,
            gain,
            b0: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        res.update_feedback();
        res.update_feedforward();
        res
    }

    /// Re-initialize all parameters at once, keeping filter memory.
    pub fn set(&mut self, fc: f64, r: f64, gain: f64) {
        self.update_fc(fc);
        self.update_r(r);
        self.update_gain(gain);
    }

    pub fn update_fc(&mut self, fc: f64) {
        if fc != self.fc {
            self.fc = fc;
            self.update_feedback();
        }
    }

    pub fn update_r(&mut self, r: f64) {
        if r != self.r {
            self.r = r;
            self.update_feedback();
            self.update_feedforward();
        }
    }

    pub fn update_gain(&mut self, gain: f64) {
        if gain != self.gain {
            self.gain = gain;
            self.update_feedforward();
        }
    }

    fn update_feedback(&mut self) {
        let wc = 2.0 * PI * self.fc / self.sample_rate;
        self.a1 = -2.0 * self.r * wc.cos();
        self.a2 = self.r * self.r;
    }

    fn update_feedforward(&mut self) {
        self.b0 = self.gain * self.r;
        self.b2 = -self.b0;
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn fc(&self) -> f64 {
        self.fc
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }
}

/// 1-pole low-pass from the bilinear transform of an RC prototype.
///
///   α  = (1 - tan(ωc/2)) / (1 + tan(ωc/2))
///   y[n] = b·(x[n] + x[n-1]) + α·y[n-1],  b = g·(1 - α)/2
///
/// Unity gain at DC when `g = 1`, a zero at Nyquist.
#[derive(Clone, Debug)]
pub struct OnePoleLpf {
    sample_rate: f64,
    cutoff_hz: f64,
    gain: f64,
    alpha: f64,
    b: f64,
    prev_x: f64,
    prev_y: f64,
}

impl OnePoleLpf {
    pub fn new(cutoff_hz: f64, sample_rate: f64) -> Self {
        Self::with_gain(cutoff_hz, 1.0, sample_rate)
    }

    pub fn with_gain(cutoff_hz: f64, gain: f64, sample_rate: f64) -> Self {
        let mut lpf = Self {
            sample_rate,
            cutoff_hz: Self::limit_cutoff(cutoff_hz, sample_rate),
            gain,
            alpha: 0.0,
            b: 0.0,
            prev_x: 0.0,
            prev_y: 0.0,
        };
        lpf.update_coefficients();
        lpf
    }

    // tan() blows up at Nyquist
    fn limit_cutoff(cutoff_hz: f64, sample_rate: f64) -> f64 {
        cutoff_hz.clamp(1.0, sample_rate * 0.49)
    }

    fn update_coefficients(&mut self) {
        let wc = 2.0 * PI * self.cutoff_hz / self.sample_rate;
        let t = (wc / 2.0).tan();
        self.alpha = (1.0 - t) / (1.0 + t);
        self.b = self.gain * (1.0 - self.alpha) / 2.0;
    }

    pub fn update_fc(&mut self, cutoff_hz: f64) {
        let cutoff_hz = Self::limit_cutoff(cutoff_hz, self.sample_rate);
        if cutoff_hz != self.cutoff_hz {
            self.cutoff_hz = cutoff_hz;
            self.update_coefficients();
        }
    }

    pub fn update_gain(&mut self, gain: f64) {
        if gain != self.gain {
            self.gain = gain;
            self.b = self.gain * (1.0 - self.alpha) / 2.0;
        }
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b * (x + self.prev_x) + self.alpha * self.prev_y;
        self.prev_x = x;
        self.prev_y = y;
        y
    }

    pub fn reset(&mut self) {
        self.prev_x = 0.0;
        self.prev_y = 0.0;
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }
}
