//! Attack/decay envelope that gates noise or live input into a voice.
//!
//! Attack is a one-pole approach towards an overshoot target so it reaches
//! full level in finite time; decay is a plain exponential fall. Retriggering
//! restarts the attack from wherever the envelope currently sits, so a fast
//! repeat never snaps the level back to zero.

/// Attack aims past 1.0 so the one-pole curve actually crosses full level.
const ATTACK_TARGET: f64 = 1.2;

/// Below this the decay segment is considered finished.
const SILENCE: f64 = 1e-4;

/// Shortest usable segment; keeps the coefficients finite.
const MIN_SEGMENT_SECS: f64 = 0.0005;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
}

#[derive(Clone, Debug)]
pub struct Envelope {
    sample_rate: f64,
    stage: EnvelopeStage,
    level: f64,
    attack_secs: f64,
    release_secs: f64,
    attack_coeff: f64,
    decay_coeff: f64,
}

impl Envelope {
    /// - `attack_secs`: time to reach full level
    /// - `release_secs`: decay time constant
    pub fn new(attack_secs: f64, release_secs: f64, sample_rate: f64) -> Self {
        let mut env = Self {
            sample_rate,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            attack_secs: f64::NAN,
            release_secs: f64::NAN,
            attack_coeff: 0.0,
            decay_coeff: 0.0,
        };
        env.set_attack(attack_secs);
        env.set_release(release_secs);
        env
    }

    fn coeff(&self, secs: f64) -> f64 {
        (-1.0 / (secs.max(MIN_SEGMENT_SECS) * self.sample_rate)).exp()
    }

    pub fn set_attack(&mut self, secs: f64) {
        if secs != self.attack_secs {
            self.attack_secs = secs;
            // Time constant chosen so the approach to ATTACK_TARGET crosses
            // 1.0 after `secs`: 1.2·(1 - e^(-t/τ)) = 1  =>  τ = t / ln 6
            let tau = secs.max(MIN_SEGMENT_SECS) / (ATTACK_TARGET / (ATTACK_TARGET - 1.0)).ln();
            self.attack_coeff = (-1.0 / (tau * self.sample_rate)).exp();
        }
    }

    pub fn set_release(&mut self, secs: f64) {
        if secs != self.release_secs {
            self.release_secs = secs;
            self.decay_coeff = self.coeff(secs);
        }
    }

    /// Start (or restart) the attack segment from the current level.
    pub fn trigger(&mut self) {
        self.stage = EnvelopeStage::Attack;
    }

    pub fn process(&mut self) -> f64 {
        match self.stage {
            EnvelopeStage::Idle => {}
            EnvelopeStage::Attack => {
                self.level = ATTACK_TARGET + self.attack_coeff * (self.level - ATTACK_TARGET);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                self.level *= self.decay_coeff;
                if self.level < SILENCE {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }
        self.level
    }

    pub fn is_running(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_until_triggered() {
        let mut env = Envelope::new(0.01, 0.1, 48000.0);
        for _ in 0..1000 {
            assert_eq!(env.process(), 0.0);
        }
        assert!(!env.is_running());
    }

    #[test]
    fn test_attack_time() {
        let sr = 48000.0;
        let mut env = Envelope::new(0.01, 0.5, sr);
        env.trigger();
        let mut samples_to_peak = 0usize;
        while env.stage() == EnvelopeStage::Attack {
            env.process();
            samples_to_peak += 1;
        }
        let expected = (0.01 * sr) as usize;
        assert!(
            samples_to_peak.abs_diff(expected) <= 2,
            "attack took {samples_to_peak} samples, expected ~{expected}"
        );
        assert_eq!(env.level(), 1.0);
    }

    #[test]
    fn test_decays_to_idle() {
        let sr = 48000.0;
        let mut env = Envelope::new(0.001, 0.05, sr);
        env.trigger();
        let mut peak = 0.0f64;
        for _ in 0..(sr as usize) {
            peak = peak.max(env.process());
        }
        assert_eq!(peak, 1.0);
        assert!(!env.is_running(), "envelope should be idle after 1 s");
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn test_retrigger_is_continuous() {
        let sr = 48000.0;
        let mut env = Envelope::new(0.005, 0.2, sr);
        env.trigger();
        for _ in 0..2000 {
            env.process();
        }
        let before = env.level();
        env.trigger();
        let after = env.process();
        assert!(after >= before, "retrigger must rise from the current level");
        assert!(after - before < 0.05, "retrigger jumped: {before} -> {after}");
    }

    #[test]
    fn test_release_change_applies_mid_decay() {
        let sr = 48000.0;
        let mut slow = Envelope::new(0.001, 2.0, sr);
        let mut fast = Envelope::new(0.001, 2.0, sr);
        slow.trigger();
        fast.trigger();
        for _ in 0..200 {
            slow.process();
            fast.process();
        }
        fast.set_release(0.01);
        for _ in 0..4800 {
            slow.process();
            fast.process();
        }
        assert!(fast.level() < slow.level() * 0.1);
    }
}
