//! Output stages: memoryless waveshapers on the mixed voice sum.
//!
//! The saturating curves are normalized so that an input of 1.0 maps to
//! 1.0 (except `ExpSoftClip`, which approaches 1 asymptotically). Whatever
//! the stage, the engine hard-limits to [-1, 1] afterwards.

use crate::controls::OutputStage;

impl OutputStage {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            OutputStage::Identity => x,
            OutputStage::ExpSoftClip => x.signum() * (1.0 - (-x.abs()).exp()),
            OutputStage::Tanh => x.tanh() / 1.0f64.tanh(),
            OutputStage::Atan => x.atan() / std::f64::consts::FRAC_PI_4,
        }
    }

    /// `apply` followed by the hard limit.
    pub fn limit(self, x: f64) -> f64 {
        self.apply(x).clamp(-1.0, 1.0)
    }
}
