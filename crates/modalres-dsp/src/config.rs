//! Engine construction settings.
//!
//! Everything here is fixed for the lifetime of an engine: voice and
//! partial counts size the preallocated banks, and the sample rate is baked
//! into every coefficient. Runtime-adjustable values live in `ParamId`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("sample rate must be positive and finite, got {0}")]
    SampleRate(f64),
    #[error("voice count must be at least 1")]
    NoVoices,
    #[error("partial count must be at least 1")]
    NoPartials,
    #[error("control block size must be at least 1")]
    BlockSize,
    #[error("MIDI channel must be in 1..=16, got {0}")]
    MidiChannel(u8),
    #[error("ping level must be in (0, 1], got {0}")]
    PingLevel(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Polyphony.
    pub voices: usize,
    /// Resonators per harmonic voice.
    pub partials: usize,
    /// Samples per control block.
    pub block_size: usize,
    /// 1-based MIDI channel the engine answers on.
    pub midi_channel: u8,
    /// Amplitude of the impulse excitation.
    pub ping_level: f64,
    pub noise_seed: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            voices: 4,
            partials: 4,
            block_size: 48,
            midi_channel: 1,
            ping_level: 0.25,
            noise_seed: 0x5eed_1234,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.voices == 0 {
            return Err(ConfigError::NoVoices);
        }
        if self.partials == 0 {
            return Err(ConfigError::NoPartials);
        }
        if self.block_size == 0 {
            return Err(ConfigError::BlockSize);
        }
        if !(1..=16).contains(&self.midi_channel) {
            return Err(ConfigError::MidiChannel(self.midi_channel));
        }
        if !(self.ping_level > 0.0 && self.ping_level <= 1.0) {
            return Err(ConfigError::PingLevel(self.ping_level));
        }
        Ok(())
    }

    /// Control blocks per second.
    pub fn control_rate(&self) -> f64 {
        self.sample_rate / self.block_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
        assert_eq!(EngineConfig::default().control_rate(), 1000.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = |f: fn(&mut EngineConfig)| {
            let mut c = EngineConfig::default();
            f(&mut c);
            c.validate()
        };
        assert_eq!(bad(|c| c.sample_rate = 0.0), Err(ConfigError::SampleRate(0.0)));
        assert_eq!(bad(|c| c.voices = 0), Err(ConfigError::NoVoices));
        assert_eq!(bad(|c| c.partials = 0), Err(ConfigError::NoPartials));
        assert_eq!(bad(|c| c.block_size = 0), Err(ConfigError::BlockSize));
        assert_eq!(bad(|c| c.midi_channel = 17), Err(ConfigError::MidiChannel(17)));
        assert!(matches!(bad(|c| c.ping_level = f64::NAN), Err(ConfigError::PingLevel(_))));
        assert_eq!(bad(|c| c.ping_level = 1.5), Err(ConfigError::PingLevel(1.5)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConfigError::MidiChannel(0).to_string(),
            "MIDI channel must be in 1..=16, got 0"
        );
    }
}
