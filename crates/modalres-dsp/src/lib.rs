//! modalres DSP library: polyphonic modal resonator synthesis.
//!
//! Pure DSP and control math with no audio framework dependencies.

// Filter primitives and modulation sources
pub mod envelope;
pub mod filters;
pub mod lfo;
pub mod noise;

// Modal voices
pub mod harmonic;
pub mod inharmonic;
pub mod presets;

// Control layer
pub mod config;
pub mod controls;
pub mod param_page;
pub mod queue;

// Engine
pub mod engine;
pub mod pool;
pub mod shaper;

pub use config::{ConfigError, EngineConfig};
pub use controls::{ControlEvent, Knob, MidiMessage, OutputStage, Page, ParamId, SynthMode};
pub use engine::SynthEngine;
pub use queue::{control_queue, ControlReceiver, ControlSender, QueueFull};
