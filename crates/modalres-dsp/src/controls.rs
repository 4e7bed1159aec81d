//! Control vocabulary: pages, synthesis modes, output stages, parameter
//! identities and the events that carry them into the engine.

use crate::filters::R_MAX;
use crate::inharmonic::{DEFAULT_INPUT_CUTOFF_HZ, GAIN_MAX};
use crate::param_page::{ParameterPage, Taper};
use crate::presets::NUM_PRESETS;

/// Lower end of the resonance knob.
pub const RESONANCE_MIN: f64 = 0.99;

/// Knob catch window, in normalized position.
pub const DEFAULT_CATCH: f64 = 0.05;

/// Catch window wide enough that selectors always follow their input.
const ALWAYS_CATCH: f64 = 2.0;

/// A knob page. Each page maps the two physical knobs onto two parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Page {
    Resonance,
    Falloff,
    Body,
    Envelope,
    ResonanceLfo,
    GainLfo,
    Output,
}

impl Page {
    pub const ALL: [Page; 7] = [
        Page::Resonance,
        Page::Falloff,
        Page::Body,
        Page::Envelope,
        Page::ResonanceLfo,
        Page::GainLfo,
        Page::Output,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Step by encoder detents, wrapping in both directions.
    pub fn advance(self, delta: i32) -> Self {
        let n = Self::ALL.len() as i64;
        let next = (self.index() as i64 + delta as i64).rem_euclid(n);
        Self::ALL[next as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Page::Resonance => "Resonance",
            Page::Falloff => "Falloff",
            Page::Body => "Body",
            Page::Envelope => "Envelope",
            Page::ResonanceLfo => "Resonance LFO",
            Page::GainLfo => "Gain LFO",
            Page::Output => "Output",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Knob {
    A,
    B,
}

/// Where the excitation for each voice comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Excitation {
    /// One-sample ping on note-on.
    Impulse,
    /// Noise shaped by the voice envelope.
    Noise,
    /// Audio input, always open.
    Input,
    /// Audio input shaped by the voice envelope.
    GatedInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SynthMode {
    Impulse,
    Noise,
    External,
    ExternalGated,
    InharmonicImpulse,
    InharmonicNoise,
}

impl SynthMode {
    pub const ALL: [SynthMode; 6] = [
        SynthMode::Impulse,
        SynthMode::Noise,
        SynthMode::External,
        SynthMode::ExternalGated,
        SynthMode::InharmonicImpulse,
        SynthMode::InharmonicNoise,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn is_inharmonic(self) -> bool {
        matches!(self, SynthMode::InharmonicImpulse | SynthMode::InharmonicNoise)
    }

    pub fn excitation(self) -> Excitation {
        match self {
            SynthMode::Impulse | SynthMode::InharmonicImpulse => Excitation::Impulse,
            SynthMode::Noise | SynthMode::InharmonicNoise => Excitation::Noise,
            SynthMode::External => Excitation::Input,
            SynthMode::ExternalGated => Excitation::GatedInput,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SynthMode::Impulse => "Impulse",
            SynthMode::Noise => "Noise",
            SynthMode::External => "External",
            SynthMode::ExternalGated => "External Gated",
            SynthMode::InharmonicImpulse => "Inharmonic Impulse",
            SynthMode::InharmonicNoise => "Inharmonic Noise",
        }
    }
}

/// Final waveshaper on the mixed voice sum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputStage {
    Identity,
    ExpSoftClip,
    Tanh,
    Atan,
}

impl OutputStage {
    pub const ALL: [OutputStage; 4] = [
        OutputStage::Identity,
        OutputStage::ExpSoftClip,
        OutputStage::Tanh,
        OutputStage::Atan,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputStage::Identity => "Identity",
            OutputStage::ExpSoftClip => "Exp Soft Clip",
            OutputStage::Tanh => "Tanh",
            OutputStage::Atan => "Atan",
        }
    }
}

/// Every engine parameter reachable from knobs, MIDI CC or buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamId {
    Resonance,
    Gain,
    ModeGainFalloff,
    ModeResonanceFalloff,
    Stiffness,
    Beta,
    Attack,
    Release,
    ResonanceLfoRate,
    ResonanceLfoDepth,
    GainLfoRate,
    GainLfoDepth,
    InputCutoff,
    OutputStage,
    Mode,
    Preset,
}

/// Static description of one parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    /// Knob slot, if the parameter lives on a page.
    pub slot: Option<(Page, Knob)>,
    pub taper: Taper,
    pub stepped: bool,
    pub catch: f64,
    pub cc: u8,
}

impl ParamId {
    pub const COUNT: usize = 16;

    pub const ALL: [ParamId; Self::COUNT] = [
        ParamId::Resonance,
        ParamId::Gain,
        ParamId::ModeGainFalloff,
        ParamId::ModeResonanceFalloff,
        ParamId::Stiffness,
        ParamId::Beta,
        ParamId::Attack,
        ParamId::Release,
        ParamId::ResonanceLfoRate,
        ParamId::ResonanceLfoDepth,
        ParamId::GainLfoRate,
        ParamId::GainLfoDepth,
        ParamId::InputCutoff,
        ParamId::OutputStage,
        ParamId::Mode,
        ParamId::Preset,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn descriptor(self) -> ParamDescriptor {
        let knob = |name, min, max, default, page, knob, taper, cc| ParamDescriptor {
            name,
            min,
            max,
            default,
            slot: Some((page, knob)),
            taper,
            stepped: false,
            catch: DEFAULT_CATCH,
            cc,
        };
        let selector = |name, count: usize, slot, cc| ParamDescriptor {
            name,
            min: 0.0,
            max: (count - 1) as f64,
            default: 0.0,
            slot,
            taper: Taper::Linear,
            stepped: true,
            catch: ALWAYS_CATCH,
            cc,
        };
        use Knob::{A, B};
        use Taper::{Exponential, Linear};
        match self {
            ParamId::Resonance => knob("Resonance", RESONANCE_MIN, R_MAX, 0.9999, Page::Resonance, A, Linear, 14),
            ParamId::Gain => knob("Gain", 0.0, GAIN_MAX, 1.0, Page::Resonance, B, Linear, 15),
            ParamId::ModeGainFalloff => knob("Gain Falloff", 0.0, 2.0, 0.0, Page::Falloff, A, Linear, 18),
            ParamId::ModeResonanceFalloff => {
                knob("Resonance Falloff", 0.0, 0.001, 0.0, Page::Falloff, B, Exponential, 19)
            }
            ParamId::Stiffness => knob("Stiffness", 0.0, 0.01, 0.00001, Page::Body, A, Exponential, 16),
            ParamId::Beta => ParamDescriptor {
                stepped: true,
                ..knob("Beta", 2.0, 9.0, 2.0, Page::Body, B, Linear, 17)
            },
            ParamId::Attack => knob("Attack", 0.001, 1.0, 0.005, Page::Envelope, A, Exponential, 20),
            ParamId::Release => knob("Release", 0.01, 4.0, 0.5, Page::Envelope, B, Exponential, 21),
            ParamId::ResonanceLfoRate => {
                knob("Resonance LFO Rate", 0.01, 10.0, 0.3, Page::ResonanceLfo, A, Exponential, 24)
            }
            ParamId::ResonanceLfoDepth => knob("Resonance LFO Depth", 0.0, 1.0, 0.0, Page::ResonanceLfo, B, Linear, 25),
            ParamId::GainLfoRate => knob("Gain LFO Rate", 0.01, 10.0, 0.3, Page::GainLfo, A, Exponential, 26),
            ParamId::GainLfoDepth => knob("Gain LFO Depth", 0.0, 1.0, 0.0, Page::GainLfo, B, Linear, 27),
            ParamId::InputCutoff => knob(
                "Input Cutoff",
                20.0,
                20000.0,
                DEFAULT_INPUT_CUTOFF_HZ,
                Page::Output,
                A,
                Exponential,
                28,
            ),
            ParamId::OutputStage => selector("Output Stage", OutputStage::ALL.len(), Some((Page::Output, B)), 29),
            ParamId::Mode => selector("Mode", SynthMode::ALL.len(), None, 22),
            ParamId::Preset => selector("Preset", NUM_PRESETS, None, 23),
        }
    }

    pub fn from_cc(controller: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.descriptor().cc == controller)
    }

    /// The parameter on a given page and knob.
    pub fn at(page: Page, knob: Knob) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.descriptor().slot == Some((page, knob)))
    }

    /// The CC value that maps onto `value` (nearest step).
    pub fn cc_value(self, value: f64) -> u8 {
        let d = self.descriptor();
        let t = ((value - d.min) / (d.max - d.min)).clamp(0.0, 1.0);
        (d.taper.invert(t) * 127.0).round() as u8
    }

    pub fn build(self) -> ParameterPage {
        let d = self.descriptor();
        let page = d.slot.map(|(page, _)| page);
        let param = ParameterPage::new(d.min, d.max, d.default, page, d.catch).with_taper(d.taper);
        if d.stepped { param.stepped() } else { param }
    }
}

/// The subset of MIDI the engine listens to. Channels are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiMessage {
    pub fn channel(&self) -> u8 {
        match *self {
            MidiMessage::NoteOn { channel, .. } | MidiMessage::ControlChange { channel, .. } => channel,
        }
    }
}

/// Everything that can reach the engine from the control side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlEvent {
    Midi(MidiMessage),
    /// Raw linear knob position, 0..1.
    KnobMoved { knob: Knob, position: f64 },
    /// Encoder detents; positive steps forward through the pages.
    PageEncoder(i32),
    PresetButton,
    ModeButton,
}

/// Equal-tempered frequency of a MIDI note, A4 (69) = 440 Hz.
pub fn midi_to_freq(note: u8) -> f64 {
    440.0 * 2.0f64.powf((note as f64 - 69.0) / 12.0)
}
