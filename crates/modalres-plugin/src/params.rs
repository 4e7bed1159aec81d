use modalres_dsp::controls::Page;
use nih_plug::prelude::*;

/// Host-facing mirror of the engine's knob pages.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageChoice {
    Resonance,
    Falloff,
    Body,
    Envelope,
    #[name = "Resonance LFO"]
    ResonanceLfo,
    #[name = "Gain LFO"]
    GainLfo,
    Output,
}

impl From<PageChoice> for Page {
    fn from(choice: PageChoice) -> Self {
        match choice {
            PageChoice::Resonance => Page::Resonance,
            PageChoice::Falloff => Page::Falloff,
            PageChoice::Body => Page::Body,
            PageChoice::Envelope => Page::Envelope,
            PageChoice::ResonanceLfo => Page::ResonanceLfo,
            PageChoice::GainLfo => Page::GainLfo,
            PageChoice::Output => Page::Output,
        }
    }
}

/// The hardware surface: two knobs, a page selector and two buttons. What
/// the knobs control depends on the page; the engine's pickup logic keeps
/// a knob from taking over a parameter until it reaches its value.
#[derive(Params)]
pub struct ModalresParams {
    #[id = "knob_a"]
    pub knob_a: FloatParam,

    #[id = "knob_b"]
    pub knob_b: FloatParam,

    #[id = "page"]
    pub page: EnumParam<PageChoice>,

    /// Rising edge advances to the next inharmonic preset.
    #[id = "next_preset"]
    pub next_preset: BoolParam,

    /// Rising edge advances to the next synthesis mode.
    #[id = "next_mode"]
    pub next_mode: BoolParam,

    /// Master volume, post output stage.
    #[id = "volume"]
    pub volume: FloatParam,
}

impl Default for ModalresParams {
    fn default() -> Self {
        Self {
            knob_a: FloatParam::new("Knob A", 0.5, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_value_to_string(formatters::v2s_f32_rounded(3)),

            knob_b: FloatParam::new("Knob B", 0.5, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_value_to_string(formatters::v2s_f32_rounded(3)),

            page: EnumParam::new("Page", PageChoice::Resonance),

            next_preset: BoolParam::new("Next Preset", false),

            next_mode: BoolParam::new("Next Mode", false),

            volume: FloatParam::new(
                "Volume",
                0.8,
                FloatRange::Skewed {
                    min: 0.0,
                    max: 1.0,
                    factor: FloatRange::skew_factor(-2.0),
                },
            )
            .with_smoother(SmoothingStyle::Logarithmic(5.0))
            .with_unit(" %")
            .with_value_to_string(formatters::v2s_f32_percentage(0))
            .with_string_to_value(formatters::s2v_f32_percentage()),
        }
    }
}
