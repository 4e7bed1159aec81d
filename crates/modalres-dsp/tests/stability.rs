//! Property tests: filter boundedness, alias-free mode placement, parameter
//! ranges, and engine output limits under arbitrary control input.
//!
//! ```bash
//! cargo test -p modalres-dsp --test stability
//! ```

use proptest::prelude::*;

use modalres_dsp::controls::{ControlEvent, Knob, MidiMessage, ParamId};
use modalres_dsp::filters::{Resonator, R_MAX};
use modalres_dsp::harmonic::{HarmonicParams, HarmonicVoice};
use modalres_dsp::inharmonic::InharmonicVoice;
use modalres_dsp::presets::{self, NUM_PRESETS};
use modalres_dsp::{EngineConfig, SynthEngine};

const SR: f64 = 48000.0;

fn control_event() -> impl Strategy<Value = ControlEvent> {
    prop_oneof![
        (0u8..128, 0u8..128).prop_map(|(note, velocity)| {
            ControlEvent::Midi(MidiMessage::NoteOn { channel: 1, note, velocity })
        }),
        (14u8..30, 0u8..128).prop_map(|(controller, value)| {
            ControlEvent::Midi(MidiMessage::ControlChange { channel: 1, controller, value })
        }),
        (prop::bool::ANY, 0.0f64..=1.0).prop_map(|(a, position)| ControlEvent::KnobMoved {
            knob: if a { Knob::A } else { Knob::B },
            position,
        }),
        (-3i32..4).prop_map(ControlEvent::PageEncoder),
        Just(ControlEvent::PresetButton),
        Just(ControlEvent::ModeButton),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A unit impulse never drives a resonator past a small multiple of its
    /// gain, for any stable radius.
    #[test]
    fn resonator_impulse_response_is_bounded(
        fc in 1.0f64..(0.49 * SR),
        r in 0.0f64..=R_MAX,
        g in 0.0f64..2.0,
    ) {
        let mut res = Resonator::new(SR, fc, r, g);
        let mut peak = res.process(1.0).abs();
        for _ in 0..10_000 {
            let y = res.process(0.0);
            prop_assert!(y.is_finite());
            peak = peak.max(y.abs());
        }
        prop_assert!(peak <= 5.0 * g + 1e-12, "peak {} for fc={} r={} g={}", peak, fc, r, g);
    }

    /// Harmonic voices never place a mode at or above Nyquist, and never
    /// place one on a skipped index.
    #[test]
    fn harmonic_modes_stay_below_nyquist(
        fc in 20.0f64..20000.0,
        stiffness in 0.0f64..0.01,
        beta in 1u32..10,
        capacity in 1usize..12,
    ) {
        let params = HarmonicParams { fundamental_hz: fc, stiffness, beta, ..Default::default() };
        let voice = HarmonicVoice::new(capacity, SR, &params);
        prop_assert!(voice.active_modes() <= capacity);
        for (mode, &i) in voice.modes().iter().zip(voice.harmonic_indices()) {
            prop_assert!(mode.fc() < SR / 2.0);
            prop_assert!(i % beta as usize != 0);
        }
    }

    #[test]
    fn inharmonic_modes_stay_below_nyquist(fc in 20.0f64..20000.0, preset in 0usize..NUM_PRESETS) {
        let voice = InharmonicVoice::new(SR, fc, presets::preset(preset));
        for mode in voice.modes() {
            prop_assert!(mode.fc() < SR / 2.0);
            prop_assert!(mode.r() <= R_MAX);
        }
    }

    /// Whatever arrives from the control side, parameters stay in range and
    /// the output stays inside [-1, 1].
    #[test]
    fn engine_survives_arbitrary_control(events in prop::collection::vec(control_event(), 1..40)) {
        let mut engine = SynthEngine::new(EngineConfig::default()).unwrap();
        let input: Vec<f64> = (0..96).map(|i| ((i as f64) * 0.3).sin()).collect();
        let mut out = vec![0.0; 96];
        for event in events {
            engine.handle_event(event);
            engine.render(&input, &mut out);
            for &s in &out {
                prop_assert!(s.is_finite() && (-1.0..=1.0).contains(&s));
            }
        }
        for id in ParamId::ALL {
            let p = engine.param(id);
            let (lo, hi) = p.range();
            prop_assert!(lo <= p.value() && p.value() <= hi, "{:?} = {}", id, p.value());
        }
    }
}
