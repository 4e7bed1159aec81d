//! The synth engine: voice pool, paged parameters, LFOs and output stage.
//!
//! Signal flow per sample:
//!
//!   excitation (ping | noise·env | input | input·env) -> voice bank
//!     -> sum/N -> output stage -> hard limit
//!
//! Control changes arrive through `handle_event` (or `drain` from a control
//! queue) and only touch `ParameterPage` state. The audio path picks them up
//! at control-block boundaries, every `block_size` samples, so a block
//! always renders with one settled set of values.

use crate::config::{ConfigError, EngineConfig};
use crate::controls::{
    midi_to_freq, ControlEvent, Excitation, MidiMessage, OutputStage, Page, ParamId, SynthMode,
};
use crate::harmonic::HarmonicParams;
use crate::inharmonic::GAIN_MAX;
use crate::lfo::TriangleLfo;
use crate::noise::NoiseSource;
use crate::param_page::ParameterPage;
use crate::pool::VoicePool;
use crate::presets::{self, NUM_PRESETS};
use crate::queue::ControlReceiver;

const INITIAL_FUNDAMENTAL_HZ: f64 = 220.0;

pub struct SynthEngine {
    config: EngineConfig,
    pool: VoicePool,
    params: [ParameterPage; ParamId::COUNT],
    page: Page,
    mode: SynthMode,
    stage: OutputStage,
    preset: usize,
    resonance_lfo: TriangleLfo,
    gain_lfo: TriangleLfo,
    noise: NoiseSource,
    // Last values pushed into the voices
    pushed_resonance: f64,
    pushed_gain: f64,
    /// Position inside the current control block.
    block_pos: usize,
}

impl SynthEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let params: [ParameterPage; ParamId::COUNT] = std::array::from_fn(|i| ParamId::ALL[i].build());
        let value = |id: ParamId| params[id.index()].value();

        let harmonic = HarmonicParams {
            fundamental_hz: INITIAL_FUNDAMENTAL_HZ,
            resonance: value(ParamId::Resonance),
            gain_db: 0.0,
            stiffness: value(ParamId::Stiffness),
            beta: value(ParamId::Beta) as u32,
            mgf: value(ParamId::ModeGainFalloff),
            mrf: value(ParamId::ModeResonanceFalloff),
        };
        let preset = value(ParamId::Preset) as usize;
        let mut pool = VoicePool::new(
            config.voices,
            config.partials,
            config.sample_rate,
            &harmonic,
            presets::preset(preset),
            (value(ParamId::Attack), value(ParamId::Release)),
        );
        for slot in pool.iter_mut() {
            slot.inharmonic.update_mgf(harmonic.mgf);
            slot.inharmonic.update_input_cutoff(value(ParamId::InputCutoff));
        }

        let (res_lo, res_hi) = params[ParamId::Resonance.index()].range();
        let mut resonance_lfo = TriangleLfo::new(config.control_rate());
        resonance_lfo.set_freq(value(ParamId::ResonanceLfoRate));
        resonance_lfo.set_depth(value(ParamId::ResonanceLfoDepth));
        resonance_lfo.set_range(res_hi - res_lo);
        let mut gain_lfo = TriangleLfo::new(config.control_rate());
        gain_lfo.set_freq(value(ParamId::GainLfoRate));
        gain_lfo.set_depth(value(ParamId::GainLfoDepth));
        gain_lfo.set_range(GAIN_MAX);

        let mode = SynthMode::from_index(value(ParamId::Mode) as usize);
        let stage = OutputStage::from_index(value(ParamId::OutputStage) as usize);
        let noise = NoiseSource::new(config.noise_seed);

        let mut engine = Self {
            config,
            pool,
            params,
            page: Page::Resonance,
            mode,
            stage,
            preset,
            resonance_lfo,
            gain_lfo,
            noise,
            pushed_resonance: f64::NAN,
            pushed_gain: f64::NAN,
            block_pos: 0,
        };
        engine.push_levels();
        Ok(engine)
    }

    // ── Control side ────────────────────────────────────────────────────

    /// Apply one control event. Cheap and allocation-free, but meant for
    /// the control context: it may log.
    pub fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Midi(msg) => self.handle_midi(msg),
            ControlEvent::KnobMoved { knob, position } => {
                if let Some(id) = ParamId::at(self.page, knob) {
                    let page = self.page;
                    self.offer(id, |p| p.process_physical(position, page));
                }
            }
            ControlEvent::PageEncoder(delta) => {
                if delta != 0 {
                    self.page = self.page.advance(delta);
                    log::debug!("page -> {}", self.page.name());
                }
            }
            ControlEvent::PresetButton => {
                let next = (self.param(ParamId::Preset).value() as usize + 1) % NUM_PRESETS;
                self.offer(ParamId::Preset, |p| {
                    p.set_value(next as f64);
                    p.value()
                });
            }
            ControlEvent::ModeButton => {
                let next = (self.param(ParamId::Mode).value() as usize + 1) % SynthMode::ALL.len();
                self.offer(ParamId::Mode, |p| {
                    p.set_value(next as f64);
                    p.value()
                });
            }
        }
    }

    /// Apply every event waiting in the control queue. Control context only,
    /// like `handle_event`.
    pub fn drain(&mut self, rx: &mut ControlReceiver) -> usize {
        let mut applied = 0;
        while let Some(event) = rx.pop() {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    fn handle_midi(&mut self, msg: MidiMessage) {
        if msg.channel() != self.config.midi_channel {
            log::trace!("dropping {msg:?}: listening on channel {}", self.config.midi_channel);
            return;
        }
        match msg {
            MidiMessage::NoteOn { note, velocity, .. } => self.note_on(note, velocity),
            MidiMessage::ControlChange { controller, value, .. } => match ParamId::from_cc(controller) {
                Some(id) => self.offer(id, |p| p.process_midi_cc(value)),
                None => log::trace!("ignoring unmapped CC {controller}"),
            },
        }
    }

    /// Run an update against one parameter and log it if it moved.
    fn offer(&mut self, id: ParamId, update: impl FnOnce(&mut ParameterPage) -> f64) {
        let param = &mut self.params[id.index()];
        let before = param.value();
        let after = update(param);
        if after == before {
            return;
        }
        match id {
            ParamId::Mode => log::debug!("mode -> {}", SynthMode::from_index(after as usize).name()),
            ParamId::Preset => log::debug!("preset -> {}", presets::preset(after as usize).name),
            ParamId::OutputStage => {
                log::debug!("output stage -> {}", OutputStage::from_index(after as usize).name())
            }
            _ => log::trace!("{} -> {after}", id.descriptor().name),
        }
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        // No release model: a zero-velocity note-on (note-off) does nothing
        if velocity == 0 {
            return;
        }
        // Selector changes queued earlier in this control block take effect
        // with the note, so routing and rendering agree on the mode
        for id in [ParamId::Mode, ParamId::Preset] {
            if self.params[id.index()].changed() {
                self.apply(id, self.params[id.index()].value());
            }
        }
        let idx = self.pool.assign();
        let freq = midi_to_freq(note.min(127));
        let vel = velocity.min(127) as f64 / 127.0;
        let pending_gain = self.param(ParamId::Gain).value() / GAIN_MAX;
        let committed_gain = self.pushed_gain;
        let mode = self.mode;
        let preset_len = presets::preset(self.preset).modes.len();

        let slot = self.pool.voice_mut(idx);
        slot.velocity = vel;
        slot.harmonic.update_fc(freq);
        slot.inharmonic.update_fc(freq);
        if mode.is_inharmonic() {
            slot.inharmonic.modulate_gain(vel * pending_gain);
        } else {
            slot.harmonic.update_gain(vel * committed_gain);
        }
        match mode.excitation() {
            Excitation::Impulse => slot.ping = true,
            Excitation::Noise | Excitation::GatedInput => slot.envelope.trigger(),
            Excitation::Input => {}
        }

        let (active, capacity) = if mode.is_inharmonic() {
            (slot.inharmonic.active_modes(), preset_len)
        } else {
            (slot.harmonic.active_modes(), slot.harmonic.capacity())
        };
        if active < capacity {
            log::debug!("voice {idx}: note {note} keeps {active}/{capacity} modes below Nyquist");
        }
    }

    // ── Audio side ──────────────────────────────────────────────────────

    /// Render mono output. `input` is the external excitation; missing
    /// samples read as silence. Allocation-free.
    pub fn render(&mut self, input: &[f64], output: &mut [f64]) {
        for (i, out) in output.iter_mut().enumerate() {
            if self.block_pos == 0 {
                self.begin_block();
            }
            *out = self.tick(input.get(i).copied().unwrap_or(0.0));
            self.block_pos += 1;
            if self.block_pos == self.config.block_size {
                self.block_pos = 0;
            }
        }
    }

    /// Render and duplicate into two channels.
    pub fn render_stereo(&mut self, input: &[f64], left: &mut [f64], right: &mut [f64]) {
        self.render(input, left);
        for (r, l) in right.iter_mut().zip(left.iter()) {
            *r = *l;
        }
    }

    fn begin_block(&mut self) {
        self.resonance_lfo.process();
        self.gain_lfo.process();
        for id in ParamId::ALL {
            if self.params[id.index()].changed() {
                self.apply(id, self.params[id.index()].value());
            }
        }
        self.push_levels();
    }

    fn apply(&mut self, id: ParamId, v: f64) {
        match id {
            // Combined with the LFOs in push_levels
            ParamId::Resonance | ParamId::Gain => {}
            ParamId::ModeGainFalloff => {
                for slot in self.pool.iter_mut() {
                    slot.harmonic.update_mgf(v);
                    slot.inharmonic.update_mgf(v);
                }
            }
            ParamId::ModeResonanceFalloff => {
                for slot in self.pool.iter_mut() {
                    slot.harmonic.update_mrf(v);
                }
            }
            ParamId::Stiffness => {
                for slot in self.pool.iter_mut() {
                    slot.harmonic.update_stiffness(v);
                }
            }
            ParamId::Beta => {
                for slot in self.pool.iter_mut() {
                    slot.harmonic.update_beta(v as u32);
                }
            }
            ParamId::Attack => {
                for slot in self.pool.iter_mut() {
                    slot.envelope.set_attack(v);
                }
            }
            ParamId::Release => {
                for slot in self.pool.iter_mut() {
                    slot.envelope.set_release(v);
                }
            }
            ParamId::ResonanceLfoRate => self.resonance_lfo.set_freq(v),
            ParamId::ResonanceLfoDepth => self.resonance_lfo.set_depth(v),
            ParamId::GainLfoRate => self.gain_lfo.set_freq(v),
            ParamId::GainLfoDepth => self.gain_lfo.set_depth(v),
            ParamId::InputCutoff => {
                for slot in self.pool.iter_mut() {
                    slot.inharmonic.update_input_cutoff(v);
                }
            }
            ParamId::OutputStage => self.stage = OutputStage::from_index(v as usize),
            ParamId::Mode => self.mode = SynthMode::from_index(v as usize),
            ParamId::Preset => {
                self.preset = v as usize % NUM_PRESETS;
                let preset = presets::preset(self.preset);
                for slot in self.pool.iter_mut() {
                    slot.inharmonic.load_preset(preset);
                }
            }
        }
    }

    /// Combine base values with LFO output and push to every voice when
    /// the result moved.
    fn push_levels(&mut self) {
        let (lo, hi) = self.params[ParamId::Resonance.index()].range();
        let resonance = (self.param(ParamId::Resonance).value() + self.resonance_lfo.output()).clamp(lo, hi);
        let gain = (self.param(ParamId::Gain).value() + self.gain_lfo.output()).clamp(0.0, GAIN_MAX);

        if resonance != self.pushed_resonance {
            // Inharmonic banks sit at their table radii up to the default
            // resonance and are pushed towards R_MAX above it
            let rest = ParamId::Resonance.descriptor().default;
            let amount = ((resonance - rest) / (hi - rest)).clamp(0.0, 1.0);
            for slot in self.pool.iter_mut() {
                slot.harmonic.update_r(resonance);
                slot.inharmonic.modulate_r(amount);
            }
            self.pushed_resonance = resonance;
        }
        if gain != self.pushed_gain {
            for slot in self.pool.iter_mut() {
                slot.harmonic.update_gain(gain * slot.velocity);
                slot.inharmonic.modulate_gain(gain / GAIN_MAX * slot.velocity);
            }
            self.pushed_gain = gain;
        }
    }

    #[inline]
    fn tick(&mut self, input: f64) -> f64 {
        let excitation = self.mode.excitation();
        let inharmonic = self.mode.is_inharmonic();
        let ping_level = self.config.ping_level;

        let mut sum = 0.0;
        for slot in self.pool.iter_mut() {
            // Taken in every mode so a stale ping never outlives a mode switch
            let ping = std::mem::take(&mut slot.ping);
            let x = match excitation {
                Excitation::Impulse => {
                    if ping {
                        ping_level
                    } else {
                        0.0
                    }
                }
                Excitation::Noise => self.noise.next_sample() * slot.envelope.process(),
                Excitation::Input => input,
                Excitation::GatedInput => input * slot.envelope.process(),
            };
            sum += if inharmonic {
                slot.inharmonic.process(x)
            } else {
                slot.harmonic.process(x)
            };
        }
        self.stage.limit(sum / self.pool.len() as f64)
    }

    /// Silence all voices, restart the LFOs and the noise sequence. Parameter
    /// values are kept.
    pub fn reset(&mut self) {
        self.pool.reset();
        self.resonance_lfo.reset();
        self.gain_lfo.reset();
        self.noise.reseed(self.config.noise_seed);
        self.block_pos = 0;
    }

    // ── Introspection ───────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn param(&self, id: ParamId) -> &ParameterPage {
        &self.params[id.index()]
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// The synthesis mode the audio path is rendering with.
    pub fn mode(&self) -> SynthMode {
        self.mode
    }

    pub fn output_stage(&self) -> OutputStage {
        self.stage
    }

    pub fn preset(&self) -> usize {
        self.preset
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Resonance and gain as last pushed into the voices.
    pub fn levels(&self) -> (f64, f64) {
        (self.pushed_resonance, self.pushed_gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::Knob;

    fn engine() -> SynthEngine {
        SynthEngine::new(EngineConfig::default()).unwrap()
    }

    fn note(note: u8, velocity: u8) -> ControlEvent {
        ControlEvent::Midi(MidiMessage::NoteOn { channel: 1, note, velocity })
    }

    fn cc(controller: u8, value: u8) -> ControlEvent {
        ControlEvent::Midi(MidiMessage::ControlChange { channel: 1, controller, value })
    }

    fn run(e: &mut SynthEngine, n: usize) -> Vec<f64> {
        let mut out = vec![0.0; n];
        e.render(&[], &mut out);
        out
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            voices: 0,
            ..Default::default()
        };
        assert!(matches!(SynthEngine::new(config), Err(ConfigError::NoVoices)));
    }

    #[test]
    fn test_silent_without_notes() {
        let mut e = engine();
        assert!(run(&mut e, 4800).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_impulse_note_rings() {
        let mut e = engine();
        e.handle_event(note(57, 127));
        let out = run(&mut e, 4800);
        let peak = out.iter().fold(0.0f64, |m, s| m.max(s.abs()));
        assert!(peak > 1e-3, "peak {peak}");
        assert!(peak <= 1.0);
        assert!(!e.pool().voice(0).ping_pending());
    }

    #[test]
    fn test_note_retunes_both_banks() {
        let mut e = engine();
        e.handle_event(note(69, 100));
        let slot = e.pool().voice(0);
        assert_eq!(slot.harmonic().fundamental(), 440.0);
        assert_eq!(slot.inharmonic().fundamental(), 440.0);
        assert!((slot.velocity() - 100.0 / 127.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_velocity_is_ignored() {
        let mut e = engine();
        e.handle_event(note(60, 0));
        assert_eq!(e.pool().next_voice(), 0);
    }

    #[test]
    fn test_harmonic_velocity_scales_committed_gain() {
        let mut e = engine();
        let (_, gain) = e.levels();
        e.handle_event(note(60, 64));
        let expected = gain * 64.0 / 127.0;
        assert!((e.pool().voice(0).harmonic().gain() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cc_changes_apply_at_block_boundary() {
        let mut e = engine();
        // Gain default 1.0 of 0..2: CC 64 is within the catch window
        e.handle_event(cc(15, 64));
        let target = 64.0 / 127.0 * GAIN_MAX;
        assert!((e.param(ParamId::Gain).value() - target).abs() < 1e-12);
        assert_eq!(e.levels().1, 1.0, "not pushed before the next block");
        run(&mut e, 1);
        assert!((e.levels().1 - target).abs() < 1e-12);
    }

    #[test]
    fn test_knob_follows_page() {
        let mut e = engine();
        // Release default 0.5 of 0.01..4 exponential: position ≈ 0.35
        let pos = e.param(ParamId::Release).pot();
        e.handle_event(ControlEvent::KnobMoved { knob: Knob::B, position: pos + 0.01 });
        assert_eq!(e.param(ParamId::Release).value(), 0.5, "Envelope page is not active");

        e.handle_event(ControlEvent::PageEncoder(3));
        assert_eq!(e.page(), Page::Envelope);
        e.handle_event(ControlEvent::KnobMoved { knob: Knob::B, position: pos + 0.01 });
        assert!(e.param(ParamId::Release).value() > 0.5);
    }

    #[test]
    fn test_mode_button_cycles() {
        let mut e = engine();
        for expected in SynthMode::ALL.iter().cycle().skip(1).take(7) {
            e.handle_event(ControlEvent::ModeButton);
            run(&mut e, 48);
            assert_eq!(e.mode(), *expected);
        }
    }

    #[test]
    fn test_mode_cc_always_catches() {
        let mut e = engine();
        e.handle_event(cc(22, 127));
        run(&mut e, 48);
        assert_eq!(e.mode(), SynthMode::InharmonicNoise);
        e.handle_event(cc(22, 0));
        run(&mut e, 48);
        assert_eq!(e.mode(), SynthMode::Impulse);
    }

    #[test]
    fn test_preset_button_hot_swaps_every_voice() {
        let mut e = engine();
        e.handle_event(ControlEvent::PresetButton);
        run(&mut e, 1);
        assert_eq!(e.preset(), 1);
        for slot in e.pool().iter() {
            assert_eq!(slot.inharmonic().active_modes(), 4);
            assert_eq!(slot.inharmonic().modes()[3].fc(), 2443.0);
        }
    }

    #[test]
    fn test_noise_mode_is_gated() {
        let mut e = engine();
        e.handle_event(ControlEvent::ModeButton);
        run(&mut e, 48);
        assert_eq!(e.mode(), SynthMode::Noise);
        assert!(run(&mut e, 480).iter().all(|&s| s == 0.0), "idle envelopes pass no noise");
        e.handle_event(note(60, 127));
        assert!(run(&mut e, 480).iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_mode_change_mid_block_applies_to_note() {
        let mut e = engine();
        e.handle_event(ControlEvent::ModeButton);
        run(&mut e, 48);
        assert_eq!(e.mode(), SynthMode::Noise);

        run(&mut e, 10);
        e.handle_event(cc(22, 0));
        e.handle_event(note(57, 127));
        assert_eq!(e.mode(), SynthMode::Impulse);
        let peak = run(&mut e, 4800).iter().fold(0.0f64, |m, s| m.max(s.abs()));
        assert!(peak > 1e-3, "note lost across the mode switch: peak {peak}");
    }

    #[test]
    fn test_mid_block_switch_pings_inharmonic_bank() {
        let mut e = engine();
        run(&mut e, 10);
        e.handle_event(cc(22, 102));
        e.handle_event(note(57, 127));
        assert_eq!(e.mode(), SynthMode::InharmonicImpulse);

        // Same note in a bank that was inharmonic from the start
        let mut reference = engine();
        reference.handle_event(cc(22, 102));
        run(&mut reference, 10);
        reference.handle_event(note(57, 127));

        let out = run(&mut e, 4800);
        assert!(out.iter().any(|&s| s != 0.0));
        assert_eq!(out, run(&mut reference, 4800));
    }

    #[test]
    fn test_presets_play_table_resonances_at_defaults() {
        let mut e = engine();
        for name in ["Wood1", "Reso"] {
            let index = presets::find(name).unwrap();
            e.handle_event(cc(23, ParamId::Preset.cc_value(index as f64)));
            run(&mut e, 48);
            assert_eq!(e.preset(), index);

            let table = presets::preset(index);
            for slot in e.pool().iter() {
                let bank = slot.inharmonic();
                assert_eq!(bank.resonance_amount(), 0.0);
                for (mode, &i) in bank.modes().iter().zip(bank.table_indices()) {
                    assert!(
                        (mode.r() - table.modes[i].resonance).abs() < 1e-12,
                        "{name} mode {i}: {} vs {}",
                        mode.r(),
                        table.modes[i].resonance
                    );
                }
            }
        }

        // Resonance knob at the top pushes every radius to the ceiling
        e.handle_event(cc(14, 127));
        run(&mut e, 48);
        for slot in e.pool().iter() {
            assert_eq!(slot.inharmonic().resonance_amount(), 1.0);
            assert!(slot.inharmonic().modes().iter().all(|m| (m.r() - crate::filters::R_MAX).abs() < 1e-12));
        }
    }

    #[test]
    fn test_external_mode_passes_input() {
        let mut e = engine();
        e.handle_event(cc(22, 51)); // 51/127·5 ≈ 2.0 -> External
        let input: Vec<f64> = (0..4800).map(|i| (i as f64 * 0.05).sin() * 0.1).collect();
        let mut out = vec![0.0; input.len()];
        e.render(&input, &mut out);
        assert_eq!(e.mode(), SynthMode::External);
        assert!(out.iter().any(|&s| s.abs() > 1e-6));
    }

    #[test]
    fn test_output_is_hard_limited() {
        let mut e = engine();
        e.handle_event(cc(22, 51));
        let input = vec![1.0; 9600];
        let mut out = vec![0.0; input.len()];
        e.render(&input, &mut out);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_render_stereo_duplicates() {
        let mut e = engine();
        e.handle_event(note(60, 127));
        let mut left = vec![0.0; 256];
        let mut right = vec![0.0; 256];
        e.render_stereo(&[], &mut left, &mut right);
        assert_eq!(left, right);
    }

    #[test]
    fn test_reset_silences() {
        let mut e = engine();
        e.handle_event(note(60, 127));
        run(&mut e, 100);
        e.reset();
        assert!(run(&mut e, 480).iter().all(|&s| s == 0.0));
    }
}
