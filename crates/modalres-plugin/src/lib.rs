// modalres: polyphonic modal resonator instrument plugin (CLAP + VST3).

use modalres_dsp::controls::{ControlEvent, Knob, MidiMessage, Page};
use modalres_dsp::{EngineConfig, SynthEngine};
use nih_plug::prelude::*;
use nih_plug::util::permit_alloc;
use std::num::NonZeroU32;
use std::sync::Arc;

mod params;
use params::ModalresParams;

const MAX_BLOCK_SIZE: usize = 8192;

/// Last surface state forwarded to the engine, for change and edge detection.
struct SurfaceState {
    knob_a: f32,
    knob_b: f32,
    next_preset: bool,
    next_mode: bool,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            // NaN never compares equal, so the first block always reports
            knob_a: f32::NAN,
            knob_b: f32::NAN,
            next_preset: false,
            next_mode: false,
        }
    }
}

struct Modalres {
    params: Arc<ModalresParams>,
    engine: Option<SynthEngine>,
    surface: SurfaceState,
    has_input: bool,

    // Pre-allocated scratch buffers
    in_buf: Vec<f64>,
    out_buf: Vec<f64>,
}

impl Default for Modalres {
    fn default() -> Self {
        Self {
            params: Arc::new(ModalresParams::default()),
            engine: None,
            surface: SurfaceState::default(),
            has_input: false,
            in_buf: vec![0.0; MAX_BLOCK_SIZE],
            out_buf: vec![0.0; MAX_BLOCK_SIZE],
        }
    }
}

/// Translate a host note event into an engine event. Host channels are
/// 0-based, the engine's are 1-based.
fn to_control_event(event: &NoteEvent<()>) -> Option<ControlEvent> {
    match *event {
        NoteEvent::NoteOn {
            channel, note, velocity, ..
        } => Some(ControlEvent::Midi(MidiMessage::NoteOn {
            channel: channel + 1,
            note,
            velocity: ((velocity * 127.0).round().clamp(0.0, 127.0) as u8).max(1),
        })),
        NoteEvent::MidiCC { channel, cc, value, .. } => Some(ControlEvent::Midi(MidiMessage::ControlChange {
            channel: channel + 1,
            controller: cc,
            value: (value * 127.0).round().clamp(0.0, 127.0) as u8,
        })),
        _ => None,
    }
}

fn handle_note_event(engine: &mut SynthEngine, event: &NoteEvent<()>) {
    if let Some(event) = to_control_event(event) {
        // Control-rate work: may log
        permit_alloc(|| engine.handle_event(event));
    }
}

/// Turn host parameter state into the events a hardware surface would send.
fn forward_surface(params: &ModalresParams, surface: &mut SurfaceState, engine: &mut SynthEngine) {
    let mut events: [Option<ControlEvent>; 5] = [None; 5];

    let page = Page::from(params.page.value());
    if page != engine.page() {
        events[0] = Some(ControlEvent::PageEncoder(page.index() as i32 - engine.page().index() as i32));
    }
    let knob_a = params.knob_a.value();
    if knob_a != surface.knob_a {
        surface.knob_a = knob_a;
        events[1] = Some(ControlEvent::KnobMoved {
            knob: Knob::A,
            position: knob_a as f64,
        });
    }
    let knob_b = params.knob_b.value();
    if knob_b != surface.knob_b {
        surface.knob_b = knob_b;
        events[2] = Some(ControlEvent::KnobMoved {
            knob: Knob::B,
            position: knob_b as f64,
        });
    }
    let next_preset = params.next_preset.value();
    if next_preset && !surface.next_preset {
        events[3] = Some(ControlEvent::PresetButton);
    }
    surface.next_preset = next_preset;
    let next_mode = params.next_mode.value();
    if next_mode && !surface.next_mode {
        events[4] = Some(ControlEvent::ModeButton);
    }
    surface.next_mode = next_mode;

    for event in events.into_iter().flatten() {
        permit_alloc(|| engine.handle_event(event));
    }
}

impl Plugin for Modalres {
    const NAME: &'static str = "modalres";
    const VENDOR: &'static str = "modalres";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: None,
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::MidiCCs;
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.has_input = audio_io_layout.main_input_channels.is_some();

        let config = EngineConfig::with_sample_rate(buffer_config.sample_rate as f64);
        match SynthEngine::new(config) {
            Ok(engine) => self.engine = Some(engine),
            Err(err) => {
                nih_log!("modalres: cannot start engine: {err}");
                return false;
            }
        }
        self.surface = SurfaceState::default();

        // Ensure buffers are large enough
        let max_samples = buffer_config.max_buffer_size as usize;
        if self.out_buf.len() < max_samples {
            self.in_buf.resize(max_samples, 0.0);
            self.out_buf.resize(max_samples, 0.0);
        }

        nih_log!(
            "modalres: {} Hz, input {}",
            buffer_config.sample_rate,
            if self.has_input { "connected" } else { "none" }
        );
        true
    }

    fn reset(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.reset();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let Some(engine) = self.engine.as_mut() else {
            return ProcessStatus::Normal;
        };
        let num_samples = buffer.samples();

        forward_surface(&self.params, &mut self.surface, engine);

        // Input shares storage with the first output channel: copy it out
        // before anything is written back
        let input = &mut self.in_buf[..num_samples];
        match buffer.as_slice().first() {
            Some(channel) if self.has_input => {
                for (dst, src) in input.iter_mut().zip(channel.iter()) {
                    *dst = *src as f64;
                }
            }
            _ => input.fill(0.0),
        }

        // Event-splitting loop: notes land on their sample offset
        let mut next_event = context.next_event();
        let mut block_start: usize = 0;

        while block_start < num_samples {
            loop {
                match next_event {
                    Some(ref event) if (event.timing() as usize) <= block_start => {
                        handle_note_event(engine, event);
                        next_event = context.next_event();
                    }
                    _ => break,
                }
            }

            let block_end = match next_event {
                Some(ref event) => (event.timing() as usize).min(num_samples),
                None => num_samples,
            };

            if block_end > block_start {
                engine.render(
                    &self.in_buf[block_start..block_end],
                    &mut self.out_buf[block_start..block_end],
                );
            }
            block_start = block_end;
        }

        while let Some(event) = next_event {
            handle_note_event(engine, &event);
            next_event = context.next_event();
        }

        // Mono engine output duplicated to every channel
        for (i, mut channel_samples) in buffer.iter_samples().enumerate() {
            let volume = self.params.volume.smoothed.next() as f64;
            let sample = (self.out_buf[i] * volume) as f32;
            for s in channel_samples.iter_mut() {
                *s = sample;
            }
        }

        ProcessStatus::Normal
    }
}

impl ClapPlugin for Modalres {
    const CLAP_ID: &'static str = "com.modalres.modal-resonator";
    const CLAP_DESCRIPTION: Option<&'static str> = Some("Polyphonic modal resonator synthesizer");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::Instrument,
        ClapFeature::Synthesizer,
        ClapFeature::Mono,
        ClapFeature::Custom("physical-modeling"),
    ];
}

impl Vst3Plugin for Modalres {
    const VST3_CLASS_ID: [u8; 16] = *b"ModalresResonatr";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Instrument, Vst3SubCategory::Synth];
}

nih_export_clap!(Modalres);
nih_export_vst3!(Modalres);
