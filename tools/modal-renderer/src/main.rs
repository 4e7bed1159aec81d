//! Modal Renderer: offline WAV renderer and mode-table inspector for the
//! modalres engine.
//!
//! Usage:
//!   modal-renderer note [-n 60,64] [-v 100] [-d 2.0] [--mode impulse] [-o out.wav]
//!   modal-renderer midi song.mid [--tail 3.0] [-o song.wav]
//!   modal-renderer modes [-n 60] [--preset marimba] [--json]

mod midi;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use modalres_dsp::controls::{midi_to_freq, ControlEvent, MidiMessage, OutputStage, ParamId, SynthMode};
use modalres_dsp::harmonic::{HarmonicParams, HarmonicVoice};
use modalres_dsp::inharmonic::InharmonicVoice;
use modalres_dsp::presets::{self, PRESETS};
use modalres_dsp::{EngineConfig, SynthEngine};

#[derive(Parser)]
#[command(name = "modal-renderer")]
#[command(version, about = "Render the modalres engine to WAV files", long_about = None)]
struct Cli {
    /// Engine configuration (JSON); missing fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the sample rate
    #[arg(long, global = true)]
    sample_rate: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one file per note x velocity
    Note {
        /// MIDI note(s)
        #[arg(short, long, value_delimiter = ',', default_value = "60")]
        note: Vec<u8>,

        /// Velocity(ies), 1-127
        #[arg(short, long, value_delimiter = ',', default_value = "100")]
        velocity: Vec<u8>,

        /// Duration in seconds
        #[arg(short, long, default_value_t = 2.0)]
        duration: f64,

        #[command(flatten)]
        voicing: Voicing,

        #[command(flatten)]
        output: Output,
    },

    /// Render a Standard MIDI File
    Midi {
        file: PathBuf,

        /// Seconds rendered after the last event
        #[arg(long, default_value_t = 3.0)]
        tail: f64,

        #[command(flatten)]
        voicing: Voicing,

        #[command(flatten)]
        output: Output,
    },

    /// Print the mode table a note would play
    Modes {
        #[arg(short, long, default_value_t = 60)]
        note: u8,

        /// Inharmonic preset name; harmonic layout when omitted
        #[arg(long)]
        preset: Option<String>,

        #[arg(long, default_value_t = 0.00001)]
        stiffness: f64,

        #[arg(long, default_value_t = 2)]
        beta: u32,

        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct Voicing {
    #[arg(long, value_enum, default_value_t = Mode::Impulse)]
    mode: Mode,

    /// Inharmonic preset name (see `modes --help`)
    #[arg(long)]
    preset: Option<String>,

    #[arg(long, value_enum, default_value_t = Stage::Identity)]
    stage: Stage,

    /// Controller changes sent before the first note, as CC=VALUE. They go
    /// through the same pickup gate as live MIDI.
    #[arg(long = "cc", value_parser = parse_cc)]
    ccs: Vec<(u8, u8)>,

    /// Mono WAV fed to the external input
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(clap::Args)]
struct Output {
    /// Output WAV file (single render only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output directory for batch renders
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Write two duplicated channels instead of one
    #[arg(long)]
    stereo: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Impulse,
    Noise,
    External,
    ExternalGated,
    InharmonicImpulse,
    InharmonicNoise,
}

impl From<Mode> for SynthMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Impulse => SynthMode::Impulse,
            Mode::Noise => SynthMode::Noise,
            Mode::External => SynthMode::External,
            Mode::ExternalGated => SynthMode::ExternalGated,
            Mode::InharmonicImpulse => SynthMode::InharmonicImpulse,
            Mode::InharmonicNoise => SynthMode::InharmonicNoise,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Stage {
    Identity,
    ExpSoftClip,
    Tanh,
    Atan,
}

impl From<Stage> for OutputStage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Identity => OutputStage::Identity,
            Stage::ExpSoftClip => OutputStage::ExpSoftClip,
            Stage::Tanh => OutputStage::Tanh,
            Stage::Atan => OutputStage::Atan,
        }
    }
}

fn parse_cc(s: &str) -> Result<(u8, u8), String> {
    let (cc, value) = s.split_once('=').ok_or_else(|| format!("expected CC=VALUE, got '{s}'"))?;
    let cc = cc.trim().parse::<u8>().map_err(|e| format!("bad controller '{cc}': {e}"))?;
    let value = value.trim().parse::<u8>().map_err(|e| format!("bad value '{value}': {e}"))?;
    if cc > 127 || value > 127 {
        return Err(format!("'{s}' out of MIDI range"));
    }
    Ok((cc, value))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.sample_rate)?;

    match cli.command {
        Command::Note {
            note,
            velocity,
            duration,
            voicing,
            output,
        } => cmd_note(&config, &note, &velocity, duration, &voicing, &output),
        Command::Midi {
            file,
            tail,
            voicing,
            output,
        } => cmd_midi(&config, &file, tail, &voicing, &output),
        Command::Modes {
            note,
            preset,
            stiffness,
            beta,
            json,
        } => cmd_modes(&config, note, preset.as_deref(), stiffness, beta, json),
    }
}

fn load_config(path: Option<&Path>, sample_rate: Option<f64>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(sr) = sample_rate {
        config.sample_rate = sr;
    }
    config.validate()?;
    Ok(config)
}

fn find_preset(name: &str) -> Result<usize> {
    match presets::find(name) {
        Some(index) => Ok(index),
        None => {
            let names: Vec<&str> = PRESETS.iter().map(|p| p.name).collect();
            bail!("unknown preset '{name}' (available: {})", names.join(", "))
        }
    }
}

/// Build an engine and put it into the requested voicing.
fn voiced_engine(config: &EngineConfig, voicing: &Voicing) -> Result<SynthEngine> {
    let mut engine = SynthEngine::new(config.clone())?;
    let channel = config.midi_channel;
    let cc = |controller, value| ControlEvent::Midi(MidiMessage::ControlChange { channel, controller, value });

    let mode = SynthMode::from(voicing.mode);
    engine.handle_event(cc(ParamId::Mode.descriptor().cc, ParamId::Mode.cc_value(mode.index() as f64)));
    let stage = OutputStage::from(voicing.stage);
    engine.handle_event(cc(
        ParamId::OutputStage.descriptor().cc,
        ParamId::OutputStage.cc_value(stage.index() as f64),
    ));
    if let Some(name) = &voicing.preset {
        let index = find_preset(name)?;
        engine.handle_event(cc(ParamId::Preset.descriptor().cc, ParamId::Preset.cc_value(index as f64)));
    }
    for &(controller, value) in &voicing.ccs {
        engine.handle_event(cc(controller, value));
    }
    for id in ParamId::ALL {
        let param = engine.param(id);
        tracing::debug!(
            "{:<20} {:>12.6} ({:.3} of range)",
            id.descriptor().name,
            param.value(),
            param.normalized()
        );
    }
    Ok(engine)
}

fn cmd_note(
    config: &EngineConfig,
    notes: &[u8],
    velocities: &[u8],
    duration: f64,
    voicing: &Voicing,
    output: &Output,
) -> Result<()> {
    if notes.iter().any(|&n| n > 127) {
        bail!("MIDI notes must be 0-127");
    }
    if velocities.iter().any(|&v| v == 0 || v > 127) {
        bail!("velocities must be 1-127");
    }
    let input = read_input(voicing.input.as_deref())?;
    let single = notes.len() == 1 && velocities.len() == 1;
    let num_samples = (duration * config.sample_rate) as usize;

    for &note in notes {
        for &vel in velocities {
            let path = match &output.output {
                Some(path) if single => path.clone(),
                _ => output
                    .output_dir
                    .join(format!("modal_{}_v{vel}.wav", midi_note_name(note))),
            };
            tracing::info!(
                "rendering MIDI {note} ({}) vel={vel} dur={duration}s -> {}",
                midi_note_name(note),
                path.display()
            );

            let mut engine = voiced_engine(config, voicing)?;
            engine.handle_event(ControlEvent::Midi(MidiMessage::NoteOn {
                channel: config.midi_channel,
                note,
                velocity: vel,
            }));
            let mut samples = vec![0.0; num_samples];
            engine.render(&input, &mut samples);

            report_peak(&samples);
            write_wav(&path, &samples, config.sample_rate as u32, output.stereo)?;
        }
    }
    Ok(())
}

fn cmd_midi(config: &EngineConfig, file: &Path, tail: f64, voicing: &Voicing, output: &Output) -> Result<()> {
    let events = midi::load(file)?;
    let input = read_input(voicing.input.as_deref())?;
    let end = events.last().map_or(0.0, |e| e.time) + tail.max(0.0);
    let num_samples = (end * config.sample_rate) as usize;
    tracing::info!("{} events, {end:.2}s from {}", events.len(), file.display());

    let mut engine = voiced_engine(config, voicing)?;
    let mut samples = vec![0.0; num_samples];
    let mut pos = 0;
    for timed in &events {
        let at = ((timed.time * config.sample_rate) as usize).min(num_samples);
        if at > pos {
            engine.render(input_span(&input, pos, at), &mut samples[pos..at]);
            pos = at;
        }
        engine.handle_event(timed.event);
    }
    engine.render(input_span(&input, pos, num_samples), &mut samples[pos..]);

    let path = output.output.clone().unwrap_or_else(|| {
        let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("midi");
        output.output_dir.join(format!("{stem}.wav"))
    });
    report_peak(&samples);
    write_wav(&path, &samples, config.sample_rate as u32, output.stereo)?;
    tracing::info!("written {}", path.display());
    Ok(())
}

fn cmd_modes(
    config: &EngineConfig,
    note: u8,
    preset: Option<&str>,
    stiffness: f64,
    beta: u32,
    json: bool,
) -> Result<()> {
    let fc = midi_to_freq(note.min(127));
    let (label, rows): (String, Vec<(usize, f64, f64, f64)>) = match preset {
        Some(name) => {
            let index = find_preset(name)?;
            let voice = InharmonicVoice::new(config.sample_rate, fc, presets::preset(index));
            let rows = voice
                .table_indices()
                .iter()
                .zip(voice.modes())
                .map(|(&i, m)| (i, m.fc(), m.r(), m.gain()))
                .collect();
            (presets::preset(index).name.to_string(), rows)
        }
        None => {
            let params = HarmonicParams {
                fundamental_hz: fc,
                stiffness,
                beta,
                ..Default::default()
            };
            let voice = HarmonicVoice::new(config.partials, config.sample_rate, &params);
            let rows = voice
                .harmonic_indices()
                .iter()
                .zip(voice.modes())
                .map(|(&i, m)| (i, m.fc(), m.r(), m.gain()))
                .collect();
            (format!("harmonic (stiffness {stiffness}, beta {beta})"), rows)
        }
    };

    if json {
        let modes: Vec<_> = rows
            .iter()
            .map(|&(index, freq, r, gain)| serde_json::json!({ "index": index, "freq": freq, "r": r, "gain": gain }))
            .collect();
        let doc = serde_json::json!({
            "note": note,
            "fundamental": fc,
            "sample_rate": config.sample_rate,
            "layout": label,
            "modes": modes,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("MIDI {note} ({}) {fc:.3} Hz, {label}", midi_note_name(note));
        println!("{:>5}  {:>12}  {:>9}  {:>8}", "index", "freq (Hz)", "r", "gain");
        for (index, freq, r, gain) in rows {
            println!("{index:>5}  {freq:>12.3}  {r:>9.6}  {gain:>8.4}");
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<Vec<f64>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let mut reader = hound::WavReader::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().map(|s| s.map(f64::from)).collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<Result<_, _>>()?
        }
    };
    // First channel only
    Ok(interleaved.into_iter().step_by(channels).collect())
}

/// `input[from..to]`, cut short where the input runs out.
fn input_span(input: &[f64], from: usize, to: usize) -> &[f64] {
    let end = to.min(input.len());
    &input[from.min(end)..end]
}

fn report_peak(samples: &[f64]) {
    let peak = samples.iter().map(|x| x.abs()).fold(0.0f64, f64::max);
    tracing::info!("peak amplitude: {peak:.6} ({:.1} dBFS)", 20.0 * peak.log10());
}

fn write_wav(path: &Path, samples: &[f64], sample_rate: u32, stereo: bool) -> Result<()> {
    let spec = hound::WavSpec {
        channels: if stereo { 2 } else { 1 },
        sample_rate,
        bits_per_sample: 24,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).with_context(|| format!("failed to create {}", path.display()))?;
    let scale = (1 << 23) as f64 - 1.0;
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * scale) as i32;
        writer.write_sample(v)?;
        if stereo {
            writer.write_sample(v)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

fn midi_note_name(midi: u8) -> String {
    let names = ["C", "Cs", "D", "Ds", "E", "F", "Fs", "G", "Gs", "A", "As", "B"];
    let octave = (midi / 12) as i32 - 1;
    format!("{}{}", names[(midi % 12) as usize], octave)
}
