//! Standard MIDI File -> time-stamped engine events.
//!
//! All tracks are merged onto one timeline. Tempo changes are honoured for
//! metrical files; timecode files use their fixed tick rate. Only note-ons
//! and controller changes are kept: the engine has no release model.

use anyhow::{anyhow, Context, Result};
use midly::{MetaMessage, Smf, Timing, TrackEventKind};
use std::path::Path;

use modalres_dsp::controls::{ControlEvent, MidiMessage};

const DEFAULT_US_PER_QUARTER: f64 = 500_000.0;

/// An engine event and when it happens, in seconds from the start.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedEvent {
    pub time: f64,
    pub event: ControlEvent,
}

pub fn load(path: &Path) -> Result<Vec<TimedEvent>> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let smf = Smf::parse(&data).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))?;
    Ok(events_from_smf(&smf))
}

enum Raw {
    Tempo(f64),
    Event(ControlEvent),
}

pub fn events_from_smf(smf: &Smf) -> Vec<TimedEvent> {
    // (absolute tick, payload)
    let mut raw: Vec<(u64, Raw)> = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u64;
        for event in track {
            tick += event.delta.as_int() as u64;
            let payload = match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(us)) => Raw::Tempo(us.as_int() as f64),
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int() + 1;
                    let msg = match message {
                        midly::MidiMessage::NoteOn { key, vel } => MidiMessage::NoteOn {
                            channel,
                            note: key.as_int(),
                            velocity: vel.as_int(),
                        },
                        midly::MidiMessage::Controller { controller, value } => MidiMessage::ControlChange {
                            channel,
                            controller: controller.as_int(),
                            value: value.as_int(),
                        },
                        _ => continue,
                    };
                    Raw::Event(ControlEvent::Midi(msg))
                }
                _ => continue,
            };
            raw.push((tick, payload));
        }
    }
    // Stable: simultaneous events keep their track order
    raw.sort_by_key(|(tick, _)| *tick);

    let seconds_per_tick = |us_per_quarter: f64| match smf.header.timing {
        Timing::Metrical(ppq) => us_per_quarter / 1e6 / ppq.as_int().max(1) as f64,
        Timing::Timecode(fps, ticks_per_frame) => 1.0 / (fps.as_f32() as f64 * ticks_per_frame.max(1) as f64),
    };

    let mut us_per_quarter = DEFAULT_US_PER_QUARTER;
    let mut last_tick = 0u64;
    let mut time = 0.0;
    let mut events = Vec::new();
    for (tick, payload) in raw {
        time += (tick - last_tick) as f64 * seconds_per_tick(us_per_quarter);
        last_tick = tick;
        match payload {
            Raw::Tempo(us) => us_per_quarter = us,
            Raw::Event(event) => events.push(TimedEvent { time, event }),
        }
    }
    events
}
