//! Fixed-size voice pool with round-robin assignment.
//!
//! Each slot carries both a harmonic and an inharmonic voice, kept tuned in
//! parallel so switching synthesis mode never needs a retrigger. Only the
//! bank selected by the current mode is rendered.

use crate::envelope::Envelope;
use crate::harmonic::{HarmonicParams, HarmonicVoice};
use crate::inharmonic::InharmonicVoice;
use crate::presets::Preset;

pub struct VoiceSlot {
    pub(crate) harmonic: HarmonicVoice,
    pub(crate) inharmonic: InharmonicVoice,
    pub(crate) envelope: Envelope,
    /// Impulse waiting to be injected on the next sample.
    pub(crate) ping: bool,
    /// Last note-on velocity, 0..1.
    pub(crate) velocity: f64,
}

impl VoiceSlot {
    pub fn harmonic(&self) -> &HarmonicVoice {
        &self.harmonic
    }

    pub fn inharmonic(&self) -> &InharmonicVoice {
        &self.inharmonic
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn ping_pending(&self) -> bool {
        self.ping
    }

    fn reset(&mut self) {
        self.harmonic.reset();
        self.inharmonic.reset();
        self.envelope.reset();
        self.ping = false;
    }
}

pub struct VoicePool {
    slots: Vec<VoiceSlot>,
    next_voice: usize,
}

impl VoicePool {
    pub fn new(
        voices: usize,
        partials: usize,
        sample_rate: f64,
        harmonic: &HarmonicParams,
        preset: &Preset,
        envelope: (f64, f64),
    ) -> Self {
        let slots = (0..voices)
            .map(|_| VoiceSlot {
                harmonic: HarmonicVoice::new(partials, sample_rate, harmonic),
                inharmonic: InharmonicVoice::new(sample_rate, harmonic.fundamental_hz, preset),
                envelope: Envelope::new(envelope.0, envelope.1, sample_rate),
                ping: false,
                velocity: 1.0,
            })
            .collect();
        Self { slots, next_voice: 0 }
    }

    /// Claim the voice under the cursor and advance it, wrapping.
    pub fn assign(&mut self) -> usize {
        let idx = self.next_voice;
        self.next_voice = (self.next_voice + 1) % self.slots.len();
        idx
    }

    pub fn next_voice(&self) -> usize {
        self.next_voice
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn voice(&self, idx: usize) -> &VoiceSlot {
        &self.slots[idx]
    }

    pub(crate) fn voice_mut(&mut self, idx: usize) -> &mut VoiceSlot {
        &mut self.slots[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoiceSlot> {
        self.slots.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut VoiceSlot> {
        self.slots.iter_mut()
    }

    /// Silence every voice and rewind the cursor.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
        self.next_voice = 0;
    }
}
