use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio::WaveShape;

pub const MIN_FREQUENCY: f32 = 20.0;
pub const MAX_FREQUENCY: f32 = 20_000.0;
pub const MIN_GAIN: f32 = 0.001;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

// fancy atomic counter; ids stay unique even across stores
pub fn next_event_id() -> EventId {
    EventId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// One placed note on the step grid.
///
/// `step` and `id` are fixed at creation. Only `frequency` and `gain` can be
/// changed afterwards, and only through the pattern store.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    id: EventId,
    step: usize,
    frequency: f32,
    base_frequency: f32,
    gain: f32,
    duration: f32,
    color: String,
    wave_shape: WaveShape,
}

// Partial update coming from a drag gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EventParams {
    pub gain: Option<f32>,
    pub frequency: Option<f32>,
}

impl Event {
    pub(crate) fn new(
        step: usize,
        frequency: f32,
        gain: f32,
        duration: f32,
        color: String,
        wave_shape: WaveShape,
    ) -> Self {
        let frequency = clamp_frequency(frequency);
        Self {
            id: next_event_id(),
            step,
            frequency,
            base_frequency: frequency,
            gain: clamp_gain(gain),
            duration: duration.max(0.001),
            color,
            wave_shape,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn base_frequency(&self) -> f32 {
        self.base_frequency
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn wave_shape(&self) -> WaveShape {
        self.wave_shape
    }

    pub(crate) fn apply(&mut self, params: EventParams) {
        if let Some(gain) = params.gain {
            self.gain = clamp_gain(gain);
        }
        if let Some(frequency) = params.frequency {
            self.frequency = clamp_frequency(frequency);
        }
    }

    // relative drag: pitch moves around the anchor, never away from it
    pub(crate) fn bend(&mut self, semitones: f32) {
        self.frequency = clamp_frequency(self.base_frequency * 2f32.powf(semitones / 12.0));
    }
}

fn clamp_frequency(f: f32) -> f32 {
    if f.is_finite() { f.clamp(MIN_FREQUENCY, MAX_FREQUENCY) } else { MIN_FREQUENCY }
}

fn clamp_gain(g: f32) -> f32 {
    if g.is_finite() { g.clamp(MIN_GAIN, 1.0) } else { MIN_GAIN }
}
