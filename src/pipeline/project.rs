// The pattern: placed events on a fixed-length step grid, plus the tempo.
// This is the only place events are created, changed or removed.

use crate::audio::WaveShape;
use crate::config::PatternConfig;
use crate::error::SessionError;

use super::event::{Event, EventId, EventParams};
use super::persistence::{EventSnapshot, PatternSnapshot};

// display tags handed to the visual side; one per column of the pad grid
const PALETTE: [&str; 8] = [
    "#ff5e5b", "#ffb347", "#ffed66", "#7bd389", "#00cecb", "#4d9de0", "#a06cd5", "#f78fb3",
];

// minor pentatonic, two octaves up from A3
const RANDOM_ROOT_HZ: f32 = 220.0;
const RANDOM_SCALE: [u8; 10] = [0, 3, 5, 7, 10, 12, 15, 17, 19, 22];

#[derive(Clone, Debug)]
pub struct PatternStore {
    events: Vec<Event>, // insertion order is dispatch order within a step
    tempo: u32,
    step_count: usize,
    wave_shape: WaveShape,
    config: PatternConfig,
}

impl PatternStore {
    pub fn new(step_count: usize, config: PatternConfig) -> Self {
        let mut store = Self {
            events: Vec::new(),
            tempo: config.tempo,
            step_count: step_count.max(1),
            wave_shape: config.wave_shape,
            config,
        };
        store.tempo = store.clamp_tempo(store.tempo);
        store
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    // Returns the tempo actually applied. Picked up by the scheduler on its
    // next step increment.
    pub fn set_tempo(&mut self, bpm: u32) -> u32 {
        self.tempo = self.clamp_tempo(bpm);
        self.tempo
    }

    fn clamp_tempo(&self, bpm: u32) -> u32 {
        let min = self.config.min_tempo.max(1);
        bpm.clamp(min, self.config.max_tempo.max(min))
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn wave_shape(&self) -> WaveShape {
        self.wave_shape
    }

    pub fn set_wave_shape(&mut self, shape: WaveShape) {
        self.wave_shape = shape;
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id() == id)
    }

    pub fn events_at(&self, step: usize) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.step() == step)
    }

    pub fn is_step_used(&self, step: usize) -> bool {
        self.events_at(step).next().is_some()
    }

    // Out-of-range hints wrap onto the grid instead of being rejected.
    pub fn place(&mut self, step_hint: i64, frequency: f32, gain: f32) -> Result<&Event, SessionError> {
        let step = step_hint.rem_euclid(self.step_count as i64) as usize;
        self.push(step, frequency, gain, self.config.note_duration_secs, self.wave_shape)
    }

    fn push(
        &mut self,
        step: usize,
        frequency: f32,
        gain: f32,
        duration: f32,
        wave_shape: WaveShape,
    ) -> Result<&Event, SessionError> {
        if self.events.len() >= self.config.max_events {
            log::warn!("pattern full, rejecting event on step {step}");
            return Err(SessionError::PatternFull { max: self.config.max_events });
        }
        let color = PALETTE[step % PALETTE.len()].to_string();
        let idx = self.events.len();
        self.events.push(Event::new(step, frequency, gain, duration, color, wave_shape));
        Ok(&self.events[idx])
    }

    pub fn update(&mut self, id: EventId, params: EventParams) -> Option<&Event> {
        let event = self.events.iter_mut().find(|e| e.id() == id)?;
        event.apply(params);
        Some(event)
    }

    pub fn bend(&mut self, id: EventId, semitones: f32) -> Option<&Event> {
        let event = self.events.iter_mut().find(|e| e.id() == id)?;
        event.bend(semitones);
        Some(event)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    // Adds up to `count` random notes; returns how many fit under the cap.
    pub fn randomize(&mut self, count: usize, rng: &mut fastrand::Rng) -> usize {
        let mut added = 0;
        for _ in 0..count {
            let step = rng.usize(..self.step_count);
            let semis = RANDOM_SCALE[rng.usize(..RANDOM_SCALE.len())] as f32;
            let frequency = RANDOM_ROOT_HZ * 2f32.powf(semis / 12.0);
            let gain = 0.3 + rng.f32() * 0.5;
            let duration = self.config.note_duration_secs;
            if self.push(step, frequency, gain, duration, self.wave_shape).is_err() {
                break;
            }
            added += 1;
        }
        added
    }

    pub fn snapshot(&self) -> PatternSnapshot {
        PatternSnapshot {
            tempo: self.tempo,
            steps: self.step_count,
            events: self
                .events
                .iter()
                .map(|e| EventSnapshot {
                    step: e.step(),
                    freq: e.frequency(),
                    gain: e.gain(),
                    duration: e.duration(),
                    color: e.color().to_string(),
                    wave_shape: e.wave_shape(),
                })
                .collect(),
        }
    }

    // Replaces the current events with the snapshot's. The grid size of this
    // session wins; steps from a differently-sized export wrap onto it.
    pub fn restore(&mut self, snapshot: &PatternSnapshot) {
        self.events.clear();
        self.tempo = self.clamp_tempo(snapshot.tempo);
        for saved in &snapshot.events {
            if self.events.len() >= self.config.max_events {
                log::warn!(
                    "pattern full, dropped {} saved events",
                    snapshot.events.len() - self.events.len()
                );
                break;
            }
            self.events.push(Event::new(
                saved.step % self.step_count,
                saved.freq,
                saved.gain,
                saved.duration,
                saved.color.clone(),
                saved.wave_shape,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PatternStore {
        PatternStore::new(16, PatternConfig::default())
    }

    #[test]
    fn place_wraps_step_into_range() {
        let mut s = store();
        assert_eq!(s.place(4, 440.0, 0.5).unwrap().step(), 4);
        assert_eq!(s.place(17, 440.0, 0.5).unwrap().step(), 1);
        assert_eq!(s.place(-1, 440.0, 0.5).unwrap().step(), 15);
        assert!(s.events().iter().all(|e| e.step() < s.step_count()));
    }

    #[test]
    fn placed_event_takes_defaults() {
        let mut s = store();
        s.set_wave_shape(WaveShape::Triangle);
        let e = s.place(2, 330.0, 0.7).unwrap().clone();
        assert_eq!(e.base_frequency(), 330.0);
        assert_eq!(e.duration(), 0.4);
        assert_eq!(e.wave_shape(), WaveShape::Triangle);
        assert_eq!(e.color(), PALETTE[2]);
    }

    #[test]
    fn tempo_is_clamped() {
        let mut s = store();
        assert_eq!(s.set_tempo(0), 40);
        assert_eq!(s.set_tempo(1000), 240);
        assert_eq!(s.set_tempo(133), 133);
    }

    #[test]
    fn update_keeps_step_and_id() {
        let mut s = store();
        let id = s.place(5, 440.0, 0.5).unwrap().id();
        let e = s.update(id, EventParams { gain: Some(0.25), frequency: None }).unwrap();
        assert_eq!((e.id(), e.step(), e.gain(), e.frequency()), (id, 5, 0.25, 440.0));
        assert!(s.bend(id, 7.0).unwrap().frequency() > 440.0);
    }

    #[test]
    fn unknown_id_is_ignored() {
        let mut s = store();
        let mut other = store();
        let id = other.place(0, 440.0, 0.5).unwrap().id();
        assert!(s.update(id, EventParams::default()).is_none());
        assert!(s.bend(id, 1.0).is_none());
    }

    #[test]
    fn events_at_keeps_insertion_order() {
        let mut s = store();
        let a = s.place(3, 200.0, 0.5).unwrap().id();
        s.place(4, 300.0, 0.5).unwrap();
        let b = s.place(3, 400.0, 0.5).unwrap().id();
        let ids: Vec<EventId> = s.events_at(3).map(|e| e.id()).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn cap_rejects_instead_of_evicting() {
        let config = PatternConfig { max_events: 2, ..PatternConfig::default() };
        let mut s = PatternStore::new(16, config);
        let first = s.place(0, 440.0, 0.5).unwrap().id();
        s.place(1, 440.0, 0.5).unwrap();
        assert_eq!(s.place(2, 440.0, 0.5).unwrap_err(), SessionError::PatternFull { max: 2 });
        assert_eq!(s.len(), 2);
        assert!(s.get(first).is_some());
        assert_eq!(s.randomize(5, &mut fastrand::Rng::with_seed(1)), 0);
    }

    #[test]
    fn randomize_stays_on_grid_and_scale() {
        let mut s = store();
        let added = s.randomize(32, &mut fastrand::Rng::with_seed(9));
        assert_eq!(added, 32);
        for e in s.events() {
            assert!(e.step() < 16);
            assert!((220.0..=880.0).contains(&e.frequency()));
            assert!((0.3..=0.8).contains(&e.gain()));
        }
    }

    #[test]
    fn snapshot_restore_rebuilds_pattern() {
        let mut s = store();
        s.set_tempo(90);
        let id = s.place(6, 500.0, 0.4).unwrap().id();
        s.bend(id, 2.0);
        let snap = s.snapshot();
        assert_eq!(snap.events.len(), s.len());

        let mut restored = store();
        restored.restore(&snap);
        assert_eq!(restored.tempo(), 90);
        assert_eq!(restored.snapshot(), snap);
        let e = &restored.events()[0];
        assert_ne!(e.id(), id);
        assert_eq!(e.base_frequency(), e.frequency()); // bent pitch becomes the new anchor
    }

    #[test]
    fn restore_wraps_foreign_grid_sizes() {
        let snap = PatternSnapshot {
            tempo: 120,
            steps: 32,
            events: vec![EventSnapshot {
                step: 20,
                freq: 440.0,
                gain: 0.5,
                duration: 0.3,
                color: "#000".into(),
                wave_shape: WaveShape::Sine,
            }],
        };
        let mut s = store();
        s.restore(&snap);
        assert_eq!(s.events()[0].step(), 4);
        assert_eq!(s.step_count(), 16);
    }

    #[test]
    fn clear_removes_everything() {
        let mut s = store();
        s.place(1, 440.0, 0.5).unwrap();
        s.clear();
        assert!(s.is_empty());
    }
}
