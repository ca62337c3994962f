// Everything mutable about one running sequencer, in one place. The host loop
// owns a Session and calls into it for input and for polling; nothing here is
// global and nothing here locks.
use std::time::Instant;

use crate::audio::{AudioClock, AudioContext, WaveShape};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::pipeline::{Event, EventId, EventParams, PatternSnapshot, PatternStore};
use crate::scheduler::TransportState;
use crate::sink::VisualSink;
use crate::synth::ToneSynth;
use crate::transport::Transport;

pub struct Session {
    pattern: PatternStore,
    synth: ToneSynth,
    transport: Transport,
    rng: fastrand::Rng,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            pattern: PatternStore::new(config.step_count(), config.pattern.clone()),
            synth: ToneSynth::new(config.synth.clone()),
            transport: Transport::new(&config.scheduler),
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(config: &SessionConfig, seed: u64) -> Self {
        let mut session = Self::new(config);
        session.rng = fastrand::Rng::with_seed(seed);
        session
    }

    pub fn attach_audio(&mut self, context: AudioContext) {
        self.synth.attach(context);
    }

    pub fn audio_now(&self) -> Option<f64> {
        self.synth.context().map(|c| c.clock().now())
    }

    pub fn pattern(&self) -> &PatternStore {
        &self.pattern
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_running(&self) -> bool {
        self.transport.is_running()
    }

    // -- input layer --

    pub fn place_event(&mut self, step_hint: i64, frequency: f32, gain: f32) -> Result<Event, SessionError> {
        self.pattern.place(step_hint, frequency, gain).cloned()
    }

    pub fn update_event_params(&mut self, id: EventId, params: EventParams) -> Option<Event> {
        self.pattern.update(id, params).cloned()
    }

    pub fn bend_event(&mut self, id: EventId, semitones: f32) -> Option<Event> {
        self.pattern.bend(id, semitones).cloned()
    }

    pub fn remove_all_events(&mut self) {
        self.pattern.clear();
    }

    pub fn randomize(&mut self, count: usize) -> usize {
        self.pattern.randomize(count, &mut self.rng)
    }

    pub fn set_tempo(&mut self, bpm: u32) -> u32 {
        self.pattern.set_tempo(bpm)
    }

    pub fn set_wave_shape(&mut self, shape: WaveShape) {
        self.pattern.set_wave_shape(shape);
    }

    pub fn set_delay_enabled(&mut self, enabled: bool) {
        self.synth.set_delay_enabled(enabled);
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        self.synth.set_reverb_enabled(enabled);
    }

    pub fn delay_enabled(&self) -> bool {
        self.synth.routing().delay
    }

    pub fn reverb_enabled(&self) -> bool {
        self.synth.routing().reverb
    }

    // -- transport --

    // The engine has to exist first: without a clock there is nothing to
    // schedule against, so this refuses instead of starting a dead loop.
    pub fn start(&mut self, wall_now: Instant) -> Result<(), SessionError> {
        let audio_now = self.audio_now().ok_or(SessionError::EngineUnavailable)?;
        if self.transport.start(audio_now, wall_now) {
            log::info!("transport started at {audio_now:.3}s, tempo {}", self.pattern.tempo());
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.transport.stop() {
            log::info!("transport stopped on step {}", self.transport.state().current_step);
        }
    }

    // Called by the host loop as often as it likes; ticks the scheduler only
    // when the poll cadence says so.
    pub fn pump(&mut self, wall_now: Instant, sink: &mut dyn VisualSink) -> usize {
        if !self.transport.poll_due(wall_now) {
            return 0;
        }
        self.tick(sink)
    }

    // One scheduler pass, ignoring the wall-clock cadence.
    pub fn tick(&mut self, sink: &mut dyn VisualSink) -> usize {
        if !self.transport.is_running() {
            return 0;
        }
        let context = self.synth.context().cloned();
        let clock = context.as_ref().map(|c| c.clock() as &dyn AudioClock);
        self.transport
            .scheduler_mut()
            .tick(clock, &self.pattern, &mut self.synth, sink)
    }

    // -- export --

    pub fn export(&self) -> PatternSnapshot {
        self.pattern.snapshot()
    }

    pub fn restore(&mut self, snapshot: &PatternSnapshot) {
        self.pattern.restore(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OfflineRenderer;
    use crate::config::EffectsConfig;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        fired: Vec<(EventId, usize, f64)>,
    }

    impl VisualSink for RecordingSink {
        fn on_event_fired(&mut self, event: &Event, latency_secs: f64) {
            self.fired.push((event.id(), event.step(), latency_secs));
        }
    }

    fn session_with_audio() -> (Session, OfflineRenderer) {
        let renderer = OfflineRenderer::new(8000, &EffectsConfig::default(), 5).unwrap();
        let mut session = Session::with_seed(&SessionConfig::default(), 11);
        session.attach_audio(renderer.context());
        (session, renderer)
    }

    #[test]
    fn start_requires_an_engine() {
        let mut session = Session::new(&SessionConfig::default());
        assert_eq!(session.start(Instant::now()), Err(SessionError::EngineUnavailable));
        assert!(!session.is_running());
        assert_eq!(session.tick(&mut RecordingSink::default()), 0);
    }

    #[test]
    fn double_start_keeps_one_polling_loop() {
        let (mut session, mut renderer) = session_with_audio();
        let id = session.place_event(0, 440.0, 0.5).unwrap().id();
        let wall = Instant::now();
        let mut sink = RecordingSink::default();

        session.start(wall).unwrap();
        renderer.render(80); // 10 ms, step 0 (at 0.1 s) is now inside the window
        session.pump(wall, &mut sink);
        session.start(wall).unwrap();
        session.pump(wall, &mut sink);
        session.pump(wall + Duration::from_millis(5), &mut sink);

        assert_eq!(sink.fired.len(), 1);
        assert_eq!(sink.fired[0].0, id);
        assert!((sink.fired[0].2 - 0.09).abs() < 1e-9);
    }

    #[test]
    fn stop_then_start_restarts_from_step_zero() {
        let (mut session, mut renderer) = session_with_audio();
        let mut sink = RecordingSink::default();
        session.start(Instant::now()).unwrap();
        for _ in 0..20 {
            renderer.render(200); // 25 ms at 8 kHz
            session.tick(&mut sink);
        }
        assert!(session.transport_state().current_step > 0);

        session.stop();
        assert_eq!(session.tick(&mut sink), 0);
        session.start(Instant::now()).unwrap();
        let state = session.transport_state();
        assert_eq!(state.current_step, 0);
        assert!((state.next_step_time - (0.5 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn no_tick_after_stop() {
        let (mut session, _renderer) = session_with_audio();
        session.place_event(0, 440.0, 0.5).unwrap();
        let wall = Instant::now();
        let mut sink = RecordingSink::default();
        session.start(wall).unwrap();
        session.stop();
        assert_eq!(session.pump(wall + Duration::from_secs(1), &mut sink), 0);
        assert!(sink.fired.is_empty());
    }

    #[test]
    fn dragging_never_moves_an_event() {
        let (mut session, _renderer) = session_with_audio();
        let placed = session.place_event(9, 300.0, 0.5).unwrap();
        let moved = session
            .update_event_params(placed.id(), EventParams { gain: Some(0.9), frequency: Some(600.0) })
            .unwrap();
        assert_eq!((moved.id(), moved.step()), (placed.id(), 9));
        let bent = session.bend_event(placed.id(), -12.0).unwrap();
        assert!((bent.frequency() - 150.0).abs() < 1e-3);
        assert_eq!(bent.step(), 9);
    }

    #[test]
    fn export_matches_live_pattern() {
        let (mut session, _renderer) = session_with_audio();
        session.place_event(1, 440.0, 0.5).unwrap();
        session.place_event(5, 550.0, 0.6).unwrap();
        session.randomize(3);
        let snapshot = session.export();
        assert_eq!(snapshot.events.len(), session.pattern().len());
        assert_eq!(snapshot.steps, 16);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("base"));
        // exporting doesn't touch the pattern
        assert_eq!(session.export(), snapshot);
    }

    #[test]
    fn effect_toggles_are_plain_flags() {
        let mut session = Session::new(&SessionConfig::default());
        session.set_delay_enabled(true);
        session.set_reverb_enabled(true);
        session.set_reverb_enabled(false);
        assert!(session.delay_enabled());
        assert!(!session.reverb_enabled());
    }
}
