// The layer between key presses and the session: resolves input into
// session calls, keeps the pad lights in time with the audio and builds the
// DisplayState the TUI draws.
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::pipeline::persistence;
use crate::pipeline::{Event, EventId, EventParams};
use crate::session::Session;
use crate::shared::{DisplayState, InputEvent, LedState, NUM_PADS};
use crate::sink::VisualSink;
use crate::tasks::TaskRegistry;

const FLASH: Duration = Duration::from_millis(120);
const PLACE_GAIN: f32 = 0.6;
const PLACE_ROOT_HZ: f32 = 220.0;
const RANDOMIZE_COUNT: usize = 4;

// Lights currently flashing; counted so overlapping flashes on one pad
// don't switch each other off early. The playhead is the last step heard.
#[derive(Clone, Debug, Default)]
pub struct PadLights {
    flashing: [u8; NUM_PADS],
    playhead: Option<usize>,
}

impl PadLights {
    pub fn flash_on(&mut self, pad: usize) {
        self.flashing[pad] = self.flashing[pad].saturating_add(1);
    }

    pub fn flash_off(&mut self, pad: usize) {
        self.flashing[pad] = self.flashing[pad].saturating_sub(1);
    }

    pub fn is_flashing(&self, pad: usize) -> bool {
        self.flashing[pad] > 0
    }

    pub fn move_playhead(&mut self, step: usize) {
        self.playhead = Some(step);
    }

    pub fn playhead(&self) -> Option<usize> {
        self.playhead
    }

    pub fn reset(&mut self) {
        self.flashing = [0; NUM_PADS];
        self.playhead = None;
    }
}

// Turns dispatch notifications into deadline tasks, so a pad lights when
// its note is heard rather than when it was scheduled.
pub struct FlashSink<'a> {
    tasks: &'a mut TaskRegistry<PadLights>,
    wall_now: Instant,
}

impl<'a> FlashSink<'a> {
    pub fn new(tasks: &'a mut TaskRegistry<PadLights>, wall_now: Instant) -> Self {
        Self { tasks, wall_now }
    }

    fn sounding(&self, latency_secs: f64) -> Instant {
        self.wall_now + Duration::from_secs_f64(latency_secs.max(0.0))
    }
}

impl VisualSink for FlashSink<'_> {
    fn on_event_fired(&mut self, event: &Event, latency_secs: f64) {
        let pad = event.step();
        if pad >= NUM_PADS {
            return; // off the visible grid
        }
        let sounding = self.sounding(latency_secs);
        self.tasks.schedule(sounding, move |lights: &mut PadLights| lights.flash_on(pad));
        self.tasks.schedule(sounding + FLASH, move |lights: &mut PadLights| lights.flash_off(pad));
    }

    // each boundary carries its own time, so a tempo change can't skew the playhead
    fn on_step_scheduled(&mut self, step: usize, latency_secs: f64) {
        let sounding = self.sounding(latency_secs);
        self.tasks.schedule(sounding, move |lights: &mut PadLights| lights.move_playhead(step));
    }
}

pub struct Middle {
    pub session: Session,
    project_dir: PathBuf,
    last_placed: Option<EventId>,
    lights: PadLights,
    tasks: TaskRegistry<PadLights>,
    display_text: String,
}

impl Middle {
    pub fn new(session: Session, project_dir: PathBuf) -> Self {
        Self {
            session,
            project_dir,
            last_placed: None,
            lights: PadLights::default(),
            tasks: TaskRegistry::new(),
            display_text: String::new(),
        }
    }

    pub fn handle_input(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::GridDown(pad) => {
                // chromatic up the grid, one semitone per pad
                let freq = PLACE_ROOT_HZ * 2f32.powf(pad as f32 / 12.0);
                match self.session.place_event(pad as i64, freq, PLACE_GAIN) {
                    Ok(event) => {
                        self.last_placed = Some(event.id());
                        self.display_text = format!("{:.0} Hz", event.frequency());
                    }
                    Err(e) => self.display_text = e.to_string(),
                }
            }
            InputEvent::BendLast(semitones) => {
                if let Some(event) = self.last_placed.and_then(|id| self.session.bend_event(id, semitones)) {
                    self.display_text = format!("{:.0} Hz", event.frequency());
                }
            }
            InputEvent::NudgeGain(delta) => {
                let Some(id) = self.last_placed else {
                    return;
                };
                let Some(gain) = self.session.pattern().get(id).map(|e| e.gain()) else {
                    return;
                };
                let params = EventParams { gain: Some(gain + delta), frequency: None };
                if let Some(event) = self.session.update_event_params(id, params) {
                    self.display_text = format!("gain {:.2}", event.gain());
                }
            }
            InputEvent::NudgeTempo(delta) => {
                let tempo = self.session.pattern().tempo() as i32 + delta;
                let applied = self.session.set_tempo(tempo.max(0) as u32);
                self.display_text = format!("{applied} bpm");
            }
            InputEvent::ToggleDelay => {
                let on = !self.session.delay_enabled();
                self.session.set_delay_enabled(on);
            }
            InputEvent::ToggleReverb => {
                let on = !self.session.reverb_enabled();
                self.session.set_reverb_enabled(on);
            }
            InputEvent::CycleWave => {
                let shape = self.session.pattern().wave_shape().next();
                self.session.set_wave_shape(shape);
                self.display_text = shape.label().to_string();
            }
            InputEvent::Randomize => {
                let added = self.session.randomize(RANDOMIZE_COUNT);
                self.display_text = format!("+{added} notes");
            }
            InputEvent::Clear => {
                self.session.remove_all_events();
                self.last_placed = None;
                self.display_text = "cleared".to_string();
            }
            InputEvent::Export => {
                self.display_text = match persistence::export_snapshot(&self.project_dir, &self.session.export()) {
                    Ok(path) => format!("exported {}", path.display()),
                    Err(e) => {
                        log::error!("export failed: {e:#}");
                        "export failed".to_string()
                    }
                };
            }
            InputEvent::PlayPress => {
                if self.session.is_running() {
                    self.session.stop();
                    // notes already handed to the engine still play out; their
                    // flashes are dropped with the rest of the transport
                    self.tasks.clear();
                    self.lights.reset();
                } else {
                    if let Err(e) = self.session.start(now) {
                        self.display_text = e.to_string();
                    }
                }
            }
            InputEvent::Quit => {} // main saves and leaves
        }
    }

    // Called once per frame: polls the scheduler if due, then fires any pad
    // flashes whose moment has come.
    pub fn tick(&mut self, now: Instant) {
        let mut sink = FlashSink::new(&mut self.tasks, now);
        self.session.pump(now, &mut sink);
        self.tasks.run_due(now, &mut self.lights);
    }

    // Earliest pending flash or playhead move; the host loop wakes for it.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.next_deadline()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        persistence::save_snapshot(&self.project_dir, &self.session.export())
    }

    // None through the lead-in and whenever the step is off the grid
    fn playing_step(&self) -> Option<u8> {
        if !self.session.is_running() {
            return None;
        }
        let step = self.lights.playhead()?;
        (step < NUM_PADS).then_some(step as u8)
    }

    pub fn display_state(&self) -> DisplayState {
        let pattern = self.session.pattern();
        let mut leds = [LedState::Off; NUM_PADS];
        for (pad, led) in leds.iter_mut().enumerate() {
            if self.lights.is_flashing(pad) {
                *led = LedState::OnHigh;
            } else if pattern.is_step_used(pad) {
                *led = LedState::OnMedium;
            }
        }
        DisplayState {
            leds,
            playing_step: self.playing_step(),
            playing: self.session.is_running(),
            bpm: pattern.tempo(),
            delay: self.session.delay_enabled(),
            reverb: self.session.reverb_enabled(),
            wave_label: pattern.wave_shape().label(),
            event_count: pattern.len(),
            display_text: self.display_text.clone(),
        }
    }
}
