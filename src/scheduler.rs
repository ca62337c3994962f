// Lookahead scheduler. Polled on a coarse wall-clock cadence, it commits every
// step boundary that falls inside the lookahead window to the synth with an
// exact audio-clock timestamp, so the poll jitter never reaches the audio.
use std::time::Duration;

use crate::audio::AudioClock;
use crate::config::SchedulerConfig;
use crate::pipeline::{Event, PatternStore};
use crate::sink::VisualSink;
use crate::synth::Synth;

/// Loop position on the audio timeline. Only the scheduler writes it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransportState {
    pub current_step: usize,
    /// Audio time of the most recent wrap to step 0. Bookkeeping only.
    pub loop_start_time: f64,
    /// Audio time of the next step boundary not yet scheduled.
    pub next_step_time: f64,
}

pub struct LookaheadScheduler {
    lookahead: f64,
    poll_interval: Duration,
    subdivisions: u32,
    state: TransportState,
}

impl LookaheadScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            lookahead: config.lookahead_secs.max(0.0),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            subdivisions: config.subdivisions_per_beat.max(1),
            state: TransportState::default(),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn lookahead(&self) -> f64 {
        self.lookahead
    }

    pub fn reset(&mut self, start_time: f64) {
        self.state = TransportState {
            current_step: 0,
            loop_start_time: start_time,
            next_step_time: start_time,
        };
    }

    fn step_duration(&self, tempo: u32) -> f64 {
        60.0 / tempo.max(1) as f64 / self.subdivisions as f64
    }

    // One poll. Returns how many step boundaries were scheduled; more than one
    // means the poll came late and we caught up.
    pub fn tick(
        &mut self,
        clock: Option<&dyn AudioClock>,
        pattern: &PatternStore,
        synth: &mut dyn Synth,
        sink: &mut dyn VisualSink,
    ) -> usize {
        let Some(clock) = clock else {
            return 0;
        };
        let now = clock.now();
        let step_count = pattern.step_count();
        let mut scheduled = 0;

        while self.state.next_step_time < now + self.lookahead {
            let at = self.state.next_step_time;
            let step = self.state.current_step % step_count;

            sink.on_step_scheduled(step, at - now);
            // copy out first; nothing a dispatch does can disturb the walk
            let due: Vec<Event> = pattern.events_at(step).cloned().collect();
            for event in &due {
                synth.play(event, at);
                sink.on_event_fired(event, at - now);
            }

            self.state.next_step_time += self.step_duration(pattern.tempo());
            self.state.current_step = (step + 1) % step_count;
            if self.state.current_step == 0 {
                self.state.loop_start_time = self.state.next_step_time;
            }
            scheduled += 1;
        }

        if scheduled > 1 {
            log::debug!("late poll, scheduled {scheduled} steps in one tick");
        }
        scheduled
    }
}
