// Start/stop lifecycle and the poll cadence that drives the scheduler.
use std::time::Instant;

use crate::config::SchedulerConfig;
use crate::scheduler::{LookaheadScheduler, TransportState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportStatus {
    Stopped,
    Running,
}

pub struct Transport {
    status: TransportStatus,
    lead_in: f64,
    next_poll: Option<Instant>, // the one polling timer; None while stopped
    scheduler: LookaheadScheduler,
}

impl Transport {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            status: TransportStatus::Stopped,
            lead_in: config.lead_in_secs.max(0.0),
            next_poll: None,
            scheduler: LookaheadScheduler::new(config),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TransportStatus::Running
    }

    pub fn state(&self) -> TransportState {
        self.scheduler.state()
    }

    pub fn scheduler_mut(&mut self) -> &mut LookaheadScheduler {
        &mut self.scheduler
    }

    // Always restarts from step 0. Returns false if already running, in which
    // case nothing changes.
    pub fn start(&mut self, audio_now: f64, wall_now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.scheduler.reset(audio_now + self.lead_in);
        self.next_poll = Some(wall_now); // first poll right away
        self.status = TransportStatus::Running;
        true
    }

    // Loop position is left as-is; start() overwrites it anyway.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.next_poll = None;
        self.status = TransportStatus::Stopped;
        true
    }

    // True when a poll is due; arms the next one. A late host loop gets a
    // single poll, the scheduler's catch-up handles the missed steps.
    pub fn poll_due(&mut self, wall_now: Instant) -> bool {
        match self.next_poll {
            Some(due) if wall_now >= due => {
                self.next_poll = Some(wall_now + self.scheduler.poll_interval());
                true
            }
            _ => false,
        }
    }
}
