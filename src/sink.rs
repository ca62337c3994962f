use crate::pipeline::Event;

/// Receives a notification for every dispatched event.
///
/// `latency_secs` is how far ahead of the audio clock the event was
/// scheduled, so the sink can line its own animation up with the sound.
/// Implementations must return quickly; they run inside the scheduler tick.
pub trait VisualSink {
    fn on_event_fired(&mut self, event: &Event, latency_secs: f64);

    /// Called once per committed step boundary, empty steps included, before
    /// that step's events.
    fn on_step_scheduled(&mut self, _step: usize, _latency_secs: f64) {}
}

// for headless runs (bounce) where nobody is watching
pub struct NullSink;

impl VisualSink for NullSink {
    fn on_event_fired(&mut self, _event: &Event, _latency_secs: f64) {}
}
