// What the session sends across to the render context. Everything a voice
// needs is resolved before sending, so the render side never looks back at
// the pattern.
pub use crate::audio::{Envelope, StereoFrame, WaveShape};

// Which send effects a voice feeds. Decided once, when the note is dispatched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Routing {
    pub delay: bool,
    pub reverb: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceSpec {
    pub start_time: f64, // audio clock seconds
    pub wave_shape: WaveShape,
    pub frequency: f32,
    pub cutoff: f32,
    pub filter_q: f32,
    pub envelope: Envelope,
    pub routing: Routing,
}

impl VoiceSpec {
    pub fn stop_time(&self) -> f64 {
        self.start_time + self.envelope.stop_time() as f64
    }
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // one fresh oscillator -> filter -> envelope chain
    Play(VoiceSpec),
}
