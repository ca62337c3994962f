// Front half of the tone synthesis engine: turns an event into a fully
// resolved voice and schedules it into the render context.

use crate::audio::{AudioContext, Envelope};
use crate::audio_api::{AudioCommand, Routing, VoiceSpec};
use crate::config::SynthConfig;
use crate::pipeline::Event;

pub trait Synth {
    fn play(&mut self, event: &Event, at_time: f64);
}

pub struct ToneSynth {
    context: Option<AudioContext>,
    config: SynthConfig,
    routing: Routing, // what new notes get; copied into each voice at dispatch
}

impl ToneSynth {
    pub fn new(config: SynthConfig) -> Self {
        Self {
            context: None,
            config,
            routing: Routing::default(),
        }
    }

    pub fn attach(&mut self, context: AudioContext) {
        self.context = Some(context);
    }

    pub fn context(&self) -> Option<&AudioContext> {
        self.context.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn routing(&self) -> Routing {
        self.routing
    }

    pub fn set_delay_enabled(&mut self, enabled: bool) {
        self.routing.delay = enabled;
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        self.routing.reverb = enabled;
    }

    pub fn voice_for(&self, event: &Event, at_time: f64) -> VoiceSpec {
        let c = &self.config;
        VoiceSpec {
            start_time: at_time,
            wave_shape: event.wave_shape(),
            frequency: event.frequency(),
            cutoff: c.filter_base_hz + event.frequency() * c.filter_tracking,
            filter_q: c.filter_q,
            envelope: Envelope::new(
                c.envelope_floor,
                event.gain(),
                c.attack_secs,
                event.duration(),
                c.release_pad_secs,
            ),
            routing: self.routing,
        }
    }
}

impl Synth for ToneSynth {
    fn play(&mut self, event: &Event, at_time: f64) {
        let Some(context) = &self.context else {
            return; // no engine yet, nothing to schedule into
        };
        context.send(AudioCommand::Play(self.voice_for(event, at_time)));
    }
}
