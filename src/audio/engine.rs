use std::sync::Arc;

use crate::audio_api::{AudioCommand, VoiceSpec};
use crate::config::EffectsConfig;

use super::clock::FrameClock;
use super::effect::{DelaySend, Effect, ReverbSend};
use super::frame::StereoFrame;
use super::voice::ToneVoice;

const MAX_VOICES: usize = 64; // hard cap so we wont malloc in audio callback
const BUS_CAPACITY: usize = 4096;

// The render side. Owns the voice pool, the two send effects and the master
// stage, and advances the audio clock after each block.
pub struct Engine {
    sample_rate: u32,
    clock: Arc<FrameClock>,
    voices: Vec<Option<ToneVoice>>,
    delay: DelaySend,
    reverb: ReverbSend,
    master_gain: f32,
    dry: Vec<f32>,
    delay_bus: Vec<f32>,
    reverb_bus: Vec<f32>,
}

impl Engine {
    pub fn new(clock: Arc<FrameClock>, config: &EffectsConfig, reverb_seed: u64) -> anyhow::Result<Self> {
        let sample_rate = clock.sample_rate();
        Ok(Self {
            sample_rate,
            delay: DelaySend::new(sample_rate, config),
            reverb: ReverbSend::new(sample_rate, config, reverb_seed)?,
            master_gain: config.master_gain,
            voices: (0..MAX_VOICES).map(|_| None).collect(),
            dry: vec![0.0; BUS_CAPACITY],
            delay_bus: vec![0.0; BUS_CAPACITY],
            reverb_bus: vec![0.0; BUS_CAPACITY],
            clock,
        })
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Play(spec) => self.start_voice(&spec),
        }
    }

    fn active_voices(&self) -> usize {
        self.voices.iter().flatten().filter(|v| v.active).count()
    }

    fn start_voice(&mut self, spec: &VoiceSpec) {
        let voice = ToneVoice::new(spec, self.sample_rate);

        // free slot first, otherwise steal the oldest voice
        let slot = self
            .voices
            .iter()
            .position(|v| v.as_ref().is_none_or(|v| !v.active))
            .or_else(|| {
                self.voices
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| v.as_ref().map(|v| (i, v.start_frame())))
                    .min_by_key(|(_, start)| *start)
                    .map(|(i, _)| i)
            })
            .unwrap_or(0);
        self.voices[slot] = Some(voice);
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        let n = out.len();
        if self.dry.len() < n {
            self.dry.resize(n, 0.0);
            self.delay_bus.resize(n, 0.0);
            self.reverb_bus.resize(n, 0.0);
        }
        let dry = &mut self.dry[..n];
        let delay_bus = &mut self.delay_bus[..n];
        let reverb_bus = &mut self.reverb_bus[..n];
        dry.fill(0.0);
        delay_bus.fill(0.0);
        reverb_bus.fill(0.0);

        let block_start = self.clock.frames();
        for slot in self.voices.iter_mut() {
            let finished = match slot {
                Some(voice) => {
                    voice.render_into(block_start, dry, delay_bus, reverb_bus);
                    !voice.active
                }
                None => false,
            };
            if finished {
                *slot = None;
            }
        }

        for (frame, s) in out.iter_mut().zip(dry.iter()) {
            *frame = StereoFrame::mono(*s);
        }
        self.delay.process(delay_bus, out);
        self.reverb.process(reverb_bus, out);

        for frame in out.iter_mut() {
            frame.left *= self.master_gain;
            frame.right *= self.master_gain;
        }

        self.clock.advance(n as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioClock, Envelope, WaveShape};
    use crate::audio_api::Routing;

    fn engine(sample_rate: u32) -> (Engine, Arc<FrameClock>) {
        let clock = Arc::new(FrameClock::new(sample_rate));
        let engine = Engine::new(clock.clone(), &EffectsConfig::default(), 1).unwrap();
        (engine, clock)
    }

    fn spec(start_time: f64, routing: Routing) -> VoiceSpec {
        VoiceSpec {
            start_time,
            wave_shape: WaveShape::Sine,
            frequency: 220.0,
            cutoff: 932.0,
            filter_q: std::f32::consts::FRAC_1_SQRT_2,
            envelope: Envelope::new(0.0001, 0.8, 0.01, 0.2, 0.02),
            routing,
        }
    }

    fn render(engine: &mut Engine, frames: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::zero(); frames];
        engine.render_block(&mut out);
        out
    }

    #[test]
    fn render_advances_clock() {
        let (mut engine, clock) = engine(8000);
        render(&mut engine, 800);
        assert!((clock.now() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn voice_starts_at_its_frame() {
        let (mut engine, _clock) = engine(8000);
        engine.handle_cmd(AudioCommand::Play(spec(0.05, Routing::default())));
        let out = render(&mut engine, 800);
        assert!(out[..400].iter().all(|f| f.peak() == 0.0));
        assert!(out[400..].iter().any(|f| f.peak() > 0.0));
    }

    #[test]
    fn voices_are_torn_down_after_stop_time() {
        let (mut engine, _clock) = engine(8000);
        engine.handle_cmd(AudioCommand::Play(spec(0.0, Routing::default())));
        engine.handle_cmd(AudioCommand::Play(spec(0.0, Routing { delay: true, reverb: true })));
        assert_eq!(engine.active_voices(), 2);
        render(&mut engine, 1000);
        assert_eq!(engine.active_voices(), 2);
        render(&mut engine, 1000); // past 0.22 s
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn delay_send_rings_after_dry_note_ends() {
        let (mut engine, _clock) = engine(8000);
        engine.handle_cmd(AudioCommand::Play(spec(0.0, Routing { delay: true, reverb: false })));
        let out = render(&mut engine, 4000);
        // dry note is gone by 0.22 s, echo lands 180 ms later
        let tail = &out[1800..3200];
        assert!(tail.iter().any(|f| f.peak() > 1e-3));
    }

    #[test]
    fn master_gain_comes_from_config() {
        let loud = EffectsConfig { master_gain: 0.8, ..EffectsConfig::default() };
        let quiet = EffectsConfig { master_gain: 0.4, ..EffectsConfig::default() };
        let peak = |config: &EffectsConfig| {
            let mut engine = Engine::new(Arc::new(FrameClock::new(8000)), config, 1).unwrap();
            engine.handle_cmd(AudioCommand::Play(spec(0.0, Routing::default())));
            render(&mut engine, 800).iter().map(|f| f.peak()).fold(0.0, f32::max)
        };
        let (loud, quiet) = (peak(&loud), peak(&quiet));
        assert!(quiet > 0.0);
        assert!((loud / quiet - 2.0).abs() < 1e-4, "{loud} vs {quiet}");
    }

    #[test]
    fn pool_steals_oldest_when_full() {
        let (mut engine, _clock) = engine(8000);
        for i in 0..MAX_VOICES + 4 {
            engine.handle_cmd(AudioCommand::Play(spec(i as f64 * 0.001, Routing::default())));
        }
        assert_eq!(engine.active_voices(), MAX_VOICES);
    }
}
