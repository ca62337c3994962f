use super::convolver::{generate_impulse, Convolver};
use super::frame::StereoFrame;
use crate::config::EffectsConfig;

// partition size for the reverb; also its extra pre-delay
const REVERB_BLOCK: usize = 256;

// A send effect reads its mono send bus and mixes its (already gained) wet
// signal into the master block. Wired once, never rebuilt.
pub trait Effect: Send {
    fn process(&mut self, send: &[f32], out: &mut [StereoFrame]);
}

// delay -> gain -> master
pub struct DelaySend {
    line: Vec<f32>,
    pos: usize,
    feedback: f32,
    gain: f32,
}

impl DelaySend {
    pub fn new(sample_rate: u32, config: &EffectsConfig) -> Self {
        let delay_samples = ((config.delay_secs.max(0.0) * sample_rate as f32).round() as usize).max(1);
        Self {
            line: vec![0.0; delay_samples],
            pos: 0,
            feedback: config.delay_feedback.clamp(0.0, 0.95),
            gain: config.delay_gain,
        }
    }
}

impl Effect for DelaySend {
    fn process(&mut self, send: &[f32], out: &mut [StereoFrame]) {
        for (x, frame) in send.iter().zip(out.iter_mut()) {
            let delayed = self.line[self.pos];
            self.line[self.pos] = x + delayed * self.feedback;
            self.pos = (self.pos + 1) % self.line.len();

            let wet = delayed * self.gain;
            frame.left += wet;
            frame.right += wet;
        }
    }
}

// convolver -> gain -> master, with a noise impulse drawn once per session
pub struct ReverbSend {
    left: Convolver,
    right: Convolver,
    gain: f32,
}

impl ReverbSend {
    pub fn new(sample_rate: u32, config: &EffectsConfig, seed: u64) -> anyhow::Result<Self> {
        let [ir_left, ir_right] =
            generate_impulse(sample_rate, config.reverb_secs, config.reverb_decay, seed);
        Ok(Self {
            left: Convolver::new(&ir_left, REVERB_BLOCK)?,
            right: Convolver::new(&ir_right, REVERB_BLOCK)?,
            gain: config.reverb_gain,
        })
    }
}

impl Effect for ReverbSend {
    fn process(&mut self, send: &[f32], out: &mut [StereoFrame]) {
        for (x, frame) in send.iter().zip(out.iter_mut()) {
            frame.left += self.left.process_sample(*x) * self.gain;
            frame.right += self.right.process_sample(*x) * self.gain;
        }
    }
}
