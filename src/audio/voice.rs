use crate::audio_api::{Routing, VoiceSpec};

use super::clock::secs_to_frame;
use super::envelope::Envelope;
use super::filter::LowPass;
use super::oscillator::Oscillator;

// One transient oscillator -> low-pass -> envelope chain. Lives in the
// engine's pool from dispatch until its stop frame has been rendered.
#[derive(Clone, Debug)]
pub struct ToneVoice {
    osc: Oscillator,
    filter: LowPass,
    envelope: Envelope,
    routing: Routing,
    start_frame: u64,
    stop_frame: u64,
    sample_rate: f32,
    pub active: bool,
}

impl ToneVoice {
    pub fn new(spec: &VoiceSpec, sample_rate: u32) -> Self {
        let sr = sample_rate as f32;
        Self {
            osc: Oscillator::new(spec.wave_shape, spec.frequency, sr),
            filter: LowPass::new(spec.cutoff, spec.filter_q, sr),
            envelope: spec.envelope,
            routing: spec.routing,
            start_frame: secs_to_frame(spec.start_time, sample_rate),
            stop_frame: secs_to_frame(spec.stop_time(), sample_rate),
            sample_rate: sr,
            active: true,
        }
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    // Renders the part of this voice that overlaps the block starting at
    // `block_start`. The three buffers are mono and the same length.
    pub fn render_into(
        &mut self,
        block_start: u64,
        dry: &mut [f32],
        delay_send: &mut [f32],
        reverb_send: &mut [f32],
    ) {
        if !self.active {
            return;
        }
        let len = dry.len();
        let block_end = block_start + len as u64;
        if self.start_frame >= block_end {
            return; // not yet
        }

        let first = self.start_frame.saturating_sub(block_start) as usize;
        for i in first..len {
            let frame = block_start + i as u64;
            if frame >= self.stop_frame {
                self.active = false; // teardown, the slot gets reused
                return;
            }
            let t = (frame - self.start_frame) as f32 / self.sample_rate;
            let s = self.filter.process(self.osc.next_sample()) * self.envelope.level_at(t);

            dry[i] += s;
            if self.routing.delay {
                delay_send[i] += s;
            }
            if self.routing.reverb {
                reverb_send[i] += s;
            }
        }

        if block_end >= self.stop_frame {
            self.active = false;
        }
    }
}
