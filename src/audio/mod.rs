use std::sync::Arc;

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio_api::AudioCommand;
use crate::config::EffectsConfig;

mod clock;
mod convolver;
mod effect;
mod engine;
mod envelope;
mod filter;
mod frame;
mod oscillator;
mod voice;

pub use clock::{AudioClock, FrameClock};
pub use effect::Effect;
pub use engine::Engine;
pub use envelope::Envelope;
pub use frame::StereoFrame;
pub use oscillator::WaveShape;

const COMMAND_QUEUE: usize = 1024;

// The session's view of an initialized render context: a way to schedule
// into it and a way to read its clock. Cheap to clone.
#[derive(Clone)]
pub struct AudioContext {
    tx: Sender<AudioCommand>,
    clock: Arc<FrameClock>,
}

impl AudioContext {
    pub fn new(tx: Sender<AudioCommand>, clock: Arc<FrameClock>) -> Self {
        Self { tx, clock }
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    // fire-and-forget; never blocks the session thread
    pub fn send(&self, cmd: AudioCommand) -> bool {
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("audio command queue full, dropping command");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

pub struct AudioHandle {
    context: AudioContext,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn context(&self) -> AudioContext {
        self.context.clone()
    }
}

pub fn start_audio(config: &EffectsConfig) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let supported = device.default_output_config().context("no default output config")?;

    let sample_rate = supported.sample_rate();
    let channels = supported.channels() as usize;
    let clock = Arc::new(FrameClock::new(sample_rate));

    match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            let engine = Engine::new(clock.clone(), config, fastrand::u64(..))?;
            let stream = build_output_stream_f32(&device, &supported.into(), engine, rx, channels)?;
            stream.play().context("failed to play output stream")?;
            log::info!("audio output running at {sample_rate} Hz, {channels} channel(s)");

            Ok(AudioHandle {
                context: AudioContext::new(tx, clock),
                _output_stream: stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut engine: Engine,
    rx: Receiver<AudioCommand>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut block: Vec<StereoFrame> = Vec::with_capacity(4096);
    let err_fn = |err| log::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels.max(1);
            block.resize(n_frames, StereoFrame::zero()); // only allocates if the host grows its buffer
            engine.render_block(&mut block);

            for (chunk, frame) in data.chunks_exact_mut(channels.max(1)).zip(block.iter()) {
                for (ch, sample) in chunk.iter_mut().enumerate() {
                    *sample = match (channels, ch) {
                        (1, _) => (frame.left + frame.right) * 0.5,
                        (_, 0) => frame.left,
                        (_, 1) => frame.right,
                        _ => 0.0,
                    };
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

// Same engine, driven by hand instead of by a device callback. Used for
// bouncing to disk and for deterministic tests.
pub struct OfflineRenderer {
    engine: Engine,
    rx: Receiver<AudioCommand>,
    context: AudioContext,
}

impl OfflineRenderer {
    pub fn new(sample_rate: u32, config: &EffectsConfig, reverb_seed: u64) -> anyhow::Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);
        let clock = Arc::new(FrameClock::new(sample_rate));
        let engine = Engine::new(clock.clone(), config, reverb_seed)?;
        Ok(Self {
            engine,
            rx,
            context: AudioContext::new(tx, clock),
        })
    }

    pub fn context(&self) -> AudioContext {
        self.context.clone()
    }

    pub fn render(&mut self, frames: usize) -> Vec<StereoFrame> {
        while let Ok(cmd) = self.rx.try_recv() {
            self.engine.handle_cmd(cmd);
        }
        let mut out = vec![StereoFrame::zero(); frames];
        self.engine.render_block(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_api::{Routing, VoiceSpec};

    #[test]
    fn offline_renderer_drains_commands_and_advances() {
        let mut renderer = OfflineRenderer::new(8000, &EffectsConfig::default(), 3).unwrap();
        let ctx = renderer.context();
        let voice = VoiceSpec {
            start_time: 0.0,
            wave_shape: WaveShape::Square,
            frequency: 440.0,
            cutoff: 1064.0,
            filter_q: std::f32::consts::FRAC_1_SQRT_2,
            envelope: Envelope::new(0.0001, 0.8, 0.01, 0.1, 0.02),
            routing: Routing::default(),
        };
        assert!(ctx.send(AudioCommand::Play(voice)));
        let out = renderer.render(80);
        assert_eq!(out.len(), 80);
        assert!(out.iter().any(|f| f.peak() > 0.0));
        assert!((ctx.clock().now() - 0.01).abs() < 1e-9);
    }
}
