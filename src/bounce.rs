// Offline rendering: the same session, scheduler and engine, driven block by
// block against the offline clock instead of a sound card.
use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use crate::audio::{OfflineRenderer, StereoFrame};
use crate::config::SessionConfig;
use crate::pipeline::PatternSnapshot;
use crate::session::Session;
use crate::sink::NullSink;

#[derive(Clone, Debug)]
pub struct BounceOptions {
    pub loops: u32,
    pub sample_rate: u32,
    pub delay: bool,
    pub reverb: bool,
    pub seed: u64,
}

impl Default for BounceOptions {
    fn default() -> Self {
        Self {
            loops: 2,
            sample_rate: 44_100,
            delay: false,
            reverb: false,
            seed: 0,
        }
    }
}

pub fn render_loops(
    config: &SessionConfig,
    snapshot: &PatternSnapshot,
    options: &BounceOptions,
) -> anyhow::Result<Vec<StereoFrame>> {
    let mut renderer = OfflineRenderer::new(options.sample_rate, &config.effects, options.seed)
        .context("failed to build offline engine")?;
    let mut session = Session::with_seed(config, options.seed);
    session.restore(snapshot);
    session.set_delay_enabled(options.delay);
    session.set_reverb_enabled(options.reverb);
    session.attach_audio(renderer.context());
    session.start(Instant::now())?;

    let state = session.transport_state();
    let step_secs = 60.0 / session.pattern().tempo() as f64 / config.scheduler.subdivisions_per_beat.max(1) as f64;
    let loop_secs = step_secs * session.pattern().step_count() as f64;
    let last_step_end = state.next_step_time + loop_secs * options.loops as f64;
    // long enough for the longest restored note to ring out, wherever it sits
    let longest_note = session
        .pattern()
        .events()
        .iter()
        .map(|e| e.duration())
        .fold(0.0f32, f32::max);
    let tail = (longest_note + config.synth.release_pad_secs) as f64
        + if options.reverb { config.effects.reverb_secs as f64 + 0.05 } else { 0.0 }
        + if options.delay { config.effects.delay_secs as f64 } else { 0.0 };
    let total_frames = ((last_step_end + tail) * options.sample_rate as f64).ceil() as usize;

    let block = ((config.scheduler.poll_interval_ms.max(1) as f64 / 1000.0) * options.sample_rate as f64)
        .round()
        .max(1.0) as usize;
    let mut out = Vec::with_capacity(total_frames);

    while out.len() < total_frames {
        // every step of the last loop is committed once next_step_time passes the end
        if session.is_running() && session.transport_state().next_step_time >= last_step_end - 1e-9 {
            session.stop();
        }
        session.tick(&mut NullSink);
        let n = block.min(total_frames - out.len());
        out.extend(renderer.render(n));
    }

    log::info!(
        "bounced {} loop(s), {:.2}s at {} Hz",
        options.loops,
        out.len() as f64 / options.sample_rate as f64,
        options.sample_rate
    );
    Ok(out)
}

pub fn write_wav(path: &Path, frames: &[StereoFrame], sample_rate: u32) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for frame in frames {
        writer.write_sample(frame.left)?;
        writer.write_sample(frame.right)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::WaveShape;
    use crate::pipeline::EventSnapshot;

    fn one_note(step: usize) -> PatternSnapshot {
        PatternSnapshot {
            tempo: 120,
            steps: 16,
            events: vec![EventSnapshot {
                step,
                freq: 330.0,
                gain: 0.8,
                duration: 0.2,
                color: "#fff".into(),
                wave_shape: WaveShape::Sawtooth,
            }],
        }
    }

    fn options() -> BounceOptions {
        BounceOptions { loops: 1, sample_rate: 8000, ..BounceOptions::default() }
    }

    fn first_sound(frames: &[StereoFrame]) -> Option<usize> {
        frames.iter().position(|f| f.peak() > 1e-6)
    }

    #[test]
    fn empty_pattern_renders_silence() {
        let snapshot = PatternSnapshot { tempo: 120, steps: 16, events: vec![] };
        let frames = render_loops(&SessionConfig::default(), &snapshot, &options()).unwrap();
        // lead-in + one 2 s loop + note tail
        assert!(frames.len() >= 2 * 8000);
        assert!(frames.iter().all(|f| f.peak() == 0.0));
    }

    #[test]
    fn note_sounds_on_its_step() {
        let frames = render_loops(&SessionConfig::default(), &one_note(4), &options()).unwrap();
        // 0.1 s lead-in + 4 steps of 0.125 s
        let onset = first_sound(&frames).unwrap();
        assert!((4800..4805).contains(&onset), "onset at {onset}");
    }

    #[test]
    fn each_loop_replays_the_note() {
        let opts = BounceOptions { loops: 2, ..options() };
        let frames = render_loops(&SessionConfig::default(), &one_note(0), &opts).unwrap();
        let second = &frames[16_800..];
        let onset = first_sound(second).unwrap();
        assert!(onset < 10, "second loop onset at {onset}");
    }

    #[test]
    fn delay_send_adds_an_echo() {
        let config = SessionConfig::default();
        let dry = render_loops(&config, &one_note(0), &options()).unwrap();
        let wet = render_loops(&config, &one_note(0), &BounceOptions { delay: true, ..options() }).unwrap();
        // dry note is over by 0.1 + 0.22 s; the echo runs until 0.1 + 0.18 + 0.22 s
        let window = 2700..3700;
        assert!(dry[window.clone()].iter().all(|f| f.peak() < 1e-6));
        assert!(wet[window].iter().any(|f| f.peak() > 1e-3));
    }

    #[test]
    fn long_last_note_rings_out() {
        let mut snapshot = one_note(15);
        snapshot.events[0].duration = 1.5;
        let frames = render_loops(&SessionConfig::default(), &snapshot, &options()).unwrap();

        // onset 1.975 s, torn down at 1.975 + 1.5 + 0.02 s
        let stop = (3.495 * 8000.0) as usize;
        assert!(frames.len() > stop);
        assert!(frames[stop - 800..stop - 400].iter().any(|f| f.peak() > 0.0));
        assert!(frames[stop + 1..].iter().all(|f| f.peak() == 0.0));
    }

    #[test]
    fn wav_round_trip_keeps_length_and_format() {
        let frames = render_loops(&SessionConfig::default(), &one_note(2), &options()).unwrap();
        let path = std::env::temp_dir().join(format!("taploop-bounce-{}.wav", fastrand::u64(..)));
        write_wav(&path, &frames, 8000).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(reader.len() as usize, frames.len() * 2);
        let _ = std::fs::remove_file(&path);
    }
}
