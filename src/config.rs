// Session-wide knobs. Every field has a default so a partial config.json
// (or none at all) still gives a playable session.
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::audio::WaveShape;

const TAPLOOP_DIR: &str = ".taploop";
const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub scheduler: SchedulerConfig,
    pub pattern: PatternConfig,
    pub synth: SynthConfig,
    pub effects: EffectsConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub lookahead_secs: f64,
    pub poll_interval_ms: u64,
    pub subdivisions_per_beat: u32,
    pub lead_in_secs: f64, // gap between start() and the first step so it can be scheduled cleanly
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_secs: 0.1,
            poll_interval_ms: 25,
            subdivisions_per_beat: 4,
            lead_in_secs: 0.1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub beats_per_loop: u32,
    pub tempo: u32,
    pub min_tempo: u32,
    pub max_tempo: u32,
    pub max_events: usize,
    pub note_duration_secs: f32,
    pub wave_shape: WaveShape,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            beats_per_loop: 4,
            tempo: 120,
            min_tempo: 40,
            max_tempo: 240,
            max_events: 256,
            note_duration_secs: 0.4,
            wave_shape: WaveShape::Sine,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub attack_secs: f32,
    pub release_pad_secs: f32,
    pub envelope_floor: f32, // exponential ramps can't start from 0
    pub filter_base_hz: f32,
    pub filter_tracking: f32, // cutoff = base + frequency * tracking
    pub filter_q: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            attack_secs: 0.01,
            release_pad_secs: 0.02,
            envelope_floor: 0.0001,
            filter_base_hz: 800.0,
            filter_tracking: 0.6,
            filter_q: std::f32::consts::FRAC_1_SQRT_2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub delay_secs: f32,
    pub delay_gain: f32,
    pub delay_feedback: f32,
    pub reverb_secs: f32,
    pub reverb_decay: f32,
    pub reverb_gain: f32,
    pub master_gain: f32,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            delay_secs: 0.18,
            delay_gain: 0.22,
            delay_feedback: 0.0,
            reverb_secs: 1.5,
            reverb_decay: 2.0,
            reverb_gain: 0.15,
            master_gain: 0.8,
        }
    }
}

impl SessionConfig {
    pub fn step_count(&self) -> usize {
        (self.pattern.beats_per_loop.max(1) * self.scheduler.subdivisions_per_beat.max(1)) as usize
    }
}

// <project_dir>/.taploop/<file>
pub fn taploop_path(project_dir: &Path, file: &str) -> PathBuf {
    project_dir.join(TAPLOOP_DIR).join(file)
}

// A missing file is fine (defaults); a broken one is reported so the caller can decide.
pub fn load_config(project_dir: &Path) -> anyhow::Result<SessionConfig> {
    let path = taploop_path(project_dir, CONFIG_FILE);
    if !path.exists() {
        return Ok(SessionConfig::default());
    }
    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}
