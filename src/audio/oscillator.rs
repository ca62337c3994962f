use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveShape {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl WaveShape {
    pub const ALL: [WaveShape; 4] = [
        WaveShape::Sine,
        WaveShape::Square,
        WaveShape::Sawtooth,
        WaveShape::Triangle,
    ];

    pub fn next(self) -> Self {
        match self {
            WaveShape::Sine => WaveShape::Square,
            WaveShape::Square => WaveShape::Sawtooth,
            WaveShape::Sawtooth => WaveShape::Triangle,
            WaveShape::Triangle => WaveShape::Sine,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WaveShape::Sine => "SINE",
            WaveShape::Square => "SQR",
            WaveShape::Sawtooth => "SAW",
            WaveShape::Triangle => "TRI",
        }
    }

    // phase in [0, 1), output in [-1, 1]
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            WaveShape::Sine => (phase * std::f32::consts::TAU).sin(),
            WaveShape::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }
            WaveShape::Sawtooth => 2.0 * phase - 1.0,
            WaveShape::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Oscillator {
    shape: WaveShape,
    phase: f32,
    phase_inc: f32, // cycles per sample
}

impl Oscillator {
    pub fn new(shape: WaveShape, frequency: f32, sample_rate: f32) -> Self {
        Self {
            shape,
            phase: 0.0,
            phase_inc: frequency / sample_rate,
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let out = self.shape.sample(self.phase);
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        out
    }
}
