// RBJ cookbook low-pass, one per voice
use std::f32::consts::PI;

#[derive(Clone, Copy, Debug)]
pub struct LowPass {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl LowPass {
    pub fn new(cutoff: f32, q: f32, sample_rate: f32) -> Self {
        // keep the cutoff under nyquist or the coefficients blow up
        let cutoff = cutoff.clamp(10.0, sample_rate * 0.49);
        let omega = 2.0 * PI * cutoff / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * q.max(0.01));
        let a0 = 1.0 + alpha;

        Self {
            b0: (1.0 - cos_w) / 2.0 / a0,
            b1: (1.0 - cos_w) / a0,
            b2: (1.0 - cos_w) / 2.0 / a0,
            a1: -2.0 * cos_w / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = out;
        out
    }
}
