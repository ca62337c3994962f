// One stereo frame; what the output callback and the bounce writer deal in
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self {
        Self::default()
    }

    // the synth is mono until the master stage
    pub fn mono(s: f32) -> Self {
        Self { left: s, right: s }
    }

    pub fn peak(&self) -> f32 {
        self.left.abs().max(self.right.abs())
    }
}
