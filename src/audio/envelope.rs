// Attack/decay curve of one note, as a pure function of time since note start.
// Both segments are exponential ramps between the floor and the peak, so the
// level never touches 0.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    floor: f32,
    peak: f32,
    attack: f32,
    decay_end: f32,
    release_pad: f32,
}

impl Envelope {
    pub fn new(floor: f32, peak: f32, attack: f32, duration: f32, release_pad: f32) -> Self {
        let floor = floor.max(f32::MIN_POSITIVE);
        let attack = attack.max(0.0);
        Self {
            floor,
            peak: peak.max(floor),
            attack,
            decay_end: duration.max(attack + 0.001),
            release_pad: release_pad.max(0.0),
        }
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    // seconds after note start when the voice can be torn down
    pub fn stop_time(&self) -> f32 {
        self.decay_end + self.release_pad
    }

    #[inline]
    pub fn level_at(&self, t: f32) -> f32 {
        if t <= 0.0 {
            self.floor
        } else if t < self.attack {
            ramp(self.floor, self.peak, t / self.attack)
        } else if t < self.decay_end {
            ramp(self.peak, self.floor, (t - self.attack) / (self.decay_end - self.attack))
        } else {
            self.floor
        }
    }
}

// v0 * (v1 / v0)^x, same curve as an exponential ramp between two set points
#[inline]
fn ramp(from: f32, to: f32, x: f32) -> f32 {
    from * (to / from).powf(x)
}
