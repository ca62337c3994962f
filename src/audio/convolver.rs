// Uniformly partitioned overlap-save convolution. The impulse response is cut
// into block-sized partitions, each kept as a spectrum; incoming blocks go
// into a frequency-domain delay line and the output block is the sum of
// spectrum products. Latency is one block.
use std::sync::Arc;

use anyhow::anyhow;
use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

pub struct Convolver {
    block: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    ifft: Arc<dyn ComplexToReal<f32>>,
    partitions: Vec<Vec<Complex<f32>>>,
    history: Vec<Vec<Complex<f32>>>, // newest spectrum at `head`
    head: usize,
    input: Vec<f32>, // previous block | block being filled
    fill: usize,
    output: Vec<f32>,
    time_buf: Vec<f32>,
    accum: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
    ifft_scratch: Vec<Complex<f32>>,
}

impl Convolver {
    pub fn new(impulse: &[f32], block: usize) -> anyhow::Result<Self> {
        let block = block.max(1);
        let n = block * 2;
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        let ifft = planner.plan_fft_inverse(n);
        let mut fft_scratch = fft.make_scratch_vec();

        let count = impulse.len().div_ceil(block).max(1);
        let mut partitions = Vec::with_capacity(count);
        let mut padded = fft.make_input_vec();
        for p in 0..count {
            padded.fill(0.0);
            let start = p * block;
            let end = (start + block).min(impulse.len());
            if start < end {
                padded[..end - start].copy_from_slice(&impulse[start..end]);
            }
            let mut spectrum = fft.make_output_vec();
            fft.process_with_scratch(&mut padded, &mut spectrum, &mut fft_scratch)
                .map_err(|e| anyhow!("impulse response FFT failed: {e:?}"))?;
            partitions.push(spectrum);
        }

        Ok(Self {
            block,
            history: vec![fft.make_output_vec(); count],
            head: 0,
            input: vec![0.0; n],
            fill: 0,
            output: vec![0.0; block],
            time_buf: vec![0.0; n],
            accum: fft.make_output_vec(),
            ifft_scratch: ifft.make_scratch_vec(),
            fft_scratch,
            partitions,
            fft,
            ifft,
        })
    }

    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        let y = self.output[self.fill];
        self.input[self.block + self.fill] = x;
        self.fill += 1;
        if self.fill == self.block {
            self.flush();
            self.fill = 0;
        }
        y
    }

    fn flush(&mut self) {
        let b = self.block;
        let count = self.partitions.len();

        self.time_buf.copy_from_slice(&self.input);
        if self
            .fft
            .process_with_scratch(&mut self.time_buf, &mut self.history[self.head], &mut self.fft_scratch)
            .is_err()
        {
            return;
        }

        self.accum.fill(Complex::new(0.0, 0.0));
        for (p, h) in self.partitions.iter().enumerate() {
            let x = &self.history[(self.head + count - p) % count];
            for ((acc, xi), hi) in self.accum.iter_mut().zip(x).zip(h) {
                *acc += xi * hi;
            }
        }
        // c2r rejects non-real DC / nyquist bins
        self.accum[0].im = 0.0;
        self.accum[b].im = 0.0;

        if self
            .ifft
            .process_with_scratch(&mut self.accum, &mut self.time_buf, &mut self.ifft_scratch)
            .is_ok()
        {
            let norm = 1.0 / (2 * b) as f32;
            for (out, s) in self.output.iter_mut().zip(&self.time_buf[b..]) {
                *out = s * norm;
            }
        }

        self.head = (self.head + 1) % count;
        self.input.copy_within(b.., 0);
    }
}

// White noise under a (1 - t)^decay curve; one buffer per channel, each from
// its own stretch of the rng.
pub fn generate_impulse(sample_rate: u32, secs: f32, decay: f32, seed: u64) -> [Vec<f32>; 2] {
    let len = ((sample_rate as f32 * secs.max(0.0)) as usize).max(1);
    let mut rng = fastrand::Rng::with_seed(seed);
    std::array::from_fn(|_| {
        (0..len)
            .map(|i| {
                let noise = rng.f32() * 2.0 - 1.0;
                noise * (1.0 - i as f32 / len as f32).powf(decay)
            })
            .collect()
    })
}
