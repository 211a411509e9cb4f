/// Pure-math sample conversion and gain mixing for the mixing graph.
///
/// All operations work on `&[f32]` mono buffers at `target_sample_rate`
/// with no platform dependencies.
#[derive(Debug, Clone)]
pub struct GainMixer {
    pub target_sample_rate: f64,
}

impl GainMixer {
    pub fn new(target_sample_rate: f64) -> Self {
        Self { target_sample_rate }
    }

    /// Convert a delivered buffer of any layout into mono at the mix rate.
    pub fn condition(&self, samples: &[f32], sample_rate: f64, channels: u16) -> Vec<f32> {
        let mono = Self::downmix_to_mono(samples, channels as usize);
        self.resample(&mono, sample_rate)
    }

    /// Downmix interleaved multi-channel audio to mono by averaging each frame.
    pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
        if channels <= 1 {
            return samples.to_vec();
        }
        let scale = 1.0 / channels as f32;
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect()
    }

    /// Linear interpolation resampling from `source_sample_rate` to the mix rate.
    ///
    /// Returns input unchanged if rates match.
    pub fn resample(&self, samples: &[f32], source_sample_rate: f64) -> Vec<f32> {
        if (source_sample_rate - self.target_sample_rate).abs() < 0.01 || samples.is_empty() {
            return samples.to_vec();
        }
        if source_sample_rate <= 0.0 {
            return Vec::new();
        }

        let ratio = self.target_sample_rate / source_sample_rate;
        let output_count = (samples.len() as f64 * ratio) as usize;

        (0..output_count)
            .map(|i| {
                let position = i as f64 / ratio;
                let index = position as usize;
                let fraction = (position - index as f64) as f32;
                match (samples.get(index), samples.get(index + 1)) {
                    (Some(a), Some(b)) => a * (1.0 - fraction) + b * fraction,
                    (Some(a), None) => *a,
                    _ => 0.0,
                }
            })
            .collect()
    }

    /// Add `source * gain` into `destination`, sample by sample.
    ///
    /// Extra samples on either side are left untouched.
    pub fn accumulate(destination: &mut [f32], source: &[f32], gain: f32) {
        if gain == 0.0 {
            return;
        }
        for (out, sample) in destination.iter_mut().zip(source) {
            *out += sample * gain;
        }
    }

    /// Compute RMS level of samples (0.0–1.0 range for normalized audio).
    pub fn rms_level(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }

    /// Compute peak absolute level of samples.
    pub fn peak_level(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }
}
