use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Normalized per-band frequency magnitudes from one analysis window.
///
/// Every frame is normalized independently so its maximum band is 1.0 (or
/// all bands are 0.0 for silent input). There is no temporal smoothing and
/// no log scaling; the spectrogram is deliberately responsive over smooth.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpectralFrame {
    pub bands: Vec<f32>,
}

impl SpectralFrame {
    pub fn silent(bands: usize) -> Self {
        Self {
            bands: vec![0.0; bands],
        }
    }

    pub fn is_silent(&self) -> bool {
        self.bands.iter().all(|&b| b == 0.0)
    }
}

/// Fixed-window FFT analyzer producing [`SpectralFrame`]s.
///
/// Plans the FFT once and owns its scratch buffer; each audio source gets
/// its own analyzer so concurrent sources never share working memory.
pub struct SpectralAnalyzer {
    window_size: usize,
    output_bands: usize,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectralAnalyzer {
    pub fn new(window_size: usize, output_bands: usize) -> Self {
        let output_bands = output_bands.max(1);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);
        Self {
            window_size,
            output_bands,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); window_size],
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn output_bands(&self) -> usize {
        self.output_bands
    }

    /// Analyze one PCM frame. Frames shorter than the window are ignored;
    /// extra samples past the window are not consumed here (the chunker
    /// delivers exact windows in normal operation).
    pub fn analyze(&mut self, frame: &[f32]) -> Option<SpectralFrame> {
        if frame.len() < self.window_size {
            return None;
        }

        for (slot, &sample) in self.scratch.iter_mut().zip(frame) {
            *slot = Complex::new(sample, 0.0);
        }
        self.fft.process(&mut self.scratch);

        // Average contiguous bin ranges of the first N/2 magnitudes down to
        // `output_bands` values; the last band absorbs any remainder.
        let half = self.window_size / 2;
        let band_size = (half / self.output_bands).max(1);
        let mut bands = Vec::with_capacity(self.output_bands);
        for band in 0..self.output_bands {
            let start = band * band_size;
            let end = if band == self.output_bands - 1 {
                half
            } else {
                ((band + 1) * band_size).min(half)
            };
            if start >= end {
                bands.push(0.0);
                continue;
            }
            let sum: f32 = self.scratch[start..end].iter().map(|c| c.norm()).sum();
            bands.push(sum / (end - start) as f32);
        }

        normalize_in_place(&mut bands);
        Some(SpectralFrame { bands })
    }
}

/// Divide every band by the frame's maximum. Silent frames stay all-zero.
fn normalize_in_place(bands: &mut [f32]) {
    let max = bands.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for band in bands {
            *band /= max;
        }
    }
}
