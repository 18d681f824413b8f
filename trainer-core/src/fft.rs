//! # Fast Fourier Transform (FFT) Module
//!
//! FFT-backed autocorrelation for analysis windows too long for the direct
//! O(n²) sum. The signal is zero padded to at least twice its length so the
//! circular correlation computed in the frequency domain equals the linear
//! one, then the power spectrum is transformed back.

use rustfft::{FftPlanner, num_complex::Complex};

/// Computes `c[lag] = Σ signal[i] * signal[i + lag]` for `lag = 0..len`.
///
/// # Arguments
/// * `signal` - Time domain samples
///
/// # Returns
/// * `Vec<f32>` - One correlation value per lag, same length as `signal`
pub fn autocorrelation_fft(signal: &[f32]) -> Vec<f32> {
    let len = signal.len();
    if len == 0 {
        return Vec::new();
    }
    let fft_len = (2 * len).next_power_of_two();

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }))
        .take(fft_len)
        .collect();

    forward.process(&mut buffer);
    for bin in buffer.iter_mut() {
        // Power spectrum: X * conj(X)
        *bin = Complex { re: bin.norm_sqr(), im: 0.0 };
    }
    inverse.process(&mut buffer);

    // RustFFT does not normalise the inverse transform.
    let scale = 1.0 / fft_len as f32;
    buffer.iter().take(len).map(|c| c.re * scale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::autocorrelation_direct;

    #[test]
    fn matches_direct_sum() {
        let signal: Vec<f32> = (0..300)
            .map(|i| (i as f32 * 0.13).sin() + 0.3 * (i as f32 * 0.71).cos())
            .collect();
        let direct = autocorrelation_direct(&signal);
        let fast = autocorrelation_fft(&signal);
        assert_eq!(direct.len(), fast.len());
        for (lag, (d, f)) in direct.iter().zip(&fast).enumerate() {
            assert!((d - f).abs() < 1e-2, "lag {lag}: direct {d} fft {f}");
        }
    }

    #[test]
    fn empty_signal() {
        assert!(autocorrelation_fft(&[]).is_empty());
    }
}
