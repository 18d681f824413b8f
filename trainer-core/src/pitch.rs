//! # Pitch Detection Module
//!
//! This module recovers the fundamental frequency of a single guitar note
//! from a raw time domain buffer using autocorrelation.
//!
//! ## Steps
//! - Noise gate on RMS energy
//! - Leading and trailing near-silence trim
//! - Autocorrelation (direct sum, or FFT for long windows)
//! - Skip of the zero-lag peak, then global peak search
//! - Peak refinement on the overlap-normalized correlation, with parabolic
//!   interpolation for sub-sample accuracy
//!
//! The direct autocorrelation costs O(n²) per call. That is fine for one
//! 2048-sample window per frame but longer windows go through `fft`.

use crate::fft;

/// Buffers quieter than this RMS level are treated as silence.
pub const SILENCE_RMS_THRESHOLD: f32 = 0.03;

/// Samples at or below this magnitude count as near-silent for edge trimming.
pub const EDGE_THRESHOLD: f32 = 0.02;

/// Longest window autocorrelated with the direct sum.
pub const DIRECT_AUTOCORRELATION_MAX: usize = 4096;

/// Root mean square level of a buffer.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

/// Trims leading and trailing samples whose magnitude does not exceed
/// `threshold`. Returns an empty slice when no sample exceeds it.
pub fn trim_edges(signal: &[f32], threshold: f32) -> &[f32] {
    let start = signal.iter().position(|s| s.abs() > threshold);
    let end = signal.iter().rposition(|s| s.abs() > threshold);
    match (start, end) {
        (Some(start), Some(end)) => &signal[start..=end],
        _ => &[],
    }
}

/// Direct autocorrelation, `c[lag] = Σ signal[i] * signal[i + lag]`.
pub fn autocorrelation_direct(signal: &[f32]) -> Vec<f32> {
    let len = signal.len();
    (0..len)
        .map(|lag| {
            signal[..len - lag]
                .iter()
                .zip(&signal[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

fn autocorrelate(signal: &[f32]) -> Vec<f32> {
    if signal.len() <= DIRECT_AUTOCORRELATION_MAX {
        autocorrelation_direct(signal)
    } else {
        fft::autocorrelation_fft(signal)
    }
}

/// Peak search on the raw correlation.
///
/// # Returns
/// * `Some((first_minimum, peak))` - End of the zero-lag peak, and the lag of
///   the strongest repetition after it (always > 0)
/// * `None` - The correlation never turns upward
fn find_period(correlation: &[f32]) -> Option<(usize, usize)> {
    let len = correlation.len();

    // Walk down the zero-lag peak to the first minimum.
    let mut lag = 0;
    while lag + 1 < len && correlation[lag] > correlation[lag + 1] {
        lag += 1;
    }
    if lag + 1 >= len {
        return None;
    }

    let mut best = lag;
    let mut best_value = correlation[lag];
    for (i, &value) in correlation.iter().enumerate().skip(lag + 1) {
        if value > best_value {
            best = i;
            best_value = value;
        }
    }

    (best > 0).then_some((lag, best))
}

/// Refines a peak lag to sub-sample precision.
///
/// The raw sum shrinks with lag because fewer samples overlap, which pulls
/// the peak a few samples early on low notes. Dividing by the overlap length
/// removes that tilt. The lag climbs to the local maximum of the normalized
/// curve (never back into the zero-lag peak) and a parabola through its
/// neighbours gives the final position.
fn refine_period(correlation: &[f32], first_minimum: usize, peak: usize) -> f32 {
    let len = correlation.len();
    let normalized = |lag: usize| correlation[lag] / (len - lag) as f32;

    let mut lag = peak;
    while lag + 2 < len && normalized(lag + 1) > normalized(lag) {
        lag += 1;
    }
    while lag > first_minimum + 1 && normalized(lag - 1) > normalized(lag) {
        lag -= 1;
    }

    if lag == 0 || lag + 1 >= len {
        return lag as f32;
    }
    let y1 = normalized(lag - 1);
    let y2 = normalized(lag);
    let y3 = normalized(lag + 1);

    let denominator = y1 - 2.0 * y2 + y3;
    if denominator.abs() < f32::EPSILON {
        return lag as f32;
    }
    let shift = (y1 - y3) / (2.0 * denominator);
    if shift.abs() < 1.0 {
        lag as f32 + shift
    } else {
        lag as f32
    }
}

/// Estimates the fundamental frequency of a monophonic buffer.
///
/// # Arguments
/// * `signal` - Input audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `amplitude_threshold` - Minimum RMS level for pitch detection
///
/// # Returns
/// * `Some(frequency)` - Detected frequency in Hz
/// * `None` - Silence, a degenerate buffer, or no usable period
pub fn detect_pitch_autocorrelation(
    signal: &[f32],
    sample_rate: u32,
    amplitude_threshold: f32,
) -> Option<f32> {
    // --- Noise gate ---
    if signal.is_empty() || rms(signal) < amplitude_threshold {
        return None;
    }

    // --- Edge trim ---
    let trimmed = trim_edges(signal, EDGE_THRESHOLD);
    if trimmed.len() <= 1 {
        return None;
    }

    let correlation = autocorrelate(trimmed);
    let (first_minimum, peak) = find_period(&correlation)?;
    let period = refine_period(&correlation, first_minimum, peak);
    if period <= 0.0 {
        return None;
    }

    let frequency = sample_rate as f32 / period;
    (frequency.is_finite() && frequency > 0.0).then_some(frequency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::TAU;

    const SAMPLE_RATE: u32 = 44_100;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (TAU * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[test]
    fn every_fretted_note_is_within_match_tolerance() {
        use crate::tuning::{CENT_TOLERANCE, calculate_cents_deviation, frequency_of};
        for pitch_number in 40..=76 {
            let freq = frequency_of(pitch_number);
            for phase in [0.0, 1.3, 2.6, 4.0] {
                let buffer: Vec<f32> = (0..2048)
                    .map(|i| 0.5 * (TAU * freq * i as f32 / SAMPLE_RATE as f32 + phase).sin())
                    .collect();
                let detected = detect_pitch_autocorrelation(&buffer, SAMPLE_RATE, SILENCE_RMS_THRESHOLD)
                    .expect("a pitch should be detected");
                let cents = calculate_cents_deviation(detected, freq);
                assert!(cents.abs() < CENT_TOLERANCE, "pitch {pitch_number}: {cents:.1} cents");
            }
        }
    }

    fn assert_close(detected: Option<f32>, expected: f32) {
        let detected = detected.expect("a pitch should be detected");
        let error = (detected - expected).abs() / expected;
        assert!(error < 0.02, "expected {expected} Hz, detected {detected} Hz");
    }

    #[test]
    fn detects_pure_sines_across_the_neck() {
        for freq in [82.41, 110.0, 196.0, 220.0, 329.63, 440.0, 659.26, 1318.5] {
            let buffer = sine(freq, 0.5, 2048);
            assert_close(detect_pitch_autocorrelation(&buffer, SAMPLE_RATE, SILENCE_RMS_THRESHOLD), freq);
        }
    }

    #[test]
    fn detects_fundamental_with_overtones_and_noise() {
        let mut rng = StdRng::seed_from_u64(17);
        let freq = 146.83;
        let buffer: Vec<f32> = (0..2048)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                0.4 * (TAU * freq * t).sin()
                    + 0.2 * (TAU * 2.0 * freq * t).sin()
                    + 0.1 * (TAU * 3.0 * freq * t).sin()
                    + rng.gen_range(-0.01..0.01)
            })
            .collect();
        assert_close(detect_pitch_autocorrelation(&buffer, SAMPLE_RATE, SILENCE_RMS_THRESHOLD), freq);
    }

    #[test]
    fn long_windows_use_the_fft_path() {
        let buffer = sine(98.0, 0.5, 8192);
        assert_close(detect_pitch_autocorrelation(&buffer, SAMPLE_RATE, SILENCE_RMS_THRESHOLD), 98.0);
    }

    #[test]
    fn leading_silence_does_not_bias_the_estimate() {
        let mut buffer = vec![0.0; 600];
        buffer.extend(sine(261.63, 0.5, 1448));
        assert_close(detect_pitch_autocorrelation(&buffer, SAMPLE_RATE, SILENCE_RMS_THRESHOLD), 261.63);
    }

    #[test]
    fn rejects_silence() {
        let mut rng = StdRng::seed_from_u64(3);
        let hiss: Vec<f32> = (0..2048).map(|_| rng.gen_range(-0.005..0.005)).collect();
        assert!(rms(&hiss) < SILENCE_RMS_THRESHOLD);
        assert_eq!(detect_pitch_autocorrelation(&hiss, SAMPLE_RATE, SILENCE_RMS_THRESHOLD), None);
        assert_eq!(detect_pitch_autocorrelation(&[0.0; 2048], SAMPLE_RATE, SILENCE_RMS_THRESHOLD), None);
        assert_eq!(detect_pitch_autocorrelation(&[], SAMPLE_RATE, SILENCE_RMS_THRESHOLD), None);
    }

    #[test]
    fn degenerate_buffers_return_none() {
        // A single loud sample survives the gate but trims to length 1.
        let mut spike = vec![0.0; 16];
        spike[7] = 1.0;
        assert_eq!(detect_pitch_autocorrelation(&spike, SAMPLE_RATE, SILENCE_RMS_THRESHOLD), None);

        // A monotonically decaying correlation has no peak after lag 0.
        let ramp = [0.9, 0.8, 0.7, 0.6];
        assert_eq!(find_period(&autocorrelation_direct(&ramp)), None);
    }

    #[test]
    fn trim_keeps_the_inner_span() {
        let signal = [0.0, 0.01, 0.5, -0.3, 0.0, 0.4, 0.015, 0.0];
        assert_eq!(trim_edges(&signal, EDGE_THRESHOLD), &[0.5, -0.3, 0.0, 0.4]);
        assert!(trim_edges(&[0.0, 0.01], EDGE_THRESHOLD).is_empty());
    }

    #[test]
    fn direct_autocorrelation_values() {
        let c = autocorrelation_direct(&[1.0, 2.0, 3.0]);
        assert_eq!(c, [14.0, 8.0, 3.0]);
    }
}
