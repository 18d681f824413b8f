//! # Audio Module
//!
//! This module handles real-time audio I/O using CPAL (Cross-Platform Audio
//! Library): microphone capture for the pitch detector and the reference
//! tone output.
//!
//! ## Features
//! - Automatic input device and format selection
//! - 100 Hz high-pass on the captured signal to strip hum and rumble
//! - Fixed-size frames streamed over a crossbeam channel
//! - Fire-and-forget sine tone playback

use anyhow::{Context, Result, anyhow};
use biquad::{Biquad, Coefficients, DirectForm1, Q_BUTTERWORTH_F32, ToHertz, Type};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;
use tracing::{debug, error, info};

/// Audio buffer size for processing frames.
///
/// This constant defines the number of samples handed to the pitch detector
/// per frame (~46ms at 44.1kHz).
pub const BUFFER_SIZE: usize = 2048;

/// Preferred capture sample rate.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Cutoff of the capture high-pass filter.
pub const HIGH_PASS_CUTOFF_HZ: f32 = 100.0;

/// Reference tone amplitude.
const TONE_GAIN: f32 = 0.15;

/// A request to play a sine tone on the output device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneRequest {
    pub frequency: f32,
    pub duration: Duration,
}

/// Builds the second-order Butterworth high-pass used on captured audio.
pub fn high_pass_filter(sample_rate: u32) -> Result<DirectForm1<f32>> {
    let coeffs = Coefficients::<f32>::from_params(
        Type::HighPass,
        (sample_rate as f32).hz(),
        HIGH_PASS_CUTOFF_HZ.hz(),
        Q_BUTTERWORTH_F32,
    )
    .map_err(|e| anyhow!("invalid high-pass parameters: {e:?}"))?;
    Ok(DirectForm1::<f32>::new(coeffs))
}

/// Collects filtered samples and emits fixed-size frames.
pub struct FrameAssembler {
    filter: DirectForm1<f32>,
    buffer: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(sample_rate: u32) -> Result<Self> {
        Ok(Self {
            filter: high_pass_filter(sample_rate)?,
            buffer: Vec::with_capacity(BUFFER_SIZE * 2),
        })
    }

    /// Filters `data` into the pending buffer and calls `emit` once per
    /// complete frame.
    pub fn push(&mut self, data: &[f32], mut emit: impl FnMut(Vec<f32>)) {
        self.buffer.extend(data.iter().map(|&s| self.filter.run(s)));
        while self.buffer.len() >= BUFFER_SIZE {
            emit(self.buffer.drain(..BUFFER_SIZE).collect());
        }
    }
}

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `sender` - Channel sender for streaming frames to the session
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and sample rate
/// * `Err(e)` - Error if audio setup fails
///
/// Frames are dropped when the channel is full so the newest audio is always
/// what the detector sees.
pub fn start_audio_capture(sender: Sender<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!(target: "audio", "using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let sample_rate = clamp_sample_rate(&supported_config, TARGET_SAMPLE_RATE);
    let config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(sample_rate))
        .into();

    info!(target: "audio", "selected input sample rate: {} Hz", sample_rate);

    let mut assembler = FrameAssembler::new(sample_rate)?;
    let err_fn = |err| error!(target: "audio", "input stream error: {}", err);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            assembler.push(data, |frame| {
                let _ = sender.try_send(frame);
            });
        },
        err_fn,
        None,
    )?;

    stream.play().context("failed to start input stream")?;

    Ok((stream, sample_rate))
}

/// Finds the best supported mono f32 configuration for the target rate.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i32 - target_rate as i32).abs();
            let max_diff = (c.max_sample_rate().0 as i32 - target_rate as i32).abs();
            if (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate) {
                0
            } else {
                min_diff.min(max_diff)
            }
        })
}

fn clamp_sample_rate(config: &SupportedStreamConfigRange, target_rate: u32) -> u32 {
    target_rate.clamp(config.min_sample_rate().0, config.max_sample_rate().0)
}

/// Sine oscillator driven by tone requests, run inside the output callback.
pub struct ToneGenerator {
    sample_rate: f32,
    phase: f32,
    phase_inc: f32,
    remaining: usize,
}

impl ToneGenerator {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            phase: 0.0,
            phase_inc: 0.0,
            remaining: 0,
        }
    }

    /// Starts a new tone, replacing any tone still playing.
    pub fn start(&mut self, request: ToneRequest) {
        self.phase = 0.0;
        self.phase_inc = std::f32::consts::TAU * request.frequency / self.sample_rate;
        self.remaining = (request.duration.as_secs_f32() * self.sample_rate).round() as usize;
    }

    pub fn is_playing(&self) -> bool {
        self.remaining > 0
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.remaining == 0 {
            return 0.0;
        }
        self.remaining -= 1;
        let out = TONE_GAIN * self.phase.sin();
        self.phase += self.phase_inc;
        if self.phase > std::f32::consts::TAU {
            self.phase -= std::f32::consts::TAU;
        }
        out
    }
}

/// Opens the default output device and plays tone requests as they arrive.
///
/// # Arguments
/// * `requests` - Tone requests; each one interrupts the previous tone
///
/// # Returns
/// * `Ok(stream)` - The running output stream, which must be kept alive
pub fn start_tone_output(requests: Receiver<ToneRequest>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;

    if config.sample_format() != cpal::SampleFormat::F32 {
        anyhow::bail!("unsupported output sample format (only f32 supported)");
    }

    let channels = config.channels() as usize;
    let mut generator = ToneGenerator::new(config.sample_rate().0);
    info!(target: "audio", "tone output at {} Hz, {} channels", config.sample_rate().0, channels);

    let err_fn = |err| error!(target: "audio", "output stream error: {}", err);

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            while let Ok(request) = requests.try_recv() {
                generator.start(request);
            }
            if !generator.is_playing() {
                data.fill(0.0);
                return;
            }
            for frame in data.chunks_mut(channels) {
                let sample = generator.next_sample();
                frame.fill(sample);
            }
        },
        err_fn,
        None,
    )?;

    stream.play().context("failed to play output stream")?;
    debug!(target: "audio", "tone output started");

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::rms;
    use std::f32::consts::TAU;

    #[test]
    fn assembler_emits_full_frames() {
        let mut assembler = FrameAssembler::new(44_100).unwrap();
        let mut frames = Vec::new();
        assembler.push(&vec![0.1; 3000], |f| frames.push(f));
        assert_eq!(frames.len(), 1);
        assembler.push(&vec![0.1; 1200], |f| frames.push(f));
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.len() == BUFFER_SIZE));
    }

    #[test]
    fn high_pass_removes_hum_and_keeps_notes() {
        let rate = 44_100;
        let tone = |freq: f32| -> Vec<f32> {
            (0..8192).map(|i| (TAU * freq * i as f32 / rate as f32).sin()).collect()
        };
        let settle = 4096;

        let mut filter = high_pass_filter(rate).unwrap();
        let hum: Vec<f32> = tone(20.0).into_iter().map(|s| filter.run(s)).collect();
        let mut filter = high_pass_filter(rate).unwrap();
        let note: Vec<f32> = tone(440.0).into_iter().map(|s| filter.run(s)).collect();

        assert!(rms(&hum[settle..]) < 0.1);
        assert!(rms(&note[settle..]) > 0.6);
    }

    #[test]
    fn tone_generator_plays_for_the_requested_duration() {
        let mut generator = ToneGenerator::new(1000);
        assert_eq!(generator.next_sample(), 0.0);
        generator.start(ToneRequest { frequency: 250.0, duration: Duration::from_millis(10) });
        let samples: Vec<f32> = (0..12).map(|_| generator.next_sample()).collect();
        assert!(samples[..10].iter().any(|s| s.abs() > 0.1));
        assert!(samples[..10].iter().all(|s| s.abs() <= TONE_GAIN));
        assert_eq!(&samples[10..], &[0.0, 0.0]);
        assert!(!generator.is_playing());
    }
}
