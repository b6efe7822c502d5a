use anyhow::{ensure, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::decode::AudioData;
use crate::spectrum::RawSpectrum;

pub const FFT_SIZE: usize = 8192;
pub const HOP_SIZE: usize = 1024;

/// Frames transformed per parallel batch. Bounds the memory held by unsmoothed magnitudes.
const CHUNK_FRAMES: usize = 256;

/// Windowed-FFT analyzer settings. Output is one byte per bin, like a browser analyser node.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerSettings {
    pub fft_size: usize,
    pub hop_size: usize,
    /// Time smoothing constant in [0, 1).
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            fft_size: FFT_SIZE,
            hop_size: HOP_SIZE,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

/// Analyze the whole recording into `ceil(samples / hop)` byte frames of `fft_size / 2` bins.
pub fn analyze(audio: &AudioData, settings: &AnalyzerSettings) -> Result<RawSpectrum> {
    let fft_size = settings.fft_size;
    let hop = settings.hop_size;
    ensure!(fft_size >= 2 && fft_size % 2 == 0, "FFT size must be even, got {}", fft_size);
    ensure!(hop > 0, "Hop size must be positive");
    ensure!(
        settings.max_decibels > settings.min_decibels,
        "Decibel range is empty: {} .. {}",
        settings.min_decibels,
        settings.max_decibels
    );

    let samples = &audio.samples;
    let frame_count = samples.len().div_ceil(hop);
    let half = fft_size / 2;
    let smoothing = settings.smoothing.clamp(0.0, 0.999);

    log::info!(
        "Spectrum analysis: {} frames (fft={}, hop={}, smoothing={:.2})",
        frame_count,
        fft_size,
        hop,
        smoothing
    );

    let window = blackman_window(fft_size);
    let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);

    let pb = ProgressBar::new(frame_count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} hops ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let mut smoothed = vec![0.0f32; half];
    let mut frames = Vec::with_capacity(frame_count);

    for chunk_start in (0..frame_count).step_by(CHUNK_FRAMES) {
        let chunk_end = (chunk_start + CHUNK_FRAMES).min(frame_count);
        let magnitudes: Vec<Vec<f32>> = (chunk_start..chunk_end)
            .into_par_iter()
            .map_init(
                || vec![Complex::new(0.0, 0.0); fft_size],
                |buffer, index| frame_magnitudes(samples, index, hop, &window, &fft, buffer),
            )
            .collect();

        // Smoothing runs across hops, so it stays sequential.
        for mags in magnitudes {
            for (s, m) in smoothed.iter_mut().zip(&mags) {
                *s = smoothing * *s + (1.0 - smoothing) * m;
            }
            frames.push(
                smoothed
                    .iter()
                    .map(|&m| magnitude_to_byte(m, settings.min_decibels, settings.max_decibels))
                    .collect(),
            );
        }
        pb.set_position(chunk_end as u64);
    }
    pb.finish_and_clear();

    Ok(RawSpectrum {
        frames,
        sample_rate: audio.sample_rate,
        fft_size,
        hop_size: hop,
        duration: audio.duration(),
    })
}

/// Normalized magnitudes for the window ending at sample `(index + 1) * hop`.
fn frame_magnitudes(
    samples: &[f32],
    index: usize,
    hop: usize,
    window: &[f32],
    fft: &Arc<dyn Fft<f32>>,
    buffer: &mut [Complex<f32>],
) -> Vec<f32> {
    let size = window.len();
    let end = (index + 1) * hop;
    for (i, slot) in buffer.iter_mut().enumerate() {
        // Samples before the start of the recording are silence.
        let sample = (end + i)
            .checked_sub(size)
            .and_then(|pos| samples.get(pos))
            .copied()
            .unwrap_or(0.0);
        *slot = Complex::new(sample * window[i], 0.0);
    }
    fft.process(buffer);

    let scale = 1.0 / size as f32;
    buffer[..size / 2].iter().map(|c| c.norm() * scale).collect()
}

fn blackman_window(size: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            A0 - A1 * (2.0 * std::f32::consts::PI * x).cos()
                + A2 * (4.0 * std::f32::consts::PI * x).cos()
        })
        .collect()
}

/// Linear magnitude to a byte spanning `[min_db, max_db]`.
fn magnitude_to_byte(magnitude: f32, min_db: f32, max_db: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (255.0 / (max_db - min_db) * (db - min_db)).floor();
    scaled.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> AudioData {
        AudioData {
            samples: (0..len)
                .map(|i| {
                    amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
                })
                .collect(),
            sample_rate,
        }
    }

    fn small_settings() -> AnalyzerSettings {
        AnalyzerSettings {
            fft_size: 1024,
            hop_size: 256,
            ..AnalyzerSettings::default()
        }
    }

    #[test]
    fn frame_count_and_length() {
        let audio = tone(440.0, 0.5, 8_000, 8_001);
        let raw = analyze(&audio, &small_settings()).unwrap();
        assert_eq!(raw.frames.len(), 32);
        assert!(raw.frames.iter().all(|f| f.len() == 512));
        assert_eq!(raw.fft_size, 1024);
        assert_eq!(raw.hop_size, 256);
        assert!((raw.duration - 8_001.0 / 8_000.0).abs() < 1e-6);
    }

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        // 8000 / 1024 = 7.8125 Hz per bin, so 1 kHz sits exactly on bin 128.
        let audio = tone(1_000.0, 0.001, 8_000, 8_000);
        let raw = analyze(&audio, &small_settings()).unwrap();
        let frame = &raw.frames[20];
        let peak = frame
            .iter()
            .enumerate()
            .max_by_key(|(_, v)| **v)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 128);
        assert!(frame[128] > 0);
        assert_eq!(frame[300], 0);
    }

    #[test]
    fn silence_and_empty_input() {
        let silent = AudioData {
            samples: vec![0.0; 1000],
            sample_rate: 8_000,
        };
        let raw = analyze(&silent, &small_settings()).unwrap();
        assert!(raw.frames.iter().flatten().all(|&b| b == 0));

        let empty = AudioData {
            samples: Vec::new(),
            sample_rate: 8_000,
        };
        assert!(analyze(&empty, &small_settings()).unwrap().frames.is_empty());
    }

    #[test]
    fn rejects_bad_settings() {
        let audio = tone(440.0, 0.5, 8_000, 100);
        let zero_hop = AnalyzerSettings {
            hop_size: 0,
            ..small_settings()
        };
        assert!(analyze(&audio, &zero_hop).is_err());
    }

    #[test]
    fn byte_mapping_follows_decibel_range() {
        assert_eq!(magnitude_to_byte(0.0, -100.0, -30.0), 0);
        assert_eq!(magnitude_to_byte(1.0, -100.0, -30.0), 255);
        // -65 dB is the middle of the range.
        let mid = magnitude_to_byte(10f32.powf(-65.0 / 20.0), -100.0, -30.0);
        assert!((126..=128).contains(&mid));
    }
}
