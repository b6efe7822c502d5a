//! Note-aligned spectrogram data, built once per recording.

pub mod bins;
pub mod matrix;
pub mod overlay;

use thiserror::Error;

use crate::music::notes::NoteTable;
use bins::BinLayout;
use matrix::IntensityMatrix;
use overlay::DifferentialOverlays;

#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("frame has {actual} bins, expected fft_size/2 = {expected}")]
    BinCountMismatch { expected: usize, actual: usize },
    #[error("frame {index} has {actual} bins, expected {expected}")]
    RaggedFrames {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// Byte magnitude frames as produced by the windowed-FFT analyzer, one per hop.
#[derive(Clone, Debug)]
pub struct RawSpectrum {
    pub frames: Vec<Vec<u8>>,
    pub sample_rate: u32,
    pub fft_size: usize,
    pub hop_size: usize,
    pub duration: f32,
}

/// Everything the renderer reads about a loaded recording. Immutable after construction.
#[derive(Clone, Debug)]
pub struct Spectrogram {
    pub notes: NoteTable,
    pub layout: BinLayout,
    pub matrix: IntensityMatrix,
    pub overlays: DifferentialOverlays,
    pub sample_rate: u32,
    pub hop_size: usize,
    pub duration: f32,
}

impl Spectrogram {
    pub fn build(raw: &RawSpectrum, notes: NoteTable) -> Result<Self, SpectrumError> {
        let layout = BinLayout::new(&notes, raw.sample_rate, raw.fft_size);
        let matrix = IntensityMatrix::build(&raw.frames, &layout)?;
        let overlays = DifferentialOverlays::compute(&matrix);

        log::info!(
            "Intensity matrix: {} frames x {} cells ({} notes)",
            matrix.len(),
            matrix.width(),
            notes.len()
        );

        Ok(Self {
            notes,
            layout,
            matrix,
            overlays,
            sample_rate: raw.sample_rate,
            hop_size: raw.hop_size,
            duration: raw.duration,
        })
    }

    /// Seconds between successive matrix frames.
    pub fn hop_seconds(&self) -> f32 {
        self.hop_size as f32 / self.sample_rate.max(1) as f32
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty() || self.duration <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_from_raw_frames() {
        let raw = RawSpectrum {
            frames: vec![vec![0u8; 512]; 4],
            sample_rate: 8_000,
            fft_size: 1024,
            hop_size: 256,
            duration: 0.128,
        };
        let sg = Spectrogram::build(&raw, NoteTable::default()).unwrap();
        assert_eq!(sg.matrix.len(), 4);
        assert!((sg.hop_seconds() - 0.032).abs() < 1e-6);
        assert!(!sg.is_empty());
    }

    #[test]
    fn no_frames_is_empty() {
        let raw = RawSpectrum {
            frames: Vec::new(),
            sample_rate: 44_100,
            fft_size: 8192,
            hop_size: 1024,
            duration: 0.0,
        };
        let sg = Spectrogram::build(&raw, NoteTable::default()).unwrap();
        assert!(sg.is_empty());
    }
}
