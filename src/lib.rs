//! Musically aligned spectrogram rendering.
//!
//! Audio is analyzed once into byte spectra, folded onto a semitone grid with three sub-bands per
//! note, and drawn as cached layers under independent horizontal and vertical zoom.

pub mod audio;
pub mod cli;
pub mod config;
pub mod encode;
pub mod music;
pub mod playback;
pub mod render;
pub mod spectrum;
