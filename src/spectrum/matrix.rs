use rayon::prelude::*;

use super::bins::BinLayout;
use super::SpectrumError;

/// Note-aligned intensities: one row per analysis hop, one byte per (note, sub-band).
///
/// Rows are stored contiguously; `frame(i)` slices row `i`.
#[derive(Clone, Debug, Default)]
pub struct IntensityMatrix {
    data: Vec<u8>,
    width: usize,
    len: usize,
}

impl IntensityMatrix {
    /// Reduce raw magnitude-bin frames onto the note layout.
    ///
    /// Each cell takes the maximum bin value in its window rather than the mean, so a narrow
    /// transient inside a sub-band keeps its full level.
    pub fn build(frames: &[Vec<u8>], layout: &BinLayout) -> Result<Self, SpectrumError> {
        let width = layout.width();
        let Some(first) = frames.first() else {
            return Ok(Self {
                data: Vec::new(),
                width,
                len: 0,
            });
        };

        if first.len() != layout.bin_count() {
            return Err(SpectrumError::BinCountMismatch {
                expected: layout.bin_count(),
                actual: first.len(),
            });
        }
        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.len() != first.len())
        {
            return Err(SpectrumError::RaggedFrames {
                index,
                expected: first.len(),
                actual: frame.len(),
            });
        }

        let mut data = vec![0u8; frames.len() * width];
        if width > 0 {
            data.par_chunks_mut(width)
                .zip(frames.par_iter())
                .for_each(|(row, bins)| {
                    for (cell, range) in row.iter_mut().zip(layout.ranges()) {
                        *cell = bins[range.start..=range.end]
                            .iter()
                            .copied()
                            .max()
                            .unwrap_or(0);
                    }
                });
        }

        Ok(Self {
            data,
            width,
            len: frames.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cells per frame (notes × sub-bands).
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn frame(&self, index: usize) -> &[u8] {
        &self.data[index * self.width..(index + 1) * self.width]
    }

    pub fn frames(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks(self.width.max(1)).take(self.len)
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[Vec<u8>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        Self {
            data: rows.concat(),
            width,
            len: rows.len(),
        }
    }
}
