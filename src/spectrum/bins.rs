use crate::music::notes::NoteTable;

/// Sub-bands per semitone lane.
pub const SUB_BANDS: usize = 3;

/// Inclusive FFT bin window for one (note, sub-band) cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinRange {
    pub start: usize,
    pub end: usize,
}

/// Bin windows for every cell of the note table, flattened as `note * SUB_BANDS + k`.
#[derive(Clone, Debug)]
pub struct BinLayout {
    ranges: Vec<BinRange>,
    bin_count: usize,
}

impl BinLayout {
    pub fn new(notes: &NoteTable, sample_rate: u32, fft_size: usize) -> Self {
        let bin_count = fft_size / 2;
        let bin_hz = sample_rate as f32 / fft_size as f32;
        let last = bin_count.saturating_sub(1);
        let lower = 2f32.powf(-0.5 / 36.0);
        let upper = 2f32.powf(0.5 / 36.0);

        let mut ranges = Vec::with_capacity(notes.len() * SUB_BANDS);
        for note in notes.notes() {
            for k in 0..SUB_BANDS {
                let centre = note.frequency_hz * 2f32.powf((k as f32 - 1.0) / 36.0);
                let start = ((centre * lower / bin_hz).floor().max(0.0) as usize).min(last);
                let end = ((centre * upper / bin_hz).ceil().max(0.0) as usize).min(last);
                ranges.push(BinRange {
                    start,
                    end: end.max(start),
                });
            }
        }

        Self { ranges, bin_count }
    }

    pub fn ranges(&self) -> &[BinRange] {
        &self.ranges
    }

    /// Cells per intensity frame.
    pub fn width(&self) -> usize {
        self.ranges.len()
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_ordered_and_in_bounds() {
        let notes = NoteTable::default();
        let layout = BinLayout::new(&notes, 44_100, 8192);
        assert_eq!(layout.width(), notes.len() * SUB_BANDS);
        for r in layout.ranges() {
            assert!(r.start <= r.end);
            assert!(r.end < layout.bin_count());
        }
    }

    #[test]
    fn windows_clamp_above_nyquist() {
        // At 8 kHz the top octaves lie past Nyquist and must clamp to the last bin.
        let notes = NoteTable::default();
        let layout = BinLayout::new(&notes, 8_000, 1024);
        let last = layout.ranges().last().unwrap();
        assert_eq!(*last, BinRange { start: 511, end: 511 });
    }

    #[test]
    fn a4_centre_band_covers_440() {
        let notes = NoteTable::default();
        let layout = BinLayout::new(&notes, 44_100, 8192);
        let a4 = notes.notes().iter().position(|n| n.name == "A4").unwrap();
        let r = layout.ranges()[a4 * SUB_BANDS + 1];
        let bin_hz = 44_100.0 / 8192.0;
        let target = (440.0 / bin_hz) as usize;
        assert!(r.start <= target && target <= r.end);
    }
}
