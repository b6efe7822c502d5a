use super::matrix::IntensityMatrix;

/// Scale applied to a differential value before it is added to the raw intensity.
// Fixed for now; a UI weight control would replace this constant.
pub const OVERLAY_WEIGHT: f32 = 1.5;

/// Absolute finite differences of the intensity matrix, same shape as the matrix.
///
/// `time[i][j] = |m[i][j] - m[i-1][j]|` and `freq[i][j] = |m[i][j] - m[i][j+1]|`.
/// Entries without a neighbour compare against themselves, so matrix edges are zero.
#[derive(Clone, Debug, Default)]
pub struct DifferentialOverlays {
    time: Vec<u8>,
    freq: Vec<u8>,
    width: usize,
}

impl DifferentialOverlays {
    pub fn compute(matrix: &IntensityMatrix) -> Self {
        let width = matrix.width();
        let mut time = Vec::with_capacity(matrix.len() * width);
        let mut freq = Vec::with_capacity(matrix.len() * width);

        let mut prev: Option<&[u8]> = None;
        for row in matrix.frames() {
            match prev {
                Some(p) => time.extend(row.iter().zip(p).map(|(c, p)| c.abs_diff(*p))),
                None => time.extend(std::iter::repeat(0).take(row.len())),
            }
            freq.extend(row.windows(2).map(|w| w[0].abs_diff(w[1])));
            if !row.is_empty() {
                freq.push(0);
            }
            prev = Some(row);
        }

        Self { time, freq, width }
    }

    pub fn time_frame(&self, index: usize) -> &[u8] {
        &self.time[index * self.width..(index + 1) * self.width]
    }

    pub fn freq_frame(&self, index: usize) -> &[u8] {
        &self.freq[index * self.width..(index + 1) * self.width]
    }
}

/// Add the enabled overlays to a raw intensity, saturating at 255.
pub fn apply_overlays(raw: u8, time: Option<u8>, freq: Option<u8>) -> u8 {
    let mut value = raw as f32;
    if let Some(t) = time {
        value += t as f32 * OVERLAY_WEIGHT;
    }
    if let Some(f) = freq {
        value += f as f32 * OVERLAY_WEIGHT;
    }
    value.min(255.0) as u8
}
