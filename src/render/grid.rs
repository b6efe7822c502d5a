use serde::Serialize;

use super::viewport::TimeWindow;

pub const DEFAULT_BPM: f32 = 120.0;
pub const MAX_BPM: f32 = 999.0;
pub const MAX_SUBDIVISIONS: u32 = 64;
/// Grid offset resolution: ticks per bar.
pub const TICKS_PER_BAR: u32 = 96;

/// Tempo grid settings. Bars are always four beats long.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridConfig {
    pub bpm: f32,
    pub subdivisions: u32,
    pub offset_ticks: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            subdivisions: 4,
            offset_ticks: 0,
        }
    }
}

impl GridConfig {
    /// Builds a config with out-of-range values replaced: BPM ≤ 0 becomes 120 and
    /// faster tempos are capped at 999, subdivisions are kept within 1..=64, and offsets
    /// are clamped to one bar. The caps bound the number of lines per second of audio.
    pub fn new(bpm: f32, subdivisions: u32, offset_ticks: u32) -> Self {
        Self {
            bpm: if bpm.is_finite() && bpm > 0.0 {
                bpm.min(MAX_BPM)
            } else {
                DEFAULT_BPM
            },
            subdivisions: subdivisions.clamp(1, MAX_SUBDIVISIONS),
            offset_ticks: offset_ticks.min(TICKS_PER_BAR - 1),
        }
    }

    pub fn bar_seconds(&self) -> f32 {
        240.0 / self.bpm
    }

    pub fn step_seconds(&self) -> f32 {
        self.bar_seconds() / self.subdivisions as f32
    }

    pub fn offset_seconds(&self) -> f32 {
        self.offset_ticks as f32 / TICKS_PER_BAR as f32 * self.bar_seconds()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GridLine {
    pub time: f32,
    pub is_bar: bool,
    /// 1-based, present only on bar lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar_number: Option<i64>,
}

/// Grid lines inside `window`, limited to `[0, duration]`, in increasing time order.
pub fn grid_lines(config: &GridConfig, window: TimeWindow, duration: f32) -> Vec<GridLine> {
    let config = GridConfig::new(config.bpm, config.subdivisions, config.offset_ticks);
    let step = config.step_seconds() as f64;
    let offset = config.offset_seconds() as f64;
    let div = config.subdivisions as i64;
    let (start, end) = (window.start as f64, window.end as f64);

    let mut lines = Vec::new();
    if !(start.is_finite() && end.is_finite()) || end < start {
        return lines;
    }

    let mut idx = ((start - offset) / step).ceil() as i64;
    let mut t = offset + idx as f64 * step;
    while t <= end {
        if t >= 0.0 && t <= duration as f64 {
            let is_bar = idx.rem_euclid(div) == 0;
            lines.push(GridLine {
                time: t as f32,
                is_bar,
                bar_number: is_bar.then(|| idx.div_euclid(div) + 1),
            });
        }
        idx += 1;
        t = offset + idx as f64 * step;
    }
    lines
}
