//! Builds the lane, data and grid layers for the current view.
//!
//! Lanes and grid are cached and only rebuilt when a setter changes something they depend on.
//! The data layer follows the playback position and is rebuilt on every call to [`render`].
//!
//! [`render`]: RenderOrchestrator::render

use crate::music::notes::PitchClass;
use crate::spectrum::bins::SUB_BANDS;
use crate::spectrum::overlay::apply_overlays;
use crate::spectrum::Spectrogram;

use super::grid::{grid_lines, GridConfig};
use super::layer::{Layers, Rgba};
use super::palette::{Palette, PaletteCache};
use super::viewport::{
    clamp_vertical_zoom, max_vertical_offset, HorizontalTransform, VerticalTransform, ViewportState,
};

const LABEL_ZOOM_ALL: f32 = 49.0;
const LABEL_ZOOM_G: f32 = 73.0;
const HIGHLIGHT_LABEL: Rgba = Rgba::rgb(0, 255, 0);
const LABEL_GREY: Rgba = Rgba::rgb(0x77, 0x77, 0x77);
const BAR_YELLOW: Rgba = Rgba::rgb(255, 255, 0);

/// Complete configuration bundle applied in one go (e.g. from CLI and config file).
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSettings {
    pub horizontal_zoom: f32,
    pub vertical_zoom: f32,
    pub vertical_offset: f32,
    pub min_db: u8,
    pub max_db: u8,
    pub palette: Palette,
    pub highlight: Option<PitchClass>,
    pub diff_time: bool,
    pub diff_freq: bool,
    pub grid: GridConfig,
}

impl Default for ViewSettings {
    fn default() -> Self {
        let view = ViewportState::default();
        Self {
            horizontal_zoom: view.horizontal_zoom,
            vertical_zoom: view.vertical_zoom,
            vertical_offset: view.vertical_offset,
            min_db: view.min_db,
            max_db: view.max_db,
            palette: Palette::default(),
            highlight: None,
            diff_time: false,
            diff_freq: false,
            grid: GridConfig::default(),
        }
    }
}

/// How many times each layer has been built. Useful to confirm caching behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub lane_builds: usize,
    pub grid_builds: usize,
    pub data_builds: usize,
    pub palette_builds: usize,
}

#[derive(Clone, Copy, Debug)]
struct Dirty {
    lanes: bool,
    grid: bool,
}

pub struct RenderOrchestrator {
    spectrogram: Spectrogram,
    view: ViewportState,
    grid: GridConfig,
    palette: Palette,
    highlight: Option<PitchClass>,
    diff_time: bool,
    diff_freq: bool,
    width: u32,
    height: u32,
    max_offset: f32,
    generation: u64,
    palette_cache: PaletteCache,
    dirty: Dirty,
    layers: Layers,
    stats: RenderStats,
}

impl RenderOrchestrator {
    /// Rendering is only possible once analysis has produced a [`Spectrogram`].
    pub fn new(spectrogram: Spectrogram, width: u32, height: u32) -> Self {
        let max_offset = max_vertical_offset(spectrogram.sample_rate, spectrogram.notes.min_freq());
        Self {
            spectrogram,
            view: ViewportState::default(),
            grid: GridConfig::default(),
            palette: Palette::default(),
            highlight: None,
            diff_time: false,
            diff_freq: false,
            width,
            height,
            max_offset,
            generation: 0,
            palette_cache: PaletteCache::new(),
            dirty: Dirty {
                lanes: true,
                grid: true,
            },
            layers: Layers::default(),
            stats: RenderStats::default(),
        }
    }

    pub fn apply(&mut self, settings: &ViewSettings) {
        self.set_horizontal_zoom(settings.horizontal_zoom);
        self.set_vertical_zoom(settings.vertical_zoom);
        self.set_vertical_offset(settings.vertical_offset);
        self.set_db_range(settings.min_db, settings.max_db);
        self.set_palette(settings.palette);
        self.set_highlight(settings.highlight);
        self.set_overlays(settings.diff_time, settings.diff_freq);
        self.set_grid(settings.grid);
    }

    pub fn spectrogram(&self) -> &Spectrogram {
        &self.spectrogram
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.view
    }

    pub fn grid_config(&self) -> &GridConfig {
        &self.grid
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            palette_builds: self.palette_cache.rebuilds(),
            ..self.stats
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.dirty.lanes = true;
            self.dirty.grid = true;
        }
    }

    pub fn set_horizontal_zoom(&mut self, zoom: f32) {
        if !(zoom.is_finite() && zoom > 0.0) {
            log::warn!("Ignoring horizontal zoom {}", zoom);
            return;
        }
        if zoom != self.view.horizontal_zoom {
            self.view.horizontal_zoom = zoom;
            self.dirty.grid = true;
        }
    }

    pub fn set_vertical_zoom(&mut self, zoom: f32) {
        let zoom = clamp_vertical_zoom(zoom);
        if zoom != self.view.vertical_zoom {
            self.view.vertical_zoom = zoom;
            self.dirty.lanes = true;
        }
    }

    pub fn set_vertical_offset(&mut self, offset: f32) {
        let offset = if offset.is_finite() {
            offset.clamp(0.0, self.max_offset)
        } else {
            0.0
        };
        if offset != self.view.vertical_offset {
            self.view.vertical_offset = offset;
            self.dirty.lanes = true;
        }
    }

    /// Vertical zoom step that keeps the centre semitone in place.
    pub fn zoom_vertical_about_center(&mut self, delta: f32) {
        let mut view = self.view;
        view.zoom_vertical_about_center(delta);
        self.set_vertical_zoom(view.vertical_zoom);
        self.set_vertical_offset(view.vertical_offset);
    }

    pub fn set_db_range(&mut self, min_db: u8, max_db: u8) {
        if (min_db, max_db) != (self.view.min_db, self.view.max_db) {
            self.view.min_db = min_db;
            self.view.max_db = max_db;
            self.generation += 1;
        }
    }

    pub fn set_palette(&mut self, palette: Palette) {
        if palette != self.palette {
            self.palette = palette;
            self.generation += 1;
        }
    }

    pub fn set_highlight(&mut self, highlight: Option<PitchClass>) {
        if highlight != self.highlight {
            self.highlight = highlight;
            self.dirty.lanes = true;
        }
    }

    pub fn set_overlays(&mut self, diff_time: bool, diff_freq: bool) {
        self.diff_time = diff_time;
        self.diff_freq = diff_freq;
    }

    pub fn set_grid(&mut self, grid: GridConfig) {
        let grid = GridConfig::new(grid.bpm, grid.subdivisions, grid.offset_ticks);
        if grid != self.grid {
            self.grid = grid;
            self.dirty.grid = true;
        }
    }

    pub fn set_position(&mut self, seconds: f32) {
        let seconds = if seconds.is_finite() {
            seconds.clamp(0.0, self.spectrogram.duration.max(0.0))
        } else {
            0.0
        };
        if seconds != self.view.position {
            self.view.position = seconds;
            self.dirty.grid = true;
        }
    }

    pub fn vertical(&self) -> VerticalTransform {
        VerticalTransform::new(
            self.height as f32,
            self.view.vertical_zoom,
            self.view.vertical_offset,
        )
    }

    pub fn horizontal(&self) -> HorizontalTransform {
        HorizontalTransform::new(
            self.width as f32,
            self.spectrogram.matrix.len(),
            self.spectrogram.duration,
            self.view.position,
            self.view.horizontal_zoom,
            self.spectrogram.hop_seconds(),
        )
    }

    /// Bring every layer up to date with the current state and return them.
    pub fn render(&mut self) -> &Layers {
        if self.spectrogram.is_empty() || self.width == 0 || self.height == 0 {
            self.layers = Layers::default();
            self.dirty = Dirty {
                lanes: true,
                grid: true,
            };
            return &self.layers;
        }

        if self.dirty.lanes {
            self.build_lanes();
            self.dirty.lanes = false;
        }
        if self.dirty.grid {
            self.build_grid();
            self.dirty.grid = false;
        }
        self.build_data();

        &self.layers
    }

    fn build_lanes(&mut self) {
        let v = self.vertical();
        let (w, h) = (self.width as f32, self.height as f32);
        let row = v.row_height();
        let zoom = self.view.vertical_zoom;

        let background = &mut self.layers.lanes;
        let labels = &mut self.layers.labels;
        background.clear();
        labels.clear();
        background.fill_rect(0.0, 0.0, w, h, Rgba::BLACK);

        for note in self.spectrogram.notes.notes() {
            let cy = v.pixel_y(note.semitone_offset);
            if !v.is_row_visible(cy) {
                continue;
            }
            let highlighted = self.highlight == Some(note.pitch_class);
            let band_alpha = if highlighted {
                0.12
            } else if note.pitch_class.is_sharp() {
                0.02
            } else {
                0.05
            };
            background.fill_rect(0.0, cy - row / 2.0, w, row, Rgba::white(band_alpha));
            background.line((0.0, cy + row / 2.0), (w, cy + row / 2.0), 1.0, Rgba::white(0.05));

            let labelled = highlighted
                || (zoom <= LABEL_ZOOM_G && note.pitch_class == PitchClass::G)
                || zoom <= LABEL_ZOOM_ALL;
            if labelled {
                let (size, color) = if highlighted {
                    (10.0, HIGHLIGHT_LABEL)
                } else {
                    (9.0, LABEL_GREY)
                };
                labels.text(5.0, cy + 3.0, note.name.as_str(), size, highlighted, color);
            }
        }

        self.stats.lane_builds += 1;
        log::trace!(
            "Lane layer rebuilt: {} primitives, {} labels",
            background.len(),
            labels.len()
        );
    }

    fn build_grid(&mut self) {
        let hz = self.horizontal();
        let (w, h) = (self.width as f32, self.height as f32);
        let layer = &mut self.layers.grid;
        layer.clear();

        if hz.half_width > 0 {
            let lines = grid_lines(&self.grid, hz.time_window(), self.spectrogram.duration);
            for line in &lines {
                let x = hz.time_to_x(line.time);
                if !(0.0..=w).contains(&x) {
                    continue;
                }
                match line.bar_number {
                    Some(bar) if line.is_bar => {
                        layer.line((x, 0.0), (x, h), 2.0, BAR_YELLOW.with_alpha(0.6));
                        layer.text(x + 4.0, h - 10.0, bar.to_string(), 10.0, false, BAR_YELLOW.with_alpha(0.4));
                    }
                    _ => layer.line((x, 0.0), (x, h), 1.0, Rgba::white(0.1)),
                }
            }
        }

        self.stats.grid_builds += 1;
        log::trace!("Grid layer rebuilt: {} primitives", layer.len());
    }

    fn build_data(&mut self) {
        let v = self.vertical();
        let hz = self.horizontal();
        let Self {
            spectrogram,
            view,
            palette,
            diff_time,
            diff_freq,
            generation,
            palette_cache,
            layers,
            stats,
            ..
        } = self;
        let layer = &mut layers.data;
        layer.clear();
        stats.data_builds += 1;

        let col_w = hz.column_width();
        let frames = hz.visible_frames();
        if col_w <= 0.0 || frames.is_empty() {
            return;
        }

        let sub = v.sub_row_height();
        let lut = palette_cache.lut(*generation, view.min_db, view.max_db, *palette);
        let (matrix, overlays) = (&spectrogram.matrix, &spectrogram.overlays);

        for (n, note) in spectrogram.notes.notes().iter().enumerate() {
            let cy = v.pixel_y(note.semitone_offset);
            if !v.is_row_visible(cy) {
                continue;
            }
            for k in 0..SUB_BANDS {
                let sub_y = cy + (1.0 - k as f32) * sub - sub / 2.0;
                let cell = n * SUB_BANDS + k;
                for frame in frames.clone() {
                    let value = apply_overlays(
                        matrix.frame(frame)[cell],
                        (*diff_time).then(|| overlays.time_frame(frame)[cell]),
                        (*diff_freq).then(|| overlays.freq_frame(frame)[cell]),
                    );
                    if let Some(color) = lut.get(value) {
                        let x = hz.pixel_x(frame as i64);
                        layer.fill_rect(x, sub_y, col_w + 0.8, sub + 0.3, color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::notes::NoteTable;
    use crate::render::layer::Primitive;
    use crate::spectrum::RawSpectrum;

    const WIDTH: u32 = 640;
    const HEIGHT: u32 = 360;

    /// 400 hops of a 8 kHz / 1024-point analysis with a ramp of values in every bin.
    fn spectrogram(frames: usize) -> Spectrogram {
        let raw = RawSpectrum {
            frames: (0..frames)
                .map(|i| (0..512).map(|b| ((i + b) % 200) as u8 + 20).collect())
                .collect(),
            sample_rate: 8_000,
            fft_size: 1024,
            hop_size: 256,
            duration: frames as f32 * 256.0 / 8_000.0,
        };
        Spectrogram::build(&raw, NoteTable::default()).unwrap()
    }

    fn orchestrator() -> RenderOrchestrator {
        let mut o = RenderOrchestrator::new(spectrogram(400), WIDTH, HEIGHT);
        o.apply(&ViewSettings {
            horizontal_zoom: 4.0,
            vertical_zoom: 24.0,
            vertical_offset: 40.0,
            ..ViewSettings::default()
        });
        o.set_position(6.4);
        o
    }

    fn texts(layer: &crate::render::layer::Layer) -> Vec<(String, Rgba)> {
        layer
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { text, color, .. } => Some((text.clone(), *color)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_recording_draws_nothing() {
        let mut o = RenderOrchestrator::new(spectrogram(0), WIDTH, HEIGHT);
        assert!(o.render().is_empty());
    }

    #[test]
    fn zero_sized_viewport_draws_nothing() {
        let mut o = orchestrator();
        o.resize(0, 0);
        assert!(o.render().is_empty());
    }

    #[test]
    fn position_change_rebuilds_grid_and_data_only() {
        let mut o = orchestrator();
        o.render();
        let first = o.stats();
        assert_eq!((first.lane_builds, first.grid_builds, first.data_builds), (1, 1, 1));

        o.set_position(7.0);
        o.render();
        let second = o.stats();
        assert_eq!(second.lane_builds, 1);
        assert_eq!(second.grid_builds, 2);
        assert_eq!(second.data_builds, 2);
    }

    #[test]
    fn unchanged_state_skips_cached_layers() {
        let mut o = orchestrator();
        o.render();
        o.set_vertical_zoom(24.0);
        o.set_grid(GridConfig::default());
        o.render();
        let stats = o.stats();
        assert_eq!((stats.lane_builds, stats.grid_builds, stats.data_builds), (1, 1, 2));
        assert_eq!(stats.palette_builds, 1);
    }

    #[test]
    fn lane_inputs_mark_lanes_dirty() {
        let mut o = orchestrator();
        o.render();
        o.set_highlight(Some(PitchClass::A));
        o.render();
        o.set_vertical_offset(41.0);
        o.render();
        o.resize(800, 360);
        o.render();
        assert_eq!(o.stats().lane_builds, 4);
    }

    #[test]
    fn palette_rebuilds_follow_generation() {
        let mut o = orchestrator();
        o.render();
        o.render();
        assert_eq!(o.stats().palette_builds, 1);
        o.set_palette(Palette::Magma);
        o.render();
        o.set_db_range(30, 200);
        o.render();
        o.render();
        assert_eq!(o.stats().palette_builds, 3);
        assert_eq!(o.stats().lane_builds, 1);
    }

    #[test]
    fn highlighted_lane_gets_green_label() {
        let mut o = orchestrator();
        o.set_vertical_zoom(80.0);
        o.set_highlight(Some(PitchClass::A));
        let labels = texts(&o.render().labels);
        assert!(!labels.is_empty());
        assert!(labels
            .iter()
            .all(|(text, color)| text.starts_with('A') && !text.starts_with("A#") && *color == HIGHLIGHT_LABEL));
    }

    #[test]
    fn label_density_follows_zoom() {
        let mut o = orchestrator();
        o.set_vertical_zoom(60.0);
        let mid = texts(&o.render().labels);
        assert!(!mid.is_empty());
        assert!(mid.iter().all(|(text, _)| text.starts_with('G') && !text.starts_with("G#")));

        o.set_vertical_zoom(24.0);
        let close = texts(&o.render().labels);
        assert!(close.len() > mid.len());
    }

    #[test]
    fn data_cells_stay_in_view_columns() {
        let mut o = orchestrator();
        let layers = o.render();
        assert!(!layers.data.is_empty());
        for p in &layers.data.primitives {
            let Primitive::FillRect { x, .. } = p else {
                panic!("data layer holds only cells");
            };
            assert!(*x >= 0.0 && *x < WIDTH as f32);
        }
    }

    #[test]
    fn min_threshold_above_data_skips_every_cell() {
        let mut o = orchestrator();
        o.set_db_range(250, 255);
        assert!(o.render().data.is_empty());
    }

    #[test]
    fn overlays_brighten_cells() {
        let mut plain = orchestrator();
        plain.set_db_range(150, 255);
        plain.set_palette(Palette::Grayscale);
        let base = plain.render().data.len();

        let mut boosted = orchestrator();
        boosted.set_db_range(150, 255);
        boosted.set_palette(Palette::Grayscale);
        boosted.set_overlays(true, true);
        assert!(boosted.render().data.len() > base);
    }

    #[test]
    fn grid_marks_bars_with_numbers() {
        let mut o = orchestrator();
        let layers = o.render();
        let bars = texts(&layers.grid);
        assert!(!bars.is_empty());
        assert!(bars.iter().all(|(text, _)| text.parse::<i64>().is_ok()));
    }

    #[test]
    fn grid_settings_are_sanitized() {
        let mut o = orchestrator();
        o.set_grid(GridConfig {
            bpm: 1e7,
            subdivisions: 0,
            offset_ticks: 500,
        });
        assert_eq!(*o.grid_config(), GridConfig::new(1e7, 0, 500));
        assert_eq!(o.grid_config().bpm, crate::render::grid::MAX_BPM);
        assert_eq!(o.grid_config().subdivisions, 1);
        assert!(!o.render().grid.is_empty());
    }

    #[test]
    fn vertical_inputs_are_clamped() {
        let mut o = orchestrator();
        o.set_vertical_zoom(2.0);
        assert_eq!(o.viewport().vertical_zoom, 6.0);
        o.set_vertical_offset(-10.0);
        assert_eq!(o.viewport().vertical_offset, 0.0);
        o.zoom_vertical_about_center(1000.0);
        assert_eq!(o.viewport().vertical_zoom, 120.0);
    }
}
