use clap::Parser;
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::music::notes::PitchClass;
use crate::render::grid::GridConfig;
use crate::render::orchestrator::ViewSettings;
use crate::render::palette::Palette;

#[derive(Parser, Debug)]
#[command(name = "notegram", about = "Musically aligned spectrogram renderer")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Output file: a video (e.g. .mp4), or an image when --at is given
    #[arg(short, long, default_value = "output.mp4")]
    pub output: PathBuf,

    /// Frame width in pixels
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// Render a single still image at this position (seconds)
    #[arg(long)]
    pub at: Option<f32>,

    /// Video start position (seconds)
    #[arg(long, default_value_t = 0.0)]
    pub start: f32,

    /// Horizontal zoom: divisor of the recording length shown across the frame
    #[arg(long, default_value_t = 10.0)]
    pub hzoom: f32,

    /// Semitones visible over the frame height (6-120)
    #[arg(long, default_value_t = 48.0)]
    pub vzoom: f32,

    /// Semitone at the bottom edge, counted from 20 Hz
    #[arg(long, default_value_t = 24.0)]
    pub voffset: f32,

    /// Intensities at or below this byte value are not drawn
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub min_db: String,

    /// Intensity byte value mapped to the top of the palette
    #[arg(long, default_value = "255", allow_hyphen_values = true)]
    pub max_db: String,

    /// Tempo of the beat grid
    #[arg(long, default_value = "120", allow_hyphen_values = true)]
    pub bpm: String,

    /// Grid subdivisions per bar
    #[arg(long, default_value_t = 4)]
    pub grid: u32,

    /// Grid offset in 1/96 bar ticks (0-95)
    #[arg(long, default_value_t = 0)]
    pub grid_offset: u32,

    /// Pitch class to highlight (e.g. A, C#)
    #[arg(long)]
    pub highlight: Option<String>,

    /// Color palette (see --list-palettes)
    #[arg(long, default_value = "spectrum")]
    pub palette: String,

    /// Add the frame-to-frame change overlay
    #[arg(long)]
    pub diff_time: bool,

    /// Add the band-to-band change overlay
    #[arg(long)]
    pub diff_freq: bool,

    /// Font file for labels
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Download the label font from this URL
    #[arg(long)]
    pub font_url: Option<String>,

    /// Show the playback clock
    #[arg(long)]
    pub show_time: bool,

    /// Print the beat grid for the whole recording as JSON and exit
    #[arg(long)]
    pub print_grid: bool,

    /// List available palettes and exit
    #[arg(long)]
    pub list_palettes: bool,

    /// Config file (defaults to notegram.toml or the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Merge: config values apply only where the CLI is still at its default.
    pub fn apply_config(&mut self, cfg: Config) {
        if self.width == config::default_width() { self.width = cfg.output.width; }
        if self.height == config::default_height() { self.height = cfg.output.height; }
        if self.fps == config::default_fps() { self.fps = cfg.output.fps; }
        if self.crf == config::default_crf() { self.crf = cfg.output.crf; }
        if self.codec == config::default_codec() { self.codec = cfg.output.codec; }
        if self.font.is_none() { self.font = cfg.output.font; }
        if self.font_url.is_none() { self.font_url = cfg.output.font_url; }

        if self.hzoom == config::default_hzoom() { self.hzoom = cfg.view.hzoom; }
        if self.vzoom == config::default_vzoom() { self.vzoom = cfg.view.vzoom; }
        if self.voffset == config::default_voffset() { self.voffset = cfg.view.voffset; }
        if self.min_db == config::default_min_db() { self.min_db = cfg.view.min_db; }
        if self.max_db == config::default_max_db() { self.max_db = cfg.view.max_db; }
        if self.palette == config::default_palette() { self.palette = cfg.view.palette; }
        if self.highlight.is_none() { self.highlight = cfg.view.highlight; }
        self.diff_time |= cfg.view.diff_time;
        self.diff_freq |= cfg.view.diff_freq;

        if self.bpm == config::default_bpm() { self.bpm = cfg.grid.bpm; }
        if self.grid == config::default_subdivisions() { self.grid = cfg.grid.subdivisions; }
        if self.grid_offset == 0 { self.grid_offset = cfg.grid.offset_ticks; }
    }

    /// View configuration with every lenient input resolved.
    pub fn view_settings(&self) -> ViewSettings {
        let highlight = self.highlight.as_deref().and_then(|name| {
            let pc = PitchClass::parse_lenient(name);
            if pc.is_none() {
                log::warn!("Unknown pitch class '{}', no highlight", name);
            }
            pc
        });
        ViewSettings {
            horizontal_zoom: self.hzoom,
            vertical_zoom: self.vzoom,
            vertical_offset: self.voffset,
            min_db: config::parse_db(&self.min_db, 0),
            max_db: config::parse_db(&self.max_db, 255),
            palette: Palette::from_name(&self.palette),
            highlight,
            diff_time: self.diff_time,
            diff_freq: self.diff_freq,
            grid: GridConfig::new(config::parse_bpm(&self.bpm), self.grid, self.grid_offset),
        }
    }
}
