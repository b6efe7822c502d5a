use std::fmt;
use std::str::FromStr;

use super::layer::Rgba;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Palette {
    /// Hue sweep from blue (quiet) to red (loud), fading in with intensity
    Spectrum,
    Viridis,
    Magma,
    Inferno,
    Plasma,
    Grayscale,
}

impl Palette {
    pub const ALL: [Palette; 6] = [
        Palette::Spectrum,
        Palette::Viridis,
        Palette::Magma,
        Palette::Inferno,
        Palette::Plasma,
        Palette::Grayscale,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Palette::Spectrum => "spectrum",
            Palette::Viridis => "viridis",
            Palette::Magma => "magma",
            Palette::Inferno => "inferno",
            Palette::Plasma => "plasma",
            Palette::Grayscale => "grayscale",
        }
    }

    /// Unrecognised names fall back to grayscale.
    pub fn from_name(name: &str) -> Palette {
        name.parse().unwrap_or_else(|_| {
            log::warn!("Unknown palette '{}', using grayscale", name);
            Palette::Grayscale
        })
    }

    /// Color for a normalized intensity ratio in [0, 1].
    pub fn color(self, ratio: f32) -> Rgba {
        let r = ratio.clamp(0.0, 1.0);
        match self {
            Palette::Spectrum => hsl_to_rgb(240.0 - r * 240.0, 0.8, 0.5).with_alpha(r),
            Palette::Viridis => sample_stops(&VIRIDIS, r),
            Palette::Magma => sample_stops(&MAGMA, r),
            Palette::Inferno => sample_stops(&INFERNO, r),
            Palette::Plasma => sample_stops(&PLASMA, r),
            Palette::Grayscale => {
                let v = (r * 255.0).round() as u8;
                Rgba::rgb(v, v, v)
            }
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::Spectrum
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Palette::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown palette '{}'", s))
    }
}

// Perceptual ramps, 9 evenly spaced stops each.
const VIRIDIS: [[u8; 3]; 9] = [
    [0x44, 0x01, 0x54],
    [0x47, 0x2c, 0x7a],
    [0x3b, 0x51, 0x8b],
    [0x2c, 0x71, 0x8e],
    [0x21, 0x90, 0x8d],
    [0x27, 0xad, 0x81],
    [0x5c, 0xc8, 0x63],
    [0xaa, 0xdc, 0x32],
    [0xfd, 0xe7, 0x25],
];

const MAGMA: [[u8; 3]; 9] = [
    [0x00, 0x00, 0x04],
    [0x1c, 0x10, 0x44],
    [0x4f, 0x12, 0x7b],
    [0x81, 0x25, 0x81],
    [0xb5, 0x36, 0x7a],
    [0xe5, 0x50, 0x64],
    [0xfb, 0x87, 0x61],
    [0xfe, 0xc2, 0x87],
    [0xfc, 0xfd, 0xbf],
];

const INFERNO: [[u8; 3]; 9] = [
    [0x00, 0x00, 0x04],
    [0x1f, 0x0c, 0x48],
    [0x55, 0x0f, 0x6d],
    [0x88, 0x22, 0x6a],
    [0xba, 0x36, 0x55],
    [0xe3, 0x59, 0x33],
    [0xf9, 0x8c, 0x0a],
    [0xf9, 0xc9, 0x32],
    [0xfc, 0xff, 0xa4],
];

const PLASMA: [[u8; 3]; 9] = [
    [0x0d, 0x08, 0x87],
    [0x4c, 0x02, 0xa1],
    [0x7e, 0x03, 0xa8],
    [0xa9, 0x23, 0x95],
    [0xcc, 0x47, 0x78],
    [0xe5, 0x6b, 0x5d],
    [0xf8, 0x94, 0x41],
    [0xfd, 0xc3, 0x28],
    [0xf0, 0xf9, 0x21],
];

fn sample_stops(stops: &[[u8; 3]], ratio: f32) -> Rgba {
    let pos = ratio * (stops.len() - 1) as f32;
    let idx = (pos.floor() as usize).min(stops.len() - 2);
    let t = pos - idx as f32;
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    let (a, b) = (stops[idx], stops[idx + 1]);
    Rgba::rgb(lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]))
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Rgba {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba::rgb(to_byte(r), to_byte(g), to_byte(b))
}

/// Normalized position of `value` between the thresholds, or `None` when it should not be drawn.
pub fn intensity_ratio(value: u8, min_db: u8, max_db: u8) -> Option<f32> {
    if value <= min_db {
        return None;
    }
    let span = (max_db as f32 - min_db as f32).max(1.0);
    Some(((value as f32 - min_db as f32) / span).clamp(0.0, 1.0))
}

/// Intensity-to-color table; `None` entries are skipped when drawing.
#[derive(Clone, Debug)]
pub struct PaletteLut {
    entries: [Option<Rgba>; 256],
}

impl PaletteLut {
    pub fn build(min_db: u8, max_db: u8, palette: Palette) -> Self {
        let mut entries = [None; 256];
        for (i, entry) in entries.iter_mut().enumerate() {
            *entry = intensity_ratio(i as u8, min_db, max_db).map(|r| palette.color(r));
        }
        Self { entries }
    }

    pub fn get(&self, value: u8) -> Option<Rgba> {
        self.entries[value as usize]
    }
}

/// Lookup table owned by the renderer, rebuilt when the configuration generation moves.
#[derive(Debug, Default)]
pub struct PaletteCache {
    table: Option<(u64, PaletteLut)>,
    rebuilds: usize,
}

impl PaletteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lut(&mut self, generation: u64, min_db: u8, max_db: u8, palette: Palette) -> &PaletteLut {
        let stale = !matches!(&self.table, Some((built, _)) if *built == generation);
        if stale {
            log::debug!(
                "Rebuilding palette LUT: {} ({}..{} dB, generation {})",
                palette,
                min_db,
                max_db,
                generation
            );
            self.table = None;
            self.rebuilds += 1;
        }
        let (_, lut) = self
            .table
            .get_or_insert_with(|| (generation, PaletteLut::build(min_db, max_db, palette)));
        lut
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }
}
