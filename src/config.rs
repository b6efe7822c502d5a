use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::render::grid::DEFAULT_BPM;

pub const CONFIG_FILE: &str = "notegram.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub grid: GridSection,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default)]
    pub font_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_hzoom")]
    pub hzoom: f32,
    #[serde(default = "default_vzoom")]
    pub vzoom: f32,
    #[serde(default = "default_voffset")]
    pub voffset: f32,
    /// Numbers or strings; parsed leniently like the CLI value.
    #[serde(default = "default_min_db", deserialize_with = "lenient_text")]
    pub min_db: String,
    #[serde(default = "default_max_db", deserialize_with = "lenient_text")]
    pub max_db: String,
    #[serde(default = "default_palette")]
    pub palette: String,
    #[serde(default)]
    pub highlight: Option<String>,
    #[serde(default)]
    pub diff_time: bool,
    #[serde(default)]
    pub diff_freq: bool,
}

#[derive(Debug, Deserialize)]
pub struct GridSection {
    #[serde(default = "default_bpm", deserialize_with = "lenient_text")]
    pub bpm: String,
    #[serde(default = "default_subdivisions")]
    pub subdivisions: u32,
    #[serde(default)]
    pub offset_ticks: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            font: None,
            font_url: None,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            hzoom: default_hzoom(),
            vzoom: default_vzoom(),
            voffset: default_voffset(),
            min_db: default_min_db(),
            max_db: default_max_db(),
            palette: default_palette(),
            highlight: None,
            diff_time: false,
            diff_freq: false,
        }
    }
}

impl Default for GridSection {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            subdivisions: default_subdivisions(),
            offset_ticks: 0,
        }
    }
}

pub fn default_width() -> u32 { 1920 }
pub fn default_height() -> u32 { 1080 }
pub fn default_fps() -> u32 { 30 }
pub fn default_crf() -> u32 { 18 }
pub fn default_codec() -> String { "libx264".into() }
pub fn default_hzoom() -> f32 { 10.0 }
pub fn default_vzoom() -> f32 { 48.0 }
pub fn default_voffset() -> f32 { 24.0 }
pub fn default_min_db() -> String { "0".into() }
pub fn default_max_db() -> String { "255".into() }
pub fn default_palette() -> String { "spectrum".into() }
pub fn default_bpm() -> String { "120".into() }
pub fn default_subdivisions() -> u32 { 4 }

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match toml::Value::deserialize(deserializer)? {
        toml::Value::String(s) => s,
        other => other.to_string(),
    })
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::debug!("Config parse error in {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path first, then `./notegram.toml`, `~/.config/notegram/config.toml`,
/// and the platform config directory.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("notegram").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("notegram").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

/// Longest numeric prefix of `s`, ignoring leading whitespace ("96bpm" is 96).
fn leading_number(s: &str) -> Option<f32> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    (1..=end)
        .rev()
        .filter(|&i| s.is_char_boundary(i))
        .find_map(|i| s[..i].parse::<f32>().ok())
        .filter(|v| v.is_finite())
}

/// Tempo from user text. Unparsable or zero falls back to 120.
pub fn parse_bpm(s: &str) -> f32 {
    match leading_number(s) {
        Some(bpm) if bpm != 0.0 => bpm,
        _ => DEFAULT_BPM,
    }
}

/// Byte threshold from user text, clamped to 0..=255. Unparsable text or a value that
/// rounds to zero gives `fallback`, so `--max-db 0` means the full range.
pub fn parse_db(s: &str, fallback: u8) -> u8 {
    match leading_number(s).map(f32::round) {
        Some(v) if v != 0.0 => v.clamp(0.0, 255.0) as u8,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_numbers() {
        assert_eq!(parse_bpm("128"), 128.0);
        assert_eq!(parse_bpm(" 96bpm"), 96.0);
        assert_eq!(parse_bpm("fast"), 120.0);
        assert_eq!(parse_bpm("0"), 120.0);
        assert_eq!(parse_bpm(""), 120.0);
        assert_eq!(parse_bpm("1e2"), 100.0);

        assert_eq!(parse_db("abc", 0), 0);
        assert_eq!(parse_db("abc", 255), 255);
        assert_eq!(parse_db("40.6", 0), 41);
        assert_eq!(parse_db("-20", 0), 0);
        assert_eq!(parse_db("900", 0), 255);
    }

    #[test]
    fn zero_threshold_takes_fallback() {
        assert_eq!(parse_db("0", 255), 255);
        assert_eq!(parse_db("0.3", 255), 255);
        assert_eq!(parse_db("0", 0), 0);
        assert_eq!(parse_db("1", 255), 1);
    }

    #[test]
    fn sections_default_when_missing() {
        let cfg: Config = toml::from_str("[output]\nwidth = 1280\n").unwrap();
        assert_eq!(cfg.output.width, 1280);
        assert_eq!(cfg.output.height, 1080);
        assert_eq!(cfg.view.vzoom, 48.0);
        assert_eq!(cfg.grid.bpm, "120");
        assert_eq!(cfg.grid.subdivisions, 4);
    }

    #[test]
    fn thresholds_accept_numbers_or_strings() {
        let cfg: Config = toml::from_str(
            r#"
            [view]
            min_db = 40
            max_db = "200"
            palette = "magma"
            highlight = "A"

            [grid]
            bpm = 97.5
            offset_ticks = 12
            "#,
        )
        .unwrap();
        assert_eq!(cfg.view.min_db, "40");
        assert_eq!(cfg.view.max_db, "200");
        assert_eq!(cfg.view.highlight.as_deref(), Some("A"));
        assert_eq!(parse_bpm(&cfg.grid.bpm), 97.5);
        assert_eq!(cfg.grid.offset_ticks, 12);
    }

    #[test]
    fn unreadable_or_invalid_config_is_none() {
        assert!(load_config(Path::new("/nonexistent/notegram.toml")).is_none());
        let dir = std::env::temp_dir().join(format!("notegram-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "[view\nvzoom = ").unwrap();
        assert!(load_config(&path).is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn explicit_config_path_wins() {
        let path = Path::new("/tmp/elsewhere.toml");
        assert_eq!(find_config(Some(path)), Some(path.to_path_buf()));
    }
}
