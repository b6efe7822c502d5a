use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use std::path::{Path, PathBuf};

use super::layer::Rgba;
use super::raster::Canvas;

/// Glyph rasterizer for lane labels, bar numbers and the clock.
pub struct TextOverlay {
    font: Font,
}

impl TextOverlay {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        Ok(Self { font })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font: {}", path.display()))?;
        Self::from_bytes(&bytes)
    }

    /// Draw `text` with its baseline at `y`. Bold is faked by a one-pixel double strike.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        text: &str,
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: Rgba,
    ) {
        self.draw_run(canvas, text, x, y, size, color);
        if bold {
            self.draw_run(canvas, text, x + 1.0, y, size, color);
        }
    }

    fn draw_run(&self, canvas: &mut Canvas, text: &str, x: f32, y: f32, size: f32, color: Rgba) {
        let mut cursor_x = x.round() as i32;
        let baseline = y.round() as i32;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, size);
            let glyph_y = baseline - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }
                    let alpha = coverage as f32 / 255.0 * color.alpha();
                    canvas.blend_pixel(
                        cursor_x + metrics.xmin + gx as i32,
                        glyph_y + gy as i32,
                        color,
                        alpha,
                    );
                }
            }

            cursor_x += metrics.advance_width.round() as i32;
        }
    }

    /// Width of rendered text in pixels.
    pub fn measure_width(&self, text: &str, size: f32) -> u32 {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, size).advance_width)
            .sum();
        width.ceil() as u32
    }
}

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// First common system font that exists on this machine.
pub fn find_system_font() -> Option<PathBuf> {
    SYSTEM_FONTS.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Fetch a font file over HTTP.
pub fn load_font_from_url(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading font from {}", url);
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to request font: {}", url))?
        .error_for_status()
        .with_context(|| format!("Font download failed: {}", url))?;
    let bytes = response.bytes().context("Failed to read font response")?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_font_bytes() {
        assert!(TextOverlay::from_bytes(b"not a font").is_err());
        assert!(TextOverlay::from_path(Path::new("/nonexistent/font.ttf")).is_err());
    }

    #[test]
    fn draws_with_system_font_when_available() {
        let Some(path) = find_system_font() else {
            return;
        };
        let overlay = TextOverlay::from_path(&path).unwrap();
        assert!(overlay.measure_width("C#4", 12.0) > 0);

        let mut canvas = Canvas::new(64, 32);
        overlay.draw(&mut canvas, "G4", 2.0, 20.0, 14.0, true, Rgba::rgb(0, 255, 0));
        assert!(canvas.pixels().chunks_exact(4).any(|px| px[1] > 0));
    }
}
