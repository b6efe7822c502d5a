use super::layer::{Layer, Layers, Primitive, Rgba};
use super::text::TextOverlay;

/// CPU RGBA framebuffer the layers are composited into.
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut canvas = Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        };
        canvas.clear(Rgba::BLACK);
        canvas
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tightly packed RGBA rows, top to bottom.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self, color: Rgba) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, 255]);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Source-over blend of one pixel; out-of-bounds writes are dropped.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let a = alpha.clamp(0.0, 1.0);
        let inv = 1.0 - a;
        self.pixels[idx] = (color.r as f32 * a + self.pixels[idx] as f32 * inv).round() as u8;
        self.pixels[idx + 1] = (color.g as f32 * a + self.pixels[idx + 1] as f32 * inv).round() as u8;
        self.pixels[idx + 2] = (color.b as f32 * a + self.pixels[idx + 2] as f32 * inv).round() as u8;
        self.pixels[idx + 3] = 255;
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        if color.a == 0 {
            return;
        }
        let x0 = x.round().max(0.0) as i64;
        let y0 = y.round().max(0.0) as i64;
        let x1 = ((x + w).round() as i64).min(self.width as i64);
        let y1 = ((y + h).round() as i64).min(self.height as i64);
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let alpha = color.alpha();
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px as i32, py as i32, color, alpha);
            }
        }
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba) {
        let (x0, y0) = from;
        let (x1, y1) = to;
        let width = width.max(1.0);
        if x0 == x1 {
            self.fill_rect(x0 - width / 2.0, y0.min(y1), width, (y1 - y0).abs(), color);
        } else if y0 == y1 {
            self.fill_rect(x0.min(x1), y0 - width / 2.0, (x1 - x0).abs(), width, color);
        } else {
            // Diagonal: step along the major axis.
            let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil() as i32;
            let alpha = color.alpha();
            for i in 0..=steps {
                let t = i as f32 / steps as f32;
                let x = x0 + (x1 - x0) * t;
                let y = y0 + (y1 - y0) * t;
                self.blend_pixel(x.round() as i32, y.round() as i32, color, alpha);
            }
        }
    }

    pub fn draw_layer(&mut self, layer: &Layer, text: Option<&TextOverlay>) {
        for primitive in &layer.primitives {
            match primitive {
                Primitive::FillRect { x, y, w, h, color } => self.fill_rect(*x, *y, *w, *h, *color),
                Primitive::Line {
                    x0,
                    y0,
                    x1,
                    y1,
                    width,
                    color,
                } => self.line((*x0, *y0), (*x1, *y1), *width, *color),
                Primitive::Text {
                    x,
                    y,
                    text: s,
                    size,
                    bold,
                    color,
                } => {
                    if let Some(overlay) = text {
                        overlay.draw(self, s, *x, *y, *size, *bold, *color);
                    }
                }
            }
        }
    }

    /// Composite every layer in paint order onto a cleared canvas.
    pub fn draw_layers(&mut self, layers: &Layers, text: Option<&TextOverlay>) {
        self.clear(Rgba::BLACK);
        for layer in layers.iter() {
            self.draw_layer(layer, text);
        }
    }
}
