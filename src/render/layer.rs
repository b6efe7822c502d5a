/// Straight (non-premultiplied) RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// White at the given opacity (0.0-1.0).
    pub fn white(alpha: f32) -> Self {
        Self::rgb(255, 255, 255).with_alpha(alpha)
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub fn alpha(self) -> f32 {
        self.a as f32 / 255.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgba,
    },
    Line {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        width: f32,
        color: Rgba,
    },
    /// `y` is the text baseline.
    Text {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        bold: bool,
        color: Rgba,
    },
}

/// Drawing commands for one surface, in paint order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layer {
    pub primitives: Vec<Primitive>,
}

impl Layer {
    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        self.primitives.push(Primitive::FillRect { x, y, w, h, color });
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba) {
        self.primitives.push(Primitive::Line {
            x0: from.0,
            y0: from.1,
            x1: to.0,
            y1: to.1,
            width,
            color,
        });
    }

    pub fn text(&mut self, x: f32, y: f32, text: impl Into<String>, size: f32, bold: bool, color: Rgba) {
        self.primitives.push(Primitive::Text {
            x,
            y,
            text: text.into(),
            size,
            bold,
            color,
        });
    }
}

/// The three independently cached surfaces. The lane layer paints in two passes:
/// bands below the data, note labels above it.
#[derive(Clone, Debug, Default)]
pub struct Layers {
    pub lanes: Layer,
    pub labels: Layer,
    pub data: Layer,
    pub grid: Layer,
}

impl Layers {
    /// Layers in paint order.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        [&self.lanes, &self.data, &self.labels, &self.grid].into_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(Layer::is_empty)
    }
}
