use std::ops::Range;

pub const MIN_VERTICAL_ZOOM: f32 = 6.0;
pub const MAX_VERTICAL_ZOOM: f32 = 120.0;

/// User-controlled view parameters, read on every render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    /// Divisor of the matrix length; larger values show fewer frames
    pub horizontal_zoom: f32,
    /// Semitones spanning the full viewport height
    pub vertical_zoom: f32,
    /// Semitone value at the bottom edge
    pub vertical_offset: f32,
    pub min_db: u8,
    pub max_db: u8,
    pub position: f32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            horizontal_zoom: 10.0,
            vertical_zoom: 48.0,
            vertical_offset: 24.0,
            min_db: 0,
            max_db: 255,
            position: 0.0,
        }
    }
}

impl ViewportState {
    /// Change the vertical zoom while keeping the semitone at the view centre fixed.
    pub fn zoom_vertical_about_center(&mut self, delta: f32) {
        let centre = self.vertical_offset + self.vertical_zoom / 2.0;
        self.vertical_zoom = clamp_vertical_zoom(self.vertical_zoom + delta);
        self.vertical_offset = centre - self.vertical_zoom / 2.0;
    }
}

pub fn clamp_vertical_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() {
        zoom.clamp(MIN_VERTICAL_ZOOM, MAX_VERTICAL_ZOOM)
    } else {
        MIN_VERTICAL_ZOOM
    }
}

/// Highest useful bottom offset: the semitone of the Nyquist frequency.
pub fn max_vertical_offset(sample_rate: u32, min_freq: f32) -> f32 {
    (12.0 * (sample_rate as f32 / 2.0 / min_freq).log2()).floor().max(0.0)
}

/// Semitone axis mapping: offset at the bottom edge, `zoom` semitones over the full height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VerticalTransform {
    pub height: f32,
    pub zoom: f32,
    pub offset: f32,
}

impl VerticalTransform {
    pub fn new(height: f32, zoom: f32, offset: f32) -> Self {
        Self {
            height,
            zoom,
            offset,
        }
    }

    pub fn pixel_y(&self, semitone: f32) -> f32 {
        self.height - ((semitone - self.offset) / self.zoom) * self.height
    }

    pub fn semitone_at(&self, y: f32) -> f32 {
        self.offset + (self.height - y) / self.height * self.zoom
    }

    pub fn row_height(&self) -> f32 {
        self.height / self.zoom
    }

    pub fn sub_row_height(&self) -> f32 {
        self.row_height() / 3.0
    }

    /// Padded bounding test on a lane centred at `centre_y`.
    pub fn is_row_visible(&self, centre_y: f32) -> bool {
        let row = self.row_height();
        centre_y + row > 0.0 && centre_y - row < self.height
    }
}

/// Time axis mapping centred on the playback position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HorizontalTransform {
    pub width: f32,
    pub frame_count: usize,
    pub centre_frame: i64,
    pub half_width: i64,
    pub position: f32,
    pub hop_seconds: f32,
}

/// Visible span of the recording in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeWindow {
    pub start: f32,
    pub end: f32,
}

impl HorizontalTransform {
    pub fn new(
        width: f32,
        frame_count: usize,
        duration: f32,
        position: f32,
        zoom: f32,
        hop_seconds: f32,
    ) -> Self {
        let centre_frame = if duration > 0.0 {
            (frame_count as f64 * (position as f64 / duration as f64)).floor() as i64
        } else {
            0
        };
        let half_width = if zoom > 0.0 {
            (frame_count as f64 / zoom as f64 / 2.0).floor() as i64
        } else {
            0
        };
        Self {
            width,
            frame_count,
            centre_frame,
            half_width,
            position,
            hop_seconds,
        }
    }

    pub fn column_width(&self) -> f32 {
        if self.half_width == 0 {
            return 0.0;
        }
        self.width / (2 * self.half_width) as f32
    }

    pub fn pixel_x(&self, frame: i64) -> f32 {
        (frame - self.centre_frame + self.half_width) as f32 * self.column_width()
    }

    /// Frame indices that land in the viewport and exist in the matrix.
    pub fn visible_frames(&self) -> Range<usize> {
        if self.half_width == 0 {
            return 0..0;
        }
        let lo = (self.centre_frame - self.half_width).clamp(0, self.frame_count as i64);
        let hi = (self.centre_frame + self.half_width).clamp(0, self.frame_count as i64);
        lo as usize..hi.max(lo) as usize
    }

    pub fn time_window(&self) -> TimeWindow {
        let half = self.half_width as f32 * self.hop_seconds;
        TimeWindow {
            start: self.position - half,
            end: self.position + half,
        }
    }

    pub fn seconds_per_pixel(&self) -> f32 {
        2.0 * self.half_width as f32 * self.hop_seconds / self.width
    }

    pub fn time_to_x(&self, t: f32) -> f32 {
        (t - self.time_window().start) / self.seconds_per_pixel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_round_trip_within_a_pixel() {
        for zoom in [6.0, 12.5, 48.0, 73.0, 120.0] {
            for offset in [-30.0, 0.0, 17.3, 64.0, 110.0] {
                let v = VerticalTransform::new(720.0, zoom, offset);
                for s in [0.0, 5.5, 50.89, 99.0, 130.0] {
                    let y = v.pixel_y(s);
                    let back = v.pixel_y(v.semitone_at(y));
                    assert!((back - y).abs() < 1.0);
                    assert!((v.semitone_at(y) - s).abs() < 1e-2);
                }
            }
        }
    }

    #[test]
    fn bottom_edge_is_offset() {
        let v = VerticalTransform::new(600.0, 24.0, 36.0);
        assert!((v.pixel_y(36.0) - 600.0).abs() < 1e-4);
        assert!(v.pixel_y(60.0).abs() < 1e-4);
        assert!((v.row_height() - 25.0).abs() < 1e-4);
    }

    #[test]
    fn culling_pads_by_a_row() {
        let v = VerticalTransform::new(600.0, 24.0, 36.0);
        assert!(v.is_row_visible(-20.0));
        assert!(!v.is_row_visible(-25.0));
        assert!(v.is_row_visible(620.0));
        assert!(!v.is_row_visible(625.0));
    }

    #[test]
    fn half_width_and_centre_scenario() {
        let h = HorizontalTransform::new(1000.0, 10_000, 100.0, 50.0, 10.0, 0.01);
        assert_eq!(h.half_width, 500);
        assert!((h.centre_frame - 5000).abs() <= 1);
        assert!((h.column_width() - 1.0).abs() < 1e-6);
        assert_eq!(h.pixel_x(h.centre_frame - 500), 0.0);
        assert_eq!(h.visible_frames(), 4500..5500);
    }

    #[test]
    fn window_follows_position() {
        let h = HorizontalTransform::new(800.0, 1000, 10.0, 5.0, 4.0, 0.01);
        let w = h.time_window();
        assert!((w.start - 3.75).abs() < 1e-4);
        assert!((w.end - 6.25).abs() < 1e-4);
        assert!((h.time_to_x(5.0) - 400.0).abs() < 1e-2);
    }

    #[test]
    fn visible_frames_clip_to_matrix() {
        let h = HorizontalTransform::new(800.0, 100, 10.0, 0.0, 2.0, 0.1);
        assert_eq!(h.visible_frames(), 0..25);
        let empty = HorizontalTransform::new(800.0, 0, 0.0, 0.0, 2.0, 0.1);
        assert_eq!(empty.visible_frames(), 0..0);
        assert_eq!(empty.column_width(), 0.0);
    }

    #[test]
    fn zoom_about_centre_keeps_centre() {
        let mut state = ViewportState {
            vertical_zoom: 24.0,
            vertical_offset: 40.0,
            ..ViewportState::default()
        };
        state.zoom_vertical_about_center(-2.0);
        assert_eq!(state.vertical_zoom, 22.0);
        assert!((state.vertical_offset + state.vertical_zoom / 2.0 - 52.0).abs() < 1e-4);
        state.zoom_vertical_about_center(500.0);
        assert_eq!(state.vertical_zoom, MAX_VERTICAL_ZOOM);
    }

    #[test]
    fn nyquist_offset_limit() {
        assert_eq!(max_vertical_offset(44_100, 20.0), 121.0);
    }
}
