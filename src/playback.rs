//! Simulated playback transport. Drives the render position while a video is encoded.

pub const SEEK_STEP: f32 = 5.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Playback {
    duration: f32,
    position: f32,
    playing: bool,
}

impl Playback {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: if duration.is_finite() { duration.max(0.0) } else { 0.0 },
            position: 0.0,
            playing: false,
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        if self.duration > 0.0 {
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to `seconds`, clamped to the recording.
    pub fn seek(&mut self, seconds: f32) {
        self.position = if seconds.is_finite() {
            seconds.clamp(0.0, self.duration)
        } else {
            0.0
        };
    }

    pub fn seek_by(&mut self, delta: f32) {
        self.seek(self.position + delta);
    }

    /// Advance by `dt` seconds while playing. Returns `false` once the recording has
    /// ended, at which point playback stops and rewinds to the start.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.playing {
            return false;
        }
        let next = self.position + dt.max(0.0);
        if next >= self.duration {
            self.playing = false;
            self.position = 0.0;
            return false;
        }
        self.position = next;
        true
    }
}

/// `m:ss` clock text.
pub fn format_clock(seconds: f32) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resets_at_end() {
        let mut p = Playback::new(1.0);
        p.play();
        assert!(p.advance(0.6));
        assert!((p.position() - 0.6).abs() < 1e-6);
        assert!(!p.advance(0.6));
        assert_eq!(p.position(), 0.0);
        assert!(!p.is_playing());
    }

    #[test]
    fn paused_transport_does_not_move() {
        let mut p = Playback::new(10.0);
        p.seek(2.0);
        assert!(!p.advance(1.0));
        assert_eq!(p.position(), 2.0);
        p.toggle();
        assert!(p.is_playing());
        p.toggle();
        assert!(!p.is_playing());
    }

    #[test]
    fn seek_clamps() {
        let mut p = Playback::new(12.0);
        p.seek_by(-SEEK_STEP);
        assert_eq!(p.position(), 0.0);
        p.seek(11.0);
        p.seek_by(SEEK_STEP);
        assert_eq!(p.position(), 12.0);
        p.seek(f32::NAN);
        assert_eq!(p.position(), 0.0);
    }

    #[test]
    fn empty_recording_never_plays() {
        assert_eq!(Playback::new(f32::NAN).duration(), 0.0);
        assert_eq!(Playback::new(-4.0).duration(), 0.0);
        assert_eq!(Playback::new(3.5).duration(), 3.5);
        let mut p = Playback::new(0.0);
        p.play();
        assert!(!p.is_playing());
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(65.9), "1:05");
        assert_eq!(format_clock(600.0), "10:00");
        assert_eq!(format_clock(-3.0), "0:00");
    }
}
