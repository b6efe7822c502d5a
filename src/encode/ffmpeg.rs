use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Video stream settings passed through to ffmpeg.
#[derive(Clone, Debug)]
pub struct VideoOptions<'a> {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: &'a str,
    pub pix_fmt: &'a str,
    pub crf: u32,
}

pub struct FfmpegEncoder {
    child: Child,
    frame_bytes: usize,
}

impl FfmpegEncoder {
    /// Scrolling video with the source audio, starting `audio_start` seconds into it.
    pub fn video(output_path: &Path, input_audio: &Path, audio_start: f32, opts: &VideoOptions) -> Result<Self> {
        let args = video_args(output_path, input_audio, audio_start, opts);
        let encoder = Self::spawn(&args, opts.width, opts.height)?;
        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            opts.width,
            opts.height,
            opts.fps,
            opts.codec
        );
        Ok(encoder)
    }

    /// Single image; the format follows the output extension.
    pub fn still(output_path: &Path, width: u32, height: u32) -> Result<Self> {
        let args = still_args(output_path, width, height);
        Self::spawn(&args, width, height)
    }

    fn spawn(args: &[OsString], width: u32, height: u32) -> Result<Self> {
        let child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;
        Ok(Self {
            child,
            frame_bytes: frame_bytes(width, height),
        })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        anyhow::ensure!(
            rgba_pixels.len() == self.frame_bytes,
            "Frame is {} bytes, expected {}",
            rgba_pixels.len(),
            self.frame_bytes
        );
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}

/// Size of one RGBA frame, computed in `usize` so large frames cannot wrap.
fn frame_bytes(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

fn raw_input_args(width: u32, height: u32, fps: u32) -> Vec<OsString> {
    [
        "-y".to_string(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", width, height),
        "-framerate".into(), fps.to_string(),
        "-i".into(), "pipe:0".into(),
    ]
    .into_iter()
    .map(OsString::from)
    .collect()
}

fn video_args(output_path: &Path, input_audio: &Path, audio_start: f32, opts: &VideoOptions) -> Vec<OsString> {
    let mut args = raw_input_args(opts.width, opts.height, opts.fps);
    if audio_start > 0.0 {
        args.extend(["-ss".into(), format!("{:.3}", audio_start).into()]);
    }
    args.extend(["-i".into(), input_audio.as_os_str().to_owned()]);
    args.extend(
        [
            "-map".to_string(), "0:v".into(),
            "-map".into(), "1:a".into(),
            "-c:v".into(), opts.codec.to_string(),
            "-pix_fmt".into(), opts.pix_fmt.to_string(),
            "-crf".into(), opts.crf.to_string(),
            "-preset".into(), "medium".into(),
            "-c:a".into(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output_path.as_os_str().to_owned());
    args
}

fn still_args(output_path: &Path, width: u32, height: u32) -> Vec<OsString> {
    let mut args = raw_input_args(width, height, 1);
    args.extend(["-frames:v".into(), "1".into()]);
    args.push(output_path.as_os_str().to_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn video_args_mux_audio_from_start() {
        let opts = VideoOptions {
            width: 640,
            height: 360,
            fps: 25,
            codec: "libx264",
            pix_fmt: "yuv420p",
            crf: 20,
        };
        let args = strings(&video_args(Path::new("out.mp4"), Path::new("in.flac"), 12.5, &opts));
        assert!(args.windows(2).any(|w| w == ["-video_size", "640x360"]));
        assert!(args.windows(2).any(|w| w == ["-ss", "12.500"]));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let audio = args.iter().position(|a| a == "in.flac").unwrap();
        assert_eq!(audio, ss + 3);
        assert!(args.windows(2).any(|w| w == ["-crf", "20"]));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn no_seek_at_start_of_recording() {
        let opts = VideoOptions {
            width: 64,
            height: 64,
            fps: 30,
            codec: "libx264",
            pix_fmt: "yuv420p",
            crf: 18,
        };
        let args = strings(&video_args(Path::new("o.mp4"), Path::new("a.wav"), 0.0, &opts));
        assert!(!args.iter().any(|a| a == "-ss"));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn frame_size_does_not_wrap_u32() {
        assert_eq!(frame_bytes(1920, 1080), 8_294_400);
        assert_eq!(frame_bytes(40_000, 40_000), 6_400_000_000);
    }

    #[test]
    fn still_writes_one_frame() {
        let args = strings(&still_args(Path::new("frame.png"), 100, 50));
        assert!(args.windows(2).any(|w| w == ["-frames:v", "1"]));
        assert!(!args.iter().any(|a| a == "-c:a"));
        assert_eq!(args.last().map(String::as_str), Some("frame.png"));
    }
}
