use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Rate control for the video stream: constant quality or fixed bitrate.
pub enum RateControl {
    Crf(u32),
    Bitrate(String),
}

/// ffmpeg child process consuming raw RGBA frames on stdin and muxing the
/// source audio file alongside.
pub struct FfmpegEncoder {
    child: Child,
}

impl FfmpegEncoder {
    pub fn new(
        output_path: &Path,
        input_audio: &Path,
        width: u32,
        height: u32,
        fps: f64,
        codec: &str,
        pix_fmt: &str,
        rate: RateControl,
    ) -> Result<Self> {
        let mut command = Command::new("ffmpeg");
        command
            .arg("-y")
            .args(["-f", "rawvideo"])
            .args(["-pixel_format", "rgba"])
            .args(["-video_size", &format!("{width}x{height}")])
            .args(["-framerate", &fps.to_string()])
            .args(["-i", "pipe:0"])
            .arg("-i")
            .arg(input_audio)
            .args(["-c:v", codec])
            .args(["-pix_fmt", pix_fmt]);

        match rate {
            RateControl::Crf(crf) => {
                command.args(["-crf", &crf.to_string(), "-preset", "medium"]);
            }
            RateControl::Bitrate(bitrate) => {
                command.args(["-b:v", &bitrate]);
            }
        }

        command
            .args(["-c:a", "aac"])
            .args(["-b:a", "192k"])
            .arg("-shortest")
            .arg(output_path);

        let child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            width,
            height,
            fps,
            codec
        );

        Ok(Self { child })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        let stdin = self
            .child
            .stdin
            .as_mut()
            .context("FFmpeg stdin not available")?;
        stdin
            .write_all(rgba_pixels)
            .context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    /// Close stdin to signal EOF, then wait for the encode to complete.
    pub fn finish(mut self) -> Result<()> {
        drop(self.child.stdin.take());

        let output = self
            .child
            .wait_with_output()
            .context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}
