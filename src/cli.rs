use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Pipe raw frames into ffmpeg and mux the audio into an mp4.
    Pipe,
    /// Write frames as a numbered PNG sequence.
    Png,
}

#[derive(Parser, Debug)]
#[command(name = "vubar", about = "Renders a loudness-bar video from a PCM WAV file")]
pub struct Cli {
    /// Input WAV file (16-bit PCM, mono or stereo)
    pub input: PathBuf,

    /// Output path: mp4 file in pipe mode (default: input with .mp4
    /// extension), frame directory in png mode (default: frames)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output mode
    #[arg(long, value_enum, default_value = "pipe")]
    pub mode: OutputMode,

    /// Frames per second (fractional rates like 29.97 are supported)
    #[arg(long, default_value_t = 60.0)]
    pub fps: f64,

    /// Video width in pixels
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Video height in pixels
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Cap the number of rendered frames (default: cover the whole file)
    #[arg(long)]
    pub frames: Option<u64>,

    /// RMS analysis window in milliseconds
    #[arg(long, default_value_t = 20.0)]
    pub window_ms: f64,

    /// Hop between analysis windows in milliseconds (default: half the window)
    #[arg(long)]
    pub hop_ms: Option<f64>,

    /// Temporal smoothing factor for the bar (0 = frozen, 1 = instant)
    #[arg(long, default_value_t = 0.2)]
    pub smoothing: f64,

    /// Gamma applied to the loudness level before drawing
    #[arg(long, default_value_t = 0.5)]
    pub gamma: f32,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// H.264 CRF quality (0-51, lower = better). Ignored when --bitrate is set.
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// Video bitrate (e.g. 2400k, 5M). When set, uses -b:v instead of -crf.
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// Config file path (default: ./vubar.toml or the platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
