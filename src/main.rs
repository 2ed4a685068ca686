mod audio;
mod cli;
mod config;
mod encode;
mod render;
mod timeline;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use audio::envelope::RmsEnvelope;
use audio::wav::WavAudio;
use cli::{Cli, OutputMode};
use encode::ffmpeg::{FfmpegEncoder, RateControl};
use encode::png_seq::PngSequenceWriter;
use render::frame::FrameRenderer;
use timeline::FrameTimeline;

enum FrameSink {
    Pipe(FfmpegEncoder),
    Png(PngSequenceWriter),
}

impl FrameSink {
    fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        match self {
            FrameSink::Pipe(encoder) => encoder.write_frame(rgba_pixels),
            FrameSink::Png(writer) => writer.write_frame(rgba_pixels),
        }
    }

    fn finish(self) -> Result<()> {
        match self {
            FrameSink::Pipe(encoder) => encoder.finish(),
            FrameSink::Png(writer) => {
                log::info!("Wrote {} PNG frames", writer.frames_written());
                Ok(())
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect vubar.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("vubar.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("vubar").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.width == 1920 {
                cli.width = cfg.output.width;
            }
            if cli.height == 1080 {
                cli.height = cfg.output.height;
            }
            if cli.fps == 60.0 {
                cli.fps = cfg.output.fps;
            }
            if cli.crf == 18 {
                cli.crf = cfg.output.crf;
            }
            if cli.codec == "libx264" {
                cli.codec = cfg.output.codec;
            }
            if cli.window_ms == 20.0 {
                cli.window_ms = cfg.envelope.window_ms;
            }
            if cli.smoothing == 0.2 {
                cli.smoothing = cfg.envelope.smoothing;
            }
            if cli.gamma == 0.5 {
                cli.gamma = cfg.envelope.gamma;
            }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }
    if cli.width == 0 || cli.height == 0 {
        anyhow::bail!("Width and height must be positive");
    }

    log::info!("vubar - loudness-bar video renderer");
    log::info!("Input: {}", cli.input.display());
    log::info!("Resolution: {}x{} @ {}fps", cli.width, cli.height, cli.fps);

    // 1. Decode audio
    log::info!("Decoding WAV...");
    let wav = WavAudio::load(&cli.input)
        .with_context(|| format!("Failed to decode {}", cli.input.display()))?;
    log::info!(
        "Decoded audio: {} frames, {} channel(s), {}Hz, {:.1}s",
        wav.frames_per_channel(),
        wav.channels,
        wav.sample_rate,
        wav.duration_seconds()
    );

    // 2. Extract the loudness envelope
    let window_size = ((wav.sample_rate as f64 * cli.window_ms / 1000.0).round() as usize).max(1);
    let hop_size = match cli.hop_ms {
        Some(ms) => ((wav.sample_rate as f64 * ms / 1000.0).round() as usize).max(1),
        None => (window_size / 2).max(1),
    };
    log::info!(
        "Building RMS envelope (window {} frames, hop {} frames)...",
        window_size,
        hop_size
    );
    let envelope = RmsEnvelope::from_interleaved(
        &wav.samples,
        wav.sample_rate,
        wav.channels,
        window_size,
        hop_size,
    )?;

    // 3. Frame-to-sample mapping
    let timeline = FrameTimeline::new(wav.sample_rate, cli.fps)?;
    let (num, den) = timeline.ratio();
    log::info!("Frame timeline: {}/{} samples per frame", num, den);

    let total_frames = cli
        .frames
        .unwrap_or_else(|| (wav.duration_seconds() * cli.fps).ceil() as u64);

    // 4. Output sink
    let mut sink = match cli.mode {
        OutputMode::Pipe => {
            let output = cli
                .output
                .clone()
                .unwrap_or_else(|| cli.input.with_extension("mp4"));
            log::info!("Output: {}", output.display());
            let rate = match cli.bitrate.clone() {
                Some(bitrate) => RateControl::Bitrate(bitrate),
                None => RateControl::Crf(cli.crf),
            };
            FrameSink::Pipe(FfmpegEncoder::new(
                &output,
                &cli.input,
                cli.width,
                cli.height,
                cli.fps,
                &cli.codec,
                &cli.pix_fmt,
                rate,
            )?)
        }
        OutputMode::Png => {
            let dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("frames"));
            log::info!("Output: {}", dir.display());
            FrameSink::Png(PngSequenceWriter::new(&dir, cli.width, cli.height)?)
        }
    };

    // 5. Render loop
    let mut renderer = FrameRenderer::new(cli.width, cli.height);
    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut smoothed = 0.0f64;
    for frame in 0..total_frames as i64 {
        let sample_index = timeline.sample_index_for_frame(frame);
        let rms = envelope.value_at_sample(sample_index) as f64;

        smoothed += cli.smoothing * (rms - smoothed);
        let level = (smoothed.clamp(0.0, 1.0) as f32).powf(cli.gamma);

        let pixels = renderer.render(level);
        sink.write_frame(pixels)?;
        pb.set_position(frame as u64 + 1);
    }

    pb.finish_with_message("Rendering complete");

    // 6. Finalize output
    sink.finish()?;

    log::info!("Done");
    Ok(())
}
