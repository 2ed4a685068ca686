use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Writes frames as a numbered PNG sequence (`frame_000000.png`, ...),
/// consumable by `ffmpeg -i frame_%06d.png`.
pub struct PngSequenceWriter {
    dir: PathBuf,
    width: u32,
    height: u32,
    next_frame: u64,
}

impl PngSequenceWriter {
    pub fn new(dir: &Path, width: u32, height: u32) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create frame directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            width,
            height,
            next_frame: 0,
        })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.png", self.next_frame));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let mut encoder = png::Encoder::new(BufWriter::new(file), self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .with_context(|| format!("Failed to write PNG header for {}", path.display()))?;
        writer
            .write_image_data(rgba_pixels)
            .with_context(|| format!("Failed to write PNG data for {}", path.display()))?;

        self.next_frame += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.next_frame
    }
}
