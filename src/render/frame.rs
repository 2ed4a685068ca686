const BACKGROUND: [u8; 4] = [0, 0, 0, 255];
const BAR_COLOR: [u8; 4] = [50, 205, 50, 255];

/// Draws one loudness bar per frame into a reusable RGBA8 buffer.
pub struct FrameRenderer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FrameRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Render a centered vertical bar whose height tracks `level` in [0, 1],
    /// anchored to the bottom edge. Returns the frame buffer.
    pub fn render(&mut self, level: f32) -> &[u8] {
        let level = level.clamp(0.0, 1.0);

        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&BACKGROUND);
        }

        let bar_width = (self.width / 20).max(8).min(self.width);
        let bar_height = (level * self.height as f32).round() as u32;
        let left = (self.width - bar_width) / 2;
        let top = self.height - bar_height;

        fill_rect(
            &mut self.pixels,
            self.width,
            left,
            top,
            bar_width,
            bar_height,
            BAR_COLOR,
        );

        &self.pixels
    }
}

fn fill_rect(pixels: &mut [u8], width: u32, x: u32, y: u32, w: u32, h: u32, color: [u8; 4]) {
    for row in y..y + h {
        let start = ((row * width + x) * 4) as usize;
        let end = start + (w * 4) as usize;
        for pixel in pixels[start..end].chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }
}
