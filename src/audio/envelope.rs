use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("sample rate must be positive")]
    ZeroSampleRate,

    #[error("channel count must be positive")]
    ZeroChannels,

    #[error("window size must be positive")]
    ZeroWindow,

    #[error("hop size {hop} must be positive and no greater than window size {window}")]
    BadHop { hop: usize, window: usize },

    #[error("sample buffer length {len} is not divisible by channel count {channels}")]
    RaggedBuffer { len: usize, channels: u16 },
}

/// Windowed RMS loudness curve over a sample buffer.
///
/// One entry per analysis window: `times[i]` is the window midpoint in
/// seconds, `values[i]` its RMS over the channel-averaged signal. Times
/// ascend by construction (windows advance by a fixed hop).
pub struct RmsEnvelope {
    times: Vec<f64>,
    values: Vec<f32>,
    sample_rate: u32,
    duration_seconds: f64,
}

impl RmsEnvelope {
    /// Build an envelope from interleaved samples.
    ///
    /// The window slides by `hop_size` frames; a hop smaller than the window
    /// overlaps, trading responsiveness for smoothness. The final window may
    /// be shorter than `window_size` and is still emitted.
    pub fn from_interleaved(
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
        window_size: usize,
        hop_size: usize,
    ) -> Result<Self, EnvelopeError> {
        if sample_rate == 0 {
            return Err(EnvelopeError::ZeroSampleRate);
        }
        if channels == 0 {
            return Err(EnvelopeError::ZeroChannels);
        }
        if window_size == 0 {
            return Err(EnvelopeError::ZeroWindow);
        }
        if hop_size == 0 || hop_size > window_size {
            return Err(EnvelopeError::BadHop {
                hop: hop_size,
                window: window_size,
            });
        }
        if samples.len() % channels as usize != 0 {
            return Err(EnvelopeError::RaggedBuffer {
                len: samples.len(),
                channels,
            });
        }

        let ch = channels as usize;
        let total_frames = samples.len() / ch;
        if total_frames == 0 {
            return Ok(Self {
                times: Vec::new(),
                values: Vec::new(),
                sample_rate,
                duration_seconds: 0.0,
            });
        }

        let starts: Vec<usize> = (0..total_frames).step_by(hop_size).collect();

        // Windows are independent; compute them in parallel. collect()
        // preserves input order, so times stay ascending.
        let entries: Vec<(f64, f32)> = starts
            .into_par_iter()
            .map(|start| {
                let frames_in_window = window_size.min(total_frames - start);

                let mut sum_squares = 0.0f64;
                for frame in start..start + frames_in_window {
                    let base = frame * ch;
                    let mut mono = 0.0f64;
                    for channel in 0..ch {
                        mono += samples[base + channel] as f64;
                    }
                    mono /= ch as f64;
                    sum_squares += mono * mono;
                }

                let rms = (sum_squares / frames_in_window as f64).sqrt();
                let center_frame = start as f64 + frames_in_window as f64 / 2.0;
                (center_frame / sample_rate as f64, rms as f32)
            })
            .collect();

        let (times, values) = entries.into_iter().unzip();

        Ok(Self {
            times,
            values,
            sample_rate,
            duration_seconds: total_frames as f64 / sample_rate as f64,
        })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Loudness at time `t` seconds: clamped to the first/last window
    /// outside the covered range, linearly interpolated between window
    /// midpoints inside it.
    pub fn value_at_time(&self, t: f64) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }

        if t <= self.times[0] {
            return self.values[0];
        }
        let last = self.values.len() - 1;
        if t >= self.times[last] {
            return self.values[last];
        }

        // First index with times[i] >= t; in 1..=last here.
        let upper = self.times.partition_point(|&x| x < t);
        if self.times[upper] == t {
            return self.values[upper];
        }

        let lower = upper - 1;
        let span = self.times[upper] - self.times[lower];
        if span <= 0.0 {
            return self.values[lower];
        }

        let ratio = (t - self.times[lower]) / span;
        let lo = self.values[lower] as f64;
        let hi = self.values[upper] as f64;
        (lo + (hi - lo) * ratio) as f32
    }

    /// Loudness at an absolute sample index. Shares the time-lookup
    /// interpolation path so integer and fractional queries agree.
    pub fn value_at_sample(&self, sample_index: i64) -> f32 {
        if sample_index <= 0 {
            return self.value_at_time(0.0);
        }
        self.value_at_time(sample_index as f64 / self.sample_rate as f64)
    }
}
