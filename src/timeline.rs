use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("sample rate must be positive")]
    ZeroSampleRate,

    #[error("fps must be positive and finite, got {0}")]
    InvalidFps(f64),
}

/// Largest denominator `approximate_ratio` will accept. Keeps
/// `frame * numerator` comfortably inside integer range over multi-hour
/// timelines.
pub const MAX_DENOMINATOR: i64 = 1_000_000;

/// Maps video frame indices to audio sample indices without drift.
///
/// `sample_rate / fps` is fixed once as a reduced rational, and every query
/// is pure integer arithmetic on it. Querying frame N directly equals
/// stepping there one frame at a time, so long renders stay in sync.
pub struct FrameTimeline {
    sample_rate: u32,
    fps: f64,
    numerator: i64,
    denominator: i64,
}

impl FrameTimeline {
    pub fn new(sample_rate: u32, fps: f64) -> Result<Self, TimelineError> {
        if sample_rate == 0 {
            return Err(TimelineError::ZeroSampleRate);
        }
        if !(fps.is_finite() && fps > 0.0) {
            return Err(TimelineError::InvalidFps(fps));
        }

        let (numerator, denominator) =
            approximate_ratio(sample_rate as f64 / fps, MAX_DENOMINATOR);

        Ok(Self {
            sample_rate,
            fps,
            numerator,
            denominator,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn ratio(&self) -> (i64, i64) {
        (self.numerator, self.denominator)
    }

    /// Sample index nearest the start of `frame_index`, rounding half away
    /// from zero. Frame 0 (and anything below) maps to sample 0.
    pub fn sample_index_for_frame(&self, frame_index: i64) -> i64 {
        if frame_index <= 0 {
            return 0;
        }

        // i128 keeps frame * numerator exact far past any real timeline.
        let n = frame_index as i128 * self.numerator as i128;
        let d = self.denominator as i128;
        ((n + d / 2) / d) as i64
    }
}

/// Closest rational to `value` with denominator at most `max_denominator`,
/// in lowest terms, via continued-fraction convergents.
pub fn approximate_ratio(value: f64, max_denominator: i64) -> (i64, i64) {
    let a0 = value.floor() as i64;
    if (value - a0 as f64).abs() < 1e-12 {
        return (a0, 1);
    }

    // Convergent recurrence: p2 = a*p1 + p0, q2 = a*q1 + q0.
    let (mut p0, mut q0) = (1i64, 0i64);
    let (mut p1, mut q1) = (a0, 1i64);
    let mut frac = value - a0 as f64;

    while frac != 0.0 {
        let inv = 1.0 / frac;
        let a = inv.floor() as i64;

        let next = a
            .checked_mul(p1)
            .and_then(|v| v.checked_add(p0))
            .zip(a.checked_mul(q1).and_then(|v| v.checked_add(q0)));
        let Some((p2, q2)) = next else {
            break;
        };
        if q2 > max_denominator {
            break;
        }

        (p0, q0) = (p1, q1);
        (p1, q1) = (p2, q2);
        frac = inv - a as f64;
    }

    let g = gcd(p1.abs(), q1);
    (p1 / g, q1 / g)
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    if a == 0 {
        1
    } else {
        a
    }
}
