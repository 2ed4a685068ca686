use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use thiserror::Error;

/// WAV decode error.
#[derive(Debug, Error)]
pub enum WavError {
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("missing {0} chunk")]
    MissingChunk(&'static str),

    #[error("duplicate {0} chunk")]
    DuplicateChunk(&'static str),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unexpected end of stream while {0}")]
    UnexpectedEof(&'static str),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Decoded 16-bit PCM audio: interleaved samples normalized to [-1, 1].
#[derive(Debug)]
pub struct WavAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl WavAudio {
    pub fn frames_per_channel(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames_per_channel() as f64 / self.sample_rate as f64
    }

    pub fn load(path: &Path) -> Result<Self, WavError> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    /// Decode a RIFF/WAVE stream in a single forward pass.
    ///
    /// Top-level chunks may appear in any order; unrecognized chunks are
    /// skipped by their declared size. Only 16-bit PCM with 1 or 2 channels
    /// is accepted.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, WavError> {
        let riff = read_tag(&mut reader, "reading RIFF header")?;
        if &riff != b"RIFF" {
            return Err(WavError::InvalidHeader("not a RIFF stream".into()));
        }

        // Total-size field, unused.
        let _ = read_u32(&mut reader, "reading RIFF size")?;

        let wave = read_tag(&mut reader, "reading WAVE header")?;
        if &wave != b"WAVE" {
            return Err(WavError::InvalidHeader("not a WAVE stream".into()));
        }

        let mut format: Option<Format> = None;
        let mut data: Option<Vec<u8>> = None;

        while let Some(tag) = try_read_tag(&mut reader)? {
            let size = read_u32(&mut reader, "reading chunk size")?;
            if size > i32::MAX as u32 {
                return Err(WavError::InvalidHeader(format!(
                    "chunk size {size} out of range"
                )));
            }
            let size = size as usize;

            match &tag {
                b"fmt " => {
                    if format.is_some() {
                        return Err(WavError::DuplicateChunk("fmt "));
                    }
                    format = Some(parse_fmt_chunk(&mut reader, size)?);
                }
                b"data" => {
                    let mut bytes = vec![0u8; size];
                    read_exact(&mut reader, &mut bytes, "reading data chunk")?;
                    data = Some(bytes);
                }
                _ => skip_bytes(&mut reader, size as u64, "skipping chunk")?,
            }

            // Chunks are word-aligned; odd sizes carry one padding byte.
            if size % 2 == 1 {
                skip_bytes(&mut reader, 1, "skipping padding byte")?;
            }
        }

        let format = format.ok_or(WavError::MissingChunk("fmt "))?;
        let data = data.ok_or(WavError::MissingChunk("data"))?;

        if data.len() % format.block_align as usize != 0 {
            return Err(WavError::InvalidHeader(format!(
                "data size {} is not aligned to {}-byte sample frames",
                data.len(),
                format.block_align
            )));
        }

        let samples: Vec<f32> = data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        Ok(WavAudio {
            samples,
            sample_rate: format.sample_rate,
            channels: format.channels,
        })
    }
}

struct Format {
    channels: u16,
    sample_rate: u32,
    block_align: u16,
}

fn parse_fmt_chunk<R: Read>(reader: &mut R, size: usize) -> Result<Format, WavError> {
    if size < 16 {
        return Err(WavError::InvalidHeader(format!(
            "fmt chunk size {size} is below the 16-byte minimum"
        )));
    }

    let mut bytes = vec![0u8; size];
    read_exact(reader, &mut bytes, "reading fmt chunk")?;
    // Bytes past the first 16 are format extensions; tolerated, not parsed.

    let audio_format = u16::from_le_bytes([bytes[0], bytes[1]]);
    let channels = u16::from_le_bytes([bytes[2], bytes[3]]);
    let sample_rate = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let byte_rate = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let block_align = u16::from_le_bytes([bytes[12], bytes[13]]);
    let bits_per_sample = u16::from_le_bytes([bytes[14], bytes[15]]);

    if audio_format != 1 {
        return Err(WavError::UnsupportedFormat(format!(
            "audio format code {audio_format}, only PCM (1) is supported"
        )));
    }
    if channels != 1 && channels != 2 {
        return Err(WavError::UnsupportedFormat(format!(
            "{channels} channels, only mono and stereo are supported"
        )));
    }
    if bits_per_sample != 16 {
        return Err(WavError::UnsupportedFormat(format!(
            "{bits_per_sample} bits per sample, only 16 is supported"
        )));
    }
    if sample_rate == 0 {
        return Err(WavError::InvalidHeader("sample rate is zero".into()));
    }

    let expected_block_align = channels * 2;
    if block_align != expected_block_align {
        return Err(WavError::InvalidHeader(format!(
            "block align {block_align}, expected {expected_block_align}"
        )));
    }
    let expected_byte_rate = sample_rate * expected_block_align as u32;
    if byte_rate != expected_byte_rate {
        return Err(WavError::InvalidHeader(format!(
            "byte rate {byte_rate}, expected {expected_byte_rate}"
        )));
    }

    Ok(Format {
        channels,
        sample_rate,
        block_align,
    })
}

/// Read a 4-byte chunk tag, or `None` on a clean end of stream.
fn try_read_tag<R: Read>(reader: &mut R) -> Result<Option<[u8; 4]>, WavError> {
    let mut tag = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        let n = reader.read(&mut tag[filled..])?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(WavError::UnexpectedEof("reading chunk tag"))
            };
        }
        filled += n;
    }
    Ok(Some(tag))
}

fn read_tag<R: Read>(reader: &mut R, context: &'static str) -> Result<[u8; 4], WavError> {
    let mut tag = [0u8; 4];
    read_exact(reader, &mut tag, context)?;
    Ok(tag)
}

fn read_u32<R: Read>(reader: &mut R, context: &'static str) -> Result<u32, WavError> {
    let mut bytes = [0u8; 4];
    read_exact(reader, &mut bytes, context)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_exact<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    context: &'static str,
) -> Result<(), WavError> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => WavError::UnexpectedEof(context),
        _ => WavError::Io(err),
    })
}

fn skip_bytes<R: Read>(reader: &mut R, count: u64, context: &'static str) -> Result<(), WavError> {
    let copied = io::copy(&mut reader.take(count), &mut io::sink())?;
    if copied < count {
        return Err(WavError::UnexpectedEof(context));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + payload.len() + 1);
        out.extend_from_slice(tag);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn fmt_payload(format_code: u16, channels: u16, sample_rate: u32, bits: u16) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let byte_rate = sample_rate * block_align as u32;
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&format_code.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out
    }

    fn data_payload(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body_len: usize = chunks.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(12 + body_len);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((4 + body_len) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        for c in chunks {
            out.extend_from_slice(c);
        }
        out
    }

    fn simple_wav(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        riff(&[
            chunk(b"fmt ", &fmt_payload(1, channels, sample_rate, 16)),
            chunk(b"data", &data_payload(samples)),
        ])
    }

    fn decode(bytes: &[u8]) -> Result<WavAudio, WavError> {
        WavAudio::read_from(bytes)
    }

    #[test]
    fn decodes_mono_sine() {
        let sample_rate = 44100;
        let samples: Vec<i16> = (0..sample_rate)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                ((2.0 * std::f64::consts::PI * 440.0 * t).sin() * 0.98 * 32767.0).round() as i16
            })
            .collect();

        let audio = decode(&simple_wav(1, sample_rate, &samples)).unwrap();

        assert_eq!(audio.sample_rate, sample_rate);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.frames_per_channel(), sample_rate as usize);
        assert!((audio.duration_seconds() - 1.0).abs() < 0.01);

        let peak = audio.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.9 && peak <= 1.0);
        assert!(audio.samples.iter().all(|s| (-1.0001..=1.0001).contains(s)));
    }

    #[test]
    fn round_trips_stereo_sample_values() {
        let input = [100i16, -100, 2000, -2000, 32767, -32768];
        let audio = decode(&simple_wav(2, 48000, &input)).unwrap();

        assert_eq!(audio.channels, 2);
        assert_eq!(audio.samples.len(), input.len());
        for (decoded, source) in audio.samples.iter().zip(&input) {
            let expected = *source as f32 / 32768.0;
            assert!((decoded - expected).abs() <= 1.0 / 32768.0);
        }
    }

    #[test]
    fn skips_unknown_chunks() {
        let plain = decode(&simple_wav(1, 8000, &[1, 2, 3, 4])).unwrap();
        // 3-byte JUNK payload exercises the odd-size padding rule.
        let with_junk = decode(&riff(&[
            chunk(b"fmt ", &fmt_payload(1, 1, 8000, 16)),
            chunk(b"JUNK", &[0xaa, 0xbb, 0xcc]),
            chunk(b"data", &data_payload(&[1, 2, 3, 4])),
        ]))
        .unwrap();

        assert_eq!(plain.samples, with_junk.samples);
        assert_eq!(plain.sample_rate, with_junk.sample_rate);
        assert_eq!(plain.channels, with_junk.channels);
    }

    #[test]
    fn accepts_data_before_fmt() {
        let canonical = decode(&simple_wav(1, 8000, &[5, 6, 7, 8])).unwrap();
        let reversed = decode(&riff(&[
            chunk(b"data", &data_payload(&[5, 6, 7, 8])),
            chunk(b"fmt ", &fmt_payload(1, 1, 8000, 16)),
        ]))
        .unwrap();

        assert_eq!(canonical.samples, reversed.samples);
    }

    #[test]
    fn tolerates_fmt_extension_bytes() {
        let mut payload = fmt_payload(1, 1, 8000, 16);
        payload.extend_from_slice(&[0, 0]); // cbSize = 0
        let audio = decode(&riff(&[
            chunk(b"fmt ", &payload),
            chunk(b"data", &data_payload(&[9, 10])),
        ]))
        .unwrap();
        assert_eq!(audio.samples.len(), 2);
    }

    #[test]
    fn rejects_non_pcm_format_code() {
        let err = decode(&riff(&[
            chunk(b"fmt ", &fmt_payload(3, 1, 8000, 16)),
            chunk(b"data", &data_payload(&[0, 0])),
        ]))
        .unwrap_err();
        assert!(matches!(err, WavError::UnsupportedFormat(_)));
    }

    #[test]
    fn rejects_unsupported_bit_depth_and_channels() {
        let err = decode(&riff(&[
            chunk(b"fmt ", &fmt_payload(1, 1, 8000, 8)),
            chunk(b"data", &data_payload(&[0])),
        ]))
        .unwrap_err();
        assert!(matches!(err, WavError::UnsupportedFormat(_)));

        let err = decode(&riff(&[
            chunk(b"fmt ", &fmt_payload(1, 3, 8000, 16)),
            chunk(b"data", &data_payload(&[0, 0, 0])),
        ]))
        .unwrap_err();
        assert!(matches!(err, WavError::UnsupportedFormat(_)));
    }

    #[test]
    fn rejects_inconsistent_block_align() {
        let mut payload = fmt_payload(1, 2, 8000, 16);
        payload[12..14].copy_from_slice(&3u16.to_le_bytes());
        let err = decode(&riff(&[
            chunk(b"fmt ", &payload),
            chunk(b"data", &data_payload(&[0, 0])),
        ]))
        .unwrap_err();
        assert!(matches!(err, WavError::InvalidHeader(_)));
    }

    #[test]
    fn rejects_inconsistent_byte_rate() {
        let mut payload = fmt_payload(1, 1, 8000, 16);
        payload[8..12].copy_from_slice(&1234u32.to_le_bytes());
        let err = decode(&riff(&[
            chunk(b"fmt ", &payload),
            chunk(b"data", &data_payload(&[0])),
        ]))
        .unwrap_err();
        assert!(matches!(err, WavError::InvalidHeader(_)));
    }

    #[test]
    fn rejects_missing_chunks() {
        let err = decode(&riff(&[chunk(b"fmt ", &fmt_payload(1, 1, 8000, 16))])).unwrap_err();
        assert!(matches!(err, WavError::MissingChunk("data")));

        let err = decode(&riff(&[chunk(b"data", &data_payload(&[0, 0]))])).unwrap_err();
        assert!(matches!(err, WavError::MissingChunk("fmt ")));
    }

    #[test]
    fn rejects_duplicate_fmt_chunk() {
        let err = decode(&riff(&[
            chunk(b"fmt ", &fmt_payload(1, 1, 8000, 16)),
            chunk(b"fmt ", &fmt_payload(1, 1, 8000, 16)),
            chunk(b"data", &data_payload(&[0])),
        ]))
        .unwrap_err();
        assert!(matches!(err, WavError::DuplicateChunk("fmt ")));
    }

    #[test]
    fn rejects_truncated_data_chunk() {
        let mut bytes = simple_wav(1, 8000, &[1, 2, 3, 4]);
        bytes.truncate(bytes.len() - 3);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, WavError::UnexpectedEof(_)));
    }

    #[test]
    fn rejects_misaligned_data_size() {
        // Stereo block align is 4; a 6-byte data chunk is ragged.
        let err = decode(&riff(&[
            chunk(b"fmt ", &fmt_payload(1, 2, 8000, 16)),
            chunk(b"data", &data_payload(&[1, 2, 3])),
        ]))
        .unwrap_err();
        assert!(matches!(err, WavError::InvalidHeader(_)));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = simple_wav(1, 8000, &[0, 0]);
        bytes[0..4].copy_from_slice(b"RIFX");
        assert!(matches!(
            decode(&bytes).unwrap_err(),
            WavError::InvalidHeader(_)
        ));

        let mut bytes = simple_wav(1, 8000, &[0, 0]);
        bytes[8..12].copy_from_slice(b"AVI ");
        assert!(matches!(
            decode(&bytes).unwrap_err(),
            WavError::InvalidHeader(_)
        ));
    }

    #[test]
    fn empty_data_chunk_is_valid() {
        let audio = decode(&simple_wav(2, 44100, &[])).unwrap();
        assert!(audio.samples.is_empty());
        assert_eq!(audio.duration_seconds(), 0.0);
    }
}
