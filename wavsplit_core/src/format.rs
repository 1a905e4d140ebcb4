//! Container parsing and raw frame access for PCM WAV sources.
//!
//! Symphonia is only used as a demuxer here: its WAV reader hands out packets
//! holding the untouched bytes of the `data` chunk, which is exactly what a
//! frame-aligned split needs. No decoding ever happens.

use std::fs::File;
use std::io::{self, ErrorKind};

use log::{debug, info};
use symphonia::core::codecs::{
    CodecType, CODEC_TYPE_NULL, CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_F64LE, CODEC_TYPE_PCM_S16LE,
    CODEC_TYPE_PCM_S24LE, CODEC_TYPE_PCM_S32LE, CODEC_TYPE_PCM_U8,
};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;

use crate::error::AudioSplitError;

/// How individual samples are represented on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Linear integer PCM (unsigned for 8-bit, signed otherwise).
    Int,
    /// IEEE 754 floating point.
    Float,
}

/// Immutable description of a PCM stream, derived once from the source header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Bytes per frame across all channels. Always greater than zero.
    pub frame_size: usize,
    pub encoding: SampleEncoding,
}

impl AudioFormat {
    /// Build a format, validating that it describes a usable PCM layout.
    pub fn new(
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
        encoding: SampleEncoding,
    ) -> Result<Self, AudioSplitError> {
        if sample_rate == 0 {
            return Err(AudioSplitError::MissingSampleRate);
        }
        if channels == 0 {
            return Err(AudioSplitError::UnsupportedFormat(
                "stream has no channels".into(),
            ));
        }
        if bits_per_sample == 0 {
            return Err(AudioSplitError::UnsupportedFormat(
                "stream does not declare a bit depth".into(),
            ));
        }

        let bytes_per_sample = usize::from(bits_per_sample).div_ceil(8);
        let frame_size = bytes_per_sample * usize::from(channels);

        Ok(Self {
            channels,
            sample_rate,
            bits_per_sample,
            frame_size,
            encoding,
        })
    }

    /// Declare fewer significant bits than each sample slot holds, as with
    /// 20-bit samples stored in 24-bit containers. The frame size is kept.
    pub fn with_valid_bits(mut self, bits: u16) -> Result<Self, AudioSplitError> {
        let container_bits = self.frame_size / usize::from(self.channels) * 8;
        if bits == 0 || usize::from(bits) > container_bits {
            return Err(AudioSplitError::UnsupportedFormat(format!(
                "{bits} valid bits do not fit {container_bits}-bit samples"
            )));
        }
        self.bits_per_sample = bits;
        Ok(self)
    }

    /// Playback length of `frames` frames in whole milliseconds, truncated.
    pub fn duration_ms(&self, frames: u64) -> u64 {
        let millis = u128::from(frames) * 1_000 / u128::from(self.sample_rate);
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}

/// A cursor over whole PCM frames.
pub trait FrameSource {
    /// Size of one frame in bytes.
    fn frame_size(&self) -> usize;

    /// Append up to `frames` whole frames to `buf` and return how many were
    /// appended. Returning fewer than requested means the stream has ended.
    fn read_frames(&mut self, buf: &mut Vec<u8>, frames: u64) -> Result<u64, AudioSplitError>;
}

/// Sequential reader over the raw frames of an opened container.
///
/// At most one demuxer packet is held beyond what the caller asked for.
pub struct FrameStream {
    reader: Box<dyn FormatReader>,
    track_id: u32,
    frame_size: usize,
    total_frames: u64,
    pending: Vec<u8>,
    pending_pos: usize,
    exhausted: bool,
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream")
            .field("track_id", &self.track_id)
            .field("frame_size", &self.frame_size)
            .field("total_frames", &self.total_frames)
            .field("pending_pos", &self.pending_pos)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl FrameStream {
    /// Frame count declared by the container header.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn refill(&mut self) -> Result<(), AudioSplitError> {
        loop {
            match self.reader.next_packet() {
                Ok(packet) => {
                    if packet.track_id() != self.track_id {
                        continue;
                    }
                    self.pending.clear();
                    self.pending.extend_from_slice(packet.buf());
                    self.pending_pos = 0;
                    return Ok(());
                }
                Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => {
                    self.exhausted = true;
                    return Ok(());
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.exhausted = true;
                    return Ok(());
                }
                Err(err) => return Err(AudioSplitError::from_symphonia(err)),
            }
        }
    }
}

impl FrameSource for FrameStream {
    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn read_frames(&mut self, buf: &mut Vec<u8>, frames: u64) -> Result<u64, AudioSplitError> {
        let wanted = usize::try_from(frames)
            .ok()
            .and_then(|frames| frames.checked_mul(self.frame_size))
            .ok_or_else(|| {
                io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("cannot buffer {frames} frames at once"),
                )
            })?;

        let start = buf.len();
        let target = start + wanted;

        while buf.len() < target {
            let available = self.pending.len() - self.pending_pos;
            if available > 0 {
                let take = available.min(target - buf.len());
                buf.extend_from_slice(&self.pending[self.pending_pos..self.pending_pos + take]);
                self.pending_pos += take;
                continue;
            }

            if self.exhausted {
                break;
            }
            self.refill()?;
        }

        // A container cut off mid-frame leaves a partial frame behind; drop it.
        let whole = (buf.len() - start) / self.frame_size;
        buf.truncate(start + whole * self.frame_size);

        Ok(whole as u64)
    }
}

/// Open a seekable source and parse its container header.
pub fn open<S: MediaSource + 'static>(
    source: S,
) -> Result<(AudioFormat, FrameStream), AudioSplitError> {
    open_with_hint(Box::new(source), Hint::new())
}

/// Open a file, using its extension as a probing hint.
pub fn open_file(
    file: File,
    extension: Option<&str>,
) -> Result<(AudioFormat, FrameStream), AudioSplitError> {
    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }
    open_with_hint(Box::new(file), hint)
}

fn open_with_hint(
    source: Box<dyn MediaSource>,
    hint: Hint,
) -> Result<(AudioFormat, FrameStream), AudioSplitError> {
    if !source.is_seekable() {
        return Err(AudioSplitError::Io(io::Error::new(
            ErrorKind::Unsupported,
            "input source must be seekable",
        )));
    }

    let mss = MediaSourceStream::new(source, Default::default());
    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(AudioSplitError::from_symphonia)?;
    let reader = probed.format;

    let track = reader.default_track().ok_or_else(|| {
        AudioSplitError::UnsupportedFormat("input stream does not provide a default track".into())
    })?;
    let params = &track.codec_params;

    let (encoding, container_bits) = pcm_layout(params.codec).ok_or_else(|| {
        AudioSplitError::UnsupportedFormat(if params.codec == CODEC_TYPE_NULL {
            "input stream does not declare a codec".to_owned()
        } else {
            format!("codec {:?} is not uncompressed PCM", params.codec)
        })
    })?;

    let sample_rate = params
        .sample_rate
        .ok_or(AudioSplitError::MissingSampleRate)?;
    let channels = params
        .channels
        .map(|channels| channels.count())
        .ok_or_else(|| {
            AudioSplitError::UnsupportedFormat("input stream does not declare its channels".into())
        })?;
    let channels = u16::try_from(channels).map_err(|_| {
        AudioSplitError::UnsupportedFormat(format!("{channels} channels is too many"))
    })?;
    let total_frames = params.n_frames.ok_or_else(|| {
        AudioSplitError::UnsupportedFormat("container does not declare a frame count".into())
    })?;

    let mut format = AudioFormat::new(channels, sample_rate, container_bits, encoding)?;
    if let Some(bits) = params.bits_per_sample {
        let bits = u16::try_from(bits).map_err(|_| {
            AudioSplitError::UnsupportedFormat(format!("{bits} bits per sample is too many"))
        })?;
        format = format.with_valid_bits(bits)?;
    }
    let track_id = track.id;

    info!(
        "opened PCM source: {} channel(s), {} Hz, {} bit, {} frame(s)",
        format.channels, format.sample_rate, format.bits_per_sample, total_frames
    );
    debug!("frame size is {} byte(s)", format.frame_size);

    let stream = FrameStream {
        reader,
        track_id,
        frame_size: format.frame_size,
        total_frames,
        pending: Vec::new(),
        pending_pos: 0,
        exhausted: false,
    };

    Ok((format, stream))
}

/// Storage layout of the PCM codecs a WAV file can carry without compression.
fn pcm_layout(codec: CodecType) -> Option<(SampleEncoding, u16)> {
    match codec {
        CODEC_TYPE_PCM_U8 => Some((SampleEncoding::Int, 8)),
        CODEC_TYPE_PCM_S16LE => Some((SampleEncoding::Int, 16)),
        CODEC_TYPE_PCM_S24LE => Some((SampleEncoding::Int, 24)),
        CODEC_TYPE_PCM_S32LE => Some((SampleEncoding::Int, 32)),
        CODEC_TYPE_PCM_F32LE => Some((SampleEncoding::Float, 32)),
        CODEC_TYPE_PCM_F64LE => Some((SampleEncoding::Float, 64)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn wav_bytes(format_tag: u16, channels: u16, sample_rate: u32, bits: u16, data: &[u8]) -> Vec<u8> {
        let block_align = channels * bits.div_ceil(8);
        let byte_rate = sample_rate * u32::from(block_align);
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&format_tag.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    fn ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn parses_stereo_16_bit_header() {
        let data = ramp(4 * 1_000);
        let (format, stream) = open(Cursor::new(wav_bytes(1, 2, 44_100, 16, &data))).unwrap();

        assert_eq!(format.channels, 2);
        assert_eq!(format.sample_rate, 44_100);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.frame_size, 4);
        assert_eq!(format.encoding, SampleEncoding::Int);
        assert_eq!(stream.total_frames(), 1_000);
    }

    #[test]
    fn parses_unsigned_8_bit_mono() {
        let data = ramp(500);
        let (format, stream) = open(Cursor::new(wav_bytes(1, 1, 8_000, 8, &data))).unwrap();

        assert_eq!(format.frame_size, 1);
        assert_eq!(stream.total_frames(), 500);
    }

    #[test]
    fn parses_float_samples() {
        let data = ramp(8 * 10);
        let (format, _) = open(Cursor::new(wav_bytes(3, 2, 48_000, 32, &data))).unwrap();

        assert_eq!(format.encoding, SampleEncoding::Float);
        assert_eq!(format.frame_size, 8);
    }

    #[test]
    fn frame_stream_returns_data_bytes_verbatim() {
        // Larger than a single demuxer packet so reads span packet boundaries.
        let data = ramp(2 * 10_000);
        let (_, mut stream) = open(Cursor::new(wav_bytes(1, 1, 8_000, 16, &data))).unwrap();

        let mut collected = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let frames = stream.read_frames(&mut buf, 777).unwrap();
            assert_eq!(buf.len() as u64, frames * 2);
            collected.extend_from_slice(&buf);
            if frames < 777 {
                break;
            }
        }

        assert_eq!(collected, data);
        assert_eq!(stream.read_frames(&mut buf, 10).unwrap(), 0);
    }

    #[test]
    fn rejects_non_audio_input() {
        let err = open(Cursor::new(b"not an audio file".to_vec())).unwrap_err();
        assert!(matches!(err, AudioSplitError::UnsupportedFormat(_)));
    }

    #[test]
    fn rejects_companded_pcm() {
        let data = ramp(100);
        // Format tag 7 is mu-law.
        let err = open(Cursor::new(wav_bytes(7, 1, 8_000, 8, &data))).unwrap_err();
        assert!(matches!(err, AudioSplitError::UnsupportedFormat(_)));
    }

    #[test]
    fn duration_truncates_fractional_milliseconds() {
        let format = AudioFormat::new(1, 44_100, 16, SampleEncoding::Int).unwrap();
        assert_eq!(format.duration_ms(44_100), 1_000);
        // 1000 frames at 44.1 kHz is 22.675... ms.
        assert_eq!(format.duration_ms(1_000), 22);
        assert_eq!(format.duration_ms(0), 0);
    }

    #[test]
    fn format_requires_sample_rate_and_channels() {
        assert!(matches!(
            AudioFormat::new(1, 0, 16, SampleEncoding::Int),
            Err(AudioSplitError::MissingSampleRate)
        ));
        assert!(matches!(
            AudioFormat::new(0, 8_000, 16, SampleEncoding::Int),
            Err(AudioSplitError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn valid_bits_narrow_depth_but_keep_frame_size() {
        let format = AudioFormat::new(2, 48_000, 24, SampleEncoding::Int)
            .unwrap()
            .with_valid_bits(20)
            .unwrap();
        assert_eq!(format.bits_per_sample, 20);
        assert_eq!(format.frame_size, 6);

        let container = AudioFormat::new(1, 48_000, 24, SampleEncoding::Int).unwrap();
        assert!(matches!(
            container.with_valid_bits(32),
            Err(AudioSplitError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            container.with_valid_bits(0),
            Err(AudioSplitError::UnsupportedFormat(_))
        ));
    }
}
