//! Re-wrapping raw PCM frames as standalone WAV files.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::AudioSplitError;
use crate::format::{AudioFormat, SampleEncoding};

const WAVE_FORMAT_PCM: u16 = 0x0001;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;

/// Size of the canonical header written in front of every chunk.
pub const HEADER_LEN: u64 = 44;

/// Largest `data` payload a RIFF file can describe, leaving room for the
/// header fields counted by the RIFF size and a trailing pad byte.
pub const MAX_DATA_LEN: u64 = u32::MAX as u64 - (HEADER_LEN - 8) - 1;

/// Write `data` as a complete WAV file declaring exactly `frames` frames.
///
/// Returns the number of bytes written, header included.
pub fn write_wav<W: Write + ?Sized>(
    writer: &mut W,
    format: &AudioFormat,
    data: &[u8],
    frames: u64,
) -> Result<u64, AudioSplitError> {
    let data_len = data.len() as u64;
    let expected = frames
        .checked_mul(format.frame_size as u64)
        .ok_or_else(|| AudioSplitError::Encode(format!("{frames} frames overflow a byte count")))?;
    if data_len != expected {
        return Err(AudioSplitError::Encode(format!(
            "{data_len} bytes do not hold exactly {frames} frames of {} bytes",
            format.frame_size
        )));
    }
    if data_len > MAX_DATA_LEN {
        return Err(AudioSplitError::Encode(format!(
            "{data_len} bytes exceed the RIFF size limit"
        )));
    }

    let block_align = u16::try_from(format.frame_size).map_err(|_| {
        AudioSplitError::Encode(format!("frame size {} exceeds 16 bits", format.frame_size))
    })?;
    let byte_rate = u32::try_from(u64::from(format.sample_rate) * u64::from(block_align))
        .map_err(|_| AudioSplitError::Encode("byte rate exceeds 32 bits".into()))?;
    let format_tag = match format.encoding {
        SampleEncoding::Int => WAVE_FORMAT_PCM,
        SampleEncoding::Float => WAVE_FORMAT_IEEE_FLOAT,
    };

    // RIFF chunks are word aligned.
    let pad = data_len % 2;
    let riff_len = (HEADER_LEN - 8 + data_len + pad) as u32;

    writer.write_all(b"RIFF")?;
    writer.write_u32::<LittleEndian>(riff_len)?;
    writer.write_all(b"WAVE")?;

    writer.write_all(b"fmt ")?;
    writer.write_u32::<LittleEndian>(16)?;
    writer.write_u16::<LittleEndian>(format_tag)?;
    writer.write_u16::<LittleEndian>(format.channels)?;
    writer.write_u32::<LittleEndian>(format.sample_rate)?;
    writer.write_u32::<LittleEndian>(byte_rate)?;
    writer.write_u16::<LittleEndian>(block_align)?;
    writer.write_u16::<LittleEndian>(format.bits_per_sample)?;

    writer.write_all(b"data")?;
    writer.write_u32::<LittleEndian>(data_len as u32)?;
    writer.write_all(data)?;
    if pad == 1 {
        writer.write_u8(0)?;
    }

    Ok(HEADER_LEN + data_len + pad)
}
