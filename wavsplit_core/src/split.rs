//! The chunking loop: read a plan's worth of frames, wrap, write, repeat.

use std::io::Write;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;

use crate::encode;
use crate::error::AudioSplitError;
use crate::format::{AudioFormat, FrameSource};
use crate::plan::SplitPlan;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sink::ChunkSink;

/// Metadata of one written chunk.
///
/// Serialises with the field names of the JSON report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChunkResult {
    #[serde(rename = "fileUrl")]
    pub output_id: String,
    /// PCM bytes carried by the chunk, header excluded.
    #[serde(rename = "fileSize")]
    pub byte_size: u64,
    #[serde(rename = "fileDuration")]
    pub duration_ms: u64,
    #[serde(skip)]
    pub frames: u64,
}

/// Everything a split produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Chunks in source order.
    pub chunks: Vec<ChunkResult>,
    /// The source ended before the frame count its header declared.
    pub truncated: bool,
}

impl SplitOutcome {
    pub fn total_bytes(&self) -> u64 {
        self.chunks.iter().map(|chunk| chunk.byte_size).sum()
    }

    pub fn total_frames(&self) -> u64 {
        self.chunks.iter().map(|chunk| chunk.frames).sum()
    }
}

/// Identifier of the 1-based chunk `index` for `prefix`.
pub fn output_id(prefix: &str, index: u64) -> String {
    format!("{prefix}-{index:03}.wav")
}

/// Cut `source` into the chunks described by `plan`, writing each to `sink`.
///
/// Chunks are produced strictly in order and each one is closed before the
/// next is read. A source that runs dry early ends the split successfully:
/// whatever whole frames were read become the last chunk and the outcome is
/// flagged as truncated. Chunks already written are never removed, even when
/// a later write fails.
///
/// One chunk of PCM data is buffered in memory at a time, so memory use grows
/// with the chunk size.
pub fn split<F, S, P>(
    source: &mut F,
    format: &AudioFormat,
    plan: &SplitPlan,
    prefix: &str,
    sink: &mut S,
    progress: &mut P,
) -> Result<SplitOutcome, AudioSplitError>
where
    F: FrameSource + ?Sized,
    S: ChunkSink + ?Sized,
    P: ProgressReporter + ?Sized,
{
    if source.frame_size() != format.frame_size {
        return Err(AudioSplitError::Encode(format!(
            "source frames are {} bytes but the format declares {}",
            source.frame_size(),
            format.frame_size
        )));
    }
    if plan.chunk_bytes != plan.frames_per_chunk * format.frame_size as u64 {
        return Err(AudioSplitError::Encode(format!(
            "plan of {} bytes per chunk is not aligned to {}-byte frames",
            plan.chunk_bytes, format.frame_size
        )));
    }

    // The budget may dwarf the source, so reserve only what the first chunk holds.
    let largest_chunk = plan.frames_in_chunk(1) * format.frame_size as u64;
    let capacity = usize::try_from(largest_chunk).map_err(|_| {
        AudioSplitError::Encode(format!(
            "chunks of {largest_chunk} bytes cannot be buffered"
        ))
    })?;

    info!(
        "splitting {} frame(s) into {} chunk(s) of up to {} frame(s)",
        plan.total_frames, plan.chunk_count, plan.frames_per_chunk
    );
    progress.report(ProgressEvent::Start {
        total_chunks: plan.chunk_count,
        total_duration: Duration::from_millis(format.duration_ms(plan.total_frames)),
    });

    let mut outcome = SplitOutcome::default();
    let mut buffer = Vec::with_capacity(capacity);
    let mut frames_left = plan.total_frames;
    let mut processed = 0u64;

    for index in 1..=plan.chunk_count {
        let frames_to_read = plan.frames_in_chunk(index);

        buffer.clear();
        let frames_read = source.read_frames(&mut buffer, frames_to_read)?;
        if frames_read < frames_to_read {
            outcome.truncated = true;
            warn!(
                "source ended early: chunk {index} got {frames_read} of {frames_to_read} frame(s), {} frame(s) never arrived",
                frames_left - frames_read
            );
            if frames_read == 0 {
                break;
            }
        }

        let id = output_id(prefix, index);
        write_chunk(sink, &id, format, &buffer, frames_read)?;

        let chunk = ChunkResult {
            output_id: id,
            byte_size: buffer.len() as u64,
            duration_ms: format.duration_ms(frames_read),
            frames: frames_read,
        };
        debug!(
            "wrote {} ({} bytes, {} ms)",
            chunk.output_id, chunk.byte_size, chunk.duration_ms
        );

        frames_left -= frames_read;
        processed += frames_read;
        progress.report(ProgressEvent::Advance {
            chunk: chunk.clone(),
            processed: Duration::from_millis(format.duration_ms(processed)),
        });
        outcome.chunks.push(chunk);

        if outcome.truncated {
            break;
        }
    }

    progress.report(ProgressEvent::Finish);
    info!(
        "wrote {} chunk(s), {} byte(s) of PCM data",
        outcome.chunks.len(),
        outcome.total_bytes()
    );

    Ok(outcome)
}

fn write_chunk<S: ChunkSink + ?Sized>(
    sink: &mut S,
    output_id: &str,
    format: &AudioFormat,
    data: &[u8],
    frames: u64,
) -> Result<(), AudioSplitError> {
    let mut writer = sink.create(output_id)?;
    encode::write_wav(&mut writer, format, data, frames)?;
    writer.flush()?;
    Ok(())
}
