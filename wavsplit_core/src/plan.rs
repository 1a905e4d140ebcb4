use crate::encode::MAX_DATA_LEN;
use crate::error::AudioSplitError;
use crate::format::AudioFormat;

/// Frame-aligned chunk boundaries derived from a byte budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitPlan {
    /// Frames in every chunk except possibly the last.
    pub frames_per_chunk: u64,
    /// `frames_per_chunk * frame_size`; never larger than the requested budget.
    pub chunk_bytes: u64,
    pub total_frames: u64,
    pub chunk_count: u64,
}

impl SplitPlan {
    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }

    /// Number of frames assigned to the 1-based chunk `index`.
    pub fn frames_in_chunk(&self, index: u64) -> u64 {
        if index == 0 || index > self.chunk_count {
            return 0;
        }
        let consumed = (index - 1) * self.frames_per_chunk;
        self.frames_per_chunk.min(self.total_frames - consumed)
    }
}

/// Plan how `total_frames` frames of `format` are cut into chunks of at most
/// `budget` bytes.
///
/// Budgets beyond what a single RIFF file can describe are clamped to that
/// limit. A budget that cannot hold one frame is rejected instead of
/// producing empty chunks.
pub fn plan(
    format: &AudioFormat,
    total_frames: u64,
    budget: u64,
) -> Result<SplitPlan, AudioSplitError> {
    let frame_size = format.frame_size as u64;
    let frames_per_chunk = budget.min(MAX_DATA_LEN) / frame_size;
    if frames_per_chunk == 0 {
        return Err(AudioSplitError::InvalidBudget {
            budget,
            frame_size: format.frame_size,
        });
    }

    Ok(SplitPlan {
        frames_per_chunk,
        chunk_bytes: frames_per_chunk * frame_size,
        total_frames,
        chunk_count: total_frames.div_ceil(frames_per_chunk),
    })
}
