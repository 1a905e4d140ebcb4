use std::time::Duration;

use crate::split::ChunkResult;

/// Events emitted while chunks are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Splitting is about to begin.
    Start {
        total_chunks: u64,
        total_duration: Duration,
    },
    /// A chunk has been written; `processed` is the audio covered so far.
    Advance {
        chunk: ChunkResult,
        processed: Duration,
    },
    /// All chunks have been written.
    Finish,
}

/// Receives [`ProgressEvent`]s. Every method has a no-op default.
pub trait ProgressReporter {
    fn report(&mut self, _event: ProgressEvent) {}
}

impl<F> ProgressReporter for F
where
    F: FnMut(ProgressEvent),
{
    fn report(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Reporter that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}
