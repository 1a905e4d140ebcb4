use std::io;
use std::path::PathBuf;

use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

/// Errors that can occur while splitting audio files.
#[derive(Debug, Error)]
pub enum AudioSplitError {
    /// The source is not a container this crate can split without decoding.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Wrapper around IO errors encountered while reading or writing files.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The requested chunk size cannot hold a single frame.
    #[error("chunk size of {budget} bytes is smaller than one frame ({frame_size} bytes)")]
    InvalidBudget { budget: u64, frame_size: usize },

    /// A chunk could not be wrapped into a valid WAV container.
    #[error("failed to encode chunk: {0}")]
    Encode(String),

    /// Error returned when the decoder track lacks a sample rate.
    #[error("input stream does not advertise a sample rate")]
    MissingSampleRate,

    /// Error returned when the requested chunk size is zero.
    #[error("chunk size must be greater than zero bytes")]
    InvalidChunkSize,

    /// The output prefix does not name a file.
    #[error("invalid output prefix '{0}'")]
    InvalidOutputPrefix(String),

    /// The directory that should receive the chunks does not exist.
    #[error("output directory does not exist: {}", .0.display())]
    MissingOutputDirectory(PathBuf),

    /// A chunk would replace an existing file and overwriting is disabled.
    #[error("refusing to overwrite existing file: {}", .0.display())]
    OutputExists(PathBuf),
}

impl AudioSplitError {
    /// Classify an error raised by symphonia while probing or reading the source.
    ///
    /// Only genuine IO failures surface as [`AudioSplitError::Io`]; anything the
    /// demuxer rejects means the source is not a container we can split.
    pub(crate) fn from_symphonia(err: SymphoniaError) -> Self {
        match err {
            SymphoniaError::IoError(err) => AudioSplitError::Io(err),
            SymphoniaError::Unsupported(what) => AudioSplitError::UnsupportedFormat(what.to_owned()),
            SymphoniaError::DecodeError(what) => {
                AudioSplitError::UnsupportedFormat(format!("malformed container: {what}"))
            }
            other => AudioSplitError::UnsupportedFormat(other.to_string()),
        }
    }
}
