//! Split PCM WAV files into independently playable chunks of bounded byte size.
//!
//! Chunk boundaries always fall on frame boundaries. Each chunk is re-wrapped
//! as a complete WAV file with the source's channel count, sample rate and bit
//! depth, and is reported with its size and playback duration.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::info;
use symphonia::core::io::MediaSource;

pub mod encode;
pub mod error;
pub mod format;
pub mod plan;
pub mod progress;
pub mod report;
pub mod sink;
pub mod split;

pub use error::AudioSplitError;
pub use format::{open, AudioFormat, FrameSource, FrameStream, SampleEncoding};
pub use plan::{plan, SplitPlan};
pub use progress::{NoProgress, ProgressEvent, ProgressReporter};
pub use report::SplitRequest;
pub use sink::{ChunkSink, DirectorySink, MemorySink};
pub use split::{output_id, split, ChunkResult, SplitOutcome};

/// Configuration for splitting a file on disk.
#[derive(Clone, Debug)]
pub struct Config {
    /// Canonicalized directory that relative paths are resolved against.
    pub root: PathBuf,
    /// Canonicalized path of the source file to split.
    pub input_path: PathBuf,
    /// Prefix of the generated chunk names, relative to `root` unless absolute.
    pub output_prefix: String,
    /// Upper bound on the PCM bytes carried by one chunk.
    pub chunk_size_bytes: u64,
    /// Replace chunk files that already exist.
    pub overwrite: bool,
    /// Create the directory the chunks are written into when it is missing.
    pub create_dirs: bool,
}

/// Builder for [`Config`].
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    root: Option<PathBuf>,
    input: PathBuf,
    output_prefix: String,
    chunk_size_bytes: u64,
    overwrite: bool,
    create_dirs: bool,
}

impl Config {
    /// Construct a new [`Config`] with default options.
    pub fn new<P: AsRef<Path>, S: Into<String>>(
        input: P,
        output_prefix: S,
        chunk_size_bytes: u64,
    ) -> Result<Self, AudioSplitError> {
        Self::builder(input, output_prefix, chunk_size_bytes).build()
    }

    pub fn builder<P: AsRef<Path>, S: Into<String>>(
        input: P,
        output_prefix: S,
        chunk_size_bytes: u64,
    ) -> ConfigBuilder {
        ConfigBuilder {
            root: None,
            input: input.as_ref().to_path_buf(),
            output_prefix: output_prefix.into(),
            chunk_size_bytes,
            overwrite: false,
            create_dirs: false,
        }
    }

    fn sink(&self) -> DirectorySink {
        DirectorySink::new(&self.root)
            .overwrite(self.overwrite)
            .create_dirs(self.create_dirs)
    }
}

impl ConfigBuilder {
    /// Directory that relative input paths and output prefixes resolve against.
    /// Defaults to the current directory.
    pub fn root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }

    pub fn build(self) -> Result<Config, AudioSplitError> {
        if self.chunk_size_bytes == 0 {
            return Err(AudioSplitError::InvalidChunkSize);
        }

        let prefix = Path::new(&self.output_prefix);
        if self.output_prefix.is_empty()
            || self.output_prefix.ends_with(['/', '\\'])
            || prefix.file_name().is_none()
        {
            return Err(AudioSplitError::InvalidOutputPrefix(self.output_prefix));
        }

        let root = fs::canonicalize(self.root.as_deref().unwrap_or(Path::new(".")))?;
        let input_path = fs::canonicalize(root.join(&self.input))?;

        let target = root.join(prefix);
        if let Some(output_dir) = target.parent() {
            if !output_dir.is_dir() && !self.create_dirs {
                return Err(AudioSplitError::MissingOutputDirectory(
                    output_dir.to_path_buf(),
                ));
            }
        }

        Ok(Config {
            root,
            input_path,
            output_prefix: self.output_prefix,
            chunk_size_bytes: self.chunk_size_bytes,
            overwrite: self.overwrite,
            create_dirs: self.create_dirs,
        })
    }
}

fn open_input(config: &Config) -> Result<(AudioFormat, FrameStream), AudioSplitError> {
    let file = File::open(&config.input_path)?;
    let extension = config.input_path.extension().and_then(|ext| ext.to_str());
    format::open_file(file, extension)
}

/// Paths the chunks of `config` would be written to, without writing anything.
pub fn plan_chunks(config: &Config) -> Result<Vec<PathBuf>, AudioSplitError> {
    let (format, frames) = open_input(config)?;
    let plan = plan::plan(&format, frames.total_frames(), config.chunk_size_bytes)?;
    let sink = config.sink();

    Ok((1..=plan.chunk_count)
        .map(|index| sink.resolve(&output_id(&config.output_prefix, index)))
        .collect())
}

/// Perform the splitting operation using the supplied [`Config`].
pub fn run(config: Config) -> Result<SplitOutcome, AudioSplitError> {
    run_with_reporter(config, &mut NoProgress)
}

/// Like [`run`], invoking `callback` as chunks are written.
pub fn run_with_progress<F>(config: Config, mut callback: F) -> Result<SplitOutcome, AudioSplitError>
where
    F: FnMut(ProgressEvent),
{
    run_with_reporter(config, &mut callback)
}

pub fn run_with_reporter<P: ProgressReporter + ?Sized>(
    config: Config,
    progress: &mut P,
) -> Result<SplitOutcome, AudioSplitError> {
    info!(
        "splitting '{}' into '{}' chunks of at most {} bytes",
        config.input_path.display(),
        config.output_prefix,
        config.chunk_size_bytes
    );

    let (format, mut frames) = open_input(&config)?;
    let plan = plan::plan(&format, frames.total_frames(), config.chunk_size_bytes)?;
    let mut sink = config.sink();

    split::split(
        &mut frames,
        &format,
        &plan,
        &config.output_prefix,
        &mut sink,
        progress,
    )
}

/// Split an already opened source into `sink`.
///
/// The caller resolves where the source lives and where chunks go; output
/// identifiers are `"{prefix}-{NNN}.wav"`.
pub fn split_source<M, S>(
    source: M,
    prefix: &str,
    chunk_size_bytes: u64,
    sink: &mut S,
) -> Result<SplitOutcome, AudioSplitError>
where
    M: MediaSource + 'static,
    S: ChunkSink + ?Sized,
{
    let (format, mut frames) = format::open(source)?;
    let plan = plan::plan(&format, frames.total_frames(), chunk_size_bytes)?;
    split::split(&mut frames, &format, &plan, prefix, sink, &mut NoProgress)
}
