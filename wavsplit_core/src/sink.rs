//! Destinations for encoded chunks.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::PathBuf;

use crate::error::AudioSplitError;

/// Hands out one writer per output identifier.
///
/// The splitter drops each writer before asking for the next one, so a sink
/// never has more than one chunk open.
pub trait ChunkSink {
    type Writer<'a>: Write
    where
        Self: 'a;

    fn create(&mut self, output_id: &str) -> Result<Self::Writer<'_>, AudioSplitError>;
}

/// Writes chunks as files, resolving output identifiers against a root directory.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    root: PathBuf,
    overwrite: bool,
    create_dirs: bool,
}

impl DirectorySink {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            overwrite: false,
            create_dirs: false,
        }
    }

    /// Replace files that already exist instead of failing.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Create missing parent directories of output files.
    pub fn create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }

    /// Path a chunk with the given identifier is written to.
    pub fn resolve(&self, output_id: &str) -> PathBuf {
        self.root.join(output_id)
    }
}

impl ChunkSink for DirectorySink {
    type Writer<'a> = BufWriter<File>;

    fn create(&mut self, output_id: &str) -> Result<Self::Writer<'_>, AudioSplitError> {
        let path = self.resolve(output_id);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                if self.create_dirs {
                    fs::create_dir_all(parent)?;
                } else {
                    return Err(AudioSplitError::MissingOutputDirectory(parent.to_path_buf()));
                }
            }
        }

        let file = if self.overwrite {
            File::create(&path)?
        } else {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    return Err(AudioSplitError::OutputExists(path));
                }
                Err(err) => return Err(err.into()),
            }
        };

        Ok(BufWriter::new(file))
    }
}

/// Keeps encoded chunks in memory, in the order they were produced.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    chunks: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> &[(String, Vec<u8>)] {
        &self.chunks
    }

    pub fn get(&self, output_id: &str) -> Option<&[u8]> {
        self.chunks
            .iter()
            .find(|(id, _)| id == output_id)
            .map(|(_, bytes)| bytes.as_slice())
    }
}

impl ChunkSink for MemorySink {
    type Writer<'a> = &'a mut Vec<u8>;

    fn create(&mut self, output_id: &str) -> Result<Self::Writer<'_>, AudioSplitError> {
        self.chunks.push((output_id.to_owned(), Vec::new()));
        let (_, bytes) = self
            .chunks
            .last_mut()
            .ok_or_else(|| AudioSplitError::Encode("memory sink lost its chunk".into()))?;
        Ok(bytes)
    }
}
