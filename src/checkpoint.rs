use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{trace, warn};

use crate::path_utils::{append_extension, logical_name};

/// Durable marker of how far a logical file has been read
///
/// `filename` is always the uncompressed name, so a position taken from `app.log.1` is valid for `app.log.1.gz`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamPosition {
    pub filename: PathBuf,
    pub bytes_consumed: u64,
}

/// Possible errors that could happen while working with the checkpoint file
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("while working with checkpoint file")]
    IO(#[from] std::io::Error),

    #[error("malformed checkpoint record `{0}`")]
    Malformed(String),

    #[error("cannot record non UTF-8 filename `{0}`")]
    NonUtf8Path(PathBuf),
}

impl StreamPosition {
    /// Position inside `filename`; a `.gz` suffix is stripped
    pub fn new(filename: impl AsRef<Path>, bytes_consumed: u64) -> Self {
        Self {
            filename: logical_name(filename),
            bytes_consumed,
        }
    }

    /// Serialize as a single `<filename>:<bytes>` line
    pub fn to_record(&self) -> Result<String, CheckpointError> {
        let Some(name) = self.filename.to_str() else {
            return Err(CheckpointError::NonUtf8Path(self.filename.clone()));
        };
        Ok(format!("{}:{}\n", name, self.bytes_consumed))
    }

    /// Parse the first line of a checkpoint file
    ///
    /// A record without a separator or without a count means there is nothing to resume from.
    pub fn parse_record(text: &str) -> Result<Option<Self>, CheckpointError> {
        let line = text.lines().next().unwrap_or_default();
        let Some((name, count)) = line.rsplit_once(':') else {
            return Ok(None);
        };
        let count = count.trim();
        if name.is_empty() || count.is_empty() {
            return Ok(None);
        }
        let bytes_consumed = count
            .parse()
            .map_err(|_| CheckpointError::Malformed(line.to_string()))?;
        Ok(Some(Self::new(name, bytes_consumed)))
    }
}

/// Single-entry store for the latest `StreamPosition`
///
/// Each `save` replaces the whole record, so the file never grows. Without a configured path both `load` and
/// `save` do nothing and the engine always starts fresh.
///
/// ```rust no_run
/// # use logtail::{CheckpointStore, StreamPosition};
/// let mut store = CheckpointStore::at("/var/lib/logtail/apache.checkpoint");
/// store.save(&StreamPosition::new("/var/log/apache2/access.log.1.gz", 500))?;
/// assert_eq!(
///     store.load()?,
///     Some(StreamPosition::new("/var/log/apache2/access.log.1", 500))
/// );
/// # Ok::<(), logtail::CheckpointError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: Option<PathBuf>,
}

impl CheckpointStore {
    /// Store that keeps nothing
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Store backed by the file at `path`. The file is created on first save.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Read the stored position, if any
    pub fn load(&self) -> Result<Option<StreamPosition>, CheckpointError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(path)?;
        let position = StreamPosition::parse_record(&text)?;
        if position.is_none() {
            warn!(path = %path.display(), "checkpoint file holds no position, starting fresh");
        }
        Ok(position)
    }

    /// Replace the stored position
    ///
    /// The record is written to a sibling temporary file, synced and renamed over the checkpoint, so a crash
    /// leaves either the old or the new record in place.
    pub fn save(&mut self, position: &StreamPosition) -> Result<(), CheckpointError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let record = position.to_record()?;
        let staging = append_extension(path.clone(), "tmp");
        {
            let mut file = File::create(&staging)?;
            file.write_all(record.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&staging, path)?;
        trace!(path = %path.display(), record = record.trim_end(), "checkpoint saved");
        Ok(())
    }
}
