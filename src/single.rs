use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    checkpoint::StreamPosition,
    config::ConfigError,
    file_id::FileIdentity,
    follow::{Follow, Selection},
    path_utils::logical_name,
};

/// Phase of a `SingleStreamTailer`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// No file has matched yet
    NoFile,
    /// Reading the file whose identity was recorded when it was first seen
    Following,
    /// The path now refers to a different file than before; it is being read from offset 0
    Rotated,
}

/// Follows one path whose file may be replaced underneath it (`sys.log` style rotation)
///
/// The path is expected to match exactly one file at a time. Whenever the identity (device + inode) behind the path
/// changes, reading restarts at offset 0 and any pending line fragment of the old file is dropped.
#[derive(Debug)]
pub struct SingleStreamTailer {
    pattern: String,
    state: StreamState,
    identity: Option<FileIdentity>,
    follow: Option<Follow>,
    resume: Option<StreamPosition>,
}

impl SingleStreamTailer {
    /// `resume` is honoured only if it names the file that matches first and that file is long enough to contain
    /// the stored offset.
    pub fn new(pattern: impl Into<String>, resume: Option<StreamPosition>) -> Self {
        Self {
            pattern: pattern.into(),
            state: StreamState::NoFile,
            identity: None,
            follow: None,
            resume,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn current(&self) -> Option<&Follow> {
        self.follow.as_ref()
    }

    /// Pick the file to drain on this pass from the freshly resolved `files`
    ///
    /// More than one match is a configuration error. No match, or a match that vanished before it could be
    /// inspected, yields `None` and the caller waits.
    pub fn select(&mut self, files: &[PathBuf]) -> Result<Option<Selection<'_>>, ConfigError> {
        let path = match files {
            [] => return Ok(None),
            [path] => path,
            many => {
                return Err(ConfigError::AmbiguousMatch {
                    pattern: self.pattern.clone(),
                    count: many.len(),
                })
            }
        };

        let identity = match FileIdentity::of_path(path) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "matched file vanished before it could be inspected");
                return Ok(None);
            }
        };

        match self.identity {
            Some(known) if known == identity => {
                self.state = StreamState::Following;
                if let Some(follow) = self.follow.as_mut().filter(|f| f.path() != path) {
                    follow.relocate(path.clone());
                }
            }
            Some(known) => {
                info!(
                    path = %path.display(),
                    old_inode = known.inode,
                    new_inode = identity.inode,
                    "file was replaced, reading from start"
                );
                self.state = StreamState::Rotated;
                self.identity = Some(identity);
                if let Some(old) = self.follow.replace(Follow::start(path.to_path_buf())) {
                    old.abandon();
                }
            }
            None => {
                self.state = StreamState::Following;
                self.identity = Some(identity);
                self.follow = Some(self.first_follow(path));
            }
        }

        Ok(self.follow.as_mut().map(|follow| Selection {
            follow,
            skip_wait: false,
        }))
    }

    fn first_follow(&mut self, path: &Path) -> Follow {
        let Some(resume) = self.resume.take() else {
            return Follow::start(path.to_path_buf());
        };
        if resume.filename != logical_name(path) {
            debug!(stored = %resume.filename.display(), "checkpoint names another file, starting at 0");
            return Follow::start(path.to_path_buf());
        }
        let length = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if length < resume.bytes_consumed {
            info!(
                path = %path.display(),
                stored = resume.bytes_consumed,
                length,
                "file is shorter than checkpoint, starting at 0"
            );
            return Follow::start(path.to_path_buf());
        }
        info!(path = %path.display(), offset = resume.bytes_consumed, "resuming from checkpoint");
        Follow::resume(path.to_path_buf(), resume.bytes_consumed)
    }
}
