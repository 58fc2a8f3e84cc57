use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};

use crate::{config::ConfigError, path_utils::compare_names};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Lists files matching a glob pattern inside one directory, oldest first
///
/// Nothing is cached: every call to `list` looks at the directory again so that freshly rotated files are seen
/// on the next pass.
#[derive(Debug, Clone)]
pub struct FileSetResolver {
    directory: PathBuf,
    pattern: String,
    full_pattern: String,
}

impl FileSetResolver {
    /// Prepare a resolver for `pattern` inside `directory`
    ///
    /// Glob metacharacters inside `directory` are escaped, only `pattern` is interpreted.
    pub fn new(directory: impl AsRef<Path>, pattern: &str) -> Result<Self, ConfigError> {
        let directory = directory.as_ref();
        let Some(directory_str) = directory.to_str() else {
            return Err(ConfigError::NonUtf8Path(directory.to_path_buf()));
        };
        let full_pattern = Path::new(&Pattern::escape(directory_str))
            .join(pattern)
            .to_string_lossy()
            .into_owned();
        // fail early instead of on every pass
        Pattern::new(&full_pattern)?;

        Ok(Self {
            directory: directory.to_path_buf(),
            pattern: pattern.to_string(),
            full_pattern,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Files currently matching, sorted ascending by name. Directories are skipped.
    ///
    /// An empty result is not an error: callers wait and retry.
    pub fn list(&self) -> Vec<PathBuf> {
        let entries = match glob::glob_with(&self.full_pattern, MATCH_OPTIONS) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(pattern = %self.full_pattern, error = %e, "glob pattern rejected");
                return vec![];
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    debug!(error = %e, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|path| !path.is_dir())
            .collect();
        files.sort_by(|a, b| compare_names(a, b));
        files.dedup();
        files
    }
}
