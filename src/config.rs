use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_READ_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_IDLE_PASS_LIMIT: u32 = 3;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_EMPTY_DIR_INTERVAL: Duration = Duration::from_secs(3);

/// Fatal problems with how the tailer was set up
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("directory `{0}` does not exist")]
    MissingDirectory(PathBuf),

    #[error("`{0}` is not a directory")]
    NotADirectory(PathBuf),

    #[error("invalid glob pattern")]
    InvalidPattern(#[from] glob::PatternError),

    #[error("path `{0}` is not valid UTF-8")]
    NonUtf8Path(PathBuf),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },

    #[error("single-file mode expects one match for `{pattern}`, found {count}")]
    AmbiguousMatch { pattern: String, count: usize },

    #[error("while reading configuration file")]
    Read(#[from] std::io::Error),

    #[error("while parsing configuration file")]
    Parse(#[from] serde_json::Error),
}

/// Settings consumed by `TailEngine`
///
/// Can be built in code with `TailConfig::new` and the `with_*` methods, or loaded from a JSON document where
/// durations are given in milliseconds:
///
/// ```json
/// { "directory": "/var/log/apache2", "pattern": "access.log.*", "checkpoint_path": "/var/lib/logtail/apache" }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TailConfig {
    pub directory: PathBuf,
    pub pattern: String,
    #[serde(default)]
    pub single_file: bool,
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,
    /// Ignore any stored checkpoint at startup and begin at the newest file
    #[serde(default)]
    pub fresh_start: bool,
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
    #[serde(default = "default_idle_pass_limit")]
    pub idle_pass_limit: u32,
    #[serde(default = "default_poll_interval", with = "duration_millis")]
    pub poll_interval: Duration,
    #[serde(default = "default_empty_dir_interval", with = "duration_millis")]
    pub empty_dir_interval: Duration,
}

fn default_read_chunk_size() -> usize {
    DEFAULT_READ_CHUNK_SIZE
}

fn default_idle_pass_limit() -> u32 {
    DEFAULT_IDLE_PASS_LIMIT
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_empty_dir_interval() -> Duration {
    DEFAULT_EMPTY_DIR_INTERVAL
}

impl TailConfig {
    /// Configuration for following `pattern` inside `directory` with every other setting at its default
    pub fn new(directory: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            pattern: pattern.into(),
            single_file: false,
            checkpoint_path: None,
            fresh_start: false,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            idle_pass_limit: DEFAULT_IDLE_PASS_LIMIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            empty_dir_interval: DEFAULT_EMPTY_DIR_INTERVAL,
        }
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    pub fn with_single_file(mut self, single_file: bool) -> Self {
        self.single_file = single_file;
        self
    }

    pub fn with_checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    pub fn with_fresh_start(mut self, fresh_start: bool) -> Self {
        self.fresh_start = fresh_start;
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    pub fn with_idle_pass_limit(mut self, limit: u32) -> Self {
        self.idle_pass_limit = limit;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_empty_dir_interval(mut self, interval: Duration) -> Self {
        self.empty_dir_interval = interval;
        self
    }

    /// Check settings that would make the engine unable to start
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.directory.exists() {
            return Err(ConfigError::MissingDirectory(self.directory.clone()));
        }
        if !self.directory.is_dir() {
            return Err(ConfigError::NotADirectory(self.directory.clone()));
        }
        if self.pattern.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "pattern",
                reason: "must not be empty",
            });
        }
        glob::Pattern::new(&self.pattern)?;
        if self.read_chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "read_chunk_size",
                reason: "must be positive",
            });
        }
        if self.idle_pass_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "idle_pass_limit",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use rstest::rstest;

    use super::{ConfigError, TailConfig, DEFAULT_IDLE_PASS_LIMIT, DEFAULT_READ_CHUNK_SIZE};

    #[test]
    fn json_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"directory": "/var/log", "pattern": "app.log.*", "poll_interval": 250}"#,
        )
        .unwrap();

        let config = TailConfig::from_json_file(&path).unwrap();
        assert_eq!(config.directory.to_str(), Some("/var/log"));
        assert_eq!(config.pattern, "app.log.*");
        assert!(!config.single_file);
        assert_eq!(config.checkpoint_path, None);
        assert_eq!(config.read_chunk_size, DEFAULT_READ_CHUNK_SIZE);
        assert_eq!(config.idle_pass_limit, DEFAULT_IDLE_PASS_LIMIT);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.empty_dir_interval, Duration::from_secs(3));
    }

    #[test]
    fn json_round_trips_durations_as_millis() {
        let config = TailConfig::new("/var/log", "sys.log").with_poll_interval(Duration::from_millis(1500));
        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains(r#""poll_interval":1500"#));
        assert_eq!(serde_json::from_str::<TailConfig>(&text).unwrap(), config);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"pattern": "app.log.*"}"#).unwrap();
        assert!(matches!(
            TailConfig::from_json_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn existing_directory_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        TailConfig::new(dir.path(), "app.log.*").validate().unwrap();
    }

    #[test]
    fn missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = TailConfig::new(dir.path().join("absent"), "*.log");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingDirectory(_))
        ));
    }

    #[test]
    fn file_as_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            TailConfig::new(&file, "*.log").validate(),
            Err(ConfigError::NotADirectory(_))
        ));
    }

    #[rstest]
    #[case(TailConfig::new(".", ""))]
    #[case(TailConfig::new(".", "[unclosed"))]
    #[case(TailConfig::new(".", "*.log").with_read_chunk_size(0))]
    #[case(TailConfig::new(".", "*.log").with_idle_pass_limit(0))]
    fn bad_values_are_rejected(#[case] config: TailConfig) {
        assert!(config.validate().is_err())
    }
}
