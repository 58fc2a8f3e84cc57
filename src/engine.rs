use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::{
    checkpoint::{CheckpointError, CheckpointStore},
    chunk_reader::ChunkReader,
    config::{ConfigError, TailConfig},
    follow::{Follow, Selection},
    resolver::FileSetResolver,
    sequencer::MultiFileSequencer,
    single::SingleStreamTailer,
    sink::{Sink, SinkError},
};

/// Possible errors that stop a `TailEngine`
#[derive(Error, Debug)]
pub enum TailError {
    #[error("invalid configuration")]
    Configuration(#[from] ConfigError),
    #[error("while persisting checkpoint")]
    Checkpoint(#[from] CheckpointError),
    #[error("while delivering lines")]
    Sink(#[from] SinkError),
}

/// Cloneable flag used to ask a running engine to stop
///
/// The flag is looked at between idle passes only, never in the middle of reading a chunk or delivering its lines.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of one outer iteration
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Nothing matched (or the match could not be used); the engine slept for the empty-directory interval
    Waiting,
    /// A file was followed until it went idle or could not be opened
    Drained {
        path: PathBuf,
        bytes_consumed: u64,
        skip_wait: bool,
    },
}

enum Mode {
    Single(SingleStreamTailer),
    Multi(MultiFileSequencer),
}

/// Follows a possibly rotating log stream and hands every new line to a `Sink`
///
/// ## Usage
///
/// ```rust no_run
/// # use logtail::{TailConfig, TailEngine, TailError, WriterSink};
/// let config = TailConfig::new("/var/log/apache2", "access.log.*")
///     .with_checkpoint_path("/var/lib/logtail/apache.checkpoint");
/// let mut engine = TailEngine::new(config)?;
/// engine.run(&mut WriterSink::stdout())?;
/// # Ok::<(), TailError>(())
/// ```
///
/// ## Working principles
///
/// Each outer iteration lists the matching files, lets the single-file tailer or the multi-file sequencer decide
/// which file to follow and then drains it. Draining is a burst of chunk reads; every chunk is split into lines, the
/// lines are delivered, and only then is the checkpoint rewritten. A read that returns nothing counts as an idle
/// pass. After `idle_pass_limit` idle passes in a row the engine goes back to listing files, which bounds how late
/// a rotation is noticed. Idle passes sleep `poll_interval` unless there is backlog to catch up on.
///
/// ## Limitations
///
/// * A line fragment without a terminator is dropped when its file is rotated away.
/// * After a crash at most one chunk of lines is delivered a second time.
/// * When the sink fails, the chunk it was given counts as unread. Calling `step` again delivers the whole chunk,
///   including lines that went out before the failure.
pub struct TailEngine {
    config: TailConfig,
    resolver: FileSetResolver,
    checkpoint: CheckpointStore,
    mode: Mode,
    stop: StopHandle,
}

impl TailEngine {
    /// Validate `config`, load the checkpoint (unless `fresh_start` is set) and prepare the follower
    pub fn new(config: TailConfig) -> Result<Self, TailError> {
        config.validate()?;
        let resolver = FileSetResolver::new(&config.directory, &config.pattern)?;
        let checkpoint = match &config.checkpoint_path {
            Some(path) => CheckpointStore::at(path),
            None => CheckpointStore::disabled(),
        };
        let resume = if config.fresh_start {
            None
        } else {
            checkpoint.load()?
        };
        let mode = if config.single_file {
            Mode::Single(SingleStreamTailer::new(config.pattern.clone(), resume))
        } else {
            Mode::Multi(MultiFileSequencer::new(resume))
        };
        info!(
            directory = %config.directory.display(),
            pattern = %config.pattern,
            single_file = config.single_file,
            checkpoint = config.checkpoint_path.is_some(),
            "tail engine ready"
        );

        Ok(Self {
            config,
            resolver,
            checkpoint,
            mode,
            stop: StopHandle::default(),
        })
    }

    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// File currently followed and its state
    pub fn current(&self) -> Option<&Follow> {
        match &self.mode {
            Mode::Single(tailer) => tailer.current(),
            Mode::Multi(sequencer) => sequencer.current(),
        }
    }

    /// Run outer iterations until the stop handle fires or an error occurs
    pub fn run(&mut self, sink: &mut impl Sink) -> Result<(), TailError> {
        while !self.stop.is_stopped() {
            self.step(sink)?;
        }
        info!("tail engine stopped");
        Ok(())
    }

    /// One outer iteration: resolve files, select one and drain it
    pub fn step(&mut self, sink: &mut impl Sink) -> Result<Step, TailError> {
        let files = self.resolver.list();
        trace!(matches = files.len(), "resolved files");

        let selection = match &mut self.mode {
            Mode::Single(tailer) => tailer.select(&files)?,
            Mode::Multi(sequencer) => sequencer.select(&files),
        };
        let Some(Selection { follow, skip_wait }) = selection else {
            debug!(interval = ?self.config.empty_dir_interval, "nothing to follow, waiting");
            thread::sleep(self.config.empty_dir_interval);
            return Ok(Step::Waiting);
        };

        drain(follow, skip_wait, &self.config, &mut self.checkpoint, &self.stop, sink)?;

        Ok(Step::Drained {
            path: follow.path().to_path_buf(),
            bytes_consumed: follow.bytes_consumed(),
            skip_wait,
        })
    }
}

/// Follow one file until `idle_pass_limit` consecutive passes bring no data
fn drain(
    follow: &mut Follow,
    skip_wait: bool,
    config: &TailConfig,
    checkpoint: &mut CheckpointStore,
    stop: &StopHandle,
    sink: &mut impl Sink,
) -> Result<(), TailError> {
    let mut reader = match open_at(follow) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(path = %follow.path().display(), error = %e, "could not open file, skipping this pass");
            return Ok(());
        }
    };

    let mut idle_passes = 0;
    while idle_passes < config.idle_pass_limit {
        idle_passes += 1;
        trace!(path = %follow.path().display(), pass = idle_passes, "reading");
        loop {
            let chunk = match reader.read_chunk(config.read_chunk_size) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(path = %follow.path().display(), error = %e, "read failed, treating as no data");
                    break;
                }
            };
            if chunk.is_empty() {
                break;
            }
            idle_passes = 0;

            let assembled = follow.assemble(&chunk);
            for line in &assembled.lines {
                sink.deliver(line)?;
            }
            follow.commit(assembled);
            checkpoint.save(&follow.checkpoint_position())?;
        }

        if !skip_wait {
            thread::sleep(config.poll_interval);
        }
        if stop.is_stopped() {
            debug!("stop requested, leaving file");
            break;
        }
    }

    debug!(
        path = %follow.path().display(),
        bytes_consumed = follow.bytes_consumed(),
        "finished file"
    );
    Ok(())
}

fn open_at(follow: &Follow) -> std::io::Result<ChunkReader> {
    let mut reader = ChunkReader::open(follow.path())?;
    let wanted = follow.bytes_consumed();
    if wanted > 0 {
        let skipped = reader.skip(wanted)?;
        if skipped < wanted {
            warn!(
                path = %follow.path().display(),
                wanted,
                skipped,
                "file ends before recorded position"
            );
        }
    }
    Ok(reader)
}
