//! # Logtail
//!
//! Logtail follows a log stream that is rotated on disk and hands every newly appended line to a sink, in order,
//! surviving restarts through a small checkpoint file. It is meant as the reading half of log shippers: the sink
//! decides where lines go.
//!
//! * `TailEngine` that drives everything: resolves files, picks the one to follow, drains it and checkpoints
//!
//! ```rust no_run
//! # use logtail::{TailConfig, TailEngine, TailError, WriterSink};
//! // rotated files: access.log.1, access.log.2.gz, ... sorted by name in rotation order
//! let config = TailConfig::new("/var/log/apache2", "access.log.*")
//!     .with_checkpoint_path("/var/lib/logtail/apache.checkpoint");
//! TailEngine::new(config)?.run(&mut WriterSink::stdout())?;
//! # Ok::<(), TailError>(())
//! ```
//!
//! * `Sink` that receives lines. Anything implementing it can be plugged in
//!
//! ```rust no_run
//! # use logtail::{Sink, SinkError, TailConfig, TailEngine, TailError};
//! struct Counter(usize);
//!
//! impl Sink for Counter {
//!     fn deliver(&mut self, _line: &str) -> Result<(), SinkError> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//!
//! // a single file that gets replaced by the rotation tool
//! let config = TailConfig::new("/var/log", "syslog").with_single_file(true);
//! let mut engine = TailEngine::new(config)?;
//! let mut counter = Counter(0);
//! engine.step(&mut counter)?;
//! println!("{} lines so far", counter.0);
//! # Ok::<(), TailError>(())
//! ```
//!
//! * Building blocks usable on their own: `ChunkReader` reads plain and gzip files uniformly, `LineAssembler` joins
//! chunks into lines, `CheckpointStore` persists `StreamPosition`s and `FileSetResolver` lists rotated files.
//!
//! ```rust
//! # use logtail::LineAssembler;
//! let mut assembler = LineAssembler::new();
//! assert_eq!(assembler.feed(b"GET /index.html\nGET /fav"), vec!["GET /index.html"]);
//! assert_eq!(assembler.feed(b"icon.ico\n"), vec!["GET /favicon.ico"]);
//! ```
//!

mod checkpoint;
mod chunk_reader;
mod config;
mod engine;
mod file_id;
mod follow;
mod line_assembler;
pub mod path_utils;
mod resolver;
mod sequencer;
mod single;
mod sink;

pub use checkpoint::{CheckpointError, CheckpointStore, StreamPosition};
pub use chunk_reader::ChunkReader;
pub use config::{ConfigError, TailConfig};
pub use engine::{StopHandle, Step, TailEngine, TailError};
pub use file_id::FileIdentity;
pub use follow::{Follow, Selection};
pub use line_assembler::LineAssembler;
pub use resolver::FileSetResolver;
pub use sequencer::MultiFileSequencer;
pub use single::{SingleStreamTailer, StreamState};
pub use sink::{Sink, SinkError, WriterSink};
