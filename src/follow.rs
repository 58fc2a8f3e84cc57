use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{checkpoint::StreamPosition, line_assembler::LineAssembler, path_utils::logical_name};

/// State of the file currently being followed: which path, how many bytes were taken from it and the line
/// fragment still waiting for its terminator
///
/// The assembler lives as long as the logical file does, so a line written in two steps is joined even if an idle
/// window falls between them. It is dropped (with its fragment) when the follow moves to a different file.
#[derive(Debug, Clone)]
pub struct Follow {
    path: PathBuf,
    bytes_consumed: u64,
    assembler: LineAssembler,
}

impl Follow {
    /// Start following `path` from its first byte
    pub fn start(path: impl Into<PathBuf>) -> Self {
        Self::resume(path, 0)
    }

    /// Continue following `path` after `bytes_consumed` bytes
    pub fn resume(path: impl Into<PathBuf>, bytes_consumed: u64) -> Self {
        Self {
            path: path.into(),
            bytes_consumed,
            assembler: LineAssembler::new(),
        }
    }

    /// Path that will be opened on the next episode. May be the compressed form of the logical file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    pub fn assembler(&self) -> &LineAssembler {
        &self.assembler
    }

    /// Keep position and pending fragment but read from `path` from now on. Used when the followed file got
    /// compressed in place.
    pub fn relocate(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    /// Split a chunk that was just read into the lines it completes, without touching this follow.
    ///
    /// Nothing changes until the result is passed to `commit`, so a chunk whose lines could not all be delivered
    /// is read again later with the assembler exactly as it was before.
    pub(crate) fn assemble(&self, chunk: &[u8]) -> Assembled {
        let mut assembler = self.assembler.clone();
        let lines = assembler.feed(chunk);
        Assembled {
            lines,
            assembler,
            chunk_len: chunk.len(),
        }
    }

    /// Take over the fragment left by a delivered chunk and advance past it
    pub(crate) fn commit(&mut self, assembled: Assembled) {
        self.assembler = assembled.assembler;
        self.bytes_consumed += assembled.chunk_len as u64;
    }

    /// Give up on this file; an unterminated fragment is lost. Returns the number of dropped bytes.
    pub(crate) fn abandon(mut self) -> usize {
        let dropped = self.assembler.discard();
        if dropped > 0 {
            debug!(path = %self.path.display(), dropped, "dropping unterminated line of abandoned file");
        }
        dropped
    }

    /// Position to persist: bytes of complete lines only, so a pending fragment is read again after a restart
    pub fn checkpoint_position(&self) -> StreamPosition {
        let durable = self
            .bytes_consumed
            .saturating_sub(self.assembler.pending_len() as u64);
        StreamPosition {
            filename: logical_name(&self.path),
            bytes_consumed: durable,
        }
    }
}

/// Lines completed by one chunk together with the assembler state that follows them
#[derive(Debug)]
pub(crate) struct Assembled {
    pub(crate) lines: Vec<String>,
    assembler: LineAssembler,
    chunk_len: usize,
}

/// What a tailer wants drained on this pass
#[derive(Debug)]
pub struct Selection<'a> {
    pub follow: &'a mut Follow,
    /// Backlog exists behind this file, so idle passes should not sleep
    pub skip_wait: bool,
}
