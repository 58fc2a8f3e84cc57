use std::io::{self, Write};

use thiserror::Error;

/// Failure reported by a `Sink`; the engine stops and does not advance the checkpoint past the failed chunk
#[derive(Error, Debug)]
#[error("sink failed to deliver line")]
pub struct SinkError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl SinkError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        Self::new(e)
    }
}

/// Destination for assembled lines
///
/// `deliver` is called once per line, synchronously and in file order. Lines arrive without their terminator.
pub trait Sink {
    fn deliver(&mut self, line: &str) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn deliver(&mut self, line: &str) -> Result<(), SinkError> {
        (**self).deliver(line)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn deliver(&mut self, line: &str) -> Result<(), SinkError> {
        (**self).deliver(line)
    }
}

/// Collects lines in memory
impl Sink for Vec<String> {
    fn deliver(&mut self, line: &str) -> Result<(), SinkError> {
        self.push(line.to_string());
        Ok(())
    }
}

/// Writes every line followed by `\n` into an `io::Write`
pub struct WriterSink<W: Write> {
    inner: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn deliver(&mut self, line: &str) -> Result<(), SinkError> {
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use super::{Sink, SinkError, WriterSink};

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_sink_terminates_lines() {
        let mut sink = WriterSink::new(Vec::new());
        sink.deliver("first").unwrap();
        sink.deliver("").unwrap();
        assert_eq!(sink.into_inner(), b"first\n\n");
    }

    #[test]
    fn write_failure_becomes_sink_error() {
        let mut sink = WriterSink::new(BrokenPipe);
        let err = sink.deliver("line").unwrap_err();
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("reader went away"));
    }

    #[test]
    fn sinks_compose_through_references_and_boxes() {
        let mut collected = Vec::<String>::new();
        {
            let mut by_ref: Box<dyn Sink + '_> = Box::new(&mut collected);
            by_ref.deliver("a").unwrap();
        }
        assert_eq!(collected, vec!["a"]);
        let _: SinkError = SinkError::new("custom failure");
    }
}
