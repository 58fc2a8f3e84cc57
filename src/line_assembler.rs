pub const LINE_TERMINATOR: u8 = b'\n';

/// Turns a stream of byte chunks into complete lines, carrying an unterminated tail across chunk boundaries
///
/// ```rust
/// # use logtail::LineAssembler;
/// let mut assembler = LineAssembler::new();
/// assert_eq!(assembler.feed(b"foo\nba"), vec!["foo"]);
/// assert_eq!(assembler.feed(b"r\nbaz"), vec!["bar"]);
/// assert_eq!(assembler.pending(), b"baz");
/// ```
///
/// The pending fragment is never returned as a line. When a file is abandoned with a fragment still pending, the
/// fragment is dropped together with the assembler.
#[derive(Debug, Default, Clone)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `chunk` on the line terminator and return every line completed by it, in order.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut pieces = chunk.split(|&byte| byte == LINE_TERMINATOR);
        let mut lines = vec![];

        // split always yields at least one piece
        let mut current = pieces.next().unwrap_or_default();
        let mut carried = std::mem::take(&mut self.pending);
        for next in pieces {
            if carried.is_empty() {
                lines.push(String::from_utf8_lossy(current).into_owned());
            } else {
                carried.extend_from_slice(current);
                lines.push(String::from_utf8_lossy(&carried).into_owned());
                carried.clear();
            }
            current = next;
        }
        carried.extend_from_slice(current);
        self.pending = carried;

        lines
    }

    /// Bytes seen after the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop the pending fragment, returning how many bytes were lost.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}
