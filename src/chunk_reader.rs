use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use flate2::read::MultiGzDecoder;

use crate::path_utils::is_compressed;

enum Source {
    Plain(File),
    Compressed(MultiGzDecoder<BufReader<File>>),
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Plain(file) => file.read(buf),
            Source::Compressed(decoder) => decoder.read(buf),
        }
    }
}

/// Forward-only reader over a plain or gzip-compressed file
///
/// Offsets are always counted in decompressed bytes, so a position recorded while the file was plain stays valid
/// after it has been compressed in place.
///
/// ```rust no_run
/// # use logtail::ChunkReader;
/// let mut reader = ChunkReader::open("/var/log/apache2/access.log.1.gz")?;
/// reader.skip(500)?;
/// let chunk = reader.read_chunk(10_000)?;
/// assert_eq!(reader.position(), 500 + chunk.len() as u64);
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct ChunkReader {
    source: Source,
    path: PathBuf,
    position: u64,
}

impl ChunkReader {
    /// Open `path`, choosing gzip decoding when the name ends with `.gz`
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let source = if is_compressed(&path) {
            Source::Compressed(MultiGzDecoder::new(BufReader::new(file)))
        } else {
            Source::Plain(file)
        };

        Ok(Self {
            source,
            path,
            position: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.source, Source::Compressed(_))
    }

    /// Number of (decompressed) bytes skipped or read so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move forward by `n` bytes from the current position.
    ///
    /// Plain files seek directly. Compressed streams cannot seek, so `n` bytes are decompressed and thrown away.
    /// Returns the number of bytes actually skipped, which for a compressed file may be less than `n` if the
    /// stream ends early.
    pub fn skip(&mut self, n: u64) -> io::Result<u64> {
        let skipped = match &mut self.source {
            Source::Plain(file) => {
                file.seek(SeekFrom::Start(self.position + n))?;
                n
            }
            Source::Compressed(decoder) => io::copy(&mut decoder.take(n), &mut io::sink())?,
        };
        self.position += skipped;
        Ok(skipped)
    }

    /// Read up to `max_bytes`. An empty result means nothing is available right now, not an error.
    ///
    /// A compressed file that is still being written ends in an incomplete gzip member. Whatever decoded before the
    /// truncation point is returned; the error only surfaces when no bytes were produced at all.
    pub fn read_chunk(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let result = (&mut self.source)
            .take(max_bytes as u64)
            .read_to_end(&mut buf);
        self.position += buf.len() as u64;
        match result {
            Ok(_) => Ok(buf),
            Err(_) if !buf.is_empty() => Ok(buf),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs::{self, OpenOptions},
        io::Write,
        path::Path,
    };

    use flate2::{write::GzEncoder, Compression};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::ChunkReader;

    const CONTENT: &[u8] = b"first\nsecond\nthird\n";

    fn write_gz(path: &Path, content: &[u8]) {
        let mut encoder = GzEncoder::new(fs::File::create(path).unwrap(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();
    }

    #[fixture]
    fn dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log.1"), CONTENT).unwrap();
        write_gz(&dir.path().join("app.log.2.gz"), CONTENT);
        dir
    }

    #[rstest]
    #[case("app.log.1", false)]
    #[case("app.log.2.gz", true)]
    fn reads_decoded_content(dir: TempDir, #[case] name: &str, #[case] compressed: bool) {
        let mut reader = ChunkReader::open(dir.path().join(name)).unwrap();
        assert_eq!(reader.is_compressed(), compressed);
        assert_eq!(reader.read_chunk(1024).unwrap(), CONTENT);
        assert_eq!(reader.position(), CONTENT.len() as u64);
        assert!(reader.read_chunk(1024).unwrap().is_empty());
    }

    #[rstest]
    #[case("app.log.1")]
    #[case("app.log.2.gz")]
    fn skip_then_read_continues_at_offset(dir: TempDir, #[case] name: &str) {
        let mut reader = ChunkReader::open(dir.path().join(name)).unwrap();
        assert_eq!(reader.skip(6).unwrap(), 6);
        assert_eq!(reader.read_chunk(7).unwrap(), b"second\n");
        assert_eq!(reader.position(), 13);
    }

    #[rstest]
    fn chunks_are_bounded_by_max_bytes(dir: TempDir) {
        let mut reader = ChunkReader::open(dir.path().join("app.log.2.gz")).unwrap();
        let mut collected = vec![];
        loop {
            let chunk = reader.read_chunk(4).unwrap();
            if chunk.is_empty() {
                break;
            }
            assert!(chunk.len() <= 4);
            collected.extend(chunk);
        }
        assert_eq!(collected, CONTENT);
    }

    #[rstest]
    #[case("app.log.1")]
    #[case("app.log.2.gz")]
    fn huge_chunk_size_reads_what_is_there(dir: TempDir, #[case] name: &str) {
        let mut reader = ChunkReader::open(dir.path().join(name)).unwrap();
        assert_eq!(reader.read_chunk(usize::MAX).unwrap(), CONTENT);
        assert!(reader.read_chunk(usize::MAX).unwrap().is_empty());
    }

    #[rstest]
    fn compressed_skip_past_end_reports_short_count(dir: TempDir) {
        let mut reader = ChunkReader::open(dir.path().join("app.log.2.gz")).unwrap();
        assert_eq!(reader.skip(1000).unwrap(), CONTENT.len() as u64);
        assert!(reader.read_chunk(10).unwrap().is_empty());
    }

    #[rstest]
    fn appended_bytes_show_up_on_later_reads(dir: TempDir) {
        let path = dir.path().join("app.log.1");
        let mut reader = ChunkReader::open(&path).unwrap();
        reader.read_chunk(1024).unwrap();
        assert!(reader.read_chunk(1024).unwrap().is_empty());

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"fourth\n").unwrap();
        assert_eq!(reader.read_chunk(1024).unwrap(), b"fourth\n");
    }

    #[test]
    fn concatenated_gzip_members_read_as_one_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("joined.log.gz");
        write_gz(&dir.path().join("a.gz"), b"one\n");
        write_gz(&dir.path().join("b.gz"), b"two\n");
        let mut joined = fs::read(dir.path().join("a.gz")).unwrap();
        joined.extend(fs::read(dir.path().join("b.gz")).unwrap());
        fs::write(&path, joined).unwrap();

        let mut reader = ChunkReader::open(&path).unwrap();
        assert_eq!(reader.read_chunk(1024).unwrap(), b"one\ntwo\n");
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ChunkReader::open(dir.path().join("absent.log")).is_err());
    }
}
