// EN: src/system/capture.rs

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Which standard stream of the child a sink belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// A writer that forwards every byte to all of its underlying writers.
///
/// Each `write` is fully delivered to every sink (via `write_all`) before it
/// reports success, so all sinks see the same byte sequence.
pub struct TeeWriter<'a> {
    sinks: Vec<&'a mut dyn Write>,
}

impl<'a> TeeWriter<'a> {
    /// Creates a tee with no destinations.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Adds another destination.
    pub fn with(mut self, sink: &'a mut dyn Write) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Default for TeeWriter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TeeWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeeWriter")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Write for TeeWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in self.sinks.iter_mut() {
            sink.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in self.sinks.iter_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}

/// An opened log file for one stream. The file is truncated (or created) when
/// opened and closed when dropped.
#[derive(Debug)]
pub struct LogFile {
    /// The stream this log records.
    pub stream: StreamKind,
    /// Where the log was opened.
    pub path: PathBuf,
    file: File,
}

impl LogFile {
    /// Opens `path` for writing, truncating any prior content. On Unix a newly
    /// created file gets mode `0600`.
    pub fn create(stream: StreamKind, path: &Path) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path)?;
        log::debug!("Opened {} log at '{}'", stream, path.display());
        Ok(Self {
            stream,
            path: path.to_path_buf(),
            file,
        })
    }
}

/// Everything read from one stream.
#[derive(Debug, Default)]
pub struct Captured {
    /// The complete stream content, even if a log write failed.
    pub bytes: Vec<u8>,
    /// The first error hit while writing the log file, if any.
    pub log_error: Option<io::Error>,
}

/// Reads `reader` to EOF, teeing into an in-memory buffer and the optional log
/// file.
///
/// A failed log write does not stop draining: the rest of the stream still goes
/// to the buffer so the child never blocks on a full pipe.
///
/// # Errors
/// Returns an error only if reading from the pipe itself fails.
pub fn drain<R: Read>(mut reader: R, log: Option<&mut LogFile>) -> io::Result<Captured> {
    let mut captured = Captured::default();

    let Some(log) = log else {
        reader.read_to_end(&mut captured.bytes)?;
        return Ok(captured);
    };

    let copied = {
        let mut tee = TeeWriter::new()
            .with(&mut captured.bytes)
            .with(&mut log.file);
        io::copy(&mut reader, &mut tee).and_then(|_| tee.flush())
    };

    if let Err(e) = copied {
        log::debug!("Writing {} log '{}' failed: {}", log.stream, log.path.display(), e);
        // The buffer is written before the file, so it already holds every byte
        // read so far. Keep draining into it alone.
        captured.log_error = Some(e);
        reader.read_to_end(&mut captured.bytes)?;
    }

    Ok(captured)
}
