//! Capture-file replay source

use super::{ByteSource, ByteStream};
use crate::config::ReplayConfig;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Plays back a raw byte capture of the sensor stream.
///
/// End of file reads as end of stream, so a reader configured to retry
/// reopens the file and loops the recording.
pub struct ReplaySource {
    path: PathBuf,
    bytes_per_second: u32,
}

impl ReplaySource {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            path: config.path,
            bytes_per_second: config.bytes_per_second,
        }
    }
}

impl ByteSource for ReplaySource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&mut self) -> Result<ByteStream> {
        let file = File::open(&self.path).map_err(|e| Error::unavailable(self.name(), e))?;
        log::info!("Replaying capture {}", self.path.display());

        Ok(Box::new(PacedReader {
            inner: BufReader::new(file),
            bytes_per_second: self.bytes_per_second,
            started: Instant::now(),
            delivered: 0,
        }))
    }
}

/// Throttles reads to the capture's original line rate.
struct PacedReader<R> {
    inner: R,
    bytes_per_second: u32,
    started: Instant,
    delivered: u64,
}

impl<R: Read> Read for PacedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if self.bytes_per_second == 0 || n == 0 {
            return Ok(n);
        }

        self.delivered += n as u64;
        let due = Duration::from_secs_f64(self.delivered as f64 / self.bytes_per_second as f64);
        let elapsed = self.started.elapsed();
        if due > elapsed {
            std::thread::sleep(due - elapsed);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_replays_file_then_ends() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4]).unwrap();

        let mut source = ReplaySource::new(ReplayConfig {
            path: file.path().to_path_buf(),
            bytes_per_second: 0,
        });

        let mut stream = source.open().unwrap();
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4]);

        // Reopen starts from the beginning again
        let mut stream = source.open().unwrap();
        let mut first = [0u8; 1];
        stream.read_exact(&mut first).unwrap();
        assert_eq!(first[0], 1);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ReplaySource::new(ReplayConfig {
            path: dir.path().join("missing.bin"),
            bytes_per_second: 0,
        });
        assert!(matches!(
            source.open(),
            Err(Error::SourceUnavailable { .. })
        ));
    }
}
