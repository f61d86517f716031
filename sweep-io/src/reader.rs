//! Stream reader thread
//!
//! Owns a byte source, runs the frame decoder on a dedicated thread and
//! pushes every decoded sample into a [`SampleChannel`].
//!
//! Failure policy:
//! - read timeout: not an error; a partially read frame is aborted
//! - end of stream: pause `closed_backoff_ms`, reopen the source, repeat up
//!   to `max_reconnect_attempts` consecutive times (forever when unset)
//! - other I/O errors: abort the frame, pause `error_backoff_ms`, keep reading

use crate::channel::SampleChannel;
use crate::config::StreamReaderConfig;
use crate::error::{Error, Result};
use crate::protocol::{DecoderStats, FrameDecoder};
use crate::transport::{ByteSource, ByteStream};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest single sleep while backing off, so stop stays responsive
const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Snapshot of the reader counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub frames: u64,
    pub samples: u64,
    pub rejected_samples: u64,
    pub aborted_frames: u64,
    pub resyncs: u64,
    pub stream_closures: u64,
    pub reconnect_attempts: u64,
    pub io_errors: u64,
}

#[derive(Default)]
struct ReaderCounters {
    frames: AtomicU64,
    samples: AtomicU64,
    rejected_samples: AtomicU64,
    aborted_frames: AtomicU64,
    resyncs: AtomicU64,
    stream_closures: AtomicU64,
    reconnect_attempts: AtomicU64,
    io_errors: AtomicU64,
}

impl ReaderCounters {
    fn snapshot(&self) -> ReaderStats {
        ReaderStats {
            frames: self.frames.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            rejected_samples: self.rejected_samples.load(Ordering::Relaxed),
            aborted_frames: self.aborted_frames.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            stream_closures: self.stream_closures.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
        }
    }

    /// Fold decoder counter deltas since `last` into the shared totals.
    fn absorb(&self, current: DecoderStats, last: &mut DecoderStats) {
        self.frames
            .fetch_add(current.frames - last.frames, Ordering::Relaxed);
        self.samples
            .fetch_add(current.samples - last.samples, Ordering::Relaxed);
        self.rejected_samples.fetch_add(
            current.rejected_samples - last.rejected_samples,
            Ordering::Relaxed,
        );
        self.aborted_frames.fetch_add(
            current.aborted_frames - last.aborted_frames,
            Ordering::Relaxed,
        );
        self.resyncs
            .fetch_add(current.resyncs - last.resyncs, Ordering::Relaxed);
        *last = current;
    }
}

/// Background reader feeding a [`SampleChannel`].
pub struct StreamReader {
    source: Arc<Mutex<Box<dyn ByteSource>>>,
    source_name: String,
    config: StreamReaderConfig,
    channel: SampleChannel,
    shutdown: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    counters: Arc<ReaderCounters>,
    handle: Option<JoinHandle<()>>,
}

impl StreamReader {
    pub fn new(
        source: Box<dyn ByteSource>,
        channel: SampleChannel,
        config: StreamReaderConfig,
    ) -> Self {
        let source_name = source.name();
        Self {
            source: Arc::new(Mutex::new(source)),
            source_name,
            config,
            channel,
            shutdown: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(ReaderCounters::default()),
            handle: None,
        }
    }

    /// Open the source and spawn the reader thread.
    ///
    /// No-op while already running. Fails with [`Error::SourceUnavailable`]
    /// when the source cannot be opened; that failure is not retried.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            log::debug!("Stream reader on {} already running", self.source_name);
            return Ok(());
        }

        // Reap a thread that stopped itself
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| Error::ThreadPanic)?;
        }

        self.config.validate()?;

        let stream = match self.source.lock().open() {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("Failed to open {}: {}", self.source_name, e);
                return Err(match e {
                    Error::SourceUnavailable { .. } => e,
                    other => Error::unavailable(&self.source_name, other),
                });
            }
        };

        self.shutdown.store(false, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);

        let worker = ReaderLoop {
            source: Arc::clone(&self.source),
            source_name: self.source_name.clone(),
            config: self.config.clone(),
            channel: self.channel.clone(),
            shutdown: Arc::clone(&self.shutdown),
            counters: Arc::clone(&self.counters),
        };
        let running = Arc::clone(&self.running);

        let spawned = thread::Builder::new()
            .name("sweep-reader".to_string())
            .spawn(move || {
                worker.run(stream);
                running.store(false, Ordering::Release);
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                log::info!("Stream reader started on {}", self.source_name);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(Error::ThreadSpawn(e.to_string()))
            }
        }
    }

    /// Request shutdown and wait for the thread to exit.
    ///
    /// Safe to call repeatedly and after the reader stopped on its own.
    /// Worst-case latency is one read timeout.
    pub fn stop(&mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            log::info!("Stopping stream reader on {}...", self.source_name);
            handle.join().map_err(|_| Error::ThreadPanic)?;
            log::info!("Stream reader on {} stopped", self.source_name);
        }

        self.running.store(false, Ordering::Release);
        Ok(())
    }

    /// Whether the reader thread is alive.
    ///
    /// Turns false on its own once the reconnect budget is exhausted.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ReaderStats {
        self.counters.snapshot()
    }

    /// Channel the reader pushes into.
    pub fn channel(&self) -> &SampleChannel {
        &self.channel
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// State moved onto the reader thread.
struct ReaderLoop {
    source: Arc<Mutex<Box<dyn ByteSource>>>,
    source_name: String,
    config: StreamReaderConfig,
    channel: SampleChannel,
    shutdown: Arc<AtomicBool>,
    counters: Arc<ReaderCounters>,
}

impl ReaderLoop {
    fn run(self, stream: ByteStream) {
        let mut decoder = FrameDecoder::new();
        let mut last_stats = DecoderStats::default();
        let mut buf = vec![0u8; self.config.read_chunk_size];
        let mut samples = Vec::with_capacity(self.config.read_chunk_size);
        let mut attempts: u32 = 0;

        let mut stream = Some(stream);

        while !self.is_shutdown() {
            let Some(active) = stream.as_mut() else {
                break;
            };
            match active.read(&mut buf) {
                Ok(0) => {
                    if decoder.abort() {
                        log::debug!("{}: frame aborted by end of stream", self.source_name);
                    }
                    self.counters.absorb(decoder.stats(), &mut last_stats);
                    self.counters.stream_closures.fetch_add(1, Ordering::Relaxed);

                    // Exclusive devices refuse a second open while the old handle lives
                    drop(stream.take());
                    stream = self.reconnect(&mut attempts);
                }
                Ok(n) => {
                    attempts = 0;
                    let frames_before = last_stats.frames;

                    let summary = decoder.decode(&buf[..n], &mut samples);
                    if summary.samples > 0 {
                        self.channel.push_all(samples.drain(..));
                    }
                    self.counters.absorb(decoder.stats(), &mut last_stats);

                    self.log_stats(frames_before, last_stats.frames);
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    if decoder.abort() {
                        log::debug!("{}: frame aborted by read timeout", self.source_name);
                        self.counters.absorb(decoder.stats(), &mut last_stats);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    self.counters.io_errors.fetch_add(1, Ordering::Relaxed);
                    decoder.abort();
                    self.counters.absorb(decoder.stats(), &mut last_stats);
                    log::warn!(
                        "{}: read error: {}, retrying in {:?}",
                        self.source_name,
                        e,
                        self.config.error_backoff()
                    );
                    self.sleep_unless_shutdown(self.config.error_backoff());
                }
            }
        }

        log::info!("Stream reader thread for {} exiting", self.source_name);
    }

    /// Back off and reopen the source until it succeeds, the retry budget
    /// runs out, or shutdown is requested.
    fn reconnect(&self, attempts: &mut u32) -> Option<ByteStream> {
        log::warn!(
            "{}: stream closed, retrying in {:?}",
            self.source_name,
            self.config.closed_backoff()
        );

        loop {
            if let Some(max) = self.config.max_reconnect_attempts
                && *attempts >= max
            {
                log::error!(
                    "{}: giving up after {} reconnect attempts",
                    self.source_name,
                    max
                );
                return None;
            }

            if !self.sleep_unless_shutdown(self.config.closed_backoff()) {
                return None;
            }

            *attempts += 1;
            self.counters
                .reconnect_attempts
                .fetch_add(1, Ordering::Relaxed);

            match self.source.lock().open() {
                Ok(stream) => {
                    log::debug!(
                        "{}: reopened (attempt {})",
                        self.source_name,
                        attempts
                    );
                    return Some(stream);
                }
                Err(e) => log::warn!("{}: reopen failed: {}", self.source_name, e),
            }
        }
    }

    fn log_stats(&self, frames_before: u64, frames_now: u64) {
        let interval = self.config.stats_interval_frames;
        if interval == 0 || frames_now / interval == frames_before / interval {
            return;
        }

        let stats = self.counters.snapshot();
        let abort_rate = if stats.frames > 0 {
            (stats.aborted_frames as f64 / stats.frames as f64) * 100.0
        } else {
            0.0
        };
        log::info!(
            "Reader stats: {} frames, {} samples, {} resyncs, {:.2}% aborted",
            stats.frames,
            stats.samples,
            stats.resyncs,
            abort_rate
        );
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Sleep in short slices. Returns false if shutdown was requested.
    fn sleep_unless_shutdown(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_shutdown() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SHUTDOWN_POLL));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_frame;
    use crate::transport::{MockEvent, MockSource};

    fn fast_config() -> StreamReaderConfig {
        StreamReaderConfig {
            read_timeout_ms: 20,
            closed_backoff_ms: 10,
            error_backoff_ms: 10,
            ..Default::default()
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_timeout_mid_frame_aborts_frame() {
        let mock = MockSource::new();
        let frame = encode_frame(0, 0.0, 10.0, &[100.0, 100.0]);
        mock.push_bytes(&frame[..5]);
        mock.push_event(MockEvent::Timeout);
        mock.push_bytes(&frame[5..]);
        mock.push_bytes(&frame);

        let channel = SampleChannel::new();
        let mut reader = StreamReader::new(Box::new(mock.clone()), channel.clone(), fast_config());
        reader.start().unwrap();

        assert!(wait_for(|| reader.stats().frames >= 1));
        reader.stop().unwrap();

        let stats = reader.stats();
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.aborted_frames, 1);
        assert_eq!(channel.drain_up_to(100).len(), 2);
    }

    #[test]
    fn test_io_error_is_recovered() {
        let mock = MockSource::new();
        mock.push_event(MockEvent::Error(ErrorKind::BrokenPipe));
        mock.push_bytes(&encode_frame(0, 0.0, 10.0, &[100.0, 100.0]));

        let channel = SampleChannel::new();
        let mut reader = StreamReader::new(Box::new(mock.clone()), channel.clone(), fast_config());
        reader.start().unwrap();

        assert!(wait_for(|| channel.len() == 2));
        assert!(reader.is_running());
        reader.stop().unwrap();
        assert_eq!(reader.stats().io_errors, 1);
    }
}
