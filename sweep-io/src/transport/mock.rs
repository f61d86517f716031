//! Scripted source for testing

use super::{ByteSource, ByteStream};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

const IDLE_TIMEOUT: Duration = Duration::from_millis(5);

/// One scripted step returned by a mock stream read.
#[derive(Debug, Clone)]
pub enum MockEvent {
    /// Bytes delivered (possibly across several reads)
    Data(Vec<u8>),
    /// Read times out with no data
    Timeout,
    /// Read fails with the given kind
    Error(io::ErrorKind),
    /// Read reports end of stream
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdleBehavior {
    Timeout,
    Closed,
}

struct MockState {
    events: VecDeque<MockEvent>,
    idle: IdleBehavior,
    fail_opens: u32,
    open_count: u32,
    exclusive: bool,
    live_streams: u32,
    busy_opens: u32,
}

/// Scripted byte source for unit and integration tests.
///
/// Clones share the same script, so a test keeps one handle for injecting
/// events while the reader owns another. Once the script is exhausted the
/// stream either times out (default) or reports end of stream
/// ([`MockSource::closed`]).
#[derive(Clone)]
pub struct MockSource {
    inner: Arc<Mutex<MockState>>,
}

impl MockSource {
    /// Mock that idles with read timeouts.
    pub fn new() -> Self {
        Self::with_idle(IdleBehavior::Timeout)
    }

    /// Mock that reports end of stream whenever the script is empty.
    pub fn closed() -> Self {
        Self::with_idle(IdleBehavior::Closed)
    }

    fn with_idle(idle: IdleBehavior) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                events: VecDeque::new(),
                idle,
                fail_opens: 0,
                open_count: 0,
                exclusive: false,
                live_streams: 0,
                busy_opens: 0,
            })),
        }
    }

    /// Queue bytes to be read.
    pub fn push_bytes(&self, data: &[u8]) {
        self.push_event(MockEvent::Data(data.to_vec()));
    }

    pub fn push_event(&self, event: MockEvent) {
        self.inner.lock().events.push_back(event);
    }

    /// Make the next `count` opens fail.
    pub fn fail_next_opens(&self, count: u32) {
        self.inner.lock().fail_opens = count;
    }

    /// Refuse opens while an earlier stream is still alive, like a tty
    /// opened in exclusive mode.
    pub fn set_exclusive(&self, exclusive: bool) {
        self.inner.lock().exclusive = exclusive;
    }

    /// Opens refused because a previous stream was still held.
    pub fn busy_opens(&self) -> u32 {
        self.inner.lock().busy_opens
    }

    /// Total open attempts, including failed ones.
    pub fn open_count(&self) -> u32 {
        self.inner.lock().open_count
    }

    /// Scripted events not yet consumed.
    pub fn pending(&self) -> usize {
        self.inner.lock().events.len()
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSource for MockSource {
    fn name(&self) -> String {
        "mock".to_string()
    }

    fn open(&mut self) -> Result<ByteStream> {
        let mut state = self.inner.lock();
        state.open_count += 1;
        if state.fail_opens > 0 {
            state.fail_opens -= 1;
            return Err(Error::unavailable("mock", "scripted open failure"));
        }
        if state.exclusive && state.live_streams > 0 {
            state.busy_opens += 1;
            return Err(Error::unavailable("mock", "device busy"));
        }
        state.live_streams += 1;
        Ok(Box::new(MockStream {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MockStream {
    inner: Arc<Mutex<MockState>>,
}

impl Drop for MockStream {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.live_streams = state.live_streams.saturating_sub(1);
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.inner.lock();

        let Some(event) = state.events.pop_front() else {
            let idle = state.idle;
            drop(state);
            return match idle {
                IdleBehavior::Timeout => {
                    std::thread::sleep(IDLE_TIMEOUT);
                    Err(io::ErrorKind::TimedOut.into())
                }
                IdleBehavior::Closed => Ok(0),
            };
        };

        match event {
            MockEvent::Data(mut data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    let rest = data.split_off(n);
                    state.events.push_front(MockEvent::Data(rest));
                }
                Ok(n)
            }
            MockEvent::Timeout => {
                drop(state);
                std::thread::sleep(IDLE_TIMEOUT);
                Err(io::ErrorKind::TimedOut.into())
            }
            MockEvent::Error(kind) => Err(kind.into()),
            MockEvent::Closed => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_reads() {
        let mut source = MockSource::new();
        source.push_bytes(&[1, 2, 3]);
        source.push_event(MockEvent::Closed);

        let mut stream = source.open().unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(stream.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);

        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_open_failures_are_counted() {
        let mut source = MockSource::closed();
        source.fail_next_opens(2);

        assert!(source.open().is_err());
        assert!(source.open().is_err());
        assert!(source.open().is_ok());
        assert_eq!(source.open_count(), 3);
    }

    #[test]
    fn test_exclusive_open_requires_release() {
        let mut source = MockSource::new();
        source.set_exclusive(true);

        let first = source.open().unwrap();
        assert!(source.open().is_err());
        assert_eq!(source.busy_opens(), 1);

        drop(first);
        assert!(source.open().is_ok());
        assert_eq!(source.open_count(), 3);
    }
}
