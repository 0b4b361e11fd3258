//! Where print work writes to.

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Shared, thread-safe text sink. Every write is flushed.
#[derive(Clone)]
pub struct Output {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Output {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// An in-memory sink together with a reader for what was written.
    pub fn capture() -> (Self, Capture) {
        let capture = Capture::default();
        (Self::new(capture.clone()), capture)
    }

    pub fn write_str(&self, s: &str) -> io::Result<()> {
        let mut w = self.inner.lock();
        w.write_all(s.as_bytes())?;
        w.flush()
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Output")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }
}

impl Write for Capture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_collects_writes() {
        let (out, captured) = Output::capture();
        assert!(captured.is_empty());
        out.write_str("hello ").unwrap();
        out.clone().write_str("world").unwrap();
        assert_eq!(captured.contents(), "hello world");
    }

    #[test]
    fn test_writes_from_other_threads() {
        let (out, captured) = Output::capture();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let out = out.clone();
                std::thread::spawn(move || out.write_str("x").unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(captured.contents(), "xxxx");
    }
}
