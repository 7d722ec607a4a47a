use std::io::{self, Write};

/// Write adapter that forwards every write to `inner` and reports the running
/// byte total to `on_progress` after each successful write call.
pub struct CountingWriter<W, F>
where
    W: Write,
    F: FnMut(u64),
{
    inner: W,
    written: u64,
    on_progress: F,
}

impl<W, F> CountingWriter<W, F>
where
    W: Write,
    F: FnMut(u64),
{
    pub fn new(inner: W, on_progress: F) -> Self {
        Self {
            inner,
            written: 0,
            on_progress,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W, F> Write for CountingWriter<W, F>
where
    W: Write,
    F: FnMut(u64),
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        (self.on_progress)(self.written);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
