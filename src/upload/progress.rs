// Progress reporting for uploads. The reader wrapper only observes the bytes
// flowing through it; what gets sent is the same with or without a sink.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read};
use std::sync::Arc;

/// Receives progress for one upload call.
///
/// `start` is called at the beginning of every attempt with the file size, so
/// a retry resets the display. `finish` is called once when the upload call
/// returns.
pub trait ProgressSink: Send + Sync {
    fn start(&self, _total_bytes: u64) {}
    /// `chunk` bytes were just read; `sent` is the running total.
    fn advance(&self, chunk: u64, sent: u64);
    fn finish(&self) {}
}

/// Sink used when progress display is disabled.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&self, _chunk: u64, _sent: u64) {}
}

/// Terminal progress bar for a single file.
pub struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    pub fn new(file_name: &str) -> Self {
        let style = ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_message(format!("Uploading {file_name}"));
        IndicatifProgress { bar }
    }
}

impl ProgressSink for IndicatifProgress {
    fn start(&self, total_bytes: u64) {
        self.bar.set_length(total_bytes);
        self.bar.set_position(0);
    }

    fn advance(&self, _chunk: u64, sent: u64) {
        self.bar.set_position(sent);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Wraps the file stream of one attempt and counts the bytes read from it.
pub struct ProgressReader<R> {
    inner: R,
    sink: Arc<dyn ProgressSink>,
    sent: u64,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, sink: Arc<dyn ProgressSink>) -> Self {
        ProgressReader { inner, sink, sent: 0 }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent += n as u64;
            self.sink.advance(n as u64, self.sent);
        }
        Ok(n)
    }
}
