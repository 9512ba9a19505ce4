//! Result and progress sinks.
//!
//! The probe engine hands each finished result to a [`ResultSink`] and
//! ticks a [`ProgressSink`] once per completed probe. Rendering and storage
//! live behind these traits.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ProbeError;
use crate::types::{OutputFormat, ProbeResult};

/// Receives one result per completed probe, in completion order.
pub trait ResultSink {
    /// Accept one result. An error is reported but does not stop the run.
    fn emit(&mut self, result: &ProbeResult) -> Result<(), ProbeError>;

    /// Flush buffered output once the run is over.
    fn flush(&mut self) -> Result<(), ProbeError> {
        Ok(())
    }
}

/// Receives one tick per completed probe. Called concurrently from probe tasks.
pub trait ProgressSink: Send + Sync {
    fn tick(&self);
}

impl ResultSink for Vec<ProbeResult> {
    fn emit(&mut self, result: &ProbeResult) -> Result<(), ProbeError> {
        self.push(result.clone());
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn emit(&mut self, result: &ProbeResult) -> Result<(), ProbeError> {
        (**self).emit(result)
    }

    fn flush(&mut self) -> Result<(), ProbeError> {
        (**self).flush()
    }
}

/// Progress sink that ignores ticks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn tick(&self) {}
}

/// Progress sink that counts ticks.
#[derive(Debug, Default)]
pub struct CountingProgress {
    ticks: AtomicUsize,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl ProgressSink for CountingProgress {
    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}

/// Writes results as lines to any `io::Write`.
///
/// CSV lines are `url,outcome`; JSON lines hold one serialized
/// [`ProbeResult`] each.
pub struct WriterSink<W: Write> {
    writer: W,
    format: OutputFormat,
    written: usize,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            written: 0,
        }
    }

    /// Write the `url,outcome` header line. Only meaningful for CSV.
    pub fn write_header(&mut self) -> Result<(), ProbeError> {
        if self.format == OutputFormat::Csv {
            writeln!(self.writer, "url,outcome")
                .map_err(|e| ProbeError::sink(format!("Failed to write header: {}", e)))?;
        }
        Ok(())
    }

    /// Number of results written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for WriterSink<W> {
    fn emit(&mut self, result: &ProbeResult) -> Result<(), ProbeError> {
        let line = match self.format {
            OutputFormat::Csv => result.to_string(),
            OutputFormat::Json => serde_json::to_string(result)?,
        };
        writeln!(self.writer, "{}", line).map_err(|e| {
            ProbeError::sink(format!("Failed to write result for '{}': {}", result.url, e))
        })?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ProbeError> {
        self.writer
            .flush()
            .map_err(|e| ProbeError::sink(format!("Failed to flush results: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_writer_sink() {
        let mut sink = WriterSink::new(Vec::new(), OutputFormat::Csv);
        sink.write_header().unwrap();
        sink.emit(&ProbeResult::status("http://a.test", 200)).unwrap();
        sink.emit(&ProbeResult::no_response("http://b.test")).unwrap();
        sink.flush().unwrap();

        assert_eq!(sink.written(), 2);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "url,outcome\nhttp://a.test,200\nhttp://b.test,no-response\n");
    }

    #[test]
    fn test_json_writer_sink_skips_header() {
        let mut sink = WriterSink::new(Vec::new(), OutputFormat::Json);
        sink.write_header().unwrap();
        sink.emit(&ProbeResult::no_response("http://b.test")).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "{\"url\":\"http://b.test\",\"outcome\":{\"kind\":\"no_response\"}}\n"
        );
    }

    #[test]
    fn test_counting_progress() {
        let progress = CountingProgress::new();
        progress.tick();
        progress.tick();
        assert_eq!(progress.count(), 2);
        NoProgress.tick();
    }
}
