use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Destination for per-step scalars such as `train/loss`.
pub trait ScalarSink {
    fn record(&mut self, tag: &str, value: f64, step: usize);

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// One recorded scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub tag: String,
    pub value: f64,
    pub step: usize,
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub records: Vec<ScalarRecord>,
}

impl MemorySink {
    pub fn new() -> MemorySink {
        MemorySink::default()
    }

    /// Records carrying `tag`, in recording order.
    pub fn tagged(&self, tag: &str) -> Vec<&ScalarRecord> {
        self.records.iter().filter(|r| r.tag == tag).collect()
    }
}

impl ScalarSink for MemorySink {
    fn record(&mut self, tag: &str, value: f64, step: usize) {
        self.records.push(ScalarRecord { tag: tag.to_string(), value, step });
    }
}

/// Appends one JSON object per scalar to a file.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<JsonlSink> {
        let file = File::create(path)?;
        Ok(JsonlSink { writer: BufWriter::new(file) })
    }
}

impl ScalarSink for JsonlSink {
    fn record(&mut self, tag: &str, value: f64, step: usize) {
        let rec = ScalarRecord { tag: tag.to_string(), value, step };
        // A lost scalar must not abort training.
        if let Err(e) = serde_json::to_writer(&mut self.writer, &rec)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"))
        {
            tracing::warn!(tag, step, error = %e, "failed to write scalar");
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
