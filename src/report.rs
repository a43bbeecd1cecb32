use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::batch::{BatchSummary, RecordOutcome};

/// JSON-lines run log. Clones share one writer so workers can log
/// concurrently; lines are never interleaved.
#[derive(Clone)]
pub struct RunReport {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl RunReport {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    fn write_line(&self, value: &Value) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = serde_json::to_writer(&mut *writer, value);
            let _ = writer.write_all(b"\n");
        }
    }

    pub fn log_span_ms(&self, name: &str, ms: f64) {
        self.write_line(&json!({
            "type": "run.span",
            "name": name,
            "unit": "ms",
            "ms": (ms * 1000.0).round() / 1000.0,
        }));
    }

    pub fn log_locate(&self, tokens: usize, pages: &[usize]) {
        self.write_line(&json!({
            "type": "run.locate",
            "tokens": tokens,
            "pages": pages,
        }));
    }

    pub fn log_record(&self, outcome: &RecordOutcome) {
        let mut value = json!({ "type": "run.record" });
        if let (Value::Object(map), Ok(Value::Object(fields))) =
            (&mut value, serde_json::to_value(outcome))
        {
            map.extend(fields);
        }
        self.write_line(&value);
    }

    pub fn log_summary(&self, summary: &BatchSummary) {
        self.write_line(&json!({
            "type": "run.summary",
            "records": summary.records,
            "written": summary.written,
            "failed": summary.failed,
            "images_missing": summary.images_missing,
        }));
    }

    pub fn flush(&self) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writer.flush();
        }
    }
}
