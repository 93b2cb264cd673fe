use crate::dap::transport::Frame;
use crate::tap_warn;
use anyhow::Context;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    ToAdapter,
    FromAdapter,
}

impl Direction {
    fn arrow(self) -> &'static str {
        match self {
            Direction::ToAdapter => "->",
            Direction::FromAdapter => "<-",
        }
    }
}

/// Writes tapped DAP traffic into the diagnostics file, one frame per line.
///
/// Write failures are reported once, tracing never interrupts the traffic.
#[derive(Clone)]
pub struct FileTracer {
    file: Arc<Mutex<std::fs::File>>,
    broken: Arc<AtomicBool>,
}

impl FileTracer {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            broken: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn line(&self, text: &str) {
        let res = match self.file.lock() {
            Ok(mut file) => writeln!(file, "{text}"),
            Err(poisoned) => writeln!(poisoned.into_inner(), "{text}"),
        };
        if let Err(err) = res {
            if !self.broken.swap(true, Ordering::SeqCst) {
                tap_warn!(target: "dap", "DAP trace write failed, further failures are not reported: {err}");
            }
        }
    }

    /// Return true if at least one trace line was lost.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::SeqCst)
    }

    pub fn frame(&self, direction: Direction, frame: &Frame) {
        self.line(&format!(
            "{} {}",
            direction.arrow(),
            String::from_utf8_lossy(frame.payload())
        ));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trace_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");
        let tracer = FileTracer::new(&path).unwrap();

        tracer.line("session started");
        let frame = Frame::from_message(&json!({"event": "output"})).unwrap();
        tracer.frame(Direction::FromAdapter, &frame);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "session started\n<- {\"event\":\"output\"}\n");
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_write_failure_is_remembered() {
        // every write to /dev/full fails with ENOSPC
        let tracer = FileTracer::new(Path::new("/dev/full")).unwrap();
        assert!(!tracer.is_broken());

        tracer.line("lost");
        tracer.line("lost again");
        assert!(tracer.is_broken());
    }
}
