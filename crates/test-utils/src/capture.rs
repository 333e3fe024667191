use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use multirun::output::OutputSink;

/// In-memory writer that can be inspected after the run.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn bytes(&self) -> Vec<u8> {
        self.buf.lock().unwrap().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink writing into memory, plus handles to its stdout and stderr.
pub fn capture_sink() -> (Arc<OutputSink>, CapturedOutput, CapturedOutput) {
    let stdout = CapturedOutput::default();
    let stderr = CapturedOutput::default();
    let sink = Arc::new(OutputSink::new(stdout.clone(), stderr.clone()));
    (sink, stdout, stderr)
}
