// src/output.rs

//! Output routing for command output and engine-authored lines.
//!
//! Every write goes through one of two mutex-protected writers (stdout and
//! stderr), so a single write call is never torn. Buffered blocks are written
//! with one `write_all` under the lock and therefore never interleave with
//! another command's block.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

type SharedWriter = Mutex<Box<dyn Write + Send>>;

/// Destination for command output.
pub struct OutputSink {
    stdout: SharedWriter,
    stderr: SharedWriter,
    /// When true, streamed children write straight to the process's own
    /// stdout/stderr instead of being forwarded through this sink.
    inherit_streams: bool,
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("inherit_streams", &self.inherit_streams)
            .finish_non_exhaustive()
    }
}

impl OutputSink {
    /// The process's real stdout/stderr. Streamed children inherit them.
    pub fn terminal() -> Self {
        Self {
            stdout: Mutex::new(Box::new(io::stdout())),
            stderr: Mutex::new(Box::new(io::stderr())),
            inherit_streams: true,
        }
    }

    /// Arbitrary writers. Streamed child output is forwarded line by line.
    pub fn new(stdout: impl Write + Send + 'static, stderr: impl Write + Send + 'static) -> Self {
        Self {
            stdout: Mutex::new(Box::new(stdout)),
            stderr: Mutex::new(Box::new(stderr)),
            inherit_streams: false,
        }
    }

    pub fn inherits_streams(&self) -> bool {
        self.inherit_streams
    }

    /// Write the `Running <tag>` line to the diagnostic stream.
    pub fn announce(&self, tag: &str) {
        self.write_stderr(tag_line(tag).as_bytes());
    }

    pub fn write_stdout(&self, bytes: &[u8]) {
        write_locked(lock(&self.stdout), bytes, "stdout");
    }

    pub fn write_stderr(&self, bytes: &[u8]) {
        write_locked(lock(&self.stderr), bytes, "stderr");
    }

    /// Publish a finished command's output.
    ///
    /// Streamed output has already been written while the command ran, so
    /// only buffered output produces a block here: the optional tag line
    /// followed by the captured bytes, as one contiguous write.
    pub fn emit(&self, tag: &str, exit_code: Option<i32>, output: &[u8], buffer_output: bool, tag_output: bool) {
        if !buffer_output {
            return;
        }

        debug!(tag, ?exit_code, bytes = output.len(), "flushing buffered output");

        let mut block = Vec::with_capacity(output.len() + tag.len() + 16);
        if tag_output {
            block.extend_from_slice(tag_line(tag).as_bytes());
        }
        block.extend_from_slice(output);
        if !block.is_empty() && !block.ends_with(b"\n") {
            block.push(b'\n');
        }

        self.write_stdout(&block);
    }
}

fn tag_line(tag: &str) -> String {
    format!("Running {tag}\n")
}

fn lock(writer: &SharedWriter) -> MutexGuard<'_, Box<dyn Write + Send>> {
    writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Blocking write on the caller's thread, async tasks included.
///
/// The std lock covers one `write_all` plus `flush` and never spans an await.
/// Blocks must land in the order they are emitted, so this stays off
/// `spawn_blocking`.
fn write_locked(mut guard: MutexGuard<'_, Box<dyn Write + Send>>, bytes: &[u8], stream: &str) {
    if let Err(e) = guard.write_all(bytes).and_then(|_| guard.flush()) {
        warn!(stream, error = %e, "failed to write command output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Buffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sink() -> (OutputSink, Buffer, Buffer) {
        let out = Buffer::default();
        let err = Buffer::default();
        (OutputSink::new(out.clone(), err.clone()), out, err)
    }

    #[test]
    fn announce_goes_to_the_diagnostic_stream() {
        let (sink, out, err) = sink();
        sink.announce("lint");
        assert_eq!(err.text(), "Running lint\n");
        assert_eq!(out.text(), "");
    }

    #[test]
    fn buffered_block_is_prefixed_with_tag_line() {
        let (sink, out, _) = sink();
        sink.emit("build", Some(0), b"line 1\nline 2", true, true);
        assert_eq!(out.text(), "Running build\nline 1\nline 2\n");
    }

    #[test]
    fn buffered_block_without_tag() {
        let (sink, out, _) = sink();
        sink.emit("build", Some(1), b"only output\n", true, false);
        assert_eq!(out.text(), "only output\n");
    }

    #[test]
    fn streamed_emit_writes_nothing() {
        let (sink, out, err) = sink();
        sink.emit("build", Some(0), b"ignored", false, true);
        assert_eq!(out.text(), "");
        assert_eq!(err.text(), "");
    }

    #[test]
    fn empty_untagged_block_writes_nothing() {
        let (sink, out, _) = sink();
        sink.emit("quiet", Some(0), b"", true, false);
        assert_eq!(out.text(), "");
    }

    #[test]
    fn concurrent_blocks_never_interleave() {
        let (sink, out, _) = sink();
        let sink = Arc::new(sink);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    let body: String = (0..50).map(|n| format!("cmd{i} line{n}\n")).collect();
                    sink.emit(&format!("cmd{i}"), Some(0), body.as_bytes(), true, true);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let text = out.text();
        let blocks: Vec<&str> = text.split("Running ").filter(|b| !b.is_empty()).collect();
        assert_eq!(blocks.len(), 8);
        for block in blocks {
            let mut lines = block.lines();
            let tag = lines.next().unwrap();
            assert!(lines.all(|l| l.starts_with(&format!("{tag} "))), "block for {tag} was split");
        }
    }
}
