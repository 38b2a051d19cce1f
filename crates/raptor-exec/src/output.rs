//! Capture of user-code stdout/stderr inside the worker.
//!
//! The worker's real stdout is the reply channel back to the supervisor, so
//! anything user code prints must be swallowed before it reaches the pipe.
//! [`CaptureBuffer`] is the Rust side of the replacement stream objects
//! installed into the VM: writes from either stream land here, bounded by a
//! shared byte budget. Past the budget the buffer truncates silently — user
//! output is diagnostic, never verdict data, so truncation is not an error.

use std::sync::{Arc, Mutex};

/// Which replaced stream a write came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

#[derive(Default)]
struct CaptureInner {
    stdout: String,
    stderr: String,
    remaining: usize,
    truncated: bool,
}

/// Shared, budgeted sink for captured user output.
///
/// Cheap to clone; all clones append to the same buffers.
#[derive(Clone)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<CaptureInner>>,
}

impl CaptureBuffer {
    /// A buffer accepting up to `budget` bytes across both streams.
    pub fn new(budget: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CaptureInner {
                remaining: budget,
                ..CaptureInner::default()
            })),
        }
    }

    /// Append `text` to the given stream, keeping at most the remaining
    /// budget worth of characters.
    pub fn push(&self, stream: StreamKind, text: &str) {
        let mut inner = self.inner.lock().expect("capture buffer mutex poisoned");
        let take = if text.len() <= inner.remaining {
            text.len()
        } else {
            inner.truncated = true;
            // Back off to a char boundary so the kept prefix stays valid UTF-8.
            let mut end = inner.remaining;
            while end > 0 && !text.is_char_boundary(end) {
                end -= 1;
            }
            end
        };
        let kept = &text[..take];
        inner.remaining -= take;
        match stream {
            StreamKind::Stdout => inner.stdout.push_str(kept),
            StreamKind::Stderr => inner.stderr.push_str(kept),
        }
    }

    /// True once any write ran past the budget.
    pub fn truncated(&self) -> bool {
        self.inner.lock().expect("capture buffer mutex poisoned").truncated
    }

    /// Copies of the captured `(stdout, stderr)`.
    pub fn snapshot(&self) -> (String, String) {
        let inner = self.inner.lock().expect("capture buffer mutex poisoned");
        (inner.stdout.clone(), inner.stderr.clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
