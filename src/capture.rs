//! Bounded output capture
//!
//! Fixed-capacity text sinks for the guest's stdout and stderr channels.
//! Once a channel hits its capacity, further writes are discarded rather than
//! buffered, so a runaway `print` loop cannot grow host memory without bound.

use std::sync::{Arc, Mutex};

use crate::engine::OutputHandler;

/// Fixed-capacity text sink
///
/// Capacity is measured in characters. Writes past the limit are dropped and
/// the buffer is marked truncated; reading the buffer out appends a fixed
/// suffix naming the limit.
#[derive(Debug)]
pub struct BoundedBuffer {
    text: String,
    chars: usize,
    limit: usize,
    truncated: bool,
}

/// Shared handle to a bounded buffer, suitable for engine output callbacks
pub type SharedBuffer = Arc<Mutex<BoundedBuffer>>;

impl BoundedBuffer {
    /// Create an empty buffer with the given character capacity
    pub fn new(limit: usize) -> Self {
        BoundedBuffer {
            text: String::new(),
            chars: 0,
            limit,
            truncated: false,
        }
    }

    /// Create a shared buffer handle
    pub fn shared(limit: usize) -> SharedBuffer {
        Arc::new(Mutex::new(BoundedBuffer::new(limit)))
    }

    /// Append text, retaining at most the remaining capacity
    pub fn push(&mut self, chunk: &str) {
        if self.truncated {
            return;
        }
        let remaining = self.limit - self.chars;
        let mut taken = 0;
        for (count, ch) in chunk.chars().enumerate() {
            if count == remaining {
                self.truncated = true;
                break;
            }
            self.text.push(ch);
            taken += 1;
        }
        self.chars += taken;
    }

    /// Number of retained characters
    pub fn len(&self) -> usize {
        self.chars
    }

    /// Whether nothing has been retained
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    /// Whether writes have been dropped
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Read the buffer out, appending the truncation suffix when applicable
    pub fn into_text(self) -> String {
        if self.truncated {
            format!("{}\n… [truncated to {} chars]", self.text, self.limit)
        } else {
            self.text
        }
    }
}

/// Adapt a shared buffer into an engine output callback
pub fn sink(buffer: SharedBuffer) -> OutputHandler {
    Arc::new(move |chunk: &str| {
        if let Ok(mut guard) = buffer.lock() {
            guard.push(chunk);
        }
    })
}

/// Drain a shared buffer, returning its text
///
/// The buffer handle is left holding an empty zero-capacity buffer; each
/// execution installs fresh buffers, so drained handles are never reused.
pub fn drain(buffer: &SharedBuffer) -> String {
    let mut guard = match buffer.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    std::mem::replace(&mut *guard, BoundedBuffer::new(0)).into_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_capacity_passthrough() {
        let mut buf = BoundedBuffer::new(100);
        buf.push("hello ");
        buf.push("world");
        assert!(!buf.is_truncated());
        assert_eq!(buf.into_text(), "hello world");
    }

    #[test]
    fn test_truncation_discards_overflow() {
        let mut buf = BoundedBuffer::new(5);
        buf.push("abcdefgh");
        assert!(buf.is_truncated());
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.into_text(), "abcde\n… [truncated to 5 chars]");
    }

    #[test]
    fn test_exact_fit_is_not_truncated() {
        let mut buf = BoundedBuffer::new(5);
        buf.push("abcde");
        assert!(!buf.is_truncated());
        assert_eq!(buf.into_text(), "abcde");
    }

    #[test]
    fn test_writes_after_truncation_are_dropped() {
        let mut buf = BoundedBuffer::new(3);
        buf.push("abcd");
        buf.push("efgh");
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.into_text(), "abc\n… [truncated to 3 chars]");
    }

    #[test]
    fn test_multibyte_counts_characters_not_bytes() {
        let mut buf = BoundedBuffer::new(4);
        buf.push("héllo");
        assert!(buf.is_truncated());
        assert_eq!(buf.into_text(), "héll\n… [truncated to 4 chars]");
    }

    #[test]
    fn test_sink_and_drain() {
        let shared = BoundedBuffer::shared(10);
        let handler = sink(shared.clone());
        handler("one ");
        handler("two");
        assert_eq!(drain(&shared), "one two");
    }
}
