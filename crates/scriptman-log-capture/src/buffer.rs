//! Bounded log ring buffer with cursor-based snapshots.

use crate::types::LogSnapshot;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Bounded FIFO log storage for one script.
///
/// Appends from the two capture tasks of a running script are serialized by
/// an internal mutex; each `append` is atomic with respect to buffer
/// mutation. Snapshots copy the retained lines under the lock and never
/// block appenders longer than that copy.
///
/// Cursors are the monotonic count of lines ever appended, so a poller can
/// hand its `next_cursor` back and receive only lines appended since. The
/// counter survives `reset()` (a fresh run of the script), so a stale cursor
/// from a previous run yields only new output, never a replay.
#[derive(Debug)]
pub struct LogRingBuffer {
    capacity: usize,
    inner: Mutex<BufferInner>,
}

#[derive(Debug)]
struct BufferInner {
    lines: VecDeque<String>,
    /// Cursor position of the oldest retained line
    start: u64,
}

impl LogRingBuffer {
    /// Create a buffer retaining at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(BufferInner {
                lines: VecDeque::new(),
                start: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a line, evicting the oldest retained line when full.
    pub fn append(&self, line: String) {
        let mut inner = self.inner.lock();
        inner.lines.push_back(line);
        if inner.lines.len() > self.capacity {
            inner.lines.pop_front();
            inner.start += 1;
        }
    }

    /// Number of lines currently retained.
    pub fn len(&self) -> usize {
        self.inner.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lines.is_empty()
    }

    /// Total number of lines ever appended (the cursor position after the
    /// newest line).
    pub fn end_cursor(&self) -> u64 {
        let inner = self.inner.lock();
        inner.start + inner.lines.len() as u64
    }

    /// Copy of all retained lines, oldest first.
    pub fn snapshot(&self) -> LogSnapshot {
        let inner = self.inner.lock();
        LogSnapshot {
            lines: inner.lines.iter().cloned().collect(),
            next_cursor: inner.start + inner.lines.len() as u64,
        }
    }

    /// Lines appended at or after `cursor` that are still retained.
    ///
    /// A cursor older than the eviction horizon returns everything retained;
    /// a cursor at or past the end returns no lines. Either way the returned
    /// `next_cursor` points after the newest line.
    pub fn snapshot_since(&self, cursor: u64) -> LogSnapshot {
        let inner = self.inner.lock();
        let end = inner.start + inner.lines.len() as u64;
        let effective = cursor.clamp(inner.start, end);
        let skip = (effective - inner.start) as usize;
        LogSnapshot {
            lines: inner.lines.iter().skip(skip).cloned().collect(),
            next_cursor: end,
        }
    }

    /// The newest `count` retained lines, oldest first.
    pub fn tail(&self, count: usize) -> Vec<String> {
        let inner = self.inner.lock();
        let skip = inner.lines.len().saturating_sub(count);
        inner.lines.iter().skip(skip).cloned().collect()
    }

    /// Drop all retained lines without rewinding the cursor counter.
    ///
    /// Called when a script is re-started so the new run begins with an
    /// empty buffer while cursors held by pollers stay valid.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.start += inner.lines.len() as u64;
        inner.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_append_and_snapshot() {
        let buffer = LogRingBuffer::new(10);
        buffer.append("one".to_string());
        buffer.append("two".to_string());

        let snap = buffer.snapshot();
        assert_eq!(snap.lines, vec!["one", "two"]);
        assert_eq!(snap.next_cursor, 2);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let buffer = LogRingBuffer::new(3);
        for i in 0..5 {
            buffer.append(format!("line {}", i));
        }

        assert_eq!(buffer.len(), 3);
        let snap = buffer.snapshot();
        assert_eq!(snap.lines, vec!["line 2", "line 3", "line 4"]);
        // Cursor counts all appends, not just retained lines
        assert_eq!(snap.next_cursor, 5);
    }

    #[test]
    fn test_snapshot_since() {
        let buffer = LogRingBuffer::new(10);
        for i in 0..4 {
            buffer.append(format!("line {}", i));
        }

        let snap = buffer.snapshot_since(2);
        assert_eq!(snap.lines, vec!["line 2", "line 3"]);
        assert_eq!(snap.next_cursor, 4);

        // Cursor at the end: nothing new
        let snap = buffer.snapshot_since(4);
        assert!(snap.lines.is_empty());
        assert_eq!(snap.next_cursor, 4);

        // Cursor past the end clamps
        let snap = buffer.snapshot_since(100);
        assert!(snap.lines.is_empty());
        assert_eq!(snap.next_cursor, 4);
    }

    #[test]
    fn test_snapshot_since_evicted_cursor() {
        let buffer = LogRingBuffer::new(2);
        for i in 0..5 {
            buffer.append(format!("line {}", i));
        }

        // Lines 0..3 are evicted; a cursor inside the evicted range only
        // returns what is still retained
        let snap = buffer.snapshot_since(1);
        assert_eq!(snap.lines, vec!["line 3", "line 4"]);
        assert_eq!(snap.next_cursor, 5);
    }

    #[test]
    fn test_reset_keeps_cursor_monotonic() {
        let buffer = LogRingBuffer::new(10);
        buffer.append("old".to_string());
        buffer.append("older".to_string());
        buffer.reset();

        assert!(buffer.is_empty());
        assert_eq!(buffer.end_cursor(), 2);

        buffer.append("new".to_string());
        let snap = buffer.snapshot_since(2);
        assert_eq!(snap.lines, vec!["new"]);
        assert_eq!(snap.next_cursor, 3);
    }

    #[test]
    fn test_tail() {
        let buffer = LogRingBuffer::new(10);
        for i in 0..5 {
            buffer.append(format!("line {}", i));
        }

        assert_eq!(buffer.tail(2), vec!["line 3", "line 4"]);
        assert_eq!(buffer.tail(100).len(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_appends() {
        let buffer = Arc::new(LogRingBuffer::new(1000));

        let writers: Vec<_> = (0..2)
            .map(|w| {
                let buffer = Arc::clone(&buffer);
                tokio::spawn(async move {
                    for i in 0..100 {
                        buffer.append(format!("writer {} line {}", w, i));
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.await.unwrap();
        }

        assert_eq!(buffer.len(), 200);
        assert_eq!(buffer.end_cursor(), 200);
    }
}
