//! Async draining of child process stdio streams into the ring buffer.

use crate::buffer::LogRingBuffer;
use crate::types::StreamType;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Read a child stdio stream line-by-line and append each non-blank line to
/// the buffer until EOF or cancellation.
///
/// Lines are prefixed with a local `[HH:MM:SS]` timestamp at capture time.
/// The stdout and stderr tasks of one process share the same buffer; no
/// ordering is guaranteed between the two streams beyond arrival order.
///
/// Returns the number of lines appended.
pub async fn capture_stream<R>(
    stream: R,
    stream_type: StreamType,
    script_name: String,
    buffer: Arc<LogRingBuffer>,
    cancel: CancellationToken,
) -> u64
where
    R: AsyncRead + Unpin,
{
    debug!(
        script = %script_name,
        stream = %stream_type,
        "Output capture started"
    );

    let reader = BufReader::new(stream);
    let mut lines = reader.lines();
    let mut captured = 0u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(script = %script_name, stream = %stream_type, "Output capture cancelled");
                break;
            }
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => {
                        let trimmed = line.trim_end();
                        if trimmed.is_empty() {
                            continue;
                        }
                        let timestamp = chrono::Local::now().format("%H:%M:%S");
                        buffer.append(format!("[{}] {}", timestamp, trimmed));
                        captured += 1;
                    }
                    Ok(None) => {
                        debug!(script = %script_name, stream = %stream_type, "Stream ended");
                        break;
                    }
                    Err(e) => {
                        error!(
                            script = %script_name,
                            stream = %stream_type,
                            error = %e,
                            "Error reading from stream"
                        );
                        break;
                    }
                }
            }
        }
    }

    debug!(
        script = %script_name,
        stream = %stream_type,
        lines = captured,
        "Output capture finished"
    );

    captured
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_until_eof() {
        let buffer = Arc::new(LogRingBuffer::new(100));
        let input: &[u8] = b"first line\n\nsecond line\n";

        let captured = capture_stream(
            input,
            StreamType::Stdout,
            "counter".to_string(),
            Arc::clone(&buffer),
            CancellationToken::new(),
        )
        .await;

        // The blank line is skipped
        assert_eq!(captured, 2);
        let snap = buffer.snapshot();
        assert_eq!(snap.lines.len(), 2);
        assert!(snap.lines[0].ends_with("first line"));
        assert!(snap.lines[1].ends_with("second line"));
    }

    #[tokio::test]
    async fn test_capture_lines_are_timestamped() {
        let buffer = Arc::new(LogRingBuffer::new(100));
        let input: &[u8] = b"hello\n";

        capture_stream(
            input,
            StreamType::Stderr,
            "counter".to_string(),
            Arc::clone(&buffer),
            CancellationToken::new(),
        )
        .await;

        let lines = buffer.snapshot().lines;
        assert_eq!(lines.len(), 1);
        // "[HH:MM:SS] hello"
        assert!(lines[0].starts_with('['));
        assert_eq!(&lines[0][9..], "] hello");
    }

    #[tokio::test]
    async fn test_capture_respects_cancellation() {
        let buffer = Arc::new(LogRingBuffer::new(100));
        let cancel = CancellationToken::new();
        cancel.cancel();

        // A stream that would block forever if polled without cancellation
        let (reader, _writer) = tokio::io::duplex(64);

        let captured = capture_stream(
            reader,
            StreamType::Stdout,
            "counter".to_string(),
            Arc::clone(&buffer),
            cancel,
        )
        .await;

        assert_eq!(captured, 0);
        assert!(buffer.is_empty());
    }
}
