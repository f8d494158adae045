//! # Executor
//!
//! Drives a processor over a stream of JSON-lines batches.
//!
//! Each line is decoded and processed on a blocking worker; up to
//! `workers` batches are in flight at once against the same shared
//! processor. Results are written in input order regardless of which
//! worker finishes first.
//!
//! Lines are read with a size bound. A line longer than the limit is never
//! buffered in full: it is skipped up to the next newline and counted as an
//! error.

use crate::wire::{MAX_LINE_BYTES, decode_batch, encode_batch};
use serde::Serialize;
use sieve_core::{Message, Processor, Response, SieveError};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

type Outcome = Result<(Vec<Message>, Option<Response>), SieveError>;
type Pending = JoinHandle<Outcome>;

/// Totals for one executor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Batches decoded and handed to the processor.
    pub batches_in: u64,
    /// Batches written to the output.
    pub batches_out: u64,
    /// Inputs answered with an acknowledgment.
    pub acked: u64,
    /// Inputs answered with an error, or that could not be read or decoded.
    pub errors: u64,
}

// =============================================================================
// LINE FRAMING
// =============================================================================

/// Result of reading one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// A complete line is in the buffer, without its terminator.
    Line,
    /// The line exceeded the limit and was skipped; carries its length.
    Oversized(u64),
    /// End of input.
    Eof,
}

/// Read the next line into `buf`, holding at most `max + 1` bytes.
///
/// The trailing `\n` (and a preceding `\r`) is stripped. A final line
/// without a newline is still returned.
pub async fn read_frame<R>(
    input: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = (max as u64).saturating_add(1);
    let n = (&mut *input).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(Frame::Eof);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() <= max {
        return Ok(Frame::Line);
    }

    buf.clear();
    let skipped = skip_line(input).await?;
    Ok(Frame::Oversized((n as u64).saturating_add(skipped)))
}

/// Discard input up to and including the next newline.
async fn skip_line<R>(input: &mut R) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut skipped: u64 = 0;
    loop {
        let (done, used) = {
            let available = input.fill_buf().await?;
            if available.is_empty() {
                return Ok(skipped);
            }
            match available.iter().position(|b| *b == b'\n') {
                Some(i) => (true, i + 1),
                None => (false, available.len()),
            }
        };
        input.consume(used);
        skipped = skipped.saturating_add(used as u64);
        if done {
            return Ok(skipped);
        }
    }
}

// =============================================================================
// RUN
// =============================================================================

/// Run `proc` over every line of `input`, writing output batches to
/// `output`. Lines are limited to [`MAX_LINE_BYTES`].
///
/// Blank lines are skipped. Lines that are too long or fail to decode are
/// logged and counted as errors; they do not stop the run.
pub async fn run<R, W>(
    proc: Arc<dyn Processor>,
    input: R,
    output: &mut W,
    workers: usize,
) -> Result<Summary, SieveError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    run_with_line_limit(proc, input, output, workers, MAX_LINE_BYTES).await
}

/// [`run`] with an explicit line size limit.
pub async fn run_with_line_limit<R, W>(
    proc: Arc<dyn Processor>,
    mut input: R,
    output: &mut W,
    workers: usize,
    max_line: usize,
) -> Result<Summary, SieveError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let workers = workers.max(1);
    let mut summary = Summary::default();
    let mut in_flight: VecDeque<(u64, Pending)> = VecDeque::with_capacity(workers);
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;

    loop {
        let frame = read_frame(&mut input, &mut buf, max_line)
            .await
            .map_err(|e| SieveError::Io(format!("Read input: {}", e)))?;
        line_no += 1;

        match frame {
            Frame::Eof => break,
            Frame::Oversized(len) => {
                tracing::warn!(
                    line = line_no,
                    "skipping input: line of {} bytes exceeds maximum allowed {} bytes",
                    len,
                    max_line
                );
                summary.errors += 1;
                continue;
            }
            Frame::Line => {}
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        while in_flight.len() >= workers {
            let Some((n, handle)) = in_flight.pop_front() else {
                break;
            };
            emit(n, handle, output, &mut summary).await?;
        }

        let line = std::mem::take(&mut buf);
        let proc = Arc::clone(&proc);
        let handle = tokio::task::spawn_blocking(move || -> Outcome {
            let text = std::str::from_utf8(&line)
                .map_err(|e| SieveError::InvalidBatch(format!("invalid UTF-8: {}", e)))?;
            let msg = decode_batch(text)?;
            Ok(proc.process_message(&msg))
        });
        in_flight.push_back((line_no, handle));
    }

    while let Some((n, handle)) = in_flight.pop_front() {
        emit(n, handle, output, &mut summary).await?;
    }

    output
        .flush()
        .await
        .map_err(|e| SieveError::Io(format!("Flush output: {}", e)))?;

    Ok(summary)
}

/// Await one result and write it out.
async fn emit<W>(
    line_no: u64,
    handle: Pending,
    output: &mut W,
    summary: &mut Summary,
) -> Result<(), SieveError>
where
    W: AsyncWrite + Unpin,
{
    let outcome = handle
        .await
        .map_err(|e| SieveError::Io(format!("Worker failed on line {}: {}", line_no, e)))?;

    let (batches, response) = match outcome {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(line = line_no, "skipping input: {}", e);
            summary.errors += 1;
            return Ok(());
        }
    };
    summary.batches_in += 1;

    for batch in &batches {
        let mut encoded = encode_batch(batch)?;
        encoded.push('\n');
        output
            .write_all(encoded.as_bytes())
            .await
            .map_err(|e| SieveError::Io(format!("Write output: {}", e)))?;
        summary.batches_out += 1;
    }

    match response {
        Some(Response::Ack) => {
            tracing::debug!(line = line_no, "batch acknowledged without output");
            summary.acked += 1;
        }
        Some(Response::Error(reason)) => {
            tracing::warn!(line = line_no, "batch failed: {}", reason);
            summary.errors += 1;
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Keeps parts whose content is not "x"; sleeps on the first batch so
    /// later batches finish first.
    struct SlowFirst;

    impl Processor for SlowFirst {
        fn process_message(&self, msg: &Message) -> (Vec<Message>, Option<Response>) {
            if msg.get(0).is_some_and(|p| p.content() == b"slow") {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            let kept: Message = msg
                .iter()
                .filter(|p| p.content() != b"x")
                .cloned()
                .collect();
            if kept.is_empty() {
                (Vec::new(), Some(Response::Ack))
            } else {
                (vec![kept], None)
            }
        }
    }

    #[tokio::test]
    async fn output_keeps_input_order() {
        let input = "[{\"content\":\"slow\"}]\n[{\"content\":\"fast\"}]\n[{\"content\":\"x\"}]\n";
        let mut out = Vec::new();

        let summary = run(Arc::new(SlowFirst), input.as_bytes(), &mut out, 4)
            .await
            .expect("run");

        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(
            text,
            "[{\"content\":\"slow\"}]\n[{\"content\":\"fast\"}]\n"
        );
        assert_eq!(
            summary,
            Summary {
                batches_in: 3,
                batches_out: 2,
                acked: 1,
                errors: 0
            }
        );
    }

    #[tokio::test]
    async fn bad_lines_are_counted_not_fatal() {
        let input = "not json\n\n[{\"content\":\"ok\"}]\n";
        let mut out = Vec::new();

        let summary = run(Arc::new(SlowFirst), input.as_bytes(), &mut out, 1)
            .await
            .expect("run");

        assert_eq!(summary.batches_in, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(String::from_utf8(out).expect("utf8"), "[{\"content\":\"ok\"}]\n");
    }

    /// Streams `fill` bytes of `a` followed by `tail`, without holding the
    /// long line in memory.
    struct LongLine {
        fill: u64,
        tail: &'static [u8],
    }

    impl tokio::io::AsyncRead for LongLine {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            out: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.fill > 0 {
                let n = (out.remaining() as u64).min(self.fill) as usize;
                out.initialize_unfilled_to(n).fill(b'a');
                out.advance(n);
                self.fill -= n as u64;
            } else {
                let tail = self.tail;
                let n = out.remaining().min(tail.len());
                out.put_slice(&tail[..n]);
                self.tail = &tail[n..];
            }
            std::task::Poll::Ready(Ok(()))
        }
    }

    const OK_LINE: &[u8] = b"\n[{\"content\":\"ok\"}]\n";

    #[tokio::test]
    async fn oversized_frame_is_skipped_without_buffering() {
        let mut input = tokio::io::BufReader::new(LongLine {
            fill: 1024 * 1024,
            tail: OK_LINE,
        });
        let mut buf = Vec::new();

        let frame = read_frame(&mut input, &mut buf, 1024).await.expect("read");
        assert_eq!(frame, Frame::Oversized(1024 * 1024 + 1));
        assert!(buf.is_empty());
        assert!(buf.capacity() < 64 * 1024);

        let frame = read_frame(&mut input, &mut buf, 1024).await.expect("read");
        assert_eq!(frame, Frame::Line);
        assert_eq!(buf, br#"[{"content":"ok"}]"#);

        let frame = read_frame(&mut input, &mut buf, 1024).await.expect("read");
        assert_eq!(frame, Frame::Eof);
    }

    #[tokio::test]
    async fn line_over_default_limit_is_rejected_and_run_continues() {
        let fill = 4 * MAX_LINE_BYTES as u64;
        let input = tokio::io::BufReader::new(LongLine {
            fill,
            tail: OK_LINE,
        });
        let mut out = Vec::new();

        let summary = run(Arc::new(SlowFirst), input, &mut out, 2)
            .await
            .expect("run");

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.batches_in, 1);
        assert_eq!(String::from_utf8(out).expect("utf8"), "[{\"content\":\"ok\"}]\n");
    }

    #[tokio::test]
    async fn frames_strip_crlf_and_keep_unterminated_last_line() {
        let mut input: &[u8] = b"abc\r\nlast";
        let mut buf = Vec::new();

        assert_eq!(read_frame(&mut input, &mut buf, 16).await.expect("read"), Frame::Line);
        assert_eq!(buf, b"abc");
        assert_eq!(read_frame(&mut input, &mut buf, 16).await.expect("read"), Frame::Line);
        assert_eq!(buf, b"last");
        assert_eq!(read_frame(&mut input, &mut buf, 16).await.expect("read"), Frame::Eof);
    }

    #[tokio::test]
    async fn line_at_limit_is_accepted() {
        let input = "[{\"content\":\"ok\"}]\n[{\"content\":\"longer\"}]\n";
        let mut out = Vec::new();

        let summary = run_with_line_limit(Arc::new(SlowFirst), input.as_bytes(), &mut out, 1, 18)
            .await
            .expect("run");

        assert_eq!(summary.batches_in, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(String::from_utf8(out).expect("utf8"), "[{\"content\":\"ok\"}]\n");
    }

    #[tokio::test]
    async fn invalid_utf8_is_counted_not_fatal() {
        let input: &[u8] = b"[{\"content\":\"\xff\"}]\n[{\"content\":\"ok\"}]\n";
        let mut out = Vec::new();

        let summary = run(Arc::new(SlowFirst), input, &mut out, 2)
            .await
            .expect("run");

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.batches_in, 1);
    }

    #[test]
    fn summary_serializes() {
        let json = serde_json::to_string(&Summary::default()).expect("serialize");
        assert_eq!(json, r#"{"batches_in":0,"batches_out":0,"acked":0,"errors":0}"#);
    }
}
