//! SSE frame reassembly
//!
//! The upstream body arrives as arbitrary byte chunks; frames are
//! delimited by a blank line and may span chunk boundaries. `SseFrames`
//! wraps the byte stream and yields one `data:` payload per frame.

use bytes::Bytes;
use chatrelay_core::{Error, Result};
use futures::Stream;
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Stream adapter turning raw bytes into SSE data payloads
#[pin_project]
pub struct SseFrames<S> {
    #[pin]
    inner: S,
    buffer: String,
    exhausted: bool,
}

impl<S> SseFrames<S> {
    /// Wrap an upstream byte stream
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: String::new(),
            exhausted: false,
        }
    }
}

/// Split one complete frame off the front of the buffer
fn next_frame(buffer: &mut String) -> Option<String> {
    let lf = buffer.find("\n\n").map(|i| (i, 2));
    let crlf = buffer.find("\r\n\r\n").map(|i| (i, 4));

    let (index, sep_len) = match (lf, crlf) {
        (Some((a, a_len)), Some((b, b_len))) => {
            if a < b {
                (a, a_len)
            } else {
                (b, b_len)
            }
        }
        (Some(found), None) | (None, Some(found)) => found,
        (None, None) => return None,
    };

    let raw = buffer[..index].to_string();
    buffer.drain(..index + sep_len);
    Some(raw)
}

/// Join the frame's `data:` line payloads; None for comment/empty frames
fn data_payload(raw: &str) -> Option<String> {
    let mut parts = Vec::new();
    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix("data:") {
            parts.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

impl<S, E> Stream for SseFrames<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
{
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            while let Some(raw) = next_frame(this.buffer) {
                if let Some(payload) = data_payload(&raw) {
                    return Poll::Ready(Some(Ok(payload)));
                }
            }

            if *this.exhausted {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.push_str(&String::from_utf8_lossy(&bytes));
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(Error::stream(format!(
                        "upstream body error: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    *this.exhausted = true;
                    // A final frame may arrive without its trailing blank line
                    let rest = std::mem::take(this.buffer);
                    if let Some(payload) = data_payload(&rest) {
                        return Poll::Ready(Some(Ok(payload)));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
