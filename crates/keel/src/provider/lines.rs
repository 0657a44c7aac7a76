//! Line-oriented streaming over an HTTP response body.
//!
//! Both backends stream newline-delimited payloads (SSE `data:` lines for
//! OpenRouter, NDJSON for Ollama). [`line_stream`] turns a request into a
//! [`ChunkStream`] that reads the body incrementally and hands each complete
//! line to a backend-specific parser.

use std::collections::VecDeque;

use reqwest::{RequestBuilder, Response};
use tracing::debug;

use super::{ChunkStream, ProviderChunk};
use crate::error::ProviderError;

/// What a backend parser made of one line.
pub(crate) enum LineEvent {
    Chunk(ProviderChunk),
    Skip,
    /// The provider signalled the end of the response.
    Done,
}

/// Accumulates raw bytes and yields complete lines.
///
/// Lines are split on `\n` before UTF-8 decoding so multi-byte characters
/// spanning two network chunks are not mangled.
#[derive(Default)]
pub(crate) struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Pop the next complete line, without its terminator.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        let pos = self.bytes.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.bytes.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&line);
        Some(text.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Take whatever is left after the body ends (an unterminated last line).
    pub(crate) fn take_remainder(&mut self) -> Option<String> {
        if self.bytes.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.bytes);
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

struct LineState<F> {
    request: Option<RequestBuilder>,
    response: Option<Response>,
    buffer: LineBuffer,
    pending: VecDeque<ProviderChunk>,
    finished: bool,
    parse: F,
}

impl<F> LineState<F>
where
    F: FnMut(&str) -> LineEvent,
{
    fn consume_line(&mut self, line: &str) {
        match (self.parse)(line) {
            LineEvent::Chunk(chunk) => self.pending.push_back(chunk),
            LineEvent::Skip => {}
            LineEvent::Done => {
                self.finished = true;
                self.response = None;
            }
        }
    }

    fn drain_lines(&mut self) {
        while !self.finished {
            let Some(line) = self.buffer.next_line() else {
                break;
            };
            self.consume_line(&line);
        }
    }
}

/// Send `request` and check the status, turning failures into errors.
pub(crate) async fn open(request: RequestBuilder) -> Result<Response, ProviderError> {
    let resp = request
        .send()
        .await
        .map_err(|e| ProviderError::Request(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

/// Build a lazy chunk stream for `request`, parsing each body line with
/// `parse`.
///
/// Nothing is sent until the stream is first polled.
pub(crate) fn line_stream<F>(request: RequestBuilder, parse: F) -> ChunkStream
where
    F: FnMut(&str) -> LineEvent + Send + 'static,
{
    let state = LineState {
        request: Some(request),
        response: None,
        buffer: LineBuffer::default(),
        pending: VecDeque::new(),
        finished: false,
        parse,
    };

    Box::pin(futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(chunk) = st.pending.pop_front() {
                if chunk.is_error() {
                    st.pending.clear();
                    st.finished = true;
                    st.response = None;
                }
                return Some((chunk, st));
            }
            if st.finished {
                return None;
            }

            if let Some(request) = st.request.take() {
                match open(request).await {
                    Ok(resp) => st.response = Some(resp),
                    Err(e) => st.pending.push_back(ProviderChunk::Error(e.to_string())),
                }
                continue;
            }

            let Some(resp) = st.response.as_mut() else {
                return None;
            };

            match resp.chunk().await {
                Ok(Some(bytes)) => {
                    st.buffer.extend(&bytes);
                    st.drain_lines();
                }
                Ok(None) => {
                    if let Some(rest) = st.buffer.take_remainder() {
                        st.consume_line(&rest);
                    }
                    debug!("Response body finished");
                    st.response = None;
                    st.finished = true;
                }
                Err(e) => st.pending.push_back(ProviderChunk::Error(format!(
                    "failed to read streaming chunk: {e}"
                ))),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_yields_complete_lines_only() {
        let mut buf = LineBuffer::default();
        buf.extend(b"first\r\nsec");
        assert_eq!(buf.next_line().as_deref(), Some("first"));
        assert_eq!(buf.next_line(), None);

        buf.extend(b"ond\n");
        assert_eq!(buf.next_line().as_deref(), Some("second"));
        assert_eq!(buf.take_remainder(), None);
    }

    #[test]
    fn buffer_keeps_split_multibyte_chars() {
        let text = "héllo\n".as_bytes();
        let mut buf = LineBuffer::default();
        // Split inside the two-byte 'é'.
        buf.extend(&text[..2]);
        buf.extend(&text[2..]);
        assert_eq!(buf.next_line().as_deref(), Some("héllo"));
    }

    #[test]
    fn remainder_returns_unterminated_tail() {
        let mut buf = LineBuffer::default();
        buf.extend(b"{\"done\":true}  ");
        assert_eq!(buf.take_remainder().as_deref(), Some("{\"done\":true}"));
        assert_eq!(buf.take_remainder(), None);
    }
}
