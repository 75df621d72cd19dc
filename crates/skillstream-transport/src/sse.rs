//! SSE-over-HTTP skill transport.

use std::{collections::VecDeque, time::Duration};

use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use skillstream_core::{EventStream, SkillTransport, StreamEvent, TransportError};
use tokio_util::sync::CancellationToken;

use crate::wire::{ExecuteRequest, WireEvent};

/// Default connect timeout for opening the stream.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Skill transport over server-sent events.
///
/// Opens one POST request per execution to
/// `{base_url}/skills/{slug}/execute` and parses the chunked response body
/// as SSE frames. Dropping the returned stream releases the connection.
#[derive(Debug, Clone)]
pub struct SseTransport {
    client: reqwest::Client,
    base_url: String,
}

impl SseTransport {
    /// Create a transport against a service base URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl SkillTransport for SseTransport {
    async fn open_stream(
        &self,
        slug: &str,
        prompt: &str,
        token: CancellationToken,
    ) -> Result<EventStream, TransportError> {
        let url = format!("{}/skills/{slug}/execute", self.base_url);
        tracing::debug!(%url, "Opening skill stream");

        let response = self
            .client
            .post(&url)
            .json(&ExecuteRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        Ok(event_stream(response.bytes_stream().boxed(), token))
    }
}

struct SseState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    parser: SseParser,
    pending: VecDeque<StreamEvent>,
    done: bool,
    token: CancellationToken,
}

/// Fold a chunked byte stream into a stream of skill events.
///
/// Buffered fragments are always drained before the body is polled again,
/// so a mid-stream failure never drops text that already arrived.
fn event_stream(
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    token: CancellationToken,
) -> EventStream {
    let state = SseState {
        body,
        parser: SseParser::new(),
        pending: VecDeque::new(),
        done: false,
        token,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            // Terminal and cancellation checks gate even buffered events:
            // at most one terminal is ever yielded, and nothing is yielded
            // past cancellation.
            if st.done || st.token.is_cancelled() {
                return None;
            }
            if let Some(event) = st.pending.pop_front() {
                if event.is_terminal() {
                    st.done = true;
                }
                return Some((event, st));
            }

            match st.body.next().await {
                Some(Ok(chunk)) => {
                    for payload in st.parser.push(&chunk) {
                        match serde_json::from_str::<WireEvent>(&payload) {
                            Ok(wire) => st.pending.push_back(wire.into()),
                            Err(e) => {
                                tracing::warn!("Skipping malformed SSE payload: {e}");
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((
                        StreamEvent::Failed {
                            message: e.to_string(),
                        },
                        st,
                    ));
                }
                None => {
                    st.done = true;
                    return None;
                }
            }
        }
    })
    .boxed()
}

/// Incremental SSE frame parser.
///
/// Frames may arrive split across arbitrary chunk boundaries; a frame is
/// complete at a blank line. The buffer holds raw bytes and only complete
/// frames are decoded: the blank-line delimiter is ASCII, so a chunk
/// boundary that lands inside a multi-byte character leaves the partial
/// sequence buffered until the rest arrives. Multi-line `data:` fields are
/// joined with newlines per the SSE spec.
pub(crate) struct SseParser {
    buf: Vec<u8>,
}

impl SseParser {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed a chunk, returning the `data` payloads of any completed frames.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(end) = frame_end(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..end).collect();
            let data = String::from_utf8_lossy(&frame)
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|value| value.strip_prefix(' ').unwrap_or(value))
                .collect::<Vec<_>>()
                .join("\n");
            if !data.is_empty() {
                payloads.push(data);
            }
        }
        payloads
    }
}

/// Index one past the first blank-line delimiter, LF or CRLF flavored.
fn frame_end(buf: &[u8]) -> Option<usize> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, i + 2));
    let crlf = buf
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, i + 4));

    match (lf, crlf) {
        (Some((a, a_end)), Some((b, b_end))) => Some(if a < b { a_end } else { b_end }),
        (Some((_, end)), None) | (None, Some((_, end))) => Some(end),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_whole_frame() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b"data: {\"type\":\"fragment\",\"text\":\"hi\"}\n\n");
        assert_eq!(payloads, vec!["{\"type\":\"fragment\",\"text\":\"hi\"}"]);
    }

    #[test]
    fn reassembles_frames_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"data: {\"type\":\"frag").is_empty());
        assert!(parser.push(b"ment\",\"text\":\"x\"}").is_empty());
        let payloads = parser.push(b"\n\ndata: done\n\n");
        assert_eq!(
            payloads,
            vec!["{\"type\":\"fragment\",\"text\":\"x\"}", "done"]
        );
    }

    #[test]
    fn ignores_comment_and_event_lines() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b": keepalive\nevent: message\ndata: payload\n\n");
        assert_eq!(payloads, vec!["payload"]);
    }

    #[test]
    fn reassembles_multibyte_chars_split_across_chunks() {
        let mut parser = SseParser::new();
        let frame = "data: {\"type\":\"fragment\",\"text\":\"café\"}\n\n".as_bytes();
        // Split inside the two-byte 'é'.
        let split = frame.len() - 5;
        assert!(parser.push(&frame[..split]).is_empty());

        let payloads = parser.push(&frame[split..]);
        assert_eq!(payloads.len(), 1);
        let event: WireEvent = serde_json::from_str(&payloads[0]).unwrap();
        assert_eq!(event, WireEvent::Fragment { text: "café".into() });
    }

    #[test]
    fn handles_crlf_delimiters() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b"data: a\r\n\r\ndata: b\r\n\r\n");
        assert_eq!(payloads, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn stream_ends_at_first_terminal_even_with_buffered_frames() {
        // Server flushes a terminal and more frames in one chunk; the
        // sequence must still end after the first terminal.
        let chunks: Vec<reqwest::Result<Bytes>> = vec![Ok(Bytes::from_static(
            b"data: {\"type\":\"completed\",\"execution_time_seconds\":1.0}\n\n\
              data: {\"type\":\"failed\",\"message\":\"late\"}\n\n",
        ))];
        let body = futures::stream::iter(chunks).boxed();

        let mut events = event_stream(body, CancellationToken::new());
        assert!(matches!(
            events.next().await,
            Some(StreamEvent::Completed { .. })
        ));
        assert_eq!(events.next().await, None);
    }

    #[tokio::test]
    async fn buffered_fragments_are_not_yielded_after_cancellation() {
        let chunks: Vec<reqwest::Result<Bytes>> = vec![Ok(Bytes::from_static(
            b"data: {\"type\":\"fragment\",\"text\":\"a\"}\n\n\
              data: {\"type\":\"fragment\",\"text\":\"b\"}\n\n",
        ))];
        let body = futures::stream::iter(chunks).boxed();
        let token = CancellationToken::new();

        let mut events = event_stream(body, token.clone());
        assert_eq!(events.next().await, Some(StreamEvent::fragment("a")));

        token.cancel();
        assert_eq!(events.next().await, None);
    }

    #[tokio::test]
    async fn body_error_surfaces_as_single_failed_event() {
        // Simulate an in-flight disconnect after one good chunk.
        let chunks: Vec<reqwest::Result<Bytes>> = vec![Ok(Bytes::from_static(
            b"data: {\"type\":\"fragment\",\"text\":\"MA(\"}\n\n",
        ))];
        let body = futures::stream::iter(chunks)
            .chain(futures::stream::once(async {
                Err(fake_reqwest_error().await)
            }))
            .boxed();

        let mut events = event_stream(body, CancellationToken::new());
        assert_eq!(events.next().await, Some(StreamEvent::fragment("MA(")));
        assert!(matches!(
            events.next().await,
            Some(StreamEvent::Failed { .. })
        ));
        assert_eq!(events.next().await, None);
    }

    async fn fake_reqwest_error() -> reqwest::Error {
        // Easiest portable way to synthesize a reqwest::Error: a request
        // against an unroutable URL with an immediate timeout.
        reqwest::Client::builder()
            .timeout(Duration::from_millis(1))
            .build()
            .unwrap()
            .get("http://127.0.0.1:1")
            .send()
            .await
            .unwrap_err()
    }
}
