//! NDJSON streaming response parser for Ollama's `/api/chat`.
//!
//! Reads the HTTP body as a byte stream, splits it on newlines (each line is
//! one JSON object), and yields the `message.content` fragment of every line
//! in arrival order until the server reports `done: true`.

use futures::stream::{self, BoxStream, Stream, StreamExt};

use super::errors::InferenceError;
use super::types::ChatResponseLine;

/// A lazily produced sequence of content fragments from one chat call.
pub type FragmentStream = BoxStream<'static, Result<String, InferenceError>>;

// ─── NDJSON line parser ──────────────────────────────────────────────────────

/// Parse raw NDJSON bytes into content fragments.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// characters split across network chunks are decoded intact. The stream
/// ends after the `done` line. A line carrying `error`, a transport error, or
/// a body that ends before `done` yields one `StreamError` and ends the stream.
pub fn parse_ndjson_stream<S, B, E>(byte_stream: S) -> impl Stream<Item = Result<String, InferenceError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let state = LineState::default();

    stream::unfold(
        (Box::pin(byte_stream.fuse()), state),
        |(mut byte_stream, mut state)| async move {
            loop {
                if state.finished {
                    return None;
                }

                // Drain complete lines already in the buffer
                if let Some(pos) = state.buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                    match state.process_line(&line) {
                        Ok(Some(fragment)) => return Some((Ok(fragment), (byte_stream, state))),
                        Ok(None) => continue,
                        Err(e) => {
                            state.finished = true;
                            return Some((Err(e), (byte_stream, state)));
                        }
                    }
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => state.buffer.extend_from_slice(bytes.as_ref()),
                    Some(Err(e)) => {
                        state.finished = true;
                        return Some((
                            Err(InferenceError::StreamError {
                                reason: format!("stream read error: {e}"),
                            }),
                            (byte_stream, state),
                        ));
                    }
                    None => {
                        // Body ended; the last line may lack its newline.
                        let rest = std::mem::take(&mut state.buffer);
                        if !rest.iter().all(u8::is_ascii_whitespace) {
                            match state.process_line(&rest) {
                                Ok(Some(fragment)) => {
                                    return Some((Ok(fragment), (byte_stream, state)))
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    state.finished = true;
                                    return Some((Err(e), (byte_stream, state)));
                                }
                            }
                        }
                        if state.finished {
                            return None;
                        }
                        state.finished = true;
                        tracing::warn!("chat stream closed before the done marker");
                        return Some((
                            Err(InferenceError::StreamError {
                                reason: "stream ended before generation completed".into(),
                            }),
                            (byte_stream, state),
                        ));
                    }
                }
            }
        },
    )
}

// ─── Line State ──────────────────────────────────────────────────────────────

/// Bytes not yet split into lines, plus whether `done` has been seen.
#[derive(Default)]
struct LineState {
    buffer: Vec<u8>,
    finished: bool,
}

impl LineState {
    /// Decode one NDJSON line. Returns the content fragment, if any.
    fn process_line(&mut self, raw: &[u8]) -> Result<Option<String>, InferenceError> {
        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let line: ChatResponseLine =
            serde_json::from_str(trimmed).map_err(|e| InferenceError::StreamError {
                reason: format!("failed to parse stream line: {e} (data: {trimmed})"),
            })?;

        if let Some(error) = line.error {
            return Err(InferenceError::StreamError { reason: error });
        }

        if line.done {
            self.finished = true;
            tracing::debug!(
                done_reason = line.done_reason.as_deref().unwrap_or("unknown"),
                eval_count = line.eval_count.unwrap_or(0),
                "chat stream done"
            );
        }

        Ok(line
            .message
            .map(|m| m.content)
            .filter(|content| !content.is_empty()))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&[u8]]) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> {
        let owned: Vec<Result<Vec<u8>, std::io::Error>> =
            parts.iter().map(|p| Ok(p.to_vec())).collect();
        stream::iter(owned)
    }

    async fn collect(
        s: impl Stream<Item = Result<String, InferenceError>>,
    ) -> Vec<Result<String, InferenceError>> {
        s.collect().await
    }

    #[tokio::test]
    async fn test_fragments_in_arrival_order() {
        let body: &[&[u8]] = &[
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"<thi\"},\"done\":false}\n",
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"nk>Hi\"},\"done\":false}\n",
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"done_reason\":\"stop\"}\n",
        ];
        let out = collect(parse_ndjson_stream(chunks(body))).await;
        let fragments: Vec<String> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(fragments, vec!["<thi", "nk>Hi"]);
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let body: &[&[u8]] = &[
            b"{\"message\":{\"content\":\"hel",
            b"lo\"},\"done\":false}\n{\"message\":{\"content\":\"\"},",
            b"\"done\":true}",
        ];
        let out = collect(parse_ndjson_stream(chunks(body))).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        let line = "{\"message\":{\"content\":\"caf\u{e9}\"},\"done\":true}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let out = collect(parse_ndjson_stream(chunks(&[&line[..split], &line[split..]]))).await;
        assert_eq!(out[0].as_ref().unwrap(), "café");
    }

    #[tokio::test]
    async fn test_error_line_ends_stream() {
        let body: &[&[u8]] = &[
            b"{\"message\":{\"content\":\"partial\"},\"done\":false}\n",
            b"{\"error\":\"model runner has unexpectedly stopped\"}\n",
            b"{\"message\":{\"content\":\"never seen\"},\"done\":false}\n",
        ];
        let out = collect(parse_ndjson_stream(chunks(body))).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), "partial");
        match &out[1] {
            Err(InferenceError::StreamError { reason }) => {
                assert!(reason.contains("unexpectedly stopped"))
            }
            other => panic!("expected stream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_body_ending_without_done_is_error() {
        let body: &[&[u8]] = &[b"{\"message\":{\"content\":\"cut\"},\"done\":false}\n"];
        let out = collect(parse_ndjson_stream(chunks(body))).await;
        assert_eq!(out.len(), 2);
        assert!(out[1].is_err());
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let items: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"{\"message\":{\"content\":\"a\"},\"done\":false}\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer")),
        ];
        let out = collect(parse_ndjson_stream(stream::iter(items))).await;
        assert_eq!(out.len(), 2);
        match &out[1] {
            Err(InferenceError::StreamError { reason }) => assert!(reason.contains("reset by peer")),
            other => panic!("expected stream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_line_is_error() {
        let body: &[&[u8]] = &[b"not json\n"];
        let out = collect(parse_ndjson_stream(chunks(body))).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].is_err());
    }
}
