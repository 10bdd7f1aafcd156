use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use emberchat_core::{ChatBackend, ChatError, ChatRequest, ChatResponse, DeltaStream};

/// Ollama local LLM backend.
///
/// One handle is constructed at startup and shared; `reqwest::Client` pools
/// connections internally.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "http://localhost:11434".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    async fn dispatch(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ChatError> {
        let body = OllamaChatRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream,
            keep_alive: request.keep_alive,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        debug!(model = %request.model, stream, "Sending request to Ollama");

        let response = self
            .client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::BackendUnreachable(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    ChatError::BackendUnreachable(format!("connection failed: {e}"))
                } else {
                    ChatError::BackendUnreachable(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::BackendUnreachable(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        Ok(response)
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    keep_alive: i64,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    eval_count: Option<u64>,
    prompt_eval_count: Option<u64>,
}

/// One NDJSON object from a streamed `/api/chat` response.
#[derive(Deserialize)]
struct OllamaStreamChunk {
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let start = Instant::now();
        let response = self.dispatch(request, false).await?;

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::BackendProtocol(format!("failed to parse response: {e}")))?;

        let tokens_used =
            chat_response.eval_count.unwrap_or(0) + chat_response.prompt_eval_count.unwrap_or(0);

        Ok(ChatResponse {
            content: chat_response.message.content,
            model: request.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream, ChatError> {
        let response = self.dispatch(request, true).await?;

        let byte_stream = response.bytes_stream().map(|result| {
            result.map_err(|e| ChatError::BackendUnreachable(format!("stream error: {e}")))
        });

        Ok(Box::pin(decode_ndjson(byte_stream)))
    }
}

/// Decode a byte stream of newline-delimited JSON chunks into content deltas.
///
/// Byte chunks may split a JSON line (or a multibyte character) arbitrarily;
/// lines are only parsed once their terminating newline has arrived. The
/// stream ends at the `done: true` object or on stream closure; a parse
/// failure or backend-reported error terminates it with one `Err` item.
fn decode_ndjson<S>(byte_stream: S) -> impl Stream<Item = Result<String, ChatError>>
where
    S: Stream<Item = Result<Bytes, ChatError>> + Unpin + Send + 'static,
{
    stream::unfold(
        (byte_stream, Vec::new(), false),
        |(mut byte_stream, mut buffer, finished)| async move {
            if finished {
                return None;
            }
            loop {
                while let Some(line) = extract_line(&mut buffer) {
                    match parse_line(&line) {
                        None => continue,
                        Some(Ok(delta)) => {
                            if delta.done {
                                return None;
                            }
                            if delta.content.is_empty() {
                                continue;
                            }
                            return Some((Ok(delta.content), (byte_stream, buffer, false)));
                        }
                        Some(Err(e)) => return Some((Err(e), (byte_stream, buffer, true))),
                    }
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => return Some((Err(e), (byte_stream, buffer, true))),
                    None => {
                        // Stream closed; a residual complete object without a
                        // trailing newline is still honored.
                        if buffer.iter().all(|b| b.is_ascii_whitespace()) {
                            return None;
                        }
                        let line = std::mem::take(&mut buffer);
                        return match parse_line(&line) {
                            None => None,
                            Some(Ok(delta)) if delta.done || delta.content.is_empty() => None,
                            Some(Ok(delta)) => {
                                Some((Ok(delta.content), (byte_stream, buffer, true)))
                            }
                            Some(Err(e)) => Some((Err(e), (byte_stream, buffer, true))),
                        };
                    }
                }
            }
        },
    )
}

#[derive(Debug)]
struct StreamDelta {
    content: String,
    done: bool,
}

/// Split one newline-terminated line off the front of the buffer.
fn extract_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop();
    Some(line)
}

/// Parse one NDJSON line. Returns `None` for blank lines.
fn parse_line(line: &[u8]) -> Option<Result<StreamDelta, ChatError>> {
    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return None;
    }
    let chunk: OllamaStreamChunk = match serde_json::from_slice(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            return Some(Err(ChatError::BackendProtocol(format!(
                "malformed stream frame: {e}"
            ))));
        }
    };
    if let Some(error) = chunk.error {
        return Some(Err(ChatError::BackendUnreachable(format!(
            "backend reported error: {error}"
        ))));
    }
    Some(Ok(StreamDelta {
        content: chunk.message.map(|m| m.content).unwrap_or_default(),
        done: chunk.done,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, ChatError>> + Unpin + use<> {
        let owned: Vec<Result<Bytes, ChatError>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        stream::iter(owned)
    }

    async fn collect(parts: &[&str]) -> Vec<Result<String, ChatError>> {
        decode_ndjson(chunks(parts)).collect().await
    }

    #[test]
    fn test_extract_line_waits_for_newline() {
        let mut buffer = b"partial".to_vec();
        assert!(extract_line(&mut buffer).is_none());
        buffer.extend_from_slice(b" line\nrest");
        assert_eq!(extract_line(&mut buffer).unwrap(), b"partial line");
        assert_eq!(buffer, b"rest");
    }

    #[test]
    fn test_parse_line_content_and_done() {
        let delta = parse_line(br#"{"message":{"role":"assistant","content":"He"},"done":false}"#)
            .unwrap()
            .unwrap();
        assert_eq!(delta.content, "He");
        assert!(!delta.done);

        let delta = parse_line(br#"{"message":{"role":"assistant","content":""},"done":true}"#)
            .unwrap()
            .unwrap();
        assert!(delta.done);
    }

    #[test]
    fn test_parse_line_backend_error() {
        let err = parse_line(br#"{"error":"model not found"}"#).unwrap().unwrap_err();
        assert!(matches!(err, ChatError::BackendUnreachable(_)));
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn test_parse_line_malformed_is_protocol_error() {
        let err = parse_line(b"{not json").unwrap().unwrap_err();
        assert!(matches!(err, ChatError::BackendProtocol(_)));
    }

    #[tokio::test]
    async fn test_decode_whole_lines() {
        let deltas = collect(&[
            "{\"message\":{\"role\":\"assistant\",\"content\":\"He\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"llo\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        ])
        .await;
        let texts: Vec<String> = deltas.into_iter().map(|d| d.unwrap()).collect();
        assert_eq!(texts, vec!["He", "llo"]);
    }

    #[tokio::test]
    async fn test_decode_line_split_across_chunks() {
        let deltas = collect(&[
            "{\"message\":{\"role\":\"assista",
            "nt\",\"content\":\"Hi\"},\"done\":false}\n{\"done\"",
            ":true}\n",
        ])
        .await;
        let texts: Vec<String> = deltas.into_iter().map(|d| d.unwrap()).collect();
        assert_eq!(texts, vec!["Hi"]);
    }

    #[tokio::test]
    async fn test_decode_stops_after_done() {
        let deltas = collect(&[
            "{\"done\":true}\n{\"message\":{\"role\":\"assistant\",\"content\":\"late\"},\"done\":false}\n",
        ])
        .await;
        assert!(deltas.is_empty());
    }

    #[tokio::test]
    async fn test_decode_malformed_frame_terminates_with_error() {
        let deltas = collect(&[
            "{\"message\":{\"role\":\"assistant\",\"content\":\"ok\"},\"done\":false}\n",
            "garbage\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"never\"},\"done\":false}\n",
        ])
        .await;
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].as_ref().unwrap(), "ok");
        assert!(matches!(deltas[1], Err(ChatError::BackendProtocol(_))));
    }

    #[tokio::test]
    async fn test_decode_eof_without_done_marker() {
        let deltas = collect(&[
            "{\"message\":{\"role\":\"assistant\",\"content\":\"tail\"},\"done\":false}",
        ])
        .await;
        let texts: Vec<String> = deltas.into_iter().map(|d| d.unwrap()).collect();
        assert_eq!(texts, vec!["tail"]);
    }
}
