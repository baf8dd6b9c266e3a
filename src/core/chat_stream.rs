use std::time::Duration;

use futures_util::StreamExt;
use memchr::memmem;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{QueryRequest, StreamEventPayload};
use crate::utils::url::construct_api_url;

/// One parsed unit of a streaming response. A stream produces any number of
/// `Chunk`s followed by exactly one terminal: either `End`, or `Error`
/// immediately followed by `End`.
#[derive(Clone, Debug)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

/// Events on the wire are separated by a blank line, SSE style.
const EVENT_BOUNDARY: &[u8] = b"\n\n";

fn extract_data_payload(event: &str) -> Option<&str> {
    event.strip_prefix("data:").map(str::trim_start)
}

/// Parse one complete event and forward the result. Returns `true` once a
/// terminal message has been sent and the stream should stop.
///
/// Malformed events are skipped, not fatal: one corrupt event must not
/// abort a conversation in progress.
fn handle_event(
    event: &str,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> bool {
    let event = event.trim();
    if event.is_empty() {
        return false;
    }

    let Some(payload) = extract_data_payload(event) else {
        warn!(stream_id, event, "skipping stream event without data prefix");
        return false;
    };

    match serde_json::from_str::<StreamEventPayload>(payload) {
        Ok(record) => match record.kind.as_str() {
            "content" => {
                let _ = tx.send((StreamMessage::Chunk(record.data), stream_id));
                false
            }
            "done" => {
                let _ = tx.send((StreamMessage::End, stream_id));
                true
            }
            "error" => {
                let _ = tx.send((StreamMessage::Error(record.data), stream_id));
                let _ = tx.send((StreamMessage::End, stream_id));
                true
            }
            other => {
                warn!(stream_id, kind = other, "skipping stream event of unknown type");
                false
            }
        },
        Err(e) => {
            warn!(stream_id, error = %e, "skipping malformed stream event");
            false
        }
    }
}

/// Parse every complete event in `buffer`, leaving partial trailing bytes
/// in place for the next read. Returns `true` once a terminal message has
/// been sent.
fn drain_events(
    buffer: &mut Vec<u8>,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> bool {
    while let Some(boundary_pos) = memmem::find(buffer, EVENT_BOUNDARY) {
        let event_ended = match std::str::from_utf8(&buffer[..boundary_pos]) {
            Ok(event) => handle_event(event, tx, stream_id),
            Err(e) => {
                warn!(stream_id, error = %e, "skipping stream event with invalid UTF-8");
                false
            }
        };
        buffer.drain(..boundary_pos + EVENT_BOUNDARY.len());
        if event_ended {
            return true;
        }
    }
    false
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub query: String,
    pub max_context_docs: u32,
    /// A stream that goes silent for this long is failed instead of being
    /// left open forever. `None` disables the guard.
    pub idle_timeout: Option<Duration>,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

/// Spawns one background task per streamed query and funnels parsed events
/// back over a single channel, tagged with the stream id so late messages
/// from a superseded stream can be ignored by the consumer.
#[derive(Clone)]
pub struct QueryStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl QueryStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                query,
                max_context_docs,
                idle_timeout,
                cancel_token,
                stream_id,
            } = params;

            let request = QueryRequest {
                query,
                max_context_docs,
            };

            tokio::select! {
                _ = async {
                    let stream_url = construct_api_url(&base_url, "query-stream");
                    debug!(stream_id, url = %stream_url, "opening query stream");

                    let response = match client
                        .post(stream_url)
                        .header("Content-Type", "application/json")
                        .json(&request)
                        .send()
                        .await
                    {
                        Ok(response) => response,
                        Err(e) => {
                            let _ = tx_clone.send((StreamMessage::Error(e.to_string()), stream_id));
                            let _ = tx_clone.send((StreamMessage::End, stream_id));
                            return;
                        }
                    };

                    if !response.status().is_success() {
                        let status = response.status();
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "<no body>".to_string());
                        let _ = tx_clone.send((
                            StreamMessage::Error(format!(
                                "request failed with status {status}: {error_text}"
                            )),
                            stream_id,
                        ));
                        let _ = tx_clone.send((StreamMessage::End, stream_id));
                        return;
                    }

                    let mut stream = response.bytes_stream();
                    let mut buffer: Vec<u8> = Vec::new();

                    loop {
                        let next = match idle_timeout {
                            Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                                Ok(item) => item,
                                Err(_) => {
                                    warn!(stream_id, "stream idle timeout elapsed");
                                    let _ = tx_clone.send((
                                        StreamMessage::Error(format!(
                                            "no response data received for {}s",
                                            limit.as_secs()
                                        )),
                                        stream_id,
                                    ));
                                    let _ = tx_clone.send((StreamMessage::End, stream_id));
                                    return;
                                }
                            },
                            None => stream.next().await,
                        };

                        let Some(chunk) = next else { break };

                        if cancel_token.is_cancelled() {
                            return;
                        }

                        match chunk {
                            Ok(chunk_bytes) => {
                                buffer.extend_from_slice(&chunk_bytes);
                                if drain_events(&mut buffer, &tx_clone, stream_id) {
                                    return;
                                }
                            }
                            Err(e) => {
                                let _ = tx_clone
                                    .send((StreamMessage::Error(e.to_string()), stream_id));
                                let _ = tx_clone.send((StreamMessage::End, stream_id));
                                return;
                            }
                        }
                    }

                    // Connection closed without a terminal event; finalize
                    // whatever content made it through.
                    debug!(stream_id, "stream closed without terminal event");
                    let _ = tx_clone.send((StreamMessage::End, stream_id));
                } => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}
