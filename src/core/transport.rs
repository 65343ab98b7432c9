//! Per-exchange HTTP transport task.
//!
//! One task is spawned per exchange. It POSTs the prompt payload, drives the
//! [`StreamDecoder`] over the raw response body, and forwards
//! `(ExchangeEvent, exchange_id)` pairs over an unbounded channel that the
//! chat loop drains. The whole body is wrapped in `tokio::select!` against
//! the exchange's cancellation token; the cancelled branch reports
//! [`ExchangeEvent::Interrupted`] so the controller performs the aborted
//! transition at its single application point.

use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::PromptRequest;
use crate::core::decoder::StreamDecoder;
use crate::utils::url::construct_api_url;

/// Longest body snippet quoted in a failure description.
const BODY_SNIPPET_MAX: usize = 240;

#[derive(Clone, Debug)]
pub enum ExchangeEvent {
    /// Decoded text to append to the pending assistant turn.
    Fragment(String),
    /// The cancellation token was observed; the exchange ends aborted.
    Interrupted,
    /// Transport, status, or decode failure with a readable description.
    Failed(String),
    /// The response body ended normally.
    Closed,
}

pub struct TransportParams {
    pub client: reqwest::Client,
    pub endpoint: String,
    pub api_key: String,
    pub payload: PromptRequest,
    pub cancel_token: CancellationToken,
    pub exchange_id: u64,
}

#[derive(Clone)]
pub struct TransportService {
    tx: mpsc::UnboundedSender<(ExchangeEvent, u64)>,
}

impl TransportService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(ExchangeEvent, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_call(&self, params: TransportParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let TransportParams {
                client,
                endpoint,
                api_key,
                payload,
                cancel_token,
                exchange_id,
            } = params;

            tracing::debug!(exchange_id, model = %payload.model, "opening exchange request");

            tokio::select! {
                _ = async {
                    let url = construct_api_url(&endpoint, "api/chat");
                    let mut request = client
                        .post(url)
                        .header("Content-Type", "application/json");
                    if !api_key.is_empty() {
                        request = request.bearer_auth(&api_key);
                    }

                    match request.json(&payload).send().await {
                        Ok(response) => {
                            let status = response.status();
                            if !status.is_success() {
                                let body = response.text().await.unwrap_or_default();
                                let _ = tx.send((
                                    ExchangeEvent::Failed(describe_status_failure(status, &body)),
                                    exchange_id,
                                ));
                                return;
                            }

                            let mut stream = response.bytes_stream();
                            let mut decoder = StreamDecoder::new();

                            while let Some(chunk) = stream.next().await {
                                if cancel_token.is_cancelled() {
                                    let _ = tx.send((ExchangeEvent::Interrupted, exchange_id));
                                    return;
                                }

                                match chunk {
                                    Ok(bytes) => match decoder.feed(&bytes) {
                                        Ok(text) => {
                                            if !text.is_empty() {
                                                let _ = tx.send((
                                                    ExchangeEvent::Fragment(text),
                                                    exchange_id,
                                                ));
                                            }
                                        }
                                        Err(err) => {
                                            let _ = tx.send((
                                                ExchangeEvent::Failed(format!(
                                                    "response stream failed: {err}"
                                                )),
                                                exchange_id,
                                            ));
                                            return;
                                        }
                                    },
                                    Err(err) => {
                                        let _ = tx.send((
                                            ExchangeEvent::Failed(format!(
                                                "response stream failed: {err}"
                                            )),
                                            exchange_id,
                                        ));
                                        return;
                                    }
                                }
                            }

                            match decoder.finish() {
                                Ok(()) => {
                                    let _ = tx.send((ExchangeEvent::Closed, exchange_id));
                                }
                                Err(err) => {
                                    let _ = tx.send((
                                        ExchangeEvent::Failed(format!(
                                            "response stream failed: {err}"
                                        )),
                                        exchange_id,
                                    ));
                                }
                            }
                        }
                        Err(err) => {
                            let _ = tx.send((
                                ExchangeEvent::Failed(format!("request failed: {err}")),
                                exchange_id,
                            ));
                        }
                    }
                } => {}
                _ = cancel_token.cancelled() => {
                    let _ = tx.send((ExchangeEvent::Interrupted, exchange_id));
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, event: ExchangeEvent, exchange_id: u64) {
        let _ = self.tx.send((event, exchange_id));
    }
}

/// Renders a non-success response as one readable line: the status, plus the
/// server's own message when the body carries one.
pub fn describe_status_failure(status: StatusCode, body: &str) -> String {
    match summarize_error_body(body) {
        Some(summary) => format!("request failed: {status} ({summary})"),
        None => format!("request failed: {status}"),
    }
}

/// Pulls a short human-readable message out of an error body: OpenAI-style
/// `{"error":{"message"}}`, bare `{"message"}`, FastAPI `{"detail"}`, or a
/// collapsed snippet of whatever else came back.
fn summarize_error_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let summary = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .or_else(|| {
                value.get("error").and_then(|v| match v {
                    serde_json::Value::String(s) => Some(s.clone()),
                    _ => None,
                })
            })
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str().map(str::to_owned))
            })
            .or_else(|| {
                value
                    .get("detail")
                    .and_then(|v| v.as_str().map(str::to_owned))
            });
        if let Some(summary) = summary {
            let collapsed = collapse_whitespace(&summary);
            if !collapsed.is_empty() {
                return Some(truncate_snippet(&collapsed));
            }
        }
    }

    Some(truncate_snippet(&collapse_whitespace(trimmed)))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_snippet(text: &str) -> String {
    if text.len() <= BODY_SNIPPET_MAX {
        return text.to_string();
    }
    let mut cut = BODY_SNIPPET_MAX;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &text[..cut])
}
