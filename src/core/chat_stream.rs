//! Streaming completion driver.
//!
//! A [`CompletionService`] opens one streaming call and feeds
//! [`StreamMessage`]s into a channel. [`ReplyStream`] pulls from that
//! channel, hands each fragment to the caller in arrival order and commits
//! exactly one assistant message to the transcript when the stream ends.

use std::time::Duration;

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ChatMessage, ChatRequest, ChatResponse};
use crate::core::constants::ACCESSIBILITY_INSTRUCTION;
use crate::core::error::ChatError;
use crate::core::message::{Message, Role};
use crate::core::transcript::Transcript;
use crate::utils::auth::{add_auth_headers, ApiKey};
use crate::utils::url::completions_url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

/// Model settings for one request.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Give up when no data arrives for this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

/// The remote completion service seen from the driver.
pub trait CompletionService {
    /// Local credential check; must not touch the network.
    fn check_credentials(&self) -> Result<(), ChatError>;

    /// Start the call. Every stream ends with `End`, possibly preceded by
    /// one `Error`, unless `cancel_token` fires first.
    fn open_stream(
        &self,
        request: ChatRequest,
        cancel_token: CancellationToken,
    ) -> mpsc::UnboundedReceiver<StreamMessage>;
}

fn is_accessibility_instruction(message: &Message) -> bool {
    !message.visible
        && message.role == Role::System
        && message.text() == ACCESSIBILITY_INSTRUCTION
}

/// Build the outbound payload from a transcript snapshot.
///
/// The hidden accessibility instruction is added here rather than stored,
/// and only when the snapshot does not already carry it.
pub fn build_chat_request(history: &[Message], params: &CompletionParams) -> ChatRequest {
    let mut messages: Vec<ChatMessage> = history.iter().map(ChatMessage::from).collect();
    if !history.iter().any(is_accessibility_instruction) {
        messages.push(ChatMessage::from(&Message::hidden_system(
            ACCESSIBILITY_INSTRUCTION,
        )));
    }

    ChatRequest {
        model: params.model.clone(),
        messages,
        temperature: params.temperature,
        max_tokens: params.max_tokens,
        stream: true,
    }
}

/// Validate credentials, open the call and return the fragment stream.
///
/// Must be called from within a tokio runtime.
pub fn start_reply<'a, S: CompletionService + ?Sized>(
    transcript: &'a mut Transcript,
    service: &S,
    params: &CompletionParams,
) -> Result<ReplyStream<'a>, ChatError> {
    service.check_credentials()?;

    let request = build_chat_request(transcript.snapshot(), params);
    debug!(
        model = %request.model,
        messages = request.messages.len(),
        temperature = request.temperature,
        max_tokens = request.max_tokens,
        "Opening completion stream"
    );

    let cancel_token = CancellationToken::new();
    let rx = service.open_stream(request, cancel_token.clone());
    Ok(ReplyStream {
        transcript,
        rx,
        cancel_token,
        idle_timeout: params.idle_timeout,
        response: String::new(),
        fragments: 0,
        finished: false,
    })
}

/// In-flight assistant reply. Lazy, finite and single-pass.
///
/// Dropping it before the end cancels the call and commits nothing.
pub struct ReplyStream<'a> {
    transcript: &'a mut Transcript,
    rx: mpsc::UnboundedReceiver<StreamMessage>,
    cancel_token: CancellationToken,
    idle_timeout: Option<Duration>,
    response: String,
    fragments: usize,
    finished: bool,
}

impl<'a> ReplyStream<'a> {
    /// Wait for the next fragment.
    ///
    /// `Ok(Some(text))` borrows the newly received text. `Ok(None)` means the
    /// stream ended and the assistant message has been appended. After an
    /// error or the end, further calls return `Ok(None)`.
    pub async fn next_fragment(&mut self) -> Result<Option<&str>, ChatError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let received = match self.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, self.rx.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        self.cancel_token.cancel();
                        let reason = format!("no data received for {} s", limit.as_secs_f32());
                        return Err(self.fail(reason));
                    }
                },
                None => self.rx.recv().await,
            };

            match received {
                Some(StreamMessage::Chunk(text)) => {
                    if text.is_empty() {
                        continue;
                    }
                    let start = self.response.len();
                    self.response.push_str(&text);
                    self.fragments += 1;
                    return Ok(Some(&self.response[start..]));
                }
                Some(StreamMessage::Error(reason)) => return Err(self.fail(reason)),
                Some(StreamMessage::End) => {
                    self.commit(false);
                    return Ok(None);
                }
                None => {
                    if self.cancel_token.is_cancelled() {
                        self.finished = true;
                        return Err(ChatError::Cancelled);
                    }
                    let reason = "connection closed before the reply finished".to_string();
                    return Err(self.fail(reason));
                }
            }
        }
    }

    /// Drive the stream to its end, passing each fragment to `on_fragment`.
    /// Returns the full reply text.
    pub async fn collect_with<F>(mut self, mut on_fragment: F) -> Result<String, ChatError>
    where
        F: FnMut(&str),
    {
        while let Some(fragment) = self.next_fragment().await? {
            on_fragment(fragment);
        }
        Ok(self
            .transcript
            .last()
            .filter(|message| message.is_assistant())
            .map(Message::text)
            .unwrap_or_default())
    }

    /// Abandon the call without appending anything.
    pub fn cancel(mut self) {
        self.abandon();
    }

    /// Text received so far.
    pub fn received(&self) -> &str {
        &self.response
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    fn abandon(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.cancel_token.cancel();
        info!(
            fragments = self.fragments,
            "Completion stream abandoned; partial reply discarded"
        );
    }

    fn fail(&mut self, reason: String) -> ChatError {
        self.cancel_token.cancel();
        if self.fragments == 0 {
            self.finished = true;
            warn!(%reason, "Completion request failed before any data arrived");
            return ChatError::RemoteCallFailed(reason);
        }

        warn!(
            %reason,
            fragments = self.fragments,
            "Completion stream interrupted; keeping partial reply"
        );
        let received = self.fragments;
        self.commit(true);
        ChatError::StreamInterrupted { reason, received }
    }

    fn commit(&mut self, truncated: bool) {
        self.finished = true;
        let text = std::mem::take(&mut self.response);
        debug!(
            fragments = self.fragments,
            bytes = text.len(),
            truncated,
            "Committing assistant reply"
        );
        let mut message = Message::assistant_text(text);
        message.truncated = truncated;
        self.transcript.append(message);
    }
}

impl Drop for ReplyStream<'_> {
    fn drop(&mut self) {
        self.abandon();
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// What one SSE line meant for the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    Continue,
    /// A choice carried `finish_reason`; `[DONE]` may still follow.
    Finished,
    /// `[DONE]` or an error payload. Nothing more is read.
    Closed,
}

fn handle_data_payload(payload: &str, tx: &mpsc::UnboundedSender<StreamMessage>) -> LineOutcome {
    if payload == "[DONE]" {
        let _ = tx.send(StreamMessage::End);
        return LineOutcome::Closed;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => {
            let Some(choice) = response.choices.into_iter().next() else {
                return LineOutcome::Continue;
            };
            if let Some(content) = choice.delta.content {
                if !content.is_empty() {
                    let _ = tx.send(StreamMessage::Chunk(content));
                }
            }
            match choice.finish_reason {
                Some(reason) => {
                    debug!(finish_reason = %reason, "Model finished its reply");
                    LineOutcome::Finished
                }
                None => LineOutcome::Continue,
            }
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return LineOutcome::Continue;
            }

            let _ = tx.send(StreamMessage::Error(format_api_error(payload)));
            let _ = tx.send(StreamMessage::End);
            LineOutcome::Closed
        }
    }
}

fn process_sse_line(line: &str, tx: &mpsc::UnboundedSender<StreamMessage>) -> LineOutcome {
    extract_data_payload(line)
        .map(|payload| handle_data_payload(payload, tx))
        .unwrap_or(LineOutcome::Continue)
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Render a remote error body for display.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error: <empty response>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            return match extract_error_summary(&json_value).filter(|s| !s.is_empty()) {
                Some(summary) => format!("API Error: {summary}\n```json\n{pretty_json}\n```"),
                None => format!("API Error:\n```json\n{pretty_json}\n```"),
            };
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{trimmed}\n```")
    } else {
        format!("API Error:\n```\n{trimmed}\n```")
    }
}

/// Streams completions from an OpenAI-compatible HTTP endpoint.
#[derive(Clone)]
pub struct HttpCompletionService {
    client: reqwest::Client,
    base_url: String,
    credential: Result<ApiKey, ChatError>,
}

impl HttpCompletionService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: &str) -> Self {
        let base_url = base_url.into();
        let credential = ApiKey::parse(api_key, &base_url);
        Self {
            client,
            base_url,
            credential,
        }
    }
}

impl CompletionService for HttpCompletionService {
    fn check_credentials(&self) -> Result<(), ChatError> {
        self.credential.as_ref().map(|_| ()).map_err(Clone::clone)
    }

    fn open_stream(
        &self,
        request: ChatRequest,
        cancel_token: CancellationToken,
    ) -> mpsc::UnboundedReceiver<StreamMessage> {
        let (tx, rx) = mpsc::unbounded_channel();

        let api_key = match &self.credential {
            Ok(key) => key.clone(),
            Err(err) => {
                let _ = tx.send(StreamMessage::Error(err.to_string()));
                let _ = tx.send(StreamMessage::End);
                return rx;
            }
        };
        let client = self.client.clone();
        let chat_url = completions_url(&self.base_url);

        tokio::spawn(async move {
            tokio::select! {
                _ = stream_completion(client, chat_url, api_key, request, &tx) => {}
                _ = cancel_token.cancelled() => {
                    debug!("Completion stream cancelled");
                }
            }
        });

        rx
    }
}

async fn stream_completion(
    client: reqwest::Client,
    chat_url: String,
    api_key: ApiKey,
    request: ChatRequest,
    tx: &mpsc::UnboundedSender<StreamMessage>,
) {
    let http_request = client
        .post(chat_url)
        .header("Content-Type", "application/json");
    let http_request = add_auth_headers(http_request, &api_key);

    let response = match http_request.json(&request).send().await {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send(StreamMessage::Error(format_api_error(&e.to_string())));
            let _ = tx.send(StreamMessage::End);
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| format!("HTTP {status} with no body"));
        let _ = tx.send(StreamMessage::Error(format_api_error(&error_text)));
        let _ = tx.send(StreamMessage::End);
        return;
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut finished = false;

    while let Some(chunk) = stream.next().await {
        let chunk_bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx.send(StreamMessage::Error(format!("stream error: {e}")));
                let _ = tx.send(StreamMessage::End);
                return;
            }
        };
        buffer.extend_from_slice(&chunk_bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let outcome = match std::str::from_utf8(&buffer[..newline_pos]) {
                Ok(line) => process_sse_line(line.trim(), tx),
                Err(e) => {
                    warn!(error = %e, "Skipping invalid UTF-8 line in stream");
                    LineOutcome::Continue
                }
            };
            buffer.drain(..=newline_pos);
            match outcome {
                LineOutcome::Closed => return,
                LineOutcome::Finished => finished = true,
                LineOutcome::Continue => {}
            }
        }
    }

    if let Ok(rest) = std::str::from_utf8(&buffer) {
        match process_sse_line(rest.trim(), tx) {
            LineOutcome::Closed => return,
            LineOutcome::Finished => finished = true,
            LineOutcome::Continue => {}
        }
    }
    if !finished {
        warn!("Completion stream closed before [DONE]");
        let _ = tx.send(StreamMessage::Error(
            "connection closed before end of stream".to_string(),
        ));
    }
    let _ = tx.send(StreamMessage::End);
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// Replays a fixed script instead of calling the network.
    #[derive(Default)]
    pub struct ScriptedService {
        pub script: Vec<StreamMessage>,
        pub credential_error: Option<ChatError>,
        /// Keep the channel open after the script, simulating a stalled server.
        pub hang: bool,
        pub requests: Mutex<Vec<ChatRequest>>,
        pub tokens: Mutex<Vec<CancellationToken>>,
        pub senders: Mutex<Vec<mpsc::UnboundedSender<StreamMessage>>>,
    }

    impl ScriptedService {
        pub fn new(script: Vec<StreamMessage>) -> Self {
            Self {
                script,
                ..Self::default()
            }
        }

        pub fn fragments(fragments: &[&str]) -> Self {
            let mut script: Vec<StreamMessage> = fragments
                .iter()
                .map(|f| StreamMessage::Chunk(f.to_string()))
                .collect();
            script.push(StreamMessage::End);
            Self::new(script)
        }

        pub fn last_request(&self) -> Option<ChatRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    impl CompletionService for ScriptedService {
        fn check_credentials(&self) -> Result<(), ChatError> {
            match &self.credential_error {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }

        fn open_stream(
            &self,
            request: ChatRequest,
            cancel_token: CancellationToken,
        ) -> mpsc::UnboundedReceiver<StreamMessage> {
            self.requests.lock().unwrap().push(request);
            self.tokens.lock().unwrap().push(cancel_token);
            let (tx, rx) = mpsc::unbounded_channel();
            for message in &self.script {
                let _ = tx.send(message.clone());
            }
            if self.hang {
                self.senders.lock().unwrap().push(tx);
            }
            rx
        }
    }
}
