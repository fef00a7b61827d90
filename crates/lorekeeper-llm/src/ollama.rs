//! Ollama Gateway Implementation
//!
//! Provides chat and embedding calls against a local Ollama server.
//!
//! # Features
//!
//! - Streamed chat responses aggregated into one string
//! - Single-vector embeddings via `/api/embed`
//! - Retry with exponential backoff on transport failures
//! - One generous deadline per call, shared by all retry attempts
//!
//! # Examples
//!
//! ```no_run
//! use lorekeeper_llm::OllamaGateway;
//! use lorekeeper_domain::{ChatMessage, ModelGateway};
//!
//! let gateway = OllamaGateway::default_endpoint().unwrap();
//! let reply = gateway.chat("llama3", &[ChatMessage::user("Say hello")]).unwrap();
//! println!("{}", reply);
//! ```

use crate::LlmError;
use lorekeeper_domain::{ChatMessage, ModelGateway};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default deadline for a single model call (2 minutes, for slow local inference)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts per call
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Connection settings for an Ollama server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL of the Ollama API
    pub endpoint: String,

    /// Deadline for one gateway call in seconds, covering every retry and
    /// backoff; the only cancellation mechanism
    pub timeout_secs: u64,

    /// Attempts per call before giving up on transport errors
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Ollama model gateway
///
/// Every call blocks the current thread until the server answers or the
/// timeout fires.
pub struct OllamaGateway {
    endpoint: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
    max_retries: u32,
}

/// Request body for `/api/chat`
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// One line of a streamed `/api/chat` response
#[derive(Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    message: Option<OllamaChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaChunkMessage {
    #[serde(default)]
    content: String,
}

/// Request body for `/api/embed`
#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response from `/api/embed`
#[derive(Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

impl OllamaGateway {
    /// Create a new gateway from connection settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Other` if the HTTP client cannot be built.
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
            timeout,
            max_retries: config.max_retries.max(1),
        })
    }

    /// Create a gateway for `http://localhost:11434` with default settings
    pub fn default_endpoint() -> Result<Self, LlmError> {
        Self::new(OllamaConfig::default())
    }

    /// Base URL this gateway talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a JSON body, retrying transport failures with exponential backoff
    ///
    /// Every attempt, and the body read that follows, gets only the time left
    /// before the call's deadline. No retry starts once its backoff would
    /// cross the deadline.
    fn post<B: Serialize>(
        &self,
        path: &str,
        model: &str,
        body: &B,
    ) -> Result<reqwest::blocking::Response, LlmError> {
        let url = format!("{}{}", self.endpoint, path);
        let deadline = Instant::now() + self.timeout;
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match self.client.post(&url).timeout(remaining).json(body).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(model.to_string()));
                    }
                    let error_text = response
                        .text()
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    last_error = Some(LlmError::Communication(format!(
                        "HTTP {}: {}",
                        status, error_text
                    )));
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                if delay >= deadline.saturating_duration_since(Instant::now()) {
                    warn!("{} failed, no time left to retry", path);
                    break;
                }
                warn!("{} failed, retrying in {:?}", path, delay);
                std::thread::sleep(delay);
            }
        }

        Err(last_error.unwrap_or_else(|| {
            LlmError::Communication(format!("No response within {:?}", self.timeout))
        }))
    }
}

/// Aggregate a newline-delimited chat stream into one string
///
/// Blank lines and lines that are not valid chunks are skipped. Reading stops
/// at the first chunk flagged `done`, or at end of stream. A line carrying an
/// `error` field fails the whole call.
pub fn read_chat_stream<R: BufRead>(reader: R) -> Result<String, LlmError> {
    let mut full_response = String::new();

    for line in reader.lines() {
        let line = line.map_err(|e| LlmError::Communication(format!("Stream read failed: {}", e)))?;
        if line.trim().is_empty() {
            continue;
        }

        let chunk: OllamaChatChunk = match serde_json::from_str(&line) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!("Skipping unparseable stream line: {}", e);
                continue;
            }
        };

        if let Some(error) = chunk.error {
            return Err(LlmError::Communication(format!("Ollama error: {}", error)));
        }

        if let Some(message) = chunk.message {
            full_response.push_str(&message.content);
        }

        if chunk.done {
            break;
        }
    }

    Ok(full_response)
}

impl ModelGateway for OllamaGateway {
    type Error = LlmError;

    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, Self::Error> {
        let request = OllamaChatRequest {
            model,
            messages: messages
                .iter()
                .map(|m| OllamaMessage {
                    role: &m.role,
                    content: &m.content,
                })
                .collect(),
            stream: true,
        };

        let response = self.post("/api/chat", model, &request)?;
        let text = read_chat_stream(std::io::BufReader::new(response))?;
        debug!("Chat response from {}: {} chars", model, text.len());
        Ok(text)
    }

    fn generate_embedding(&self, model: &str, text: &str) -> Result<Vec<f32>, Self::Error> {
        let request = OllamaEmbedRequest { model, input: text };

        let response = self.post("/api/embed", model, &request)?;
        let body: OllamaEmbedResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        body.embeddings
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyEmbedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_gateway_creation() {
        let gateway = OllamaGateway::new(OllamaConfig {
            endpoint: "http://localhost:11434/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(gateway.endpoint(), "http://localhost:11434");
        assert_eq!(gateway.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        let gateway = OllamaGateway::new(OllamaConfig {
            max_retries: 0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(gateway.max_retries, 1);
    }

    #[test]
    fn test_read_chat_stream_aggregates_until_done() {
        let stream = concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hello\"},\"done\":false}\n",
            "\n",
            "not json at all\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\", world\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"ignored\"},\"done\":false}\n",
        );

        let text = read_chat_stream(Cursor::new(stream)).unwrap();
        assert_eq!(text, "Hello, world");
    }

    #[test]
    fn test_read_chat_stream_error_line_fails() {
        let stream = "{\"error\":\"model 'llama9' not found\"}\n";
        let result = read_chat_stream(Cursor::new(stream));
        match result {
            Err(LlmError::Communication(message)) => assert!(message.contains("llama9")),
            other => panic!("unexpected result: {:?}", other),
        }

        let partial = concat!(
            "{\"message\":{\"content\":\"[1,\"},\"done\":false}\n",
            "{\"error\":\"out of memory\"}\n",
        );
        assert!(read_chat_stream(Cursor::new(partial)).is_err());
    }

    #[test]
    fn test_retries_stay_within_deadline() {
        let gateway = OllamaGateway::new(OllamaConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            max_retries: 3,
        })
        .unwrap();

        let started = Instant::now();
        let result = gateway.generate_embedding("nomic-embed-text", "test");

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_read_chat_stream_without_done_reads_to_end() {
        let stream = "{\"message\":{\"content\":\"[1,\"}}\n{\"message\":{\"content\":\"2]\"}}\n";
        let text = read_chat_stream(Cursor::new(stream)).unwrap();
        assert_eq!(text, "[1,2]");
    }

    #[test]
    fn test_error_handling() {
        let gateway = OllamaGateway::new(OllamaConfig {
            endpoint: "http://localhost:99999".to_string(),
            timeout_secs: 1,
            max_retries: 1,
        })
        .unwrap();

        let result = gateway.chat("llama3", &[ChatMessage::user("test")]);
        assert!(matches!(result, Err(LlmError::Communication(_))));

        let result = gateway.generate_embedding("nomic-embed-text", "test");
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }

    #[test]
    #[ignore] // Only run when Ollama is available
    fn test_ollama_chat_integration() {
        let gateway = OllamaGateway::default_endpoint().unwrap();
        let reply = gateway.chat("llama3", &[ChatMessage::user("Say 'hello' and nothing else")]);
        if let Ok(reply) = reply {
            assert!(!reply.is_empty());
        }
    }
}
