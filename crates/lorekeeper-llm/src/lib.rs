//! Lorekeeper Model Gateway Layer
//!
//! Implementations of the `ModelGateway` trait from `lorekeeper-domain`.
//!
//! # Gateways
//!
//! - `MockGateway`: Deterministic scripted gateway for testing
//! - `OllamaGateway`: Local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use lorekeeper_llm::MockGateway;
//! use lorekeeper_domain::{ChatMessage, ModelGateway};
//!
//! let gateway = MockGateway::new("Hello from the model!");
//! let reply = gateway.chat("any-model", &[ChatMessage::user("hi")]).unwrap();
//! assert_eq!(reply, "Hello from the model!");
//! ```

#![warn(missing_docs)]

pub mod ollama;

use lorekeeper_domain::{ChatMessage, ModelGateway};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use ollama::{OllamaConfig, OllamaGateway};

/// Errors that can occur during model operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the model server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The provider answered an embedding request with no vectors
    #[error("No embeddings returned")]
    EmptyEmbedding,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Scripted reply for prompts containing a marker
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error,
}

#[derive(Debug, Default)]
struct MockState {
    chat_rules: Vec<(String, MockReply)>,
    embed_failures: Vec<String>,
    chat_calls: usize,
    embed_calls: usize,
}

/// Mock gateway for deterministic testing
///
/// Chat replies are chosen by the first registered marker found in the last
/// message of the conversation, falling back to a default reply. Embeddings
/// are hash-based: the same text always yields the same unit vector.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the pipeline owns another.
///
/// # Examples
///
/// ```
/// use lorekeeper_llm::MockGateway;
/// use lorekeeper_domain::{ChatMessage, ModelGateway};
///
/// let mut gateway = MockGateway::new("[]");
/// gateway.add_response("entities", r#"[{"name": "Aria"}]"#);
/// gateway.add_chat_error("timeline");
///
/// let reply = gateway.chat("m", &[ChatMessage::user("Extract all entities")]).unwrap();
/// assert!(reply.contains("Aria"));
/// assert!(gateway.chat("m", &[ChatMessage::user("Build a timeline")]).is_err());
/// assert_eq!(gateway.chat("m", &[ChatMessage::user("other")]).unwrap(), "[]");
/// assert_eq!(gateway.chat_calls(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockGateway {
    default_response: String,
    dimension: usize,
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    /// Create a mock that answers every chat with a fixed response
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            dimension: 8,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Set the embedding dimension (default 8)
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Reply with `response` when the prompt contains `marker`
    pub fn add_response(&mut self, marker: impl Into<String>, response: impl Into<String>) {
        self.lock()
            .chat_rules
            .push((marker.into(), MockReply::Text(response.into())));
    }

    /// Fail the chat call when the prompt contains `marker`
    pub fn add_chat_error(&mut self, marker: impl Into<String>) {
        self.lock().chat_rules.push((marker.into(), MockReply::Error));
    }

    /// Fail embedding requests for texts containing `marker`
    pub fn add_embedding_error(&mut self, marker: impl Into<String>) {
        self.lock().embed_failures.push(marker.into());
    }

    /// Number of chat calls made so far
    pub fn chat_calls(&self) -> usize {
        self.lock().chat_calls
    }

    /// Number of embedding calls made so far
    pub fn embed_calls(&self) -> usize {
        self.lock().embed_calls
    }

    /// Total number of gateway calls made so far
    pub fn call_count(&self) -> usize {
        let state = self.lock();
        state.chat_calls + state.embed_calls
    }

    /// Reset both call counters
    pub fn reset_call_count(&self) {
        let mut state = self.lock();
        state.chat_calls = 0;
        state.embed_calls = 0;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked mid-call
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Hash text with a seed to get a deterministic value in [-1, 1]
    fn hash_with_seed(text: &str, seed: u64) -> f32 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        seed.hash(&mut hasher);
        let normalized = (hasher.finish() as f64 / u64::MAX as f64) * 2.0 - 1.0;
        normalized as f32
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl ModelGateway for MockGateway {
    type Error = LlmError;

    fn chat(&self, _model: &str, messages: &[ChatMessage]) -> Result<String, Self::Error> {
        let mut state = self.lock();
        state.chat_calls += 1;

        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let reply = state
            .chat_rules
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Error) => Err(LlmError::Other("Mock error".to_string())),
            None => Ok(self.default_response.clone()),
        }
    }

    fn generate_embedding(&self, _model: &str, text: &str) -> Result<Vec<f32>, Self::Error> {
        let mut state = self.lock();
        state.embed_calls += 1;

        if state.embed_failures.iter().any(|m| text.contains(m.as_str())) {
            return Err(LlmError::Communication("Mock embedding failure".to_string()));
        }
        if text.is_empty() {
            return Err(LlmError::EmptyEmbedding);
        }

        let mut embedding: Vec<f32> = (0..self.dimension)
            .map(|i| Self::hash_with_seed(text, i as u64))
            .collect();

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(gateway: &MockGateway, prompt: &str) -> Result<String, LlmError> {
        gateway.chat("test-model", &[ChatMessage::user(prompt)])
    }

    #[test]
    fn test_mock_gateway_default() {
        let gateway = MockGateway::new("Test response");
        assert_eq!(ask(&gateway, "any prompt").unwrap(), "Test response");
    }

    #[test]
    fn test_mock_gateway_first_matching_marker_wins() {
        let mut gateway = MockGateway::default();
        gateway.add_response("hello", "world");
        gateway.add_response("hello there", "never reached");

        assert_eq!(ask(&gateway, "well hello there").unwrap(), "world");
        assert_eq!(ask(&gateway, "unknown").unwrap(), "Default mock response");
    }

    #[test]
    fn test_mock_gateway_call_counts() {
        let gateway = MockGateway::new("test");
        assert_eq!(gateway.call_count(), 0);

        ask(&gateway, "prompt").unwrap();
        gateway.generate_embedding("embed", "text").unwrap();
        assert_eq!(gateway.chat_calls(), 1);
        assert_eq!(gateway.embed_calls(), 1);
        assert_eq!(gateway.call_count(), 2);

        gateway.reset_call_count();
        assert_eq!(gateway.call_count(), 0);
    }

    #[test]
    fn test_mock_gateway_errors() {
        let mut gateway = MockGateway::default();
        gateway.add_chat_error("bad prompt");
        gateway.add_embedding_error("poison");

        assert!(matches!(ask(&gateway, "a bad prompt"), Err(LlmError::Other(_))));
        assert!(gateway.generate_embedding("m", "poison pill").is_err());
        assert!(gateway.generate_embedding("m", "fine").is_ok());
    }

    #[test]
    fn test_mock_embeddings_are_deterministic_unit_vectors() {
        let gateway = MockGateway::default().with_dimension(16);
        let a = gateway.generate_embedding("m", "The sky is blue").unwrap();
        let b = gateway.generate_embedding("m", "The sky is blue").unwrap();
        let c = gateway.generate_embedding("m", "The grass is green").unwrap();

        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let magnitude: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_mock_gateway_clone_shares_state() {
        let gateway1 = MockGateway::new("test");
        let gateway2 = gateway1.clone();

        ask(&gateway1, "test").unwrap();
        assert_eq!(gateway1.call_count(), 1);
        assert_eq!(gateway2.call_count(), 1);
    }
}
