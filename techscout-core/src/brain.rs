//! Brain module: LLM provider abstraction and conversation handling.
//!
//! Defines the `LlmProvider` trait for model-agnostic completions and the
//! `Brain`, which owns retry and usage accounting and exposes the single
//! conversational call the orchestrators use.

use crate::error::LlmError;
use crate::retry::RetryPolicy;
use crate::types::{CompletionRequest, CompletionResponse, Message, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Trait for LLM providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// Conversational front-end over an [`LlmProvider`].
pub struct Brain {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    temperature: f32,
    max_tokens: Option<usize>,
    input_tokens: AtomicUsize,
    output_tokens: AtomicUsize,
    calls: AtomicUsize,
}

impl Brain {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            temperature: 0.75,
            max_tokens: None,
            input_tokens: AtomicUsize::new(0),
            output_tokens: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Send `prompt` after `history`, under `system_message`.
    ///
    /// Returns the reply text and the history extended with this exchange.
    /// The system message is never stored in the history. Transient provider
    /// errors are retried; anything left after that is returned to the caller.
    pub async fn respond(
        &self,
        prompt: &str,
        system_message: &str,
        history: &[Message],
    ) -> Result<(String, Vec<Message>), LlmError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system_message));
        messages.extend_from_slice(history);
        messages.push(Message::user(prompt));

        let request = CompletionRequest {
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            model: Some(self.provider.model_name().to_string()),
        };

        debug!(
            model = self.provider.model_name(),
            history_len = history.len(),
            prompt_len = prompt.len(),
            "Sending completion request"
        );

        let provider = Arc::clone(&self.provider);
        let response = self
            .retry
            .run("llm.complete", || {
                let provider = Arc::clone(&provider);
                let request = request.clone();
                async move { provider.complete(request).await }
            })
            .await?;

        self.track_usage(&response.usage);
        info!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "LLM response received"
        );

        let mut updated = history.to_vec();
        updated.push(Message::user(prompt));
        updated.push(Message::assistant(response.text.clone()));
        Ok((response.text, updated))
    }

    fn track_usage(&self, usage: &TokenUsage) {
        self.input_tokens
            .fetch_add(usage.input_tokens, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative token usage across all successful calls.
    pub fn total_usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

/// A mock LLM provider for testing.
///
/// Replies are served from a queue of responses and errors. When the queue is
/// empty a fixed text without any JSON block is returned. Every request is
/// recorded for inspection.
pub struct MockLlmProvider {
    model: String,
    replies: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that replies with each text in order.
    pub fn with_responses<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let provider = Self::new();
        for text in texts {
            provider.queue_response(text.as_ref());
        }
        provider
    }

    /// Queue a text reply for the next `complete` call.
    pub fn queue_response(&self, text: &str) {
        self.lock_replies().push_back(Ok(Self::text_response(text)));
    }

    /// Queue an error for the next `complete` call.
    pub fn queue_error(&self, error: LlmError) {
        self.lock_replies().push_back(Err(error));
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            text: text.to_string(),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("stop".to_string()),
        }
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        self.lock_replies().len()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<CompletionResponse, LlmError>>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        self.lock_replies().pop_front().unwrap_or_else(|| {
            Ok(MockLlmProvider::text_response(
                "I'm a mock LLM. No queued responses available.",
            ))
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
