//! Deterministic mock provider
//!
//! Replies are resolved in this order:
//!
//! 1. the scripted queue (`push_*`), consumed front to back
//! 2. the first registered pattern contained in the last user message
//! 3. the default response

use crate::LlmError;
use async_trait::async_trait;
use covenant_domain::traits::LlmProvider;
use covenant_domain::{CompletionReply, CompletionRequest, ToolCall};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Scripted {
    Reply(CompletionReply),
    Error(String),
}

/// Mock LLM provider for deterministic testing
///
/// This provider returns pre-configured replies without making any network
/// calls, and records every request it receives.
///
/// # Examples
///
/// ```
/// use covenant_llm::MockProvider;
///
/// let provider = MockProvider::default();
/// provider.push_text("first");
/// provider.add_response("uptime", "99.9%");
/// assert_eq!(provider.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model: String,
    script: Arc<Mutex<VecDeque<Scripted>>>,
    responses: Arc<Mutex<Vec<(String, Scripted)>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model: "mock".to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Override the reported model name
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue a text reply
    pub fn push_text(&self, text: impl Into<String>) {
        self.push_reply(CompletionReply::text(text));
    }

    /// Queue a full reply
    pub fn push_reply(&self, reply: CompletionReply) {
        locked(&self.script).push_back(Scripted::Reply(reply));
    }

    /// Queue a reply requesting a single tool call
    pub fn push_tool_call(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) {
        self.push_reply(CompletionReply::with_tool_calls(vec![ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }]));
    }

    /// Queue a provider failure
    pub fn push_error(&self, message: impl Into<String>) {
        locked(&self.script).push_back(Scripted::Error(message.into()));
    }

    /// Reply with `response` whenever the last user message contains `pattern`
    pub fn add_response(&self, pattern: impl Into<String>, response: impl Into<String>) {
        locked(&self.responses).push((
            pattern.into(),
            Scripted::Reply(CompletionReply::text(response)),
        ));
    }

    /// Fail whenever the last user message contains `pattern`
    pub fn add_error(&self, pattern: impl Into<String>) {
        locked(&self.responses).push((pattern.into(), Scripted::Error("Mock error".to_string())));
    }

    /// Get the number of times complete was called
    pub fn call_count(&self) -> usize {
        locked(&self.requests).len()
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        locked(&self.requests).clone()
    }

    /// Number of scripted replies not yet consumed
    pub fn remaining_script(&self) -> usize {
        locked(&self.script).len()
    }

    /// Reset the call count and recorded requests
    pub fn reset_call_count(&self) {
        locked(&self.requests).clear();
    }

    fn resolve(&self, request: &CompletionRequest) -> Scripted {
        if let Some(next) = locked(&self.script).pop_front() {
            return next;
        }
        let prompt = request.last_user_content().unwrap_or_default();
        locked(&self.responses)
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, scripted)| scripted.clone())
            .unwrap_or_else(|| Scripted::Reply(CompletionReply::text(self.default_response.clone())))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    type Error = LlmError;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply, Self::Error> {
        let scripted = self.resolve(&request);
        locked(&self.requests).push(request);
        match scripted {
            Scripted::Reply(reply) => Ok(reply),
            Scripted::Error(message) => Err(LlmError::Other(message)),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
