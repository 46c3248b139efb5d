//! Scripted provider for tests in downstream crates.
//!
//! Enabled with the `test-util` feature.

use gitsage_core::error::ProviderError;
use gitsage_core::message::Message;
use gitsage_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

/// A mock provider that replays a sequence of scripted replies.
///
/// Each call to `complete` returns the next reply in the queue and records
/// the request it was given. Panics if more calls are made than replies
/// provided.
pub struct SequentialMockProvider {
    replies: Vec<Result<String, ProviderError>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call succeeds with the given texts, in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// A provider that answers exactly once.
    pub fn single_text(text: &str) -> Self {
        Self::texts(&[text])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        requests.push(request);

        match self.replies.get(index) {
            Some(Ok(text)) => Ok(make_text_response(text)),
            Some(Err(e)) => Err(e.clone()),
            None => panic!(
                "SequentialMockProvider: no more replies (call #{}, have {})",
                index,
                self.replies.len()
            ),
        }
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}
