//! Shared test helpers for chain tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ragchat_core::document::{Document, Retriever};
use ragchat_core::error::{ProviderError, RetrievalError};
use ragchat_core::message::Message;
use ragchat_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use tokio::sync::watch;

type Responder = Box<dyn Fn(&str) -> Result<String, ProviderError> + Send + Sync>;

/// A mock provider that answers every prompt through a closure and records
/// the prompts it saw.
pub struct ScriptedProvider {
    respond: Responder,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(respond: impl Fn(&str) -> Result<String, ProviderError> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Returns the rendered prompt unchanged.
    pub fn echo() -> Self {
        Self::new(|prompt| Ok(prompt.to_string()))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = prompt_of(&request);
        self.prompts.lock().unwrap().push(prompt.clone());
        (self.respond)(&prompt).map(make_text_response)
    }
}

/// Echo provider that sleeps before answering; the delay is picked from
/// the prompt so concurrent turns can be made to finish out of order.
pub struct DelayedProvider {
    delay_for: Box<dyn Fn(&str) -> Duration + Send + Sync>,
}

impl DelayedProvider {
    pub fn new(delay_for: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        Self {
            delay_for: Box::new(delay_for),
        }
    }
}

#[async_trait]
impl Provider for DelayedProvider {
    fn name(&self) -> &str {
        "delayed_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = prompt_of(&request);
        tokio::time::sleep((self.delay_for)(&prompt)).await;
        Ok(make_text_response(prompt))
    }
}

/// Echo provider that blocks every call until the gate is opened.
pub struct GatedProvider {
    gate: watch::Receiver<bool>,
}

impl GatedProvider {
    pub fn new() -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { gate: rx }, tx)
    }
}

#[async_trait]
impl Provider for GatedProvider {
    fn name(&self) -> &str {
        "gated_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut gate = self.gate.clone();
        gate.wait_for(|open| *open)
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(make_text_response(prompt_of(&request)))
    }
}

/// Returns a fixed document list and records each query.
pub struct RecordingRetriever {
    documents: Vec<Document>,
    queries: Mutex<Vec<String>>,
}

impl RecordingRetriever {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for RecordingRetriever {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.documents.clone())
    }
}

/// Always fails.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn retrieve(&self, _query: &str) -> Result<Vec<Document>, RetrievalError> {
        Err(RetrievalError::QueryFailed("index unavailable".into()))
    }
}

pub fn make_text_response(text: impl Into<String>) -> ProviderResponse {
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

fn prompt_of(request: &ProviderRequest) -> String {
    request
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
