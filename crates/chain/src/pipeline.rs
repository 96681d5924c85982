//! Explicit async stage composition.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s run one after another
//! over a [`ChainState`] of named string values. Each stage reads what it
//! needs from the state and writes exactly one value under its output key.
//! The awaits inside each stage are the only suspension points.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ragchat_core::document::{DocumentCombiner, Retriever};
use ragchat_core::prompt::PromptTemplate;
use ragchat_core::provider::{Provider, ProviderRequest};
use tracing::debug;

use crate::error::ChainError;

/// Named values threaded through a pipeline run.
pub type ChainState = BTreeMap<String, String>;

/// One step of a pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Key the stage's result is stored under.
    fn output_key(&self) -> &str;

    async fn run(&self, state: &ChainState) -> Result<String, ragchat_core::Error>;
}

/// Ordered stages executed by an explicit loop.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn then(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order, stopping at the first failure.
    pub async fn run(&self, mut state: ChainState) -> Result<ChainState, ChainError> {
        for stage in &self.stages {
            debug!(stage = stage.name(), "Running stage");
            let value = stage.run(&state).await.map_err(|source| ChainError::Stage {
                stage: stage.name().to_string(),
                source,
            })?;
            state.insert(stage.output_key().to_string(), value);
        }
        Ok(state)
    }
}

/// Render a template from state, send it to the model, keep the text.
pub struct PromptStage {
    name: String,
    template: PromptTemplate,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    output_key: String,
}

impl PromptStage {
    pub fn new(
        name: impl Into<String>,
        template: PromptTemplate,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        output_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            template,
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            output_key: output_key.into(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }
}

#[async_trait]
impl Stage for PromptStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_key(&self) -> &str {
        &self.output_key
    }

    async fn run(&self, state: &ChainState) -> Result<String, ragchat_core::Error> {
        // Only the declared variables are handed over; the template is strict.
        let values: BTreeMap<String, String> = self
            .template
            .variables()
            .iter()
            .filter_map(|var| state.get(var).map(|v| (var.clone(), v.clone())))
            .collect();
        let prompt = self.template.render(&values)?;

        let mut request = ProviderRequest::prompt(&self.model, prompt).with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.provider.complete(request).await?;
        Ok(response.message.content.trim().to_string())
    }
}

/// Look up documents for a state value and combine them into one string.
pub struct RetrievalStage {
    retriever: Arc<dyn Retriever>,
    combiner: Arc<dyn DocumentCombiner>,
    input_key: String,
    output_key: String,
}

impl RetrievalStage {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        combiner: Arc<dyn DocumentCombiner>,
        input_key: impl Into<String>,
        output_key: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            combiner,
            input_key: input_key.into(),
            output_key: output_key.into(),
        }
    }
}

#[async_trait]
impl Stage for RetrievalStage {
    fn name(&self) -> &str {
        "retrieval"
    }

    fn output_key(&self) -> &str {
        &self.output_key
    }

    async fn run(&self, state: &ChainState) -> Result<String, ragchat_core::Error> {
        let query = state.get(&self.input_key).ok_or_else(|| {
            ragchat_core::Error::Internal(format!("no '{}' value to retrieve with", self.input_key))
        })?;

        let documents = self.retriever.retrieve(query).await?;
        debug!(
            retriever = self.retriever.name(),
            documents = documents.len(),
            "Documents retrieved"
        );
        Ok(self.combiner.combine(&documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use ragchat_core::document::{Document, JoinCombiner};
    use ragchat_core::error::PromptError;

    struct Upper;

    #[async_trait]
    impl Stage for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn output_key(&self) -> &str {
            "shout"
        }

        async fn run(&self, state: &ChainState) -> Result<String, ragchat_core::Error> {
            Ok(state["text"].to_uppercase())
        }
    }

    struct Fails;

    #[async_trait]
    impl Stage for Fails {
        fn name(&self) -> &str {
            "fails"
        }

        fn output_key(&self) -> &str {
            "never"
        }

        async fn run(&self, _state: &ChainState) -> Result<String, ragchat_core::Error> {
            Err(ragchat_core::Error::Internal("boom".into()))
        }
    }

    fn state(pairs: &[(&str, &str)]) -> ChainState {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn stages_thread_outputs_forward() {
        let pipeline = Pipeline::new().then(Upper);
        let out = pipeline.run(state(&[("text", "hi")])).await.unwrap();
        assert_eq!(out["shout"], "HI");
        assert_eq!(out["text"], "hi");
    }

    #[tokio::test]
    async fn failure_names_the_stage_and_stops() {
        let pipeline = Pipeline::new().then(Fails).then(Upper);
        let err = pipeline.run(state(&[("text", "hi")])).await.unwrap_err();
        match err {
            ChainError::Stage { stage, .. } => assert_eq!(stage, "fails"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn prompt_stage_renders_declared_variables_only() {
        let provider = Arc::new(ScriptedProvider::echo());
        let stage = PromptStage::new(
            "rewrite",
            PromptTemplate::from_template("q: {question}").unwrap(),
            provider.clone(),
            "mock-model",
            "out",
        );

        let out = stage
            .run(&state(&[("question", "why?"), ("unrelated", "ignored")]))
            .await
            .unwrap();
        assert_eq!(out, "q: why?");
        assert_eq!(provider.prompts(), vec!["q: why?".to_string()]);
    }

    #[tokio::test]
    async fn prompt_stage_reports_missing_variable() {
        let stage = PromptStage::new(
            "answer",
            PromptTemplate::from_template("{context}").unwrap(),
            Arc::new(ScriptedProvider::echo()),
            "mock-model",
            "out",
        );
        let err = stage.run(&ChainState::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ragchat_core::Error::Prompt(PromptError::MissingVariable(_))
        ));
    }

    #[tokio::test]
    async fn retrieval_stage_combines_documents() {
        let retriever = Arc::new(RecordingRetriever::new(vec![
            Document::new("one"),
            Document::new("two"),
        ]));
        let stage = RetrievalStage::new(
            retriever.clone(),
            Arc::new(JoinCombiner::new(" + ")),
            "query",
            "context",
        );

        let out = stage.run(&state(&[("query", "numbers")])).await.unwrap();
        assert_eq!(out, "one + two");
        assert_eq!(retriever.queries(), vec!["numbers".to_string()]);
    }

    #[tokio::test]
    async fn retrieval_stage_needs_its_input() {
        let stage = RetrievalStage::new(
            Arc::new(RecordingRetriever::new(vec![])),
            Arc::new(JoinCombiner::default()),
            "query",
            "context",
        );
        assert!(stage.run(&ChainState::new()).await.is_err());
    }
}
