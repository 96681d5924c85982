//! The conversation orchestrator.
//!
//! # Flow
//!
//! 1. Render the rewrite template with the question and ask the model for a
//!    standalone question
//! 2. Retrieve documents for the standalone question and combine them into
//!    a context block
//! 3. Render the answer template with the context and the ORIGINAL question
//!    and ask the model for the answer
//!
//! The orchestrator never touches history itself; the caller appends the
//! turn once `invoke` returns.

use std::sync::Arc;

use ragchat_config::AppConfig;
use ragchat_core::document::{DocumentCombiner, JoinCombiner, Retriever};
use ragchat_core::error::PromptError;
use ragchat_core::history::{HistoryEntry, HistoryFormatter, LabeledHistoryFormatter};
use ragchat_core::prompt::PromptTemplate;
use ragchat_core::provider::Provider;
use tracing::info;

use crate::error::ChainError;
use crate::pipeline::{ChainState, Pipeline, PromptStage, RetrievalStage};
use crate::templates;

pub const QUESTION: &str = "question";
pub const STANDALONE_QUESTION: &str = "standalone_question";
pub const CONTEXT: &str = "context";
pub const CONV_HISTORY: &str = "conv_history";
pub const ANSWER: &str = "answer";

/// Drives the two-stage chain for one turn.
pub struct ConversationOrchestrator {
    pipeline: Pipeline,
    rewrite_template: PromptTemplate,
    answer_template: PromptTemplate,
    formatter: Option<Arc<dyn HistoryFormatter>>,
    model: String,
}

impl ConversationOrchestrator {
    pub fn builder(provider: Arc<dyn Provider>, retriever: Arc<dyn Retriever>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(provider, retriever)
    }

    /// Run one turn and return the answer.
    ///
    /// `history` is only read when history-aware prompting is enabled.
    pub async fn invoke(&self, question: &str, history: &[HistoryEntry]) -> Result<String, ChainError> {
        let mut state = ChainState::new();
        state.insert(QUESTION.to_string(), question.to_string());
        if let Some(formatter) = &self.formatter {
            state.insert(CONV_HISTORY.to_string(), formatter.format(history));
        }

        info!(model = %self.model, history = history.len(), "Chain: starting turn");

        let mut out = self.pipeline.run(state).await?;

        let answer = out
            .remove(ANSWER)
            .ok_or_else(|| ChainError::MissingOutput(ANSWER.into()))?;

        info!(
            standalone_question = out.get(STANDALONE_QUESTION).map(String::as_str).unwrap_or_default(),
            context_len = out.get(CONTEXT).map(String::len).unwrap_or_default(),
            answer_len = answer.len(),
            "Chain: turn complete"
        );

        Ok(answer)
    }

    pub fn rewrite_template(&self) -> &PromptTemplate {
        &self.rewrite_template
    }

    pub fn answer_template(&self) -> &PromptTemplate {
        &self.answer_template
    }

    pub fn is_history_aware(&self) -> bool {
        self.formatter.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.pipeline.stage_names()
    }
}

/// Assembles a [`ConversationOrchestrator`].
pub struct OrchestratorBuilder {
    provider: Arc<dyn Provider>,
    retriever: Arc<dyn Retriever>,
    combiner: Arc<dyn DocumentCombiner>,
    formatter: Arc<dyn HistoryFormatter>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    product_name: String,
    support_email: String,
    history_aware: bool,
    rewrite_template: Option<String>,
    answer_template: Option<String>,
}

impl OrchestratorBuilder {
    pub fn new(provider: Arc<dyn Provider>, retriever: Arc<dyn Retriever>) -> Self {
        let defaults = AppConfig::default();
        Self {
            provider,
            retriever,
            combiner: Arc::new(JoinCombiner::default()),
            formatter: Arc::new(LabeledHistoryFormatter),
            model: defaults.default_model,
            temperature: defaults.default_temperature,
            max_tokens: None,
            product_name: defaults.assistant.product_name,
            support_email: defaults.assistant.support_email,
            history_aware: false,
            rewrite_template: None,
            answer_template: None,
        }
    }

    /// Take model, persona, separator and history mode from config.
    pub fn from_config(mut self, config: &AppConfig) -> Self {
        self.model = config.active_model().to_string();
        self.temperature = config.default_temperature;
        self.max_tokens = Some(config.default_max_tokens);
        self.product_name = config.assistant.product_name.clone();
        self.support_email = config.assistant.support_email.clone();
        self.history_aware = config.assistant.history_aware;
        self.combiner = Arc::new(JoinCombiner::new(config.retrieval.separator.clone()));
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn combiner(mut self, combiner: Arc<dyn DocumentCombiner>) -> Self {
        self.combiner = combiner;
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn HistoryFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn history_aware(mut self, enabled: bool) -> Self {
        self.history_aware = enabled;
        self
    }

    pub fn persona(mut self, product_name: impl Into<String>, support_email: impl Into<String>) -> Self {
        self.product_name = product_name.into();
        self.support_email = support_email.into();
        self
    }

    pub fn rewrite_template(mut self, template: impl Into<String>) -> Self {
        self.rewrite_template = Some(template.into());
        self
    }

    pub fn answer_template(mut self, template: impl Into<String>) -> Self {
        self.answer_template = Some(template.into());
        self
    }

    pub fn build(self) -> Result<ConversationOrchestrator, PromptError> {
        let rewrite_source = self.rewrite_template.unwrap_or_else(|| {
            if self.history_aware {
                templates::STANDALONE_QUESTION_WITH_HISTORY.to_string()
            } else {
                templates::STANDALONE_QUESTION.to_string()
            }
        });
        let answer_source = self.answer_template.unwrap_or_else(|| {
            if self.history_aware {
                templates::answer_with_history(&self.product_name, &self.support_email)
            } else {
                templates::answer(&self.product_name, &self.support_email)
            }
        });

        let rewrite_template = PromptTemplate::from_template(rewrite_source)?;
        let answer_template = PromptTemplate::from_template(answer_source)?;

        for var in [QUESTION] {
            if !rewrite_template.variables().iter().any(|v| v == var) {
                return Err(PromptError::MissingVariable(var.into()));
            }
        }
        for var in [CONTEXT, QUESTION] {
            if !answer_template.variables().iter().any(|v| v == var) {
                return Err(PromptError::MissingVariable(var.into()));
            }
        }

        let rewrite = PromptStage::new(
            STANDALONE_QUESTION,
            rewrite_template.clone(),
            self.provider.clone(),
            &self.model,
            STANDALONE_QUESTION,
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        let retrieve = RetrievalStage::new(self.retriever, self.combiner, STANDALONE_QUESTION, CONTEXT);

        let answer = PromptStage::new(
            ANSWER,
            answer_template.clone(),
            self.provider,
            &self.model,
            ANSWER,
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        Ok(ConversationOrchestrator {
            pipeline: Pipeline::new().then(rewrite).then(retrieve).then(answer),
            rewrite_template,
            answer_template,
            formatter: self.history_aware.then_some(self.formatter),
            model: self.model,
        })
    }
}
