// src/evaluator/mod.rs — Conversation quality evaluator

pub mod parser;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::types::ConversationScores;
use crate::infra::errors::ConvoGenError;
use crate::provider::{ChatProvider, ChatRequest, Message};

/// Default scoring rubric handed to the judge model. Callers can swap in
/// their own rubric text without touching the pipeline.
pub const DEFAULT_RUBRIC: &str = "\
coherence (1-5): the dialogue flows logically, replies address what was said.\n\
politeness (1-5): the agent stays professional and courteous throughout.\n\
relevance (1-5): the agent's answers stay on the customer's actual issue.\n\
resolution (0 or 1): 1 if the issue was resolved in-chat, 0 if it needs escalation.";

/// External evaluator contract: a transcript in, a complete score set
/// out. A failure leaves the conversation accepted but unevaluated.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, transcript: &str) -> Result<ConversationScores, ConvoGenError>;
}

/// Evaluator backed by a judge chat model.
pub struct LlmEvaluator {
    provider: Arc<dyn ChatProvider>,
    model: String,
    rubric: String,
}

impl LlmEvaluator {
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            rubric: DEFAULT_RUBRIC.into(),
        }
    }

    pub fn with_rubric(mut self, rubric: impl Into<String>) -> Self {
        self.rubric = rubric.into();
        self
    }

    fn build_prompt(&self, transcript: &str) -> String {
        format!(
            "Score this customer-service conversation against the rubric.\n\n\
             ## Rubric\n{}\n\n\
             ## Conversation\n{}\n\n\
             Respond with a JSON object only:\n\
             {{\"coherence\": n, \"politeness\": n, \"relevance\": n, \"resolution\": n}}",
            self.rubric, transcript
        )
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(&self, transcript: &str) -> Result<ConversationScores, ConvoGenError> {
        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                system: Some("You are a strict customer-service QA reviewer.".into()),
                messages: vec![Message::user(self.build_prompt(transcript))],
                max_tokens: Some(128),
                temperature: Some(0.0),
            })
            .await?;

        parser::parse_scores(&response.content).map_err(ConvoGenError::Evaluation)
    }
}
