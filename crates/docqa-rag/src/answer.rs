//! Grounded answer generation

use serde::Serialize;
use std::sync::Arc;

use docqa_core::{
    generate_within, AnswerConfig, Error, GenerationRequest, Passage, PromptTemplate, Result,
    SimilaritySearchClient, TextGenerationClient,
};

use crate::context::format_context;
use crate::pipeline::HybridRetrievalPipeline;
use crate::rewriter::QueryRewriter;

const USER_PROMPT: &str = "\
{question}

Context information:
{context}

Provide a clear, technical answer formatted in markdown.";

/// Answer text and the passages it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub passages: Vec<Passage>,
}

/// Retrieves context for a question and makes the single final answer call.
pub struct AnswerGenerator<S, G>
where
    S: SimilaritySearchClient + ?Sized,
    G: TextGenerationClient + ?Sized,
{
    pipeline: HybridRetrievalPipeline<S, G>,
    generator: Arc<G>,
    rewriter: Option<QueryRewriter<G>>,
    config: AnswerConfig,
}

impl<S, G> AnswerGenerator<S, G>
where
    S: SimilaritySearchClient + ?Sized,
    G: TextGenerationClient + ?Sized,
{
    pub fn new(
        pipeline: HybridRetrievalPipeline<S, G>,
        generator: Arc<G>,
        config: AnswerConfig,
    ) -> Self {
        let rewriter = config
            .rewrite_query
            .then(|| QueryRewriter::new(generator.clone(), config.rewrite_timeout));
        Self {
            pipeline,
            generator,
            rewriter,
            config,
        }
    }

    /// System persona for `domain`; an empty domain falls back to the configured one.
    pub fn system_prompt(&self, domain: &str) -> String {
        let domain = match domain.trim() {
            "" => self.config.domain.trim(),
            d => d,
        };
        let clause = if domain.is_empty() {
            String::new()
        } else {
            format!(" specializing in {domain}")
        };
        self.config.system_persona.render(&[("domain", &clause)])
    }

    pub fn user_prompt(&self, question: &str, passages: &[Passage]) -> String {
        let context = format_context(passages);
        PromptTemplate::new(USER_PROMPT).render(&[("question", question), ("context", &context)])
    }

    pub async fn answer(&self, question: &str, domain: &str) -> Result<String> {
        Ok(self.answer_with_sources(question, domain).await?.text)
    }

    pub async fn answer_with_sources(&self, question: &str, domain: &str) -> Result<Answer> {
        self.answer_in_conversation(None, question, domain).await
    }

    /// Full pipeline. `conversation_id` is handed to the generation client as is.
    ///
    /// An empty retrieval result is not special-cased: the model still gets
    /// the question with empty context. A blank question, search backend
    /// errors, and a failed or timed-out final call are returned as errors.
    pub async fn answer_in_conversation(
        &self,
        conversation_id: Option<&str>,
        question: &str,
        domain: &str,
    ) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(Error::InvalidInput("question is empty".to_string()));
        }

        let search_query = match &self.rewriter {
            Some(rewriter) => rewriter.rewrite(question).await,
            None => question.to_string(),
        };

        let passages = self.pipeline.search(&search_query).await?;
        if passages.is_empty() {
            tracing::info!("No passages retrieved; answering without context");
        }

        let request = GenerationRequest::new(self.user_prompt(question, &passages))
            .with_system(self.system_prompt(domain))
            .with_conversation(conversation_id.map(str::to_string));

        let text =
            generate_within(self.generator.as_ref(), &request, self.config.answer_timeout).await?;

        Ok(Answer { text, passages })
    }
}
