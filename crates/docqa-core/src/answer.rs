//! Answer assembly: grounded prompt, generator call, fallback.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Answer, RetrievedPassage};
use crate::retrieve::Retriever;

/// Returned when retrieval finds nothing to ground an answer on.
pub const FALLBACK_ANSWER: &str =
    "I could not find any relevant information in the processed documents to answer this question.";

const INSTRUCTIONS: &str = "You answer questions about the user's documents. \
Use only the context passages below. If the context does not contain enough \
information to answer, say explicitly that the documents do not contain the \
answer. Do not use outside knowledge.";

/// Trait for answer generation backends (chat-completion style LLMs).
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;

    /// Complete `prompt`, returning the generated text.
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Builds grounded answers from retrieved passages.
pub struct AnswerAssembler {
    retriever: Arc<Retriever>,
    generator: Option<Arc<dyn Generator>>,
}

impl AnswerAssembler {
    /// `generator` is `None` when no backend is configured; [`answer`]
    /// then fails with [`Error::GeneratorUnavailable`].
    ///
    /// [`answer`]: AnswerAssembler::answer
    pub fn new(retriever: Arc<Retriever>, generator: Option<Arc<dyn Generator>>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    pub async fn answer(&self, question: &str, k: usize) -> Result<Answer> {
        let generator = self.generator.as_ref().ok_or(Error::GeneratorUnavailable)?;

        let passages = self.retriever.retrieve(question, k).await?;
        if passages.is_empty() {
            info!("no passages retrieved, returning fallback answer");
            return Ok(Answer {
                question: question.to_string(),
                answer: FALLBACK_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let prompt = build_prompt(question, &passages);
        debug!(
            model = generator.model_name(),
            passages = passages.len(),
            prompt_chars = prompt.len(),
            "calling generator"
        );
        let text = generator
            .complete(&prompt)
            .await
            .map_err(|e| Error::Generation(format!("{:#}", e)))?;

        Ok(Answer {
            question: question.to_string(),
            answer: text,
            sources: passages,
        })
    }
}

/// Render the grounded prompt for `question`.
///
/// Each passage is tagged `[Source: <document>, chunk <index>]` so the
/// generator can cite it.
pub fn build_prompt(question: &str, passages: &[RetrievedPassage]) -> String {
    let mut prompt = String::from(INSTRUCTIONS);
    prompt.push_str("\n\nContext:\n");
    for (i, p) in passages.iter().enumerate() {
        if i > 0 {
            prompt.push('\n');
        }
        prompt.push_str(&format!(
            "[Source: {}, chunk {}]\n{}\n",
            p.document,
            p.chunk_index,
            p.text.trim()
        ));
    }
    prompt.push_str(&format!("\nQuestion: {}\nAnswer:", question.trim()));
    prompt
}
