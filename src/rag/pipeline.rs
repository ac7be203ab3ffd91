use super::{AssembledContext, ContextAssembler, LlmClient, Source};
use crate::error::Result;
use crate::retrieval::{CanonicalCatalog, HybridResult};

const INSTRUCTION: &str = "Answer the question using only the documents below. \
Cite the document each fact comes from as [Doc N]. \
If the documents do not contain the answer, say so.";

/// Outcome of a question
#[derive(Debug, Clone, PartialEq)]
pub enum RagAnswer {
    /// The search found nothing to answer from
    NoResults,
    Answer { text: String, sources: Vec<Source> },
}

/// Search, assemble context, ask the LLM
pub struct RagPipeline {
    llm: Box<dyn LlmClient>,
    assembler: ContextAssembler,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(llm: Box<dyn LlmClient>, assembler: ContextAssembler, top_k: usize) -> Self {
        Self {
            llm,
            assembler,
            top_k,
        }
    }

    /// Answer `question` from the documents `search` returns for it
    ///
    /// `search` must yield results in score-descending order; the first
    /// `top_k` resolvable ones become the context and the returned sources.
    pub fn ask<F>(&self, question: &str, search: F, catalog: &CanonicalCatalog) -> Result<RagAnswer>
    where
        F: FnOnce(&str) -> Result<Vec<HybridResult>>,
    {
        let results = search(question)?;
        if results.is_empty() {
            return Ok(RagAnswer::NoResults);
        }

        let AssembledContext { text, sources } =
            self.assembler.assemble(&results, self.top_k, catalog);
        if sources.is_empty() {
            return Ok(RagAnswer::NoResults);
        }

        let prompt = build_prompt(question, &text);
        tracing::info!(
            "Asking LLM with {} context documents ({} chars)",
            sources.len(),
            prompt.len()
        );

        let answer = self.llm.generate(&prompt)?;

        Ok(RagAnswer::Answer {
            text: answer,
            sources,
        })
    }
}

fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "{}\n\nDocuments:\n{}\nQuestion: {}",
        INSTRUCTION, context, question
    )
}
