use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use services::{CompletionService, RetryPolicy};

use crate::context::{Answer, RetrievalContext};

/// Returned verbatim when retrieval produced nothing to ground an answer in.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "Insufficient information: the indexed documents do not contain enough context to answer this question.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Approximate token budget for one summarization batch.
    pub batch_token_budget: usize,
    /// Completion budget for one synthesis call.
    pub max_tokens: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            batch_token_budget: 3000,
            max_tokens: 768,
        }
    }
}

/// Tree-summarize response synthesis.
///
/// Context items are packed into batches under the token budget; each batch
/// is summarized against the query, and the partial answers are fed back in
/// until a single batch remains. Batches always merge at least two items
/// when more than one is left, so the number of rounds is logarithmic in
/// the context size.
pub struct TreeSummarizer {
    service: Arc<dyn CompletionService>,
    retry: RetryPolicy,
    config: SynthesisConfig,
}

impl TreeSummarizer {
    pub fn new(
        service: Arc<dyn CompletionService>,
        retry: RetryPolicy,
        config: SynthesisConfig,
    ) -> Self {
        Self {
            service,
            retry,
            config,
        }
    }

    /// Synthesize an answer from retrieved context.
    ///
    /// An empty context yields the fixed insufficient-information answer
    /// without calling the model. A completion failure during any round
    /// propagates; no partial answer is ever returned.
    pub async fn synthesize(&self, query: &str, context: &RetrievalContext) -> Result<Answer> {
        if context.is_empty() {
            return Ok(Answer {
                text: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let mut texts: Vec<String> = context.items.iter().map(|i| i.text.clone()).collect();
        let mut round = 0;

        loop {
            let batches = pack_batches(&texts, self.config.batch_token_budget);
            let final_round = batches.len() == 1;
            debug!(round, batches = batches.len(), "Synthesis round");

            let mut partials = Vec::with_capacity(batches.len());
            for batch in &batches {
                let prompt = if final_round {
                    build_answer_prompt(query, batch)
                } else {
                    build_partial_prompt(query, batch)
                };
                let output = self
                    .retry
                    .retry("synthesize_batch", || {
                        self.service.complete(&prompt, self.config.max_tokens)
                    })
                    .await
                    .context("Response synthesis failed")?;
                partials.push(output.trim().to_string());
            }

            if final_round {
                let text = partials.pop().unwrap_or_default();
                return Ok(Answer {
                    text,
                    sources: context.items.clone(),
                });
            }

            texts = partials;
            round += 1;
        }
    }
}

/// Greedy packing under the token budget. When packing makes no progress
/// (every item alone exceeds the budget), items are paired instead so every
/// round strictly shrinks the input.
fn pack_batches<'a>(texts: &'a [String], token_budget: usize) -> Vec<Vec<&'a str>> {
    let mut batches: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0;

    for text in texts {
        let tokens = estimate_tokens(text);
        if !current.is_empty() && current_tokens + tokens > token_budget {
            batches.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current.push(text);
        current_tokens += tokens;
    }
    if !current.is_empty() {
        batches.push(current);
    }

    if batches.len() >= texts.len() && texts.len() > 1 {
        batches = texts
            .chunks(2)
            .map(|pair| pair.iter().map(|s| s.as_str()).collect())
            .collect();
    }

    batches
}

/// Rough token estimate: ~1.3 tokens per word.
fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f64 * 1.3) as usize
}

fn format_sources(batch: &[&str]) -> String {
    let mut formatted = String::new();
    for (i, text) in batch.iter().enumerate() {
        formatted.push_str(&format!("[Source {}]\n{}\n\n", i + 1, text));
    }
    formatted
}

fn build_partial_prompt(query: &str, batch: &[&str]) -> String {
    format!(
        r#"Context information from multiple sources is below.

{}
Using ONLY the context above and no prior knowledge, summarize the
information relevant to this question: {}

If the context contains nothing relevant, reply exactly: no relevant information.

SUMMARY:"#,
        format_sources(batch),
        query
    )
}

fn build_answer_prompt(query: &str, batch: &[&str]) -> String {
    format!(
        r#"You are answering a question using only the context below.

CONTEXT:
{}
QUESTION: {}

INSTRUCTIONS:
- Answer using only information from the context above
- Write a clear, well-structured answer in plain prose
- If the context does not contain enough information, say so explicitly
  instead of guessing

ANSWER:"#,
        format_sources(batch),
        query
    )
}
