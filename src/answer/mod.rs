//! Answer generation over retrieved passages


use anyhow::Context;
use async_trait::async_trait;
use fancy_regex::Regex;
use itertools::Itertools;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::embeddings::OllamaClient;
use crate::search::ScoredPassage;

pub const NOT_FOUND_ANSWER: &str = "Answer not found in the provided documents.";
pub const EMPTY_ANSWER: &str = "Answer could not be generated from the provided documents.";
pub const UNAVAILABLE_ANSWER: &str =
    "The answer could not be generated at this time due to system limits. Please try again shortly.";

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern is valid"));

/// Produces a natural-language answer from retrieved passages.
///
/// Never fails: every failure maps to one of the fixed fallback answers.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, question: &str, sources: &[ScoredPassage]) -> String;
}

/// Due-diligence prompt with each excerpt prefixed by its page
#[inline]
pub fn build_prompt(question: &str, sources: &[ScoredPassage]) -> String {
    let context = sources
        .iter()
        .map(|s| format!("Page {}:\n{}", s.passage.page_number, s.passage.text))
        .join("\n\n");

    format!(
        "You are a legal due diligence assistant.\n\
         \n\
         Answer the question strictly based on the provided document excerpts.\n\
         If the answer is not found, clearly say so.\n\
         If the answer is partially available, explain carefully.\n\
         \n\
         Rules:\n\
         Write clear paragraphs without bullets or markdown.\n\
         Use a formal legal tone.\n\
         Do not invent facts.\n\
         Do not use symbols such as asterisks, dashes or numbering.\n\
         \n\
         Question:\n\
         {question}\n\
         \n\
         Document Excerpts:\n\
         {context}\n"
    )
}

/// Strip markdown emphasis and collapse runs of blank lines.
///
/// Empty output becomes [`EMPTY_ANSWER`].
#[inline]
pub fn clean_answer(text: &str) -> String {
    let without_stars = text.replace('*', "");
    let collapsed = EXCESS_NEWLINES.replace_all(&without_stars, "\n\n");
    let cleaned = collapsed.trim();

    if cleaned.is_empty() {
        EMPTY_ANSWER.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Answers with an Ollama completion model
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    async fn complete(&self, prompt: String) -> anyhow::Result<String> {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || client.generate(&prompt))
            .await
            .context("Generation task panicked")?
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    async fn answer(&self, question: &str, sources: &[ScoredPassage]) -> String {
        if sources.is_empty() {
            return NOT_FOUND_ANSWER.to_string();
        }

        let prompt = build_prompt(question, sources);
        debug!("Generating answer from {} sources", sources.len());

        match self.complete(prompt).await {
            Ok(text) => clean_answer(&text),
            Err(e) => {
                warn!("Answer generation failed: {:#}", e);
                UNAVAILABLE_ANSWER.to_string()
            }
        }
    }
}
