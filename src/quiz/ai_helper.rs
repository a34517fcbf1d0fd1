use std::future::Future;
use std::time::Duration;

use chatgpt::prelude::*;
use chatgpt::types::CompletionResponse;
use log::debug;
use serde::Deserialize;

use crate::quiz::{InvalidRecord, QuestionRecord, QuestionSequence};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("ChatGPT request failed: {0}")]
    ChatGpt(#[from] chatgpt::err::Error),
    #[error("ChatGPT returned an empty reply")]
    EmptyReply,
    #[error("reply is not a question batch: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("question #{index} is invalid: {reason}")]
    InvalidQuestion { index: usize, reason: InvalidRecord },
    #[error("reply contains no questions")]
    EmptyBatch,
    #[error("no reply within {0:?}")]
    TimedOut(Duration),
}

/// One attempt at producing `count` questions from an external source.
pub trait QuestionGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        count: usize,
    ) -> impl Future<Output = std::result::Result<QuestionSequence, GenerationError>> + Send;
}

pub struct QuizHelper {
    chat_gpt: ChatGPT,
}

impl QuizHelper {
    pub fn new(chat_gpt: ChatGPT) -> Self {
        Self { chat_gpt }
    }
}

impl QuestionGenerator for QuizHelper {
    async fn generate(&self, count: usize) -> std::result::Result<QuestionSequence, GenerationError> {
        debug!("Requesting {} trivia questions", count);

        let response: CompletionResponse = self.chat_gpt.send_message(prompt(count)).await?;
        let content = response.message().clone().content;

        debug!("Completion: {:?}", content);

        parse_batch(&content, count)
    }
}

fn prompt(count: usize) -> String {
    format!(
        "Generate {} interesting and verifiable trivia questions that can be answered with 'Yes' or 'No'. \
        For each question, provide the question text, the boolean answer (true for Yes, false for No), \
        and a brief, fun explanation for the answer.
        Reply with JSON only, no prose, in exactly this shape:
        {{\"questions\": [{{\"question\": \"...\", \"answer\": true, \"explanation\": \"...\"}}]}}",
        count
    )
}

#[derive(Deserialize)]
struct Batch {
    questions: Vec<GeneratedQuestion>,
}

#[derive(Deserialize)]
struct GeneratedQuestion {
    question: String,
    answer: bool,
    explanation: String,
}

/// Parses a completion into at most `count` questions. The whole batch is
/// rejected if any entry is malformed.
pub fn parse_batch(
    content: &str,
    count: usize,
) -> std::result::Result<QuestionSequence, GenerationError> {
    let json = strip_code_fence(content);
    if json.is_empty() {
        return Err(GenerationError::EmptyReply);
    }

    let batch: Batch = serde_json::from_str(json)?;
    if batch.questions.is_empty() {
        return Err(GenerationError::EmptyBatch);
    }

    let mut questions = batch
        .questions
        .into_iter()
        .enumerate()
        .map(|(index, q)| {
            QuestionRecord::new(q.question, q.answer, q.explanation)
                .map_err(|reason| GenerationError::InvalidQuestion { index, reason })
        })
        .collect::<std::result::Result<QuestionSequence, _>>()?;
    questions.truncate(count);
    Ok(questions)
}

// Models like to wrap JSON in ```json ... ``` even when told not to.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}
