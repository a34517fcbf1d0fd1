pub mod ai_helper;
pub mod game;
pub mod session;
pub mod supplier;

/// Questions for one game, in the order they are asked.
pub type QuestionSequence = Vec<QuestionRecord>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidRecord {
    #[error("question text is empty")]
    EmptyText,
    #[error("explanation is empty")]
    EmptyExplanation,
}

/// A single yes/no question. `answer == true` means "Yes".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    text: String,
    answer: bool,
    explanation: String,
}

impl QuestionRecord {
    pub fn new(
        text: impl Into<String>,
        answer: bool,
        explanation: impl Into<String>,
    ) -> Result<Self, InvalidRecord> {
        let text = text.into().trim().to_string();
        let explanation = explanation.into().trim().to_string();
        if text.is_empty() {
            return Err(InvalidRecord::EmptyText);
        }
        if explanation.is_empty() {
            return Err(InvalidRecord::EmptyExplanation);
        }
        Ok(Self {
            text,
            answer,
            explanation,
        })
    }

    // Only for literals that are known to be well-formed.
    pub(crate) fn from_static(text: &'static str, answer: bool, explanation: &'static str) -> Self {
        Self {
            text: text.to_string(),
            answer,
            explanation: explanation.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn answer(&self) -> bool {
        self.answer
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn is_correct(&self, answer: bool) -> bool {
        self.answer == answer
    }
}
