use std::future::Future;
use std::time::Duration;

use log::{info, warn};

use crate::quiz::ai_helper::{GenerationError, QuestionGenerator};
use crate::quiz::{QuestionRecord, QuestionSequence};

/// Source of question batches for a game. `fetch` never fails: whatever goes
/// wrong upstream, a playable, non-empty sequence comes back.
pub trait QuestionSupplier: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = QuestionSequence> + Send;
}

/// Questions used whenever the generator can't deliver.
pub fn fallback_questions() -> QuestionSequence {
    vec![
        QuestionRecord::from_static(
            "Is the sky blue?",
            true,
            "The sky appears blue because of how the Earth's atmosphere scatters sunlight.",
        ),
        QuestionRecord::from_static(
            "Is water a good conductor of electricity?",
            false,
            "Pure water is a poor conductor. It's the impurities and minerals in it that conduct electricity.",
        ),
        QuestionRecord::from_static(
            "Was Cleopatra Egyptian?",
            false,
            "Cleopatra was of Greek descent, a member of the Ptolemaic dynasty.",
        ),
    ]
}

/// Always serves the fallback set.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticSupplier;

impl QuestionSupplier for StaticSupplier {
    async fn fetch(&self) -> QuestionSequence {
        fallback_questions()
    }
}

/// Asks a generator for one batch, bounded by `timeout`, and swaps in
/// [`fallback_questions`] on any error.
pub struct FallbackSupplier<G> {
    generator: G,
    count: usize,
    timeout: Duration,
}

impl<G: QuestionGenerator> FallbackSupplier<G> {
    pub fn new(generator: G, count: usize, timeout: Duration) -> Self {
        Self {
            generator,
            count,
            timeout,
        }
    }

    async fn try_fetch(&self) -> Result<QuestionSequence, GenerationError> {
        let questions = tokio::time::timeout(self.timeout, self.generator.generate(self.count))
            .await
            .map_err(|_| GenerationError::TimedOut(self.timeout))??;
        if questions.is_empty() {
            return Err(GenerationError::EmptyBatch);
        }
        Ok(questions)
    }
}

impl<G: QuestionGenerator> QuestionSupplier for FallbackSupplier<G> {
    async fn fetch(&self) -> QuestionSequence {
        match self.try_fetch().await {
            Ok(questions) => {
                info!("Generated {} questions", questions.len());
                questions
            }
            Err(err) => {
                warn!("Question generation failed, using fallback set: {}", err);
                fallback_questions()
            }
        }
    }
}

/// The supplier picked at startup: generated questions when a provider is
/// configured, the fallback set otherwise.
pub enum ConfiguredSupplier<G> {
    Generated(FallbackSupplier<G>),
    Offline(StaticSupplier),
}

impl<G: QuestionGenerator> QuestionSupplier for ConfiguredSupplier<G> {
    async fn fetch(&self) -> QuestionSequence {
        match self {
            ConfiguredSupplier::Generated(supplier) => supplier.fetch().await,
            ConfiguredSupplier::Offline(supplier) => supplier.fetch().await,
        }
    }
}
