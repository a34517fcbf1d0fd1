//! The trivia state machine.
//!
//! `GameController` is synchronous and owns no clocks or tasks. Anything that
//! has to happen later (a fetched batch arriving, a transition timer firing) is
//! handed back to the caller as a token, and is only honoured if the token is
//! still current when it comes back.

use std::time::Duration;

use log::debug;

use crate::quiz::{QuestionRecord, QuestionSequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Loading,
    Playing,
    Correct,
    Incorrect,
    Finished,
}

/// How long the Correct and Incorrect screens stay up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub correct: Duration,
    pub incorrect: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            correct: Duration::from_millis(2000),
            incorrect: Duration::from_millis(500),
        }
    }
}

/// Ticket for a pending question fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Leaves `Correct` for the next question or `Finished`.
    Advance,
    /// Leaves `Incorrect` back to the same question.
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    generation: u64,
    pub kind: TimerKind,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub state: GameState,
    pub current_question: Option<QuestionRecord>,
    /// 1-based position of `current_question`, 0 when there is none.
    pub question_number: usize,
    pub total_questions: usize,
    pub score: usize,
}

#[derive(Debug)]
pub struct GameController {
    state: GameState,
    questions: QuestionSequence,
    index: usize,
    score: usize,
    timings: Timings,
    generation: u64,
    loading: Option<LoadTicket>,
    pending_timer: Option<Timer>,
}

impl GameController {
    /// A controller waiting in `Loading`. Call [`GameController::start`] to
    /// get the ticket for the first fetch.
    pub fn new(timings: Timings) -> Self {
        Self {
            state: GameState::Loading,
            questions: Vec::new(),
            index: 0,
            score: 0,
            timings,
            generation: 0,
            loading: None,
            pending_timer: None,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn current_question(&self) -> Option<&QuestionRecord> {
        match self.state {
            GameState::Loading => None,
            _ => self.questions.get(self.index),
        }
    }

    /// Throws away the current game and enters `Loading`. Valid in any state.
    /// Every ticket or timer handed out before this call becomes stale.
    pub fn start(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state = GameState::Loading;
        self.questions.clear();
        self.index = 0;
        self.score = 0;
        self.pending_timer = None;

        let ticket = LoadTicket(self.generation);
        self.loading = Some(ticket);
        ticket
    }

    /// Installs a fetched batch. Returns `false` if the ticket is stale.
    pub fn questions_loaded(&mut self, ticket: LoadTicket, questions: QuestionSequence) -> bool {
        if self.loading != Some(ticket) {
            debug!("Dropping stale question batch {:?}", ticket);
            return false;
        }
        self.loading = None;
        self.questions = questions;
        self.index = 0;
        self.state = if self.questions.is_empty() {
            GameState::Finished
        } else {
            GameState::Playing
        };
        true
    }

    /// Handles an answer intent. Outside of `Playing` this does nothing and
    /// returns `None`; otherwise it returns the timer the caller must schedule.
    pub fn answer(&mut self, answer: bool) -> Option<Timer> {
        if self.state != GameState::Playing {
            debug!("Ignoring answer {} while {:?}", answer, self.state);
            return None;
        }
        let question = self.questions.get(self.index)?;

        let (state, kind, delay) = if question.is_correct(answer) {
            self.score += 1;
            (GameState::Correct, TimerKind::Advance, self.timings.correct)
        } else {
            (GameState::Incorrect, TimerKind::Retry, self.timings.incorrect)
        };
        self.state = state;

        self.generation += 1;
        let timer = Timer {
            generation: self.generation,
            kind,
            delay,
        };
        self.pending_timer = Some(timer);
        Some(timer)
    }

    /// Applies an elapsed timer. Returns `false` if the timer is not the one
    /// currently armed.
    pub fn timer_elapsed(&mut self, timer: Timer) -> bool {
        if self.pending_timer != Some(timer) {
            debug!("Dropping stale timer {:?}", timer);
            return false;
        }
        self.pending_timer = None;

        match timer.kind {
            TimerKind::Advance => {
                if self.index + 1 < self.questions.len() {
                    self.index += 1;
                    self.state = GameState::Playing;
                } else {
                    self.state = GameState::Finished;
                }
            }
            TimerKind::Retry => self.state = GameState::Playing,
        }
        true
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let current_question = self.current_question().cloned();
        GameSnapshot {
            state: self.state,
            question_number: if current_question.is_some() {
                self.index + 1
            } else {
                0
            },
            current_question,
            total_questions: self.questions.len(),
            score: self.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_questions() -> QuestionSequence {
        vec![
            QuestionRecord::new("A?", true, "A is true").unwrap(),
            QuestionRecord::new("B?", false, "B is false").unwrap(),
        ]
    }

    fn playing(questions: QuestionSequence) -> GameController {
        let mut game = GameController::new(Timings::default());
        let ticket = game.start();
        assert!(game.questions_loaded(ticket, questions));
        game
    }

    #[test]
    fn new_controller_is_loading_without_a_question() {
        let game = GameController::new(Timings::default());
        let snapshot = game.snapshot();
        assert_eq!(snapshot.state, GameState::Loading);
        assert_eq!(snapshot.current_question, None);
        assert_eq!(snapshot.question_number, 0);
        assert_eq!(snapshot.total_questions, 0);
        assert_eq!(snapshot.score, 0);
    }

    #[test]
    fn two_correct_answers_finish_with_full_score() {
        let mut game = playing(two_questions());

        let timer = game.answer(true).unwrap();
        assert_eq!(game.state(), GameState::Correct);
        assert_eq!(game.score(), 1);
        assert_eq!(timer.kind, TimerKind::Advance);
        assert_eq!(timer.delay, Duration::from_millis(2000));

        assert!(game.timer_elapsed(timer));
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.index(), 1);

        let timer = game.answer(false).unwrap();
        assert_eq!(game.state(), GameState::Correct);
        assert_eq!(game.score(), 2);
        assert!(game.timer_elapsed(timer));
        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.score(), 2);
    }

    #[test]
    fn wrong_answer_reshows_same_question() {
        let mut game = playing(two_questions());

        let timer = game.answer(false).unwrap();
        assert_eq!(game.state(), GameState::Incorrect);
        assert_eq!(game.score(), 0);
        assert_eq!(timer.kind, TimerKind::Retry);
        assert_eq!(timer.delay, Duration::from_millis(500));

        assert!(game.timer_elapsed(timer));
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.index(), 0);
        assert_eq!(game.current_question().unwrap().text(), "A?");

        let timer = game.answer(true).unwrap();
        assert_eq!(game.score(), 1);
        assert!(game.timer_elapsed(timer));
        assert_eq!(game.index(), 1);
        assert_eq!(game.state(), GameState::Playing);
    }

    #[test]
    fn correct_screen_is_shown_before_finishing_last_question() {
        let mut game = playing(vec![QuestionRecord::new("Only?", true, "yes").unwrap()]);
        let timer = game.answer(true).unwrap();
        assert_eq!(game.state(), GameState::Correct);
        assert_eq!(game.snapshot().current_question.unwrap().explanation(), "yes");
        assert!(game.timer_elapsed(timer));
        assert_eq!(game.state(), GameState::Finished);
    }

    #[test]
    fn answers_outside_playing_change_nothing() {
        let mut game = GameController::new(Timings::default());
        let ticket = game.start();
        let loading = game.snapshot();
        assert_eq!(game.answer(true), None);
        assert_eq!(game.snapshot(), loading);

        assert!(game.questions_loaded(ticket, two_questions()));
        let timer = game.answer(false).unwrap();
        let incorrect = game.snapshot();
        assert_eq!(game.answer(true), None);
        assert_eq!(game.answer(false), None);
        assert_eq!(game.snapshot(), incorrect);

        assert!(game.timer_elapsed(timer));
        let timer = game.answer(true).unwrap();
        let correct = game.snapshot();
        assert_eq!(game.answer(true), None);
        assert_eq!(game.snapshot(), correct);

        assert!(game.timer_elapsed(timer));
        let timer = game.answer(false).unwrap();
        assert!(game.timer_elapsed(timer));
        assert_eq!(game.state(), GameState::Finished);
        let finished = game.snapshot();
        assert_eq!(game.answer(true), None);
        assert_eq!(game.snapshot(), finished);
    }

    #[test]
    fn start_invalidates_pending_timer() {
        let mut game = playing(two_questions());
        let stale = game.answer(false).unwrap();

        let ticket = game.start();
        assert_eq!(game.state(), GameState::Loading);
        assert!(!game.timer_elapsed(stale));
        assert_eq!(game.state(), GameState::Loading);

        assert!(game.questions_loaded(ticket, two_questions()));
        assert!(!game.timer_elapsed(stale));
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.index(), 0);
    }

    #[test]
    fn stale_batch_is_dropped() {
        let mut game = GameController::new(Timings::default());
        let old = game.start();
        let fresh = game.start();

        assert!(!game.questions_loaded(old, two_questions()));
        assert_eq!(game.state(), GameState::Loading);
        assert!(game.questions_loaded(fresh, two_questions()));
        assert!(!game.questions_loaded(fresh, two_questions()));
        assert_eq!(game.state(), GameState::Playing);
    }

    #[test]
    fn timer_fires_once() {
        let mut game = playing(two_questions());
        let timer = game.answer(true).unwrap();
        assert!(game.timer_elapsed(timer));
        assert!(!game.timer_elapsed(timer));
        assert_eq!(game.index(), 1);
    }

    #[test]
    fn restart_from_finished_resets_score_and_index() {
        let mut game = playing(two_questions());
        let t = game.answer(true).unwrap();
        game.timer_elapsed(t);
        let t = game.answer(false).unwrap();
        game.timer_elapsed(t);
        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.score(), 2);

        let ticket = game.start();
        assert_eq!(game.state(), GameState::Loading);
        assert_eq!(game.score(), 0);
        assert!(game.questions_loaded(ticket, two_questions()));
        let snapshot = game.snapshot();
        assert_eq!(snapshot.state, GameState::Playing);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.question_number, 1);
    }

    #[test]
    fn empty_batch_finishes_immediately() {
        let mut game = GameController::new(Timings::default());
        let ticket = game.start();
        assert!(game.questions_loaded(ticket, Vec::new()));
        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.score(), 0);
        let snapshot = game.snapshot();
        assert_eq!(snapshot.current_question, None);
        assert_eq!(snapshot.question_number, 0);
        assert_eq!(snapshot.total_questions, 0);
        assert_eq!(game.answer(true), None);
    }

    #[test]
    fn index_stays_in_bounds_and_score_only_grows() {
        // Deterministic walk over a mix of right and wrong answers.
        let questions: QuestionSequence = (0..5)
            .map(|i| QuestionRecord::new(format!("Q{}?", i), i % 2 == 0, "because").unwrap())
            .collect();
        let mut game = playing(questions);
        let answers = [true, true, false, false, true, false, true, true, true, false, true];

        let mut last_score = 0;
        let mut correct = 0;
        for answer in answers {
            if game.state() == GameState::Finished {
                break;
            }
            let expected = game.current_question().unwrap().answer() == answer;
            let timer = game.answer(answer).unwrap();
            assert!(game.index() < game.total());
            if expected {
                correct += 1;
                assert_eq!(game.score(), last_score + 1);
            } else {
                assert_eq!(game.score(), last_score);
            }
            last_score = game.score();
            game.timer_elapsed(timer);
            if game.state() == GameState::Playing {
                assert!(game.index() < game.total());
            }
        }
        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.score(), correct);
    }
}
