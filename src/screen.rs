//! What the chat shows for a given snapshot. No game logic lives here.

use crate::quiz::game::{GameSnapshot, GameState};

pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const PLAY_AGAIN: &str = "Play again";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keys {
    YesNo,
    Replay,
    /// Leave whatever keyboard the chat already has.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub keys: Keys,
}

pub fn render(snapshot: &GameSnapshot) -> Screen {
    match (snapshot.state, &snapshot.current_question) {
        (GameState::Loading, _) => Screen {
            text: "Generating your trivia game...".to_string(),
            keys: Keys::Unchanged,
        },
        (GameState::Finished, _) => Screen {
            text: format!(
                "Game Over!\nYour final score is: {} / {}",
                snapshot.score, snapshot.total_questions
            ),
            keys: Keys::Replay,
        },
        (GameState::Playing, Some(question)) => Screen {
            text: format!(
                "Question {} / {}\n\n{}\n\nScore: {}",
                snapshot.question_number,
                snapshot.total_questions,
                question.text(),
                snapshot.score
            ),
            keys: Keys::YesNo,
        },
        (GameState::Correct, Some(question)) => Screen {
            text: format!(
                "Correct!\n{}\n\nScore: {}",
                question.explanation(),
                snapshot.score
            ),
            keys: Keys::Unchanged,
        },
        (GameState::Incorrect, _) => Screen {
            text: format!("Not quite! Try again.\n\nScore: {}", snapshot.score),
            keys: Keys::Unchanged,
        },
        // Playing or Correct always carry a question; keep the chat quiet if not.
        (GameState::Playing | GameState::Correct, None) => Screen {
            text: format!("Score: {}", snapshot.score),
            keys: Keys::Unchanged,
        },
    }
}

/// What a plain chat message asks the game to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Start,
    Answer(bool),
    /// Anything else; the chat gets a hint.
    Unknown,
}

/// Maps a button press or typed reply to an answer.
pub fn parse_answer(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case(YES) {
        Some(true)
    } else if text.eq_ignore_ascii_case(NO) {
        Some(false)
    } else {
        None
    }
}

/// Routes a message. A chat without a game gets one started, whatever it says.
pub fn parse_reply(text: &str, has_game: bool) -> Reply {
    if !has_game || text.trim().eq_ignore_ascii_case(PLAY_AGAIN) {
        return Reply::Start;
    }
    match parse_answer(text) {
        Some(answer) => Reply::Answer(answer),
        None => Reply::Unknown,
    }
}
