use std::time::Duration;

use crate::quiz::game::Timings;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} must be a positive number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("unknown ChatGPT engine {0:?}")]
    UnknownEngine(String),
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Gpt35Turbo,
    Gpt4,
    Gpt4_32k,
}

impl Engine {
    fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim() {
            "gpt-3.5-turbo" => Ok(Engine::Gpt35Turbo),
            "gpt-4" => Ok(Engine::Gpt4),
            "gpt-4-32k" => Ok(Engine::Gpt4_32k),
            other => Err(ConfigError::UnknownEngine(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    /// Without a key the bot only serves the built-in questions.
    pub chatgpt_api_key: Option<String>,
    pub engine: Engine,
    pub chatgpt_timeout: Duration,
    pub question_count: usize,
    pub fetch_timeout: Duration,
    pub timings: Timings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(value) => match value.trim().parse::<u64>() {
                    Ok(n) if n > 0 => Ok(n),
                    _ => Err(ConfigError::InvalidNumber { name, value }),
                },
            }
        };

        let defaults = Timings::default();
        Ok(Self {
            bot_token: required("TELOXIDE_TOKEN")?,
            chatgpt_api_key: lookup("CHATGPT_API_KEY").filter(|v| !v.trim().is_empty()),
            engine: match lookup("CHATGPT_ENGINE") {
                Some(name) => Engine::parse(&name)?,
                None => Engine::Gpt35Turbo,
            },
            chatgpt_timeout: Duration::from_secs(number("CHATGPT_TIMEOUT_SECS", 15)?),
            question_count: number("TRIVIA_QUESTION_COUNT", 10)? as usize,
            fetch_timeout: Duration::from_secs(number("TRIVIA_FETCH_TIMEOUT_SECS", 20)?),
            timings: Timings {
                correct: Duration::from_millis(number(
                    "TRIVIA_CORRECT_DELAY_MS",
                    defaults.correct.as_millis() as u64,
                )?),
                incorrect: Duration::from_millis(number(
                    "TRIVIA_INCORRECT_DELAY_MS",
                    defaults.incorrect.as_millis() as u64,
                )?),
            },
        })
    }
}
