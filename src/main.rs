mod config;
mod quiz;
mod screen;

use std::sync::Arc;

use chatgpt::{client::ChatGPT, config::ChatGPTEngine};
use config::{Config, Engine};
use dotenv::dotenv;
use log::{debug, error, info, warn};
use quiz::{
    ai_helper::QuizHelper, game::GameSnapshot, session::SessionRegistry,
    supplier::{ConfiguredSupplier, FallbackSupplier, StaticSupplier},
};
use screen::{Keys, Reply, Screen, NO, PLAY_AGAIN, YES};
use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup},
    utils::command::BotCommands,
};
use tokio::sync::watch;

type Sessions = SessionRegistry<ChatId, ConfiguredSupplier<QuizHelper>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
enum Command {
    #[command(description = "start a new game.")]
    Start,
    #[command(description = "show your current score.")]
    Score,
    #[command(description = "display this text.")]
    Help,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let from_file = dotenv().is_ok();
    pretty_env_logger::init();
    if !from_file {
        debug!("No .env file found, reading the process environment only");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };
    info!("Starting trivia bot...");

    let supplier = match &config.chatgpt_api_key {
        Some(api_key) => {
            let mut gpt = ChatGPT::new(api_key.clone())?;

            gpt.config.engine = chatgpt_engine(config.engine);
            gpt.config.timeout = config.chatgpt_timeout;

            ConfiguredSupplier::Generated(FallbackSupplier::new(
                QuizHelper::new(gpt),
                config.question_count,
                config.fetch_timeout,
            ))
        }
        None => {
            warn!("CHATGPT_API_KEY is not set, serving the built-in questions only");
            ConfiguredSupplier::Offline(StaticSupplier)
        }
    };
    let supplier = Arc::new(supplier);
    let sessions: Arc<Sessions> = Arc::new(SessionRegistry::new(supplier, config.timings));

    let bot = Bot::new(config.bot_token);
    let handler = Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint(command))
        .branch(dptree::endpoint(message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![sessions])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn chatgpt_engine(engine: Engine) -> ChatGPTEngine {
    match engine {
        Engine::Gpt35Turbo => ChatGPTEngine::Gpt35Turbo,
        Engine::Gpt4 => ChatGPTEngine::Gpt4,
        Engine::Gpt4_32k => ChatGPTEngine::Gpt4_32k,
    }
}

async fn command(bot: Bot, sessions: Arc<Sessions>, msg: Message, cmd: Command) -> HandlerResult {
    match cmd {
        Command::Start => start_game(&bot, &sessions, msg.chat.id),
        Command::Score => {
            let text = match sessions.get(&msg.chat.id) {
                Some(session) => {
                    let snapshot = session.snapshot();
                    format!("Score: {} / {}", snapshot.score, snapshot.total_questions)
                }
                None => "No game yet. Send /start to play!".to_string(),
            };
            bot.send_message(msg.chat.id, text).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
    }
    Ok(())
}

async fn message(bot: Bot, sessions: Arc<Sessions>, msg: Message) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(text) = msg.text() else {
        bot.send_message(chat_id, "Please answer with the Yes / No buttons")
            .await?;
        return Ok(());
    };

    let session = sessions.get(&chat_id);
    match (screen::parse_reply(text, session.is_some()), session) {
        (Reply::Answer(answer), Some(session)) => session.answer(answer),
        (Reply::Unknown, _) => {
            bot.send_message(chat_id, "Answer with Yes or No, or send /start for a new game.")
                .await?;
        }
        _ => start_game(&bot, &sessions, chat_id),
    }
    Ok(())
}

fn start_game(bot: &Bot, sessions: &Sessions, chat_id: ChatId) {
    let (session, created) = sessions.get_or_spawn(&chat_id);
    if created {
        info!("New trivia session for chat {}", chat_id.0);
        spawn_renderer(bot.clone(), chat_id, session.subscribe());
    } else {
        session.start();
    }
}

/// Sends a message for every snapshot the session publishes.
fn spawn_renderer(bot: Bot, chat_id: ChatId, mut snapshots: watch::Receiver<GameSnapshot>) {
    tokio::spawn(async move {
        loop {
            let view = screen::render(&snapshots.borrow_and_update());
            if let Err(err) = show(&bot, chat_id, view).await {
                warn!("Failed to update chat {}: {}", chat_id.0, err);
            }
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    });
}

async fn show(bot: &Bot, chat_id: ChatId, screen: Screen) -> HandlerResult {
    let request = bot.send_message(chat_id, screen.text);
    match screen.keys {
        Keys::YesNo => {
            request
                .reply_markup(KeyboardMarkup::new(vec![vec![
                    KeyboardButton::new(YES),
                    KeyboardButton::new(NO),
                ]]))
                .await?
        }
        Keys::Replay => {
            request
                .reply_markup(KeyboardMarkup::new(vec![vec![KeyboardButton::new(
                    PLAY_AGAIN,
                )]]))
                .await?
        }
        Keys::Unchanged => request.await?,
    };
    Ok(())
}
