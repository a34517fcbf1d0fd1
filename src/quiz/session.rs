//! Runs a [`GameController`] on its own task.
//!
//! The task is the only place the controller is touched. Fetches and timers run
//! as helper tasks that report back through a channel; their results carry the
//! controller's tokens, so anything started before a restart is ignored.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use log::{debug, info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::quiz::game::{GameController, GameSnapshot, GameState, LoadTicket, Timer, Timings};
use crate::quiz::supplier::QuestionSupplier;
use crate::quiz::QuestionSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Start,
    Answer(bool),
}

enum Event {
    Loaded(LoadTicket, QuestionSequence),
    TimerElapsed(Timer),
}

/// Cheap to clone. A session from [`spawn`] stops once every handle is
/// dropped; sessions held by a [`SessionRegistry`] live as long as it does.
#[derive(Clone)]
pub struct SessionHandle {
    intents: mpsc::UnboundedSender<Intent>,
    snapshots: watch::Receiver<GameSnapshot>,
}

impl SessionHandle {
    pub fn start(&self) {
        self.send(Intent::Start);
    }

    pub fn answer(&self, answer: bool) {
        self.send(Intent::Answer(answer));
    }

    fn send(&self, intent: Intent) {
        if self.intents.send(intent).is_err() {
            debug!("Session is gone, dropping {:?}", intent);
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A fresh receiver for rendering. It starts out with the current snapshot
    /// marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<GameSnapshot> {
        self.snapshots.clone()
    }
}

/// Spawns a session on the current runtime and starts its first game.
pub fn spawn<S: QuestionSupplier>(supplier: Arc<S>, timings: Timings) -> SessionHandle {
    let controller = GameController::new(timings);
    let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
    let (intent_tx, intent_rx) = mpsc::unbounded_channel();

    let session = Session {
        controller,
        supplier,
        snapshots: snapshot_tx,
        fetch: None,
        timer: None,
    };
    tokio::spawn(session.run(intent_rx));

    let handle = SessionHandle {
        intents: intent_tx,
        snapshots: snapshot_rx,
    };
    handle.start();
    handle
}

struct Session<S> {
    controller: GameController,
    supplier: Arc<S>,
    snapshots: watch::Sender<GameSnapshot>,
    fetch: Option<JoinHandle<()>>,
    timer: Option<JoinHandle<()>>,
}

impl<S: QuestionSupplier> Session<S> {
    async fn run(mut self, mut intents: mpsc::UnboundedReceiver<Intent>) {
        let (events_tx, mut events) = mpsc::unbounded_channel();

        loop {
            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => self.on_intent(intent, &events_tx),
                    None => break,
                },
                Some(event) = events.recv() => self.on_event(event),
            }
            self.publish();
        }

        self.cancel_pending();
        debug!("Session closed");
    }

    fn on_intent(&mut self, intent: Intent, events: &mpsc::UnboundedSender<Event>) {
        match intent {
            Intent::Start => {
                self.cancel_pending();
                let ticket = self.controller.start();
                info!("Starting a new game");

                let supplier = self.supplier.clone();
                let events = events.clone();
                self.fetch = Some(tokio::spawn(async move {
                    let questions = supplier.fetch().await;
                    let _ = events.send(Event::Loaded(ticket, questions));
                }));
            }
            Intent::Answer(answer) => {
                if let Some(timer) = self.controller.answer(answer) {
                    let events = events.clone();
                    self.timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(timer.delay).await;
                        let _ = events.send(Event::TimerElapsed(timer));
                    }));
                }
            }
        }
    }

    fn on_event(&mut self, event: Event) {
        // A stale event must not drop the handle of the task that replaced it.
        let applied = match event {
            Event::Loaded(ticket, questions) => {
                let applied = self.controller.questions_loaded(ticket, questions);
                if applied {
                    self.fetch = None;
                }
                applied
            }
            Event::TimerElapsed(timer) => {
                let applied = self.controller.timer_elapsed(timer);
                if applied {
                    self.timer = None;
                }
                applied
            }
        };
        if applied && self.controller.state() == GameState::Finished {
            info!(
                "Game finished with {} / {}",
                self.controller.score(),
                self.controller.total()
            );
        }
    }

    fn cancel_pending(&mut self) {
        for task in [self.fetch.take(), self.timer.take()].into_iter().flatten() {
            task.abort();
        }
    }

    fn publish(&self) {
        let snapshot = self.controller.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}

/// One lazily spawned session per key (a chat, a player...). Entries are
/// never evicted, so each key keeps its task until the registry is dropped.
pub struct SessionRegistry<K, S> {
    supplier: Arc<S>,
    timings: Timings,
    sessions: Mutex<HashMap<K, SessionHandle>>,
}

impl<K: Hash + Eq + Clone, S: QuestionSupplier> SessionRegistry<K, S> {
    pub fn new(supplier: Arc<S>, timings: Timings) -> Self {
        Self {
            supplier,
            timings,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session for `key`, and whether it was just created (in
    /// which case its first game is already starting).
    pub fn get_or_spawn(&self, key: &K) -> (SessionHandle, bool) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = sessions.get(key) {
            return (handle.clone(), false);
        }
        let handle = spawn(self.supplier.clone(), self.timings);
        sessions.insert(key.clone(), handle.clone());
        (handle, true)
    }

    pub fn get(&self, key: &K) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}
