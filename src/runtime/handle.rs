use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

use crate::{
    engine::{replay::ReplayReport, shopping::ShoppingItem},
    op::JournalEntry,
    prefs::{PrefError, PreferenceSet, PreferenceStore},
    recipe::RecipeId,
    session::{CommanderSession, SessionError},
    types::Timestamp,
};

use super::events::SessionEvent;

/// Failures surfaced through [`SessionHandle`] calls.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The session rejected the command.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The preference store rejected a save.
    #[error(transparent)]
    Preferences(#[from] PrefError),
    /// The runtime task has stopped.
    #[error("session runtime channel closed")]
    ChannelClosed,
}

/// Runtime tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Quiet period after the last preference change before saving.
    pub save_batch_max_latency_ms: u64,
    /// Snapshots queued to the save worker before changes stay dirty.
    pub save_queue_bound: usize,
    /// Commands queued before callers wait.
    pub command_queue_bound: usize,
    /// Broadcast buffer per subscriber.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            save_batch_max_latency_ms: 250,
            save_queue_bound: 16,
            command_queue_bound: 256,
            event_capacity: 1024,
        }
    }
}

/// Cloneable handle to a session running in its own task.
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl Clone for SessionHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

enum Command {
    LoadState {
        lines: Vec<String>,
        resp: oneshot::Sender<ReplayReport>,
    },
    ApplyEvents {
        lines: Vec<String>,
        resp: oneshot::Sender<ReplayReport>,
    },
    UserChange {
        name: String,
        delta: i64,
        resp: oneshot::Sender<Result<JournalEntry, RuntimeError>>,
    },
    SetFavorite {
        id: RecipeId,
        favorite: bool,
        resp: oneshot::Sender<Result<bool, RuntimeError>>,
    },
    SetIgnored {
        id: RecipeId,
        ignored: bool,
        resp: oneshot::Sender<Result<bool, RuntimeError>>,
    },
    ShoppingListChange {
        id: RecipeId,
        delta: i64,
        resp: oneshot::Sender<Result<bool, RuntimeError>>,
    },
    Count {
        name: String,
        resp: oneshot::Sender<Option<i64>>,
    },
    Watermark {
        resp: oneshot::Sender<Timestamp>,
    },
    ShoppingList {
        resp: oneshot::Sender<Vec<ShoppingItem>>,
    },
    Flush {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

enum SaveMsg {
    Save {
        generation: u64,
        prefs: PreferenceSet,
    },
    Flush {
        resp: oneshot::Sender<Option<SaveOutcome>>,
    },
    Shutdown {
        resp: oneshot::Sender<Option<SaveOutcome>>,
    },
}

/// Result of saving one preference snapshot.
struct SaveOutcome {
    generation: u64,
    result: Result<(), PrefError>,
}

/// Command-loop side of the save pipeline.
///
/// Every snapshot handed to the worker carries a generation. A failure is
/// only acted on when no later generation has been saved since.
struct SaveTracker {
    tx: mpsc::Sender<SaveMsg>,
    next_generation: u64,
    saved_generation: u64,
}

impl SaveTracker {
    fn settle(
        &mut self,
        outcome: SaveOutcome,
        session: &mut CommanderSession,
        events_tx: &broadcast::Sender<SessionEvent>,
    ) -> Result<(), PrefError> {
        match outcome.result {
            Ok(()) => {
                self.saved_generation = self.saved_generation.max(outcome.generation);
                let _ = events_tx.send(SessionEvent::PreferencesSaved);
                Ok(())
            }
            Err(err) => {
                if outcome.generation > self.saved_generation {
                    session.mark_preferences_unsaved();
                    let _ = events_tx.send(SessionEvent::PreferencesSaveFailed {
                        error: err.to_string(),
                    });
                } else {
                    debug!(generation = outcome.generation, "stale_preference_save_failure");
                }
                Err(err)
            }
        }
    }
}

/// Moves `session` into a single-writer task and returns a handle to it.
///
/// With a `store`, preference changes are coalesced and saved by a
/// background worker; without one they stay in memory.
pub fn spawn_session(
    session: CommanderSession,
    store: Option<Box<dyn PreferenceStore>>,
    config: RuntimeConfig,
) -> SessionHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<SessionEvent>(config.event_capacity);

    let (mut saves, mut saved_rx) = if let Some(store) = store {
        let (save_tx, save_rx) = mpsc::channel::<SaveMsg>(config.save_queue_bound);
        let (saved_tx, saved_rx) = mpsc::unbounded_channel::<SaveOutcome>();
        spawn_save_worker(store, save_rx, saved_tx, config.clone());
        let tracker = SaveTracker {
            tx: save_tx,
            next_generation: 0,
            saved_generation: 0,
        };
        (Some(tracker), Some(saved_rx))
    } else {
        (None, None)
    };

    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut session = session;
        publish(&mut session, &events_tx_loop, saves.as_mut());

        loop {
            if let Some(rx) = saved_rx.as_mut() {
                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        let Some(cmd) = cmd else { break; };
                        let done = handle_command(
                            cmd,
                            &mut session,
                            &events_tx_loop,
                            saves.as_mut(),
                        ).await;
                        if done {
                            break;
                        }
                    }
                    saved = rx.recv() => {
                        if let (Some(outcome), Some(tracker)) = (saved, saves.as_mut()) {
                            let _ = tracker.settle(outcome, &mut session, &events_tx_loop);
                        }
                    }
                }
            } else {
                let Some(cmd) = cmd_rx.recv().await else { break; };
                let done = handle_command(
                    cmd,
                    &mut session,
                    &events_tx_loop,
                    saves.as_mut(),
                )
                .await;
                if done {
                    break;
                }
            }
        }
    });

    SessionHandle { cmd_tx, events_tx }
}

impl SessionHandle {
    /// New receiver of [`SessionEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Full reload from `lines`.
    pub async fn load_state(&self, lines: Vec<String>) -> Result<ReplayReport, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::LoadState { lines, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Incremental replay of `lines`.
    pub async fn apply_events(&self, lines: Vec<String>) -> Result<ReplayReport, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ApplyEvents { lines, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Records a user correction stamped now.
    pub async fn user_change(&self, name: impl Into<String>, delta: i64) -> Result<JournalEntry, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::UserChange {
                name: name.into(),
                delta,
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Sets a recipe's favorite flag.
    pub async fn set_favorite(&self, id: RecipeId, favorite: bool) -> Result<bool, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SetFavorite { id, favorite, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Sets a recipe's ignored flag.
    pub async fn set_ignored(&self, id: RecipeId, ignored: bool) -> Result<bool, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SetIgnored { id, ignored, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Adds `delta` planned crafts; `Ok(false)` when rejected.
    pub async fn shopping_list_change(&self, id: RecipeId, delta: i64) -> Result<bool, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ShoppingListChange { id, delta, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Count of one entry.
    pub async fn count(&self, name: impl Into<String>) -> Result<Option<i64>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Count {
                name: name.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Latest applied journal time.
    pub async fn watermark(&self) -> Result<Timestamp, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Watermark { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Current shopping-list requirements.
    pub async fn shopping_list(&self) -> Result<Vec<ShoppingItem>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ShoppingList { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Waits until every preference change so far has reached the store.
    pub async fn flush(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Flush { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Saves pending preferences and stops the task.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }
}

async fn handle_command(
    cmd: Command,
    session: &mut CommanderSession,
    events_tx: &broadcast::Sender<SessionEvent>,
    mut saves: Option<&mut SaveTracker>,
) -> bool {
    match cmd {
        Command::LoadState { lines, resp } => {
            let report = session.load_state(&lines);
            publish(session, events_tx, saves);
            let _ = resp.send(report);
        }
        Command::ApplyEvents { lines, resp } => {
            let report = session.apply_events(&lines);
            publish(session, events_tx, saves);
            let _ = resp.send(report);
        }
        Command::UserChange { name, delta, resp } => {
            let res = session.user_change(&name, delta).map_err(RuntimeError::from);
            publish(session, events_tx, saves);
            let _ = resp.send(res);
        }
        Command::SetFavorite { id, favorite, resp } => {
            let res = session.set_favorite(&id, favorite).map_err(RuntimeError::from);
            publish(session, events_tx, saves);
            let _ = resp.send(res);
        }
        Command::SetIgnored { id, ignored, resp } => {
            let res = session.set_ignored(&id, ignored).map_err(RuntimeError::from);
            publish(session, events_tx, saves);
            let _ = resp.send(res);
        }
        Command::ShoppingListChange { id, delta, resp } => {
            let res = session
                .shopping_list_change(&id, delta)
                .map_err(RuntimeError::from);
            publish(session, events_tx, saves);
            let _ = resp.send(res);
        }
        Command::Count { name, resp } => {
            let _ = resp.send(session.count(&name));
        }
        Command::Watermark { resp } => {
            let _ = resp.send(session.watermark());
        }
        Command::ShoppingList { resp } => {
            let _ = resp.send(session.shopping_list());
        }
        Command::Flush { resp } => {
            publish(session, events_tx, saves.as_deref_mut());
            let out = drain_saves(session, events_tx, saves, |resp| SaveMsg::Flush { resp }).await;
            let _ = resp.send(out);
        }
        Command::Shutdown { resp } => {
            publish(session, events_tx, saves.as_deref_mut());
            let out =
                drain_saves(session, events_tx, saves, |resp| SaveMsg::Shutdown { resp }).await;
            let _ = resp.send(out);
            return true;
        }
    }

    false
}

// Asks the worker to save whatever it holds and settles the result here, so
// the outcome is reported once.
async fn drain_saves(
    session: &mut CommanderSession,
    events_tx: &broadcast::Sender<SessionEvent>,
    saves: Option<&mut SaveTracker>,
    msg: impl FnOnce(oneshot::Sender<Option<SaveOutcome>>) -> SaveMsg,
) -> Result<(), RuntimeError> {
    let Some(tracker) = saves else {
        return Ok(());
    };

    let (done_tx, done_rx) = oneshot::channel();
    if tracker.tx.send(msg(done_tx)).await.is_err() {
        session.mark_preferences_unsaved();
        return Err(RuntimeError::ChannelClosed);
    }
    match done_rx.await {
        Ok(Some(outcome)) => tracker
            .settle(outcome, session, events_tx)
            .map_err(RuntimeError::from),
        Ok(None) => Ok(()),
        Err(_) => {
            session.mark_preferences_unsaved();
            Err(RuntimeError::ChannelClosed)
        }
    }
}

fn publish(
    session: &mut CommanderSession,
    events_tx: &broadcast::Sender<SessionEvent>,
    saves: Option<&mut SaveTracker>,
) {
    for event in session.drain_events() {
        let _ = events_tx.send(event);
    }

    let Some(tracker) = saves else {
        return;
    };
    let Some(prefs) = session.take_pending_preferences() else {
        return;
    };
    tracker.next_generation += 1;
    let msg = SaveMsg::Save {
        generation: tracker.next_generation,
        prefs,
    };
    if let Err(err) = tracker.tx.try_send(msg) {
        warn!(error = %err, "preference_save_queue_full");
        session.mark_preferences_unsaved();
    }
}

fn spawn_save_worker(
    store: Box<dyn PreferenceStore>,
    mut rx: mpsc::Receiver<SaveMsg>,
    saved_tx: mpsc::UnboundedSender<SaveOutcome>,
    config: RuntimeConfig,
) {
    let store = Arc::new(Mutex::new(store));
    tokio::spawn(async move {
        let latency = Duration::from_millis(config.save_batch_max_latency_ms);
        let mut pending: Option<(u64, PreferenceSet)> = None;
        let mut deadline = Instant::now() + latency;

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        let _ = save_pending(&store, &mut pending).await;
                        break;
                    };

                    match msg {
                        SaveMsg::Save { generation, prefs } => {
                            // Later snapshots supersede earlier unsaved ones.
                            pending = Some((generation, prefs));
                            deadline = Instant::now() + latency;
                        }
                        SaveMsg::Flush { resp } => {
                            let _ = resp.send(save_pending(&store, &mut pending).await);
                        }
                        SaveMsg::Shutdown { resp } => {
                            let _ = resp.send(save_pending(&store, &mut pending).await);
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline), if pending.is_some() => {
                    if let Some(outcome) = save_pending(&store, &mut pending).await {
                        let _ = saved_tx.send(outcome);
                    }
                }
            }
        }
    });
}

async fn save_pending(
    store: &Arc<Mutex<Box<dyn PreferenceStore>>>,
    pending: &mut Option<(u64, PreferenceSet)>,
) -> Option<SaveOutcome> {
    let (generation, prefs) = pending.take()?;

    let store_ref = Arc::clone(store);
    let result = tokio::task::spawn_blocking(move || {
        let mut store = store_ref.blocking_lock();
        store.save(&prefs)
    })
    .await
    .map_err(|e| PrefError::Unavailable(format!("join error: {e}")))
    .and_then(|r| r);

    if let Err(err) = &result {
        warn!(error = %err, generation, "preference_save_failed");
    }
    Some(SaveOutcome { generation, result })
}
