//! Per-player actors. Each player runs on a dedicated thread and is handed
//! control through a rendezvous: the coordinator sends a [`TurnContext`] and
//! blocks until the actor deposits exactly one action. Exactly one actor is
//! active at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::board::{EdgeKey, PlayerId};
use crate::coords::TilePosition;
use crate::game::{GameState, PlayerAction, PlayerObjective};

/// Read-only view handed to an actor when it becomes active: the current
/// objective, a snapshot of the game state and the objective-specific legal
/// material (buildable edges, drivable tiles). `rejection` carries the
/// reason the previous submission was refused, if any.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub objective: PlayerObjective,
    pub player_index: PlayerId,
    pub state: GameState,
    pub dice_roll: u8,
    pub round: u32,
    pub building_budget: u32,
    pub buildable_edges: Vec<EdgeKey>,
    pub drivable: HashMap<TilePosition, Vec<TilePosition>>,
    pub rejection: Option<String>,
}

/// The only capability the orchestrator needs from a player, human or
/// automated: produce one action of a permitted kind for the given context.
pub trait Agent: Send {
    fn act(&mut self, context: &TurnContext) -> PlayerAction;
}

/// The actor thread is gone (stop flag observed or channel closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

pub struct ActorHandle {
    request_tx: Option<SyncSender<TurnContext>>,
    action_rx: Option<Receiver<PlayerAction>>,
    thread: Option<JoinHandle<()>>,
}

/// Starts the actor thread for one player. Automated players get an
/// artificial think-time before each answer. The actor exits as soon as the
/// stop flag is observed or either channel closes.
pub fn spawn_actor(
    mut agent: Box<dyn Agent>,
    stop: Arc<AtomicBool>,
    think_delay: Option<Duration>,
) -> ActorHandle {
    let (request_tx, request_rx) = sync_channel::<TurnContext>(0);
    let (action_tx, action_rx) = sync_channel::<PlayerAction>(0);
    let thread = thread::spawn(move || {
        while let Ok(context) = request_rx.recv() {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            if let Some(delay) = think_delay {
                thread::sleep(delay);
            }
            let action = agent.act(&context);
            if action_tx.send(action).is_err() {
                break;
            }
        }
    });
    ActorHandle {
        request_tx: Some(request_tx),
        action_rx: Some(action_rx),
        thread: Some(thread),
    }
}

impl ActorHandle {
    /// Rendezvous with the actor: deliver the context, then block until it
    /// answers. Fails fast once the actor has shut down.
    pub fn request(&self, context: TurnContext) -> Result<PlayerAction, Disconnected> {
        let tx = self.request_tx.as_ref().ok_or(Disconnected)?;
        tx.send(context).map_err(|_| Disconnected)?;
        let rx = self.action_rx.as_ref().ok_or(Disconnected)?;
        rx.recv().map_err(|_| Disconnected)
    }
}

impl Drop for ActorHandle {
    fn drop(&mut self) {
        // Close both channels first so a blocked actor wakes up and exits,
        // then reap the thread.
        drop(self.request_tx.take());
        drop(self.action_rx.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;

    struct EchoAgent;

    impl Agent for EchoAgent {
        fn act(&mut self, context: &TurnContext) -> PlayerAction {
            match context.objective {
                PlayerObjective::RollDice => PlayerAction::RollDice,
                _ => PlayerAction::ConfirmBuild,
            }
        }
    }

    fn context(objective: PlayerObjective) -> TurnContext {
        TurnContext {
            objective,
            player_index: 0,
            state: GameState::new(GameConfig::default()),
            dice_roll: 0,
            round: 0,
            building_budget: 0,
            buildable_edges: Vec::new(),
            drivable: HashMap::new(),
            rejection: None,
        }
    }

    #[test]
    fn rendezvous_round_trip() {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_actor(Box::new(EchoAgent), Arc::clone(&stop), None);
        let action = handle.request(context(PlayerObjective::RollDice)).unwrap();
        assert_eq!(action, PlayerAction::RollDice);
        let action = handle.request(context(PlayerObjective::PlaceRail)).unwrap();
        assert_eq!(action, PlayerAction::ConfirmBuild);
    }

    #[test]
    fn stop_flag_fails_fast() {
        let stop = Arc::new(AtomicBool::new(true));
        let handle = spawn_actor(Box::new(EchoAgent), Arc::clone(&stop), None);
        // The actor observes the flag on its first activation and exits, so
        // the pending rendezvous errors instead of hanging.
        assert_eq!(
            handle.request(context(PlayerObjective::RollDice)),
            Err(Disconnected)
        );
    }

    #[test]
    fn dropping_the_handle_reaps_the_thread() {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_actor(Box::new(EchoAgent), stop, None);
        drop(handle);
    }
}
