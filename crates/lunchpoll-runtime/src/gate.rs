//! Periodic re-evaluation of the voting gate.

use std::{sync::Arc, time::Duration};

use lunchpoll_core::{Clock, GateState, VotingGate, VotingWindow};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info};

/// Starts the gate task.
///
/// The returned receiver starts at [`GateState::Enabled`] and only ever
/// holds the latest state; intermediate transitions a slow reader misses
/// are dropped. The task ends once every receiver is gone.
pub fn spawn_gate(
    window: VotingWindow,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> (watch::Receiver<GateState>, JoinHandle<()>) {
    let mut gate = VotingGate::new(window);
    let (tx, rx) = watch::channel(gate.state());

    let handle = tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = interval.as_secs(), "Voting gate started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(state) = gate.tick(clock.now()) {
                        info!(?state, "Voting gate changed");
                        if tx.send(state).is_err() {
                            break;
                        }
                    }
                }
                () = tx.closed() => break,
            }
        }
        debug!("Voting gate stopped");
    });

    (rx, handle)
}
