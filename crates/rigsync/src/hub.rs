//! Single writer of the rig state and fan-out of events.
//!
//! The snapshot lives in a `watch` channel so readers never block. Every
//! replacement is diffed and announced to subscribers while the watch lock
//! is held, so subscribers see changes in the order they were made and
//! each subscriber gets every event (queues are unbounded).

use std::sync::Mutex;

use tokio::sync::{mpsc, watch};

use rigsync_core::error::RigError;
use rigsync_core::events::{RigEvent, StateChange};
use rigsync_core::state::{ChangedFields, RigState};
use rigsync_core::types::ConnectionState;

pub(crate) struct EventHub {
    state: watch::Sender<RigState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<RigEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        EventHub {
            state: watch::Sender::new(RigState::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn current(&self) -> RigState {
        self.state.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.borrow().connection_state
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RigEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_subscribers().push(tx);
        rx
    }

    /// Replace the snapshot with what `f` builds from the current one.
    /// `None` leaves it untouched. Returns what changed.
    pub fn update<F>(&self, f: F) -> ChangedFields
    where
        F: FnOnce(&RigState) -> Option<RigState>,
    {
        let mut changed = ChangedFields::empty();
        self.state.send_if_modified(|current| {
            let Some(next) = f(current) else {
                return false;
            };
            changed = current.diff(&next);
            if changed.is_empty() {
                return false;
            }
            if current.connection_state != next.connection_state {
                tracing::debug!(
                    from = %current.connection_state,
                    to = %next.connection_state,
                    "Connection state change"
                );
            }
            *current = next;
            self.broadcast(RigEvent::StateChanged(StateChange {
                state: current.clone(),
                changed,
            }));
            true
        });
        changed
    }

    /// Start a fresh, empty snapshot in `state`.
    pub fn reset(&self, state: ConnectionState) -> ChangedFields {
        self.update(|_| {
            Some(RigState {
                connection_state: state,
                ..RigState::default()
            })
        })
    }

    pub fn set_connection(&self, state: ConnectionState) -> ChangedFields {
        self.update(|current| {
            Some(RigState {
                connection_state: state,
                ..current.clone()
            })
        })
    }

    pub fn publish_error(&self, err: RigError) {
        self.broadcast(RigEvent::Error(err));
    }

    fn broadcast(&self, event: RigEvent) {
        self.lock_subscribers()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<RigEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigsync_core::types::Mode;

    #[test]
    fn update_announces_diff() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();

        let changed = hub.update(|s| {
            Some(RigState {
                mode: Mode::CW,
                ..s.clone()
            })
        });
        assert_eq!(changed, ChangedFields::MODE);

        match rx.try_recv().unwrap() {
            RigEvent::StateChanged(change) => {
                assert_eq!(change.changed, ChangedFields::MODE);
                assert_eq!(change.state.mode, Mode::CW);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn identical_snapshot_is_silent() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();
        assert!(hub.update(|s| Some(s.clone())).is_empty());
        assert!(hub.update(|_| None).is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reset_clears_fields() {
        let hub = EventHub::new();
        hub.update(|s| {
            Some(RigState {
                receive_frequency_hz: 7_074_000,
                transmit_frequency_hz: 7_074_000,
                connection_state: ConnectionState::Connected,
                ..s.clone()
            })
        });
        hub.reset(ConnectionState::Disconnected);
        assert_eq!(hub.current(), RigState::default());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let hub = EventHub::new();
        let rx = hub.subscribe();
        let mut kept = hub.subscribe();
        drop(rx);
        hub.publish_error(RigError::TransportLost);
        assert_eq!(hub.lock_subscribers().len(), 1);
        assert_eq!(
            kept.try_recv().unwrap(),
            RigEvent::Error(RigError::TransportLost)
        );
    }
}
