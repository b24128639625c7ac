//! Routes `Imperative` final intents to registered handlers under
//! per-subtype cooldown and a last-wins conflict-resolution window.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::clock::Millis;
use crate::config::CooldownConfig;
use crate::error::Error;
use crate::intent::{DetectedIntent, ImperativeSubtype, Subtype};

/// Emitted for every Imperative Final intent that reaches the router,
/// including debounced ones — the consumer decides whether to act on
/// `was_debounced`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActionEvent {
    pub action_name: &'static str,
    pub intent: DetectedIntent,
    pub was_debounced: bool,
    pub timestamp: Millis,
}

/// A user-supplied callback invoked only for non-debounced, conflict-
/// resolved winners. Returning `Err` is caught by the router and surfaced
/// as an `OnError` event rather than propagated.
pub type Handler = Box<dyn Fn(&DetectedIntent) -> Result<(), String> + Send + Sync>;

struct PendingWinner {
    intent: DetectedIntent,
    utterance_id: u64,
    subtype: ImperativeSubtype,
    deadline: Millis,
}

pub struct ActionRouterConfig {
    pub conflict_window_ms: Millis,
    pub cooldowns: CooldownConfig,
}

/// Owns cooldown state and the pending-winner slot exclusively; both are
/// guarded by coarse mutexes, matching the core's "no lock-free structures"
/// design note.
pub struct ActionRouter {
    config: ActionRouterConfig,
    last_fired: Mutex<HashMap<ImperativeSubtype, Millis>>,
    pending: Mutex<Option<PendingWinner>>,
    handlers: Mutex<HashMap<ImperativeSubtype, Handler>>,
}

/// Outcome of a single `route` call: whether an action fired or was
/// scheduled, plus any handler fault to surface via `OnError`.
#[derive(Default)]
pub struct RouteOutcome {
    pub action: Option<ActionEvent>,
    pub error: Option<Error>,
}

impl ActionRouter {
    pub fn new(config: ActionRouterConfig) -> Self {
        Self {
            config,
            last_fired: Mutex::new(HashMap::new()),
            pending: Mutex::new(None),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_handler(&self, subtype: ImperativeSubtype, handler: Handler) {
        self.handlers.lock().unwrap().insert(subtype, handler);
    }

    /// `true` iff an action was, or will be, emitted (the return value does
    /// not distinguish debounced-now from pending-for-later — inspect
    /// `RouteOutcome::action` for that).
    pub fn route(&self, intent: DetectedIntent, utterance_id: u64, now: Millis) -> RouteOutcome {
        let Subtype::Imperative(subtype) = intent.subtype else {
            return RouteOutcome::default();
        };

        let cooldown = self.config.cooldowns.for_subtype(subtype);
        let last_fired = self.last_fired.lock().unwrap().get(&subtype).copied();

        if let Some(last) = last_fired {
            if now.saturating_sub(last) < cooldown {
                let event = ActionEvent {
                    action_name: subtype.action_name(),
                    intent,
                    was_debounced: true,
                    timestamp: now,
                };
                return RouteOutcome {
                    action: Some(event),
                    error: None,
                };
            }
        }

        self.schedule_or_resolve(intent, utterance_id, subtype, now)
    }

    fn schedule_or_resolve(
        &self,
        intent: DetectedIntent,
        utterance_id: u64,
        subtype: ImperativeSubtype,
        now: Millis,
    ) -> RouteOutcome {
        let mut pending = self.pending.lock().unwrap();

        match pending.as_ref() {
            Some(existing) if now <= existing.deadline => {
                // Later imperative within the window replaces the pending
                // winner regardless of subtype — last wins.
                *pending = Some(PendingWinner {
                    intent,
                    utterance_id,
                    subtype,
                    deadline: existing.deadline,
                });
                RouteOutcome::default()
            }
            Some(_) => {
                // Deadline already passed: fire the stale winner, then
                // schedule this one fresh.
                let stale = pending.take().unwrap();
                let fired = self.fire(stale, now);
                *pending = Some(PendingWinner {
                    intent,
                    utterance_id,
                    subtype,
                    deadline: now + self.config.conflict_window_ms,
                });
                fired
            }
            None => {
                *pending = Some(PendingWinner {
                    intent,
                    utterance_id,
                    subtype,
                    deadline: now + self.config.conflict_window_ms,
                });
                RouteOutcome::default()
            }
        }
    }

    /// Periodic tick: fires the pending winner if its deadline has passed.
    pub fn check_conflict_window(&self, now: Millis) -> RouteOutcome {
        let mut pending = self.pending.lock().unwrap();
        match pending.as_ref() {
            Some(winner) if now >= winner.deadline => {
                let winner = pending.take().unwrap();
                drop(pending);
                self.fire(winner, now)
            }
            _ => RouteOutcome::default(),
        }
    }

    fn fire(&self, winner: PendingWinner, now: Millis) -> RouteOutcome {
        let PendingWinner {
            intent, subtype, ..
        } = winner;

        self.last_fired.lock().unwrap().insert(subtype, now);

        let error = if let Some(handler) = self.handlers.lock().unwrap().get(&subtype) {
            handler(&intent).err().map(|message| Error::HandlerFault {
                subtype,
                message,
            })
        } else {
            None
        };

        RouteOutcome {
            action: Some(ActionEvent {
                action_name: subtype.action_name(),
                intent,
                was_debounced: false,
                timestamp: now,
            }),
            error,
        }
    }

    pub fn reset(&self) {
        self.last_fired.lock().unwrap().clear();
        *self.pending.lock().unwrap() = None;
    }
}
