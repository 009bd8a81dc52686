//! Error types.
//!
//! - [`ConfigError`]: rejected battle configuration, raised by
//!   [`create_initial_state`](crate::config::create_initial_state)
//! - [`HandlerError`]: failure inside an ability kit
//! - [`SimError`]: anything that aborts a kernel transition
//! - [`InvariantViolation`]: a core bug detected by
//!   [`GameState::check_invariants`](crate::state::GameState::check_invariants)
//!
//! Missing entities and iteration caps are not errors: the former are
//! no-ops, the latter are recorded as diagnostics.

use thiserror::Error;

use crate::entity::EntityId;
use crate::event::EventKind;
use crate::handler::{HandlerId, KitId};

/// Invalid battle configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No enabled party member.
    #[error("no enabled party members")]
    NoPartyMembers,

    /// No enemy.
    #[error("no enemies configured")]
    NoEnemies,

    /// Rotation string contains something other than `s` and `b`.
    #[error("invalid rotation {rotation:?} for {name}: only 's' and 'b' are allowed")]
    InvalidRotation {
        /// Character name.
        name: String,
        /// Offending rotation string.
        rotation: String,
    },

    /// HP is zero, negative or not a number.
    #[error("invalid HP {hp} for {name}")]
    InvalidHp {
        /// Unit name.
        name: String,
        /// Offending value.
        hp: f64,
    },

    /// Speed is zero, negative or not a number.
    #[error("invalid speed {speed} for {name}")]
    InvalidSpeed {
        /// Unit name.
        name: String,
        /// Offending value.
        speed: f64,
    },

    /// The round budget is zero.
    #[error("round budget must be at least 1")]
    NoRounds,

    /// A unit references a kit the catalog does not contain.
    #[error("unknown kit {kit} for {name}")]
    UnknownKit {
        /// Unit name.
        name: String,
        /// Missing kit.
        kit: KitId,
    },
}

/// Failure inside an ability kit.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The kit rejected the event.
    #[error("{0}")]
    Failed(String),

    /// A kernel call made by the kit failed.
    #[error(transparent)]
    Nested(Box<SimError>),
}

impl From<SimError> for HandlerError {
    fn from(err: SimError) -> Self {
        Self::Nested(Box::new(err))
    }
}

/// Error aborting a kernel transition.
#[derive(Debug, Error)]
pub enum SimError {
    /// A handler failed while processing an event.
    #[error("handler {handler} failed on {event:?}: {source}")]
    Handler {
        /// Failing handler.
        handler: HandlerId,
        /// Event being delivered.
        event: EventKind,
        /// Underlying failure.
        #[source]
        source: HandlerError,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Core invariant broken.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// A broken core invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    /// HP outside `[0, max_hp]`.
    #[error("entity {entity} has HP {hp} outside [0, {max_hp}]")]
    HpOutOfRange {
        /// Offending entity.
        entity: EntityId,
        /// Current HP.
        hp: f64,
        /// Maximum HP.
        max_hp: f64,
    },

    /// An entity appears twice in the action queue.
    #[error("entity {0} has more than one queue entry")]
    DuplicateQueueEntry(EntityId),

    /// A dead or missing entity has a queue entry.
    #[error("entity {0} is queued but not alive")]
    DeadInQueue(EntityId),

    /// The action queue is not sorted by action value.
    #[error("action queue is not in ascending order")]
    QueueUnordered,

    /// A linked effect's parent no longer exists.
    #[error("effect {effect} on entity {entity} is linked to a missing parent")]
    OrphanedEffect {
        /// Host entity.
        entity: EntityId,
        /// Orphaned effect.
        effect: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_wraps_sim_error() {
        let inner = SimError::from(ConfigError::NoEnemies);
        let err = HandlerError::from(inner);
        assert_eq!(err.to_string(), "no enemies configured");
    }

    #[test]
    fn handler_failure_names_handler_and_event() {
        let err = SimError::Handler {
            handler: HandlerId::new("kit#1"),
            event: EventKind::TurnStart,
            source: HandlerError::Failed("boom".into()),
        };
        assert_eq!(err.to_string(), "handler kit#1 failed on TurnStart: boom");
    }
}
