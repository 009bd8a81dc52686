//! The simulation kernel: event bus and action dispatch.
//!
//! [`Kernel`] owns the immutable parts of a simulation, the [`KitCatalog`]
//! and the iteration [`Limits`], and exposes the three public transitions:
//! - [`Kernel::publish_event`]: deliver one event to every subscribed handler
//! - [`Kernel::dispatch`]: resolve one [`Action`]
//! - [`Kernel::step`]: run one scheduler cycle (see the orchestrator)
//!
//! # Architecture
//!
//! Public transitions borrow the caller's [`GameState`] and return a new one.
//! Work happens on a private copy through the `&mut GameState` operations
//! ([`Kernel::emit`], [`Kernel::execute`], the resolver operations), which
//! ability kits call back into. A failing handler aborts the whole
//! transition and the caller keeps its original state.
//!
//! # Example
//!
//! ```
//! use rotasim_core::action::Action;
//! use rotasim_core::config::{create_initial_state, SimulationConfig};
//! use rotasim_core::kernel::Kernel;
//!
//! let config: SimulationConfig = serde_json::from_str(r#"{
//!     "characters": [{ "name": "Hero", "stats": { "hp": 3000, "atk": 1200, "spd": 110 } }],
//!     "enemies": [{ "name": "Slime", "hp": 50000, "speed": 90 }]
//! }"#).unwrap();
//!
//! let kernel = Kernel::default();
//! let state = create_initial_state(&config, kernel.catalog()).unwrap();
//! let state = kernel.dispatch(&state, &Action::BattleStart).unwrap();
//! let next = kernel.step(&state).unwrap();
//!
//! assert!(next.time > state.time);
//! assert_eq!(next.turn, 1);
//! ```
//!
//! # Determinism
//!
//! Handlers run in registration order on a single thread. Re-entrant
//! publishing completes depth-first before the outer delivery continues.

use crate::action::Action;
use crate::config::Limits;
use crate::error::SimError;
use crate::event::{Event, EventKind};
use crate::handler::{self, HandlerContext, KitCatalog};
use crate::log::{LogEntry, LogKind};
use crate::scheduler;
use crate::state::{GameState, Phase};

/// Immutable simulation context shared by every transition.
#[derive(Debug, Clone, Default)]
pub struct Kernel {
    catalog: KitCatalog,
    limits: Limits,
}

impl Kernel {
    /// Creates a kernel.
    #[must_use]
    pub fn new(catalog: KitCatalog, limits: Limits) -> Self {
        Self { catalog, limits }
    }

    /// Kit lookup table.
    #[must_use]
    pub fn catalog(&self) -> &KitCatalog {
        &self.catalog
    }

    /// Iteration caps.
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    // =========================================================================
    // Event bus
    // =========================================================================

    /// Delivers `event` to every subscribed handler and returns the resulting
    /// state.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Handler`] if a handler fails. `state` is untouched.
    pub fn publish_event(&self, state: &GameState, event: &Event) -> Result<GameState, SimError> {
        let mut next = state.clone();
        self.emit(&mut next, event)?;
        Ok(next)
    }

    /// In-place form of [`publish_event`](Self::publish_event) for use inside
    /// a transition.
    ///
    /// Each handler receives the state produced by the previous one. Handlers
    /// unregistered or put on cooldown by an earlier handler of the same
    /// delivery are skipped. Publishing deeper than `max_event_depth` records
    /// a diagnostic and drops the event.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Handler`] if a handler fails.
    pub fn emit(&self, state: &mut GameState, event: &Event) -> Result<(), SimError> {
        if !state.handlers.has_subscribers(event.kind) {
            return Ok(());
        }
        if state.event_depth >= self.limits.max_event_depth {
            state.record_cap(Phase::EventDepth, self.limits.max_event_depth);
            return Ok(());
        }
        state.event_depth += 1;
        let delivered = self.deliver(state, event);
        state.event_depth -= 1;
        delivered
    }

    fn deliver(&self, state: &mut GameState, event: &Event) -> Result<(), SimError> {
        for registration in state.handlers.subscribed(event.kind) {
            if !state.handlers.contains(&registration.id)
                || state.cooldowns.is_active(&registration.id)
            {
                continue;
            }
            let Some(kit) = self.catalog.get(&registration.kit) else {
                tracing::warn!(handler = %registration.id, kit = %registration.kit, "unknown kit, handler skipped");
                continue;
            };
            tracing::trace!(handler = %registration.id, event = ?event.kind, "deliver");
            let ctx = HandlerContext::new(self, &registration);
            *state = kit
                .on_event(&ctx, event, state.clone())
                .map_err(|source| SimError::Handler {
                    handler: registration.id.clone(),
                    event: event.kind,
                    source,
                })?;
        }
        Ok(())
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Resolves one action and returns the resulting state.
    ///
    /// Actions naming missing or dead entities are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails. `state` is untouched.
    pub fn dispatch(&self, state: &GameState, action: &Action) -> Result<GameState, SimError> {
        let mut next = state.clone();
        self.execute(&mut next, action)?;
        Ok(next)
    }

    /// In-place form of [`dispatch`](Self::dispatch).
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn execute(&self, state: &mut GameState, action: &Action) -> Result<(), SimError> {
        tracing::debug!(?action, time = state.time, "dispatch");
        match action {
            Action::BasicAttack { source, target }
            | Action::Skill { source, target }
            | Action::Ultimate { source, target } => {
                if let Some(kind) = action.kind() {
                    self.use_ability(state, kind, *source, *target, None)?;
                }
            }
            Action::FollowUpAttack {
                source,
                target,
                ability,
            } => {
                if let Some(kind) = action.kind() {
                    self.use_ability(state, kind, *source, *target, *ability)?;
                }
            }
            Action::BattleStart => self.battle_start(state)?,
            Action::RegisterHandlers { registrations } => {
                for registration in registrations {
                    if self.catalog.contains(&registration.kit) {
                        state.handlers.register(registration.clone());
                    } else {
                        tracing::warn!(handler = %registration.id, kit = %registration.kit, "unknown kit, registration skipped");
                    }
                }
            }
            Action::Advance { target, fraction } => scheduler::advance(state, *target, *fraction),
            Action::Delay { target, fraction } => scheduler::delay(state, *target, *fraction),
        }
        Ok(())
    }

    /// Registers the kit of every entity that names one.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if an entity names an unknown kit.
    pub fn register_kits(&self, state: &GameState) -> Result<GameState, SimError> {
        let mut next = state.clone();
        handler::register_kits(&mut next, &self.catalog)?;
        Ok(next)
    }

    fn battle_start(&self, state: &mut GameState) -> Result<(), SimError> {
        scheduler::initialize(state);
        let mut entry = LogEntry::new(state.time, LogKind::BattleStart);
        for entity in state.registry.iter() {
            entry.snapshot(entity);
        }
        entry.skill_points = state.skill_points;
        state.record(entry);
        self.emit(state, &Event::new(EventKind::BattleStart))?;
        self.drain_pending(state)
    }

    /// Executes queued follow-up actions in FIFO order.
    ///
    /// Stops early once the battle is decided. Draining more than
    /// `max_pending` actions records a diagnostic and discards the rest.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if a handler fails.
    pub fn drain_pending(&self, state: &mut GameState) -> Result<(), SimError> {
        let mut drained = 0;
        while let Some(action) = state.pending.pop_front() {
            if drained >= self.limits.max_pending {
                state.pending.clear();
                state.record_cap(Phase::DrainPending, self.limits.max_pending);
                break;
            }
            drained += 1;
            self.execute(state, &action)?;
            if state.decided_outcome().is_some() {
                state.pending.clear();
                break;
            }
        }
        Ok(())
    }
}
