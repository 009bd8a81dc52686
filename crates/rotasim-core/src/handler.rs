//! Ability kits and handler registrations.
//!
//! This module provides the pluggable side of the event bus:
//! - [`AbilityKit`]: the trait a character, enemy or equipment module
//!   implements to react to events
//! - [`KitCatalog`]: immutable lookup table of kits keyed by [`KitId`]
//! - [`HandlerRegistration`]: data-only record of one subscribed handler
//! - [`HandlerTable`]: ordered registrations stored in the game state
//! - [`Cooldowns`]: per-handler trigger cooldowns
//!
//! # Architecture
//!
//! Registrations are plain data and live in [`GameState`], so the state stays
//! cloneable and serializable. The logic they point to lives in the catalog,
//! which the kernel owns and shares immutably. When an event is published the
//! kernel walks the subscribed registrations in registration order, resolves
//! each one's kit in the catalog and threads the state through
//! [`AbilityKit::on_event`].
//!
//! # Example
//!
//! ```
//! use rotasim_core::entity::EntityId;
//! use rotasim_core::error::HandlerError;
//! use rotasim_core::event::{Event, EventKind};
//! use rotasim_core::handler::{AbilityKit, HandlerContext, KitCatalog, KitId};
//! use rotasim_core::state::GameState;
//! use std::sync::Arc;
//!
//! struct Cheer {
//!     id: KitId,
//! }
//!
//! impl AbilityKit for Cheer {
//!     fn id(&self) -> &KitId {
//!         &self.id
//!     }
//!
//!     fn subscriptions(&self) -> &[EventKind] {
//!         &[EventKind::BattleStart]
//!     }
//!
//!     fn on_event(
//!         &self,
//!         _ctx: &HandlerContext<'_>,
//!         _event: &Event,
//!         state: GameState,
//!     ) -> Result<GameState, HandlerError> {
//!         Ok(state)
//!     }
//! }
//!
//! let mut catalog = KitCatalog::new();
//! catalog.register(Arc::new(Cheer { id: KitId::new("cheer") }));
//!
//! let registration = catalog
//!     .get(&KitId::new("cheer"))
//!     .unwrap()
//!     .register(EntityId::new(0), 80, 0);
//! assert_eq!(registration.id.as_str(), "cheer#0");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{ConfigError, HandlerError};
use crate::event::{Event, EventKind};
use crate::kernel::Kernel;
use crate::state::GameState;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of an ability kit in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KitId(String);

impl KitId {
    /// Creates a kit id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KitId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of one handler registration.
///
/// Defaults to `"{kit}#{owner}"`, so one kit registers at most once per
/// owner unless it picks its own ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(String);

impl HandlerId {
    /// Creates a handler id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Default id for `kit` registered on `owner`.
    #[must_use]
    pub fn for_owner(kit: &KitId, owner: EntityId) -> Self {
        Self(format!("{kit}#{owner}"))
    }

    /// Id for `kit` registered as equipment on `owner`.
    #[must_use]
    pub fn for_equipment(kit: &KitId, owner: EntityId) -> Self {
        Self(format!("{kit}#{owner}/equipment"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An equipment kit carried by an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquippedKit {
    /// Kit providing the equipment's handler.
    pub kit: KitId,
    /// Upgrade rank of the equipment piece.
    pub rank: u32,
}

// =============================================================================
// Registration
// =============================================================================

/// A subscribed handler: which kit runs, for whom, on which events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRegistration {
    /// Unique handler id.
    pub id: HandlerId,
    /// Entity the handler acts for.
    pub owner: EntityId,
    /// Kit providing the logic.
    pub kit: KitId,
    /// Event kinds delivered to the handler.
    pub subscribes_to: Vec<EventKind>,
    /// Owner level at registration.
    pub level: u32,
    /// Owner rank at registration.
    pub rank: u32,
}

impl HandlerRegistration {
    /// Creates a registration with the default id for `(kit, owner)`.
    #[must_use]
    pub fn new(kit: KitId, owner: EntityId, subscribes_to: Vec<EventKind>) -> Self {
        Self {
            id: HandlerId::for_owner(&kit, owner),
            owner,
            kit,
            subscribes_to,
            level: 80,
            rank: 0,
        }
    }

    /// Builder: overrides the handler id.
    #[must_use]
    pub fn with_id(mut self, id: HandlerId) -> Self {
        self.id = id;
        self
    }

    /// Builder: sets level and rank.
    #[must_use]
    pub const fn with_level(mut self, level: u32, rank: u32) -> Self {
        self.level = level;
        self.rank = rank;
        self
    }

    /// Returns true if the handler subscribes to `kind`.
    #[must_use]
    pub fn listens_to(&self, kind: EventKind) -> bool {
        self.subscribes_to.contains(&kind)
    }
}

// =============================================================================
// Kit trait
// =============================================================================

/// Context passed to a kit for one event delivery.
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    kernel: &'a Kernel,
    registration: &'a HandlerRegistration,
}

impl<'a> HandlerContext<'a> {
    /// Creates a context for one delivery.
    #[must_use]
    pub const fn new(kernel: &'a Kernel, registration: &'a HandlerRegistration) -> Self {
        Self {
            kernel,
            registration,
        }
    }

    /// Kernel, for damage, effect and scheduler operations.
    #[must_use]
    pub const fn kernel(&self) -> &'a Kernel {
        self.kernel
    }

    /// The registration being delivered to.
    #[must_use]
    pub const fn registration(&self) -> &'a HandlerRegistration {
        self.registration
    }

    /// Handler id.
    #[must_use]
    pub const fn handler_id(&self) -> &'a HandlerId {
        &self.registration.id
    }

    /// Entity the handler acts for.
    #[must_use]
    pub const fn owner(&self) -> EntityId {
        self.registration.owner
    }

    /// Owner level at registration.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.registration.level
    }

    /// Owner rank at registration.
    #[must_use]
    pub const fn rank(&self) -> u32 {
        self.registration.rank
    }

    /// Puts this handler on cooldown for `turns` of its owner's turn ends.
    pub fn start_cooldown(&self, state: &mut GameState, turns: u32) {
        state
            .cooldowns
            .start(self.registration.id.clone(), self.registration.owner, turns);
    }
}

impl fmt::Debug for HandlerContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("registration", self.registration)
            .finish_non_exhaustive()
    }
}

/// Game logic for a character, enemy, equipment piece or effect.
///
/// # Implementation Guidelines
///
/// 1. **Pure transitions**: `on_event` receives the state by value and
///    returns the next state. It must not keep references across calls.
///
/// 2. **Determinism**: draw randomness only from `state.rng`.
///
/// 3. **Errors propagate**: a returned error aborts the whole publish call.
///    The caller keeps its pre-call state.
pub trait AbilityKit: Send + Sync {
    /// Catalog key.
    fn id(&self) -> &KitId;

    /// Event kinds the kit's registrations listen to.
    fn subscriptions(&self) -> &[EventKind];

    /// Builds the registration for one owner.
    fn register(&self, owner: EntityId, level: u32, rank: u32) -> HandlerRegistration {
        HandlerRegistration::new(self.id().clone(), owner, self.subscriptions().to_vec())
            .with_level(level, rank)
    }

    /// Reacts to one event.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the kit cannot complete its transition.
    fn on_event(
        &self,
        ctx: &HandlerContext<'_>,
        event: &Event,
        state: GameState,
    ) -> Result<GameState, HandlerError>;
}

// =============================================================================
// Catalog
// =============================================================================

/// Lookup table of ability kits keyed by id.
#[derive(Clone, Default)]
pub struct KitCatalog {
    kits: BTreeMap<KitId, Arc<dyn AbilityKit>>,
}

impl KitCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a kit, replacing any kit with the same id.
    pub fn register(&mut self, kit: Arc<dyn AbilityKit>) {
        self.kits.insert(kit.id().clone(), kit);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, kit: Arc<dyn AbilityKit>) -> Self {
        self.register(kit);
        self
    }

    /// Looks up a kit.
    #[must_use]
    pub fn get(&self, id: &KitId) -> Option<&Arc<dyn AbilityKit>> {
        self.kits.get(id)
    }

    /// Returns true if the catalog has a kit with the given id.
    #[must_use]
    pub fn contains(&self, id: &KitId) -> bool {
        self.kits.contains_key(id)
    }

    /// Iterates kit ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &KitId> + '_ {
        self.kits.keys()
    }

    /// Number of kits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kits.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kits.is_empty()
    }
}

impl fmt::Debug for KitCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KitCatalog")
            .field("kits", &self.kits.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Registers the kit of every entity that names one, in roster order.
///
/// Each entity's own kit comes first, followed by its equipment kits in
/// slot order under [`HandlerId::for_equipment`] ids. Registrations already
/// present are skipped, so calling this twice is harmless.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownKit`] if an entity names a kit missing from
/// `catalog`.
pub fn register_kits(state: &mut GameState, catalog: &KitCatalog) -> Result<usize, ConfigError> {
    let mut registrations = Vec::new();
    for entity in state.registry.iter() {
        let lookup = |kit_id: &KitId| {
            catalog.get(kit_id).ok_or_else(|| ConfigError::UnknownKit {
                name: entity.name.clone(),
                kit: kit_id.clone(),
            })
        };
        if let Some(kit_id) = &entity.kit {
            registrations.push(lookup(kit_id)?.register(entity.id(), entity.level, entity.rank));
        }
        for piece in &entity.equipment {
            let registration = lookup(&piece.kit)?
                .register(entity.id(), entity.level, piece.rank)
                .with_id(HandlerId::for_equipment(&piece.kit, entity.id()));
            registrations.push(registration);
        }
    }
    let mut added = 0;
    for registration in registrations {
        if !state.handlers.contains(&registration.id) && state.handlers.register(registration) {
            added += 1;
        }
    }
    Ok(added)
}

// =============================================================================
// Handler table
// =============================================================================

/// Ordered handler registrations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerTable {
    registrations: Vec<HandlerRegistration>,
}

impl HandlerTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a registration. A duplicate id is skipped with a warning.
    ///
    /// Returns true if the registration was added.
    pub fn register(&mut self, registration: HandlerRegistration) -> bool {
        if self.contains(&registration.id) {
            tracing::warn!(handler = %registration.id, "duplicate handler registration skipped");
            return false;
        }
        tracing::debug!(
            handler = %registration.id,
            owner = %registration.owner,
            kit = %registration.kit,
            "handler registered"
        );
        self.registrations.push(registration);
        true
    }

    /// Removes a registration. Returns true if it existed.
    pub fn unregister(&mut self, id: &HandlerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| &r.id != id);
        before != self.registrations.len()
    }

    /// Removes every registration owned by `owner`.
    pub fn unregister_owner(&mut self, owner: EntityId) {
        self.registrations.retain(|r| r.owner != owner);
    }

    /// Returns true if a registration with the given id exists.
    #[must_use]
    pub fn contains(&self, id: &HandlerId) -> bool {
        self.registrations.iter().any(|r| &r.id == id)
    }

    /// Snapshot of the registrations subscribed to `kind`, in registration
    /// order.
    #[must_use]
    pub fn subscribed(&self, kind: EventKind) -> Vec<HandlerRegistration> {
        self.registrations
            .iter()
            .filter(|r| r.listens_to(kind))
            .cloned()
            .collect()
    }

    /// Returns true if any registration listens to `kind`.
    #[must_use]
    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.registrations.iter().any(|r| r.listens_to(kind))
    }

    /// Iterates registrations in order.
    pub fn iter(&self) -> impl Iterator<Item = &HandlerRegistration> + '_ {
        self.registrations.iter()
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

// =============================================================================
// Cooldowns
// =============================================================================

/// An active handler cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    /// Entity whose turn ends decrement the cooldown.
    pub owner: EntityId,
    /// Turn ends remaining.
    pub remaining: u32,
}

/// Handler cooldowns keyed by handler id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cooldowns(BTreeMap<HandlerId, Cooldown>);

impl Cooldowns {
    /// Starts or restarts a cooldown. Zero turns clears it.
    pub fn start(&mut self, id: HandlerId, owner: EntityId, turns: u32) {
        if turns == 0 {
            self.0.remove(&id);
        } else {
            self.0.insert(
                id,
                Cooldown {
                    owner,
                    remaining: turns,
                },
            );
        }
    }

    /// Returns true while the handler is on cooldown.
    #[must_use]
    pub fn is_active(&self, id: &HandlerId) -> bool {
        self.0.get(id).is_some_and(|c| c.remaining > 0)
    }

    /// Remaining turns for a handler, zero when inactive.
    #[must_use]
    pub fn remaining(&self, id: &HandlerId) -> u32 {
        self.0.get(id).map_or(0, |c| c.remaining)
    }

    /// Decrements every cooldown owned by `owner`, dropping expired ones.
    pub fn tick_owner(&mut self, owner: EntityId) {
        for cooldown in self.0.values_mut().filter(|c| c.owner == owner) {
            cooldown.remaining = cooldown.remaining.saturating_sub(1);
        }
        self.0.retain(|_, c| c.remaining > 0);
    }
}
