//! Append-only battle log.
//!
//! The log is write-only from the kernel's point of view: entries are
//! appended and never read back to make decisions. Each entry carries enough
//! resource and effect snapshots to be read on its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::action::ActionKind;
use crate::damage::DamageBreakdown;
use crate::entity::{Entity, EntityId};

/// What a log line records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Battle initialisation.
    BattleStart,
    /// An ability resolved.
    Action(ActionKind),
    /// Damage outside an ability, e.g. a kit's additional hit.
    Damage,
    /// A damage-over-time tick.
    Dot,
    /// A weakness break.
    Break,
    /// A crowd-control tick on the afflicted entity's turn.
    CrowdControl,
    /// A turn lost to crowd control.
    TurnSkipped,
    /// Toughness restored at turn start.
    Recovery,
    /// An entity was defeated.
    Defeat,
    /// A summon entered the battle.
    Summon,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BattleStart => write!(f, "Battle Start"),
            Self::Action(kind) => write!(f, "{kind}"),
            Self::Damage => write!(f, "Additional DMG"),
            Self::Dot => write!(f, "DoT"),
            Self::Break => write!(f, "Weakness Break"),
            Self::CrowdControl => write!(f, "Crowd Control"),
            Self::TurnSkipped => write!(f, "Turn Skipped"),
            Self::Recovery => write!(f, "Toughness Recovered"),
            Self::Defeat => write!(f, "Defeated"),
            Self::Summon => write!(f, "Summoned"),
        }
    }
}

/// Resource state of one entity after the logged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Entity.
    pub entity: EntityId,
    /// Display name.
    pub name: String,
    /// HP.
    pub hp: f64,
    /// Maximum HP.
    pub max_hp: f64,
    /// Shield pool.
    pub shield: f64,
    /// Energy.
    pub energy: f64,
    /// Toughness.
    pub toughness: f64,
    /// Remaining action value.
    pub action_value: f64,
}

impl ResourceSnapshot {
    /// Captures an entity's resources.
    #[must_use]
    pub fn of(entity: &Entity) -> Self {
        Self {
            entity: entity.id(),
            name: entity.name.clone(),
            hp: entity.hp,
            max_hp: entity.max_hp(),
            shield: entity.shield,
            energy: entity.energy,
            toughness: entity.toughness,
            action_value: entity.action_value,
        }
    }
}

/// One active effect at the time of the logged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSnapshot {
    /// Host entity.
    pub host: EntityId,
    /// Effect name.
    pub name: String,
    /// Remaining duration.
    pub remaining: i32,
    /// Stack count.
    pub stacks: u32,
}

/// One line of the battle log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Global clock.
    pub time: f64,
    /// Acting entity.
    pub actor: Option<EntityId>,
    /// Acting entity's name.
    pub actor_name: String,
    /// What happened.
    pub kind: LogKind,
    /// Names of the affected entities.
    pub targets: Vec<String>,
    /// Total damage dealt.
    pub damage: f64,
    /// Total healing done.
    pub healing: f64,
    /// Total shield granted.
    pub shield: f64,
    /// Team skill points afterwards.
    pub skill_points: u32,
    /// Resources of the actor and targets afterwards.
    pub resources: Vec<ResourceSnapshot>,
    /// Effects on the actor and targets afterwards.
    pub effects: Vec<EffectSnapshot>,
    /// Per-hit damage breakdowns.
    pub breakdown: Vec<DamageBreakdown>,
    /// Free-form note.
    pub details: Option<String>,
}

impl LogEntry {
    /// Creates an empty entry.
    #[must_use]
    pub fn new(time: f64, kind: LogKind) -> Self {
        Self {
            time,
            actor: None,
            actor_name: String::new(),
            kind,
            targets: Vec::new(),
            damage: 0.0,
            healing: 0.0,
            shield: 0.0,
            skill_points: 0,
            resources: Vec::new(),
            effects: Vec::new(),
            breakdown: Vec::new(),
            details: None,
        }
    }

    /// Builder: sets the actor.
    #[must_use]
    pub fn with_actor(mut self, actor: &Entity) -> Self {
        self.actor = Some(actor.id());
        self.actor_name.clone_from(&actor.name);
        self
    }

    /// Builder: sets a note.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Records resource and effect snapshots of `entity`.
    pub fn snapshot(&mut self, entity: &Entity) {
        if self.resources.iter().any(|r| r.entity == entity.id()) {
            return;
        }
        self.resources.push(ResourceSnapshot::of(entity));
        self.effects.extend(entity.effects.iter().map(|effect| EffectSnapshot {
            host: entity.id(),
            name: effect.name.clone(),
            remaining: effect.remaining,
            stacks: effect.stack_count(),
        }));
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>7.1}] ", self.time)?;
        if !self.actor_name.is_empty() {
            write!(f, "{} ", self.actor_name)?;
        }
        write!(f, "{}", self.kind)?;
        if !self.targets.is_empty() {
            write!(f, " -> {}", self.targets.join(", "))?;
        }
        if self.damage > 0.0 {
            write!(f, " | DMG {:.0}", self.damage)?;
        }
        if self.healing > 0.0 {
            write!(f, " | HEAL {:.0}", self.healing)?;
        }
        if self.shield > 0.0 {
            write!(f, " | SHIELD {:.0}", self.shield)?;
        }
        write!(f, " | SP {}", self.skill_points)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

/// Shared, append-only list of log entries.
///
/// Cloning the log is a pointer copy. Appending copies the backing vector only
/// when another snapshot still holds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionLog(Arc<Vec<LogEntry>>);

impl ActionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: LogEntry) {
        tracing::trace!(line = %entry, "log");
        Arc::make_mut(&mut self.0).push(entry);
    }

    /// Entries in order.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.0
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
