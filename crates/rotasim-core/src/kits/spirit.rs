//! Spirit kit: the owner enters battle with a summoned companion.
//!
//! The spirit inherits the owner's ATK, cannot be targeted by enemies and
//! acts on its own turns with its skill. The owner's ultimate pulls the
//! spirit's next turn forward.

use crate::ability::{AbilitySet, AbilitySpec};
use crate::action::Action;
use crate::entity::{Entity, EntityId};
use crate::error::HandlerError;
use crate::event::{Event, EventKind};
use crate::handler::{AbilityKit, HandlerContext, KitId};
use crate::resolver::SummonSpec;
use crate::state::GameState;
use crate::stats::{StatBlock, StatKey};

const SUBSCRIPTIONS: &[EventKind] = &[EventKind::BattleStart, EventKind::UltimateUsed];

/// Battle-start summon.
#[derive(Debug, Clone)]
pub struct SpiritKit {
    id: KitId,
    spec: SummonSpec,
    ult_advance: f64,
}

impl SpiritKit {
    /// Default catalog id.
    pub const ID: &'static str = "spirit";

    /// Display name of the default spirit.
    pub const SPIRIT_NAME: &'static str = "Spirit";

    /// Creates the kit with the default spirit: speed 80, the owner's ATK
    /// and crit stats, half the owner's HP and a 150% ATK skill.
    #[must_use]
    pub fn new() -> Self {
        let spec = SummonSpec {
            name: Self::SPIRIT_NAME.to_string(),
            stats: StatBlock::new().with(StatKey::Spd, 80.0),
            owner_ratios: StatBlock::new()
                .with(StatKey::Atk, 1.0)
                .with(StatKey::Hp, 0.5)
                .with(StatKey::CritRate, 1.0)
                .with(StatKey::CritDmg, 1.0),
            abilities: AbilitySet {
                skill: Some(AbilitySpec::single_target("Pounce", 1.5, 20.0, 0.0)),
                ..AbilitySet::default()
            },
            untargetable: true,
            ..SummonSpec::default()
        };
        Self {
            id: KitId::new(Self::ID),
            spec,
            ult_advance: 0.5,
        }
    }

    /// Builder: replaces the summoned template.
    #[must_use]
    pub fn with_spec(mut self, spec: SummonSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Template of the summoned spirit.
    #[must_use]
    pub fn spec(&self) -> &SummonSpec {
        &self.spec
    }

    fn spirit_of(&self, state: &GameState, owner: EntityId) -> Option<EntityId> {
        state
            .registry
            .iter()
            .find(|e| e.owner == Some(owner) && e.name == self.spec.name && e.is_alive())
            .map(Entity::id)
    }
}

impl Default for SpiritKit {
    fn default() -> Self {
        Self::new()
    }
}

impl AbilityKit for SpiritKit {
    fn id(&self) -> &KitId {
        &self.id
    }

    fn subscriptions(&self) -> &[EventKind] {
        SUBSCRIPTIONS
    }

    fn on_event(
        &self,
        ctx: &HandlerContext<'_>,
        event: &Event,
        mut state: GameState,
    ) -> Result<GameState, HandlerError> {
        let owner = ctx.owner();
        match event.kind {
            EventKind::BattleStart => {
                ctx.kernel().summon(&mut state, owner, &self.spec)?;
            }
            EventKind::UltimateUsed if event.source == Some(owner) => {
                if let Some(spirit) = self.spirit_of(&state, owner) {
                    state.enqueue(Action::Advance {
                        target: spirit,
                        fraction: self.ult_advance,
                    });
                }
            }
            _ => {}
        }
        Ok(state)
    }
}
