//! Resolvers: the in-place kernel operations that turn actions into state.
//!
//! Every resolver is an `impl Kernel` block operating on `&mut GameState`, so
//! ability kits reach them through [`HandlerContext::kernel`] while a
//! transition is in progress.
//!
//! # Architecture
//!
//! - `ability`: ability use (costs, targeting, hits, support, side-effects)
//! - `combat`: damage, toughness and weakness break, healing, shields, effect
//!   application with event publishing
//! - `status`: turn-start toughness recovery, DoT ticks and crowd control
//! - `summon`: summon creation and dismissal
//!
//! # Invariants
//!
//! - Missing or dead entities turn every resolver into a no-op
//! - Random draws come only from the state's RNG, in a fixed order
//! - Persisted HP never leaves `[0, max_hp]`
//!
//! [`HandlerContext::kernel`]: crate::handler::HandlerContext::kernel

mod ability;
mod combat;
mod status;
mod summon;

pub use ability::{pick_target, DEFAULT_AGGRO};
pub use combat::{HitOutcome, HitRequest};
pub use status::FREEZE_CATCH_UP;
pub use summon::SummonSpec;
