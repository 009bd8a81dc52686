//! Standard ability kits.
//!
//! Ready-made [`AbilityKit`](crate::handler::AbilityKit) implementations for
//! the recurring character mechanics:
//!
//! - [`CounterKit`]: follow-up attack against an enemy that hits the owner or
//!   an ally carrying the owner's shield
//! - [`ResurgenceKit`]: an extra action after the owner defeats an enemy on
//!   its own turn
//! - [`BenedictionKit`]: the owner's ally-targeted skill buffs the target and
//!   pulls its turn forward
//! - [`FieldKit`]: the owner's ultimate opens a field that lends a share of
//!   the owner's ATK to every ally while it lasts
//! - [`SpiritKit`]: the owner summons a companion at battle start
//!
//! # Registration
//!
//! Use [`standard_catalog`] to get a catalog with every kit registered under
//! its default id. Entities opt in by naming a kit id in their config.

mod benediction;
mod counter;
mod field;
mod resurgence;
mod spirit;

use std::sync::Arc;

use crate::handler::KitCatalog;

pub use benediction::BenedictionKit;
pub use counter::CounterKit;
pub use field::FieldKit;
pub use resurgence::{ResurgenceKit, RESURGENCE, RESURGENCE_BOOST};
pub use spirit::SpiritKit;

/// Catalog with every standard kit under its default id.
///
/// # Example
///
/// ```
/// use rotasim_core::handler::KitId;
/// use rotasim_core::kits::standard_catalog;
///
/// let catalog = standard_catalog();
/// assert!(catalog.contains(&KitId::new("counter")));
/// assert_eq!(catalog.len(), 5);
/// ```
#[must_use]
pub fn standard_catalog() -> KitCatalog {
    KitCatalog::new()
        .with(Arc::new(BenedictionKit::new()))
        .with(Arc::new(CounterKit::new()))
        .with(Arc::new(FieldKit::new()))
        .with(Arc::new(ResurgenceKit::new()))
        .with(Arc::new(SpiritKit::new()))
}
