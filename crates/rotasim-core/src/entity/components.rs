//! Component value types carried by every combat entity.
//!
//! These are small, data-only structs and enums: the combat element of an
//! entity, the set of elements it is weak to, and the rotation config that
//! drives a character's action choice.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Element
// =============================================================================

/// Combat element of an entity and of the damage it deals.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Physical damage; breaks inflict Bleed.
    Physical,
    /// Fire damage; breaks inflict Burn.
    Fire,
    /// Ice damage; breaks inflict Freeze.
    Ice,
    /// Lightning damage; breaks inflict Shock.
    Lightning,
    /// Wind damage; breaks inflict Wind Shear.
    Wind,
    /// Quantum damage; breaks inflict Entanglement.
    Quantum,
    /// Imaginary damage; breaks inflict Imprisonment.
    Imaginary,
}

impl Element {
    /// All elements in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Physical,
        Self::Fire,
        Self::Ice,
        Self::Lightning,
        Self::Wind,
        Self::Quantum,
        Self::Imaginary,
    ];

    /// Returns the weakness flag corresponding to this element.
    #[must_use]
    pub const fn weakness(self) -> Weaknesses {
        match self {
            Self::Physical => Weaknesses::PHYSICAL,
            Self::Fire => Weaknesses::FIRE,
            Self::Ice => Weaknesses::ICE,
            Self::Lightning => Weaknesses::LIGHTNING,
            Self::Wind => Weaknesses::WIND,
            Self::Quantum => Weaknesses::QUANTUM,
            Self::Imaginary => Weaknesses::IMAGINARY,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Physical => "Physical",
            Self::Fire => "Fire",
            Self::Ice => "Ice",
            Self::Lightning => "Lightning",
            Self::Wind => "Wind",
            Self::Quantum => "Quantum",
            Self::Imaginary => "Imaginary",
        };
        write!(f, "{name}")
    }
}

bitflags! {
    /// Set of elements an entity is weak to.
    ///
    /// Toughness is only reduced by hits whose element is in this set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Weaknesses: u8 {
        /// Weak to Physical.
        const PHYSICAL = 1 << 0;
        /// Weak to Fire.
        const FIRE = 1 << 1;
        /// Weak to Ice.
        const ICE = 1 << 2;
        /// Weak to Lightning.
        const LIGHTNING = 1 << 3;
        /// Weak to Wind.
        const WIND = 1 << 4;
        /// Weak to Quantum.
        const QUANTUM = 1 << 5;
        /// Weak to Imaginary.
        const IMAGINARY = 1 << 6;
    }
}

impl Weaknesses {
    /// Builds a weakness set from a list of elements.
    #[must_use]
    pub fn from_elements(elements: &[Element]) -> Self {
        elements
            .iter()
            .fold(Self::empty(), |acc, element| acc | element.weakness())
    }

    /// Returns true if the set contains the given element.
    #[must_use]
    pub const fn has(self, element: Element) -> bool {
        self.contains(element.weakness())
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// When a character fires its ultimate.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UltStrategy {
    /// Fire as an interrupt as soon as energy is full.
    #[default]
    Immediate,
    /// Fire as the character's own turn action once energy is full.
    OnTurn,
    /// Never fire automatically. External commands may still dispatch it.
    Manual,
}

/// Per-character action-choice configuration.
///
/// The rotation string is read one character per turn: `s` selects the skill
/// when skill points allow, any other character selects the basic attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Rotation pattern, e.g. `"sbb"`.
    pub sequence: String,
    /// Ultimate firing strategy.
    pub ult_strategy: UltStrategy,
    /// Turns the ultimate is locked after use.
    pub ult_cooldown: u32,
    /// Roster index of the preferred ally target for ally-targeted skills.
    pub skill_target: Option<usize>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            sequence: "s".to_string(),
            ult_strategy: UltStrategy::Immediate,
            ult_cooldown: 0,
            skill_target: None,
        }
    }
}

impl RotationConfig {
    /// Returns true if the rotation slot at `cursor` requests the skill.
    #[must_use]
    pub fn wants_skill(&self, cursor: usize) -> bool {
        let len = self.sequence.chars().count();
        if len == 0 {
            return false;
        }
        self.sequence.chars().nth(cursor % len) == Some('s')
    }

    /// Returns the cursor that follows `cursor`.
    #[must_use]
    pub fn next_cursor(&self, cursor: usize) -> usize {
        let len = self.sequence.chars().count().max(1);
        (cursor + 1) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod weakness_tests {
        use super::*;

        #[test]
        fn from_elements_collects_flags() {
            let weak = Weaknesses::from_elements(&[Element::Fire, Element::Quantum]);
            assert!(weak.has(Element::Fire));
            assert!(weak.has(Element::Quantum));
            assert!(!weak.has(Element::Ice));
        }

        #[test]
        fn empty_set_has_nothing() {
            let weak = Weaknesses::default();
            assert!(Element::ALL.iter().all(|e| !weak.has(*e)));
        }
    }

    mod rotation_tests {
        use super::*;

        #[test]
        fn rotation_cycles_through_sequence() {
            let rotation = RotationConfig {
                sequence: "sbb".to_string(),
                ..RotationConfig::default()
            };
            assert!(rotation.wants_skill(0));
            assert!(!rotation.wants_skill(1));
            assert!(!rotation.wants_skill(2));
            assert!(rotation.wants_skill(3));
            assert_eq!(rotation.next_cursor(2), 0);
        }

        #[test]
        fn empty_rotation_never_skills() {
            let rotation = RotationConfig {
                sequence: String::new(),
                ..RotationConfig::default()
            };
            assert!(!rotation.wants_skill(0));
            assert_eq!(rotation.next_cursor(0), 0);
        }

        #[test]
        fn rotation_deserializes_with_defaults() {
            let rotation: RotationConfig =
                serde_json::from_str(r#"{"sequence":"sb","ult_strategy":"on_turn"}"#).unwrap();
            assert_eq!(rotation.ult_strategy, UltStrategy::OnTurn);
            assert_eq!(rotation.ult_cooldown, 0);
        }
    }
}
