//! A gameplay host that records what node events asked for.
//!
//! The runner has no game attached, so granted abilities, active effects and
//! float properties are tracked in maps, logged, and printed in the final
//! report.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use skilltree_engine::{GameplayHost, HostError};

/// Records abilities, effects and property values.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingHost {
    /// Granted abilities and their level.
    pub abilities: BTreeMap<String, u32>,
    /// Active effects and their level.
    pub effects: BTreeMap<String, u32>,
    /// Accumulated float properties.
    pub properties: BTreeMap<String, Decimal>,
}

impl GameplayHost for RecordingHost {
    fn grant_ability(&mut self, ability: &str, level: u32) -> Result<(), HostError> {
        tracing::info!(ability, level, "Ability granted");
        self.abilities.insert(ability.to_owned(), level);
        Ok(())
    }

    fn revoke_ability(&mut self, ability: &str) -> Result<(), HostError> {
        if self.abilities.remove(ability).is_none() {
            return Err(HostError::UnknownTarget(ability.to_owned()));
        }
        tracing::info!(ability, "Ability revoked");
        Ok(())
    }

    fn apply_effect(&mut self, effect: &str, level: u32) -> Result<(), HostError> {
        tracing::info!(effect, level, "Effect applied");
        self.effects.insert(effect.to_owned(), level);
        Ok(())
    }

    fn remove_effect(&mut self, effect: &str) -> Result<(), HostError> {
        if self.effects.remove(effect).is_none() {
            return Err(HostError::UnknownTarget(effect.to_owned()));
        }
        tracing::info!(effect, "Effect removed");
        Ok(())
    }

    fn modify_float_property(&mut self, property: &str, delta: Decimal) -> Result<(), HostError> {
        let value = self.properties.entry(property.to_owned()).or_default();
        *value = value
            .checked_add(delta)
            .ok_or_else(|| HostError::Rejected(format!("{property} overflowed")))?;
        tracing::info!(property, %delta, value = %*value, "Property modified");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn revoking_unknown_ability_is_reported() {
        let mut host = RecordingHost::default();
        host.grant_ability("Slash", 1).unwrap();
        assert!(host.revoke_ability("Slash").is_ok());
        assert_eq!(
            host.revoke_ability("Slash"),
            Err(HostError::UnknownTarget("Slash".to_owned()))
        );
    }

    #[test]
    fn property_deltas_accumulate() {
        let mut host = RecordingHost::default();
        host.modify_float_property("MoveSpeed", Decimal::new(15, 1)).unwrap();
        host.modify_float_property("MoveSpeed", Decimal::new(-5, 1)).unwrap();
        assert_eq!(host.properties.get("MoveSpeed").copied(), Some(Decimal::ONE));
    }
}
