//! Ready-made catalogs, players and instants for tests.

use grove_catalog::Catalog;
use grove_core::{FamilyId, Millis, PlayerId, MS_PER_HOUR};
use grove_engine::GameState;

/// A fixed, far-from-epoch instant so day boundaries are not accidental.
pub const EPOCH: Millis = Millis(1_700_000_000_000);

/// The compiled-in catalog.
pub fn builtin_catalog() -> Catalog {
    match Catalog::builtin() {
        Ok(catalog) => catalog,
        Err(err) => panic!("builtin catalog must load: {err}"),
    }
}

/// A freshly created player whose referral code is derived from the id.
pub fn fresh_player(catalog: &Catalog, id: u64, now: Millis) -> GameState {
    GameState::new_player(catalog, PlayerId(id), format!("TEST{id:04}"), now)
}

/// Parse a family key known to be valid.
pub fn family(name: &str) -> FamilyId {
    match FamilyId::parse(name) {
        Ok(id) => id,
        Err(err) => panic!("bad family fixture '{name}': {err}"),
    }
}

/// `base` moved forward by whole hours.
pub fn hours_after(base: Millis, hours: u64) -> Millis {
    base.advance(hours * MS_PER_HOUR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_player_uses_starter_layout() {
        let catalog = builtin_catalog();
        let state = fresh_player(&catalog, 3, EPOCH);
        assert_eq!(state.referral.code, "TEST0003");
        assert_eq!(state.grid.count(), catalog.rules().starter.creatures.len());
        assert_eq!(hours_after(EPOCH, 2).since(EPOCH), 2 * MS_PER_HOUR);
    }
}
