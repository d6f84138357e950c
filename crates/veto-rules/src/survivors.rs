//! Map availability derived from the action history.
//!
//! A map is available while no ban and no pick references it. Nothing here
//! is cached; callers always pass the history they are reasoning about.

use veto_types::{Action, ActionKind, GameMap, MapId, MapPool};

/// Whether any recorded action references the map.
pub fn is_used(actions: &[Action], map_id: MapId) -> bool {
    actions.iter().any(|a| a.map_id == map_id)
}

/// Whether the map belongs to the pool and has not been banned or picked.
pub fn is_available(pool: &MapPool, actions: &[Action], map_id: MapId) -> bool {
    pool.contains(map_id) && !is_used(actions, map_id)
}

/// Pool maps not yet banned or picked, in pool order.
pub fn survivors<'a>(pool: &'a MapPool, actions: &[Action]) -> Vec<&'a GameMap> {
    pool.maps
        .iter()
        .filter(|m| !is_used(actions, m.id))
        .collect()
}

/// Number of pool maps still available.
pub fn survivor_count(pool: &MapPool, actions: &[Action]) -> usize {
    pool.maps.iter().filter(|m| !is_used(actions, m.id)).count()
}

/// Number of picks in the history.
pub fn pick_count(actions: &[Action]) -> usize {
    actions
        .iter()
        .filter(|a| a.kind == ActionKind::Pick)
        .count()
}

/// Banned maps in step order.
pub fn banned_maps(actions: &[Action]) -> Vec<MapId> {
    maps_of_kind(actions, ActionKind::Ban)
}

/// Picked maps in step order.
pub fn picked_maps(actions: &[Action]) -> Vec<MapId> {
    maps_of_kind(actions, ActionKind::Pick)
}

fn maps_of_kind(actions: &[Action], kind: ActionKind) -> Vec<MapId> {
    actions
        .iter()
        .filter(|a| a.kind == kind)
        .map(|a| a.map_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pool, record};
    use veto_types::Team;

    #[test]
    fn fresh_pool_is_fully_available() {
        let pool = pool(7);
        assert_eq!(survivor_count(&pool, &[]), 7);
        assert!(pool.maps.iter().all(|m| is_available(&pool, &[], m.id)));
    }

    #[test]
    fn bans_and_picks_both_remove_maps() {
        let pool = pool(5);
        let mut actions = Vec::new();
        let ids: Vec<MapId> = pool.maps.iter().map(|m| m.id).collect();
        if let (Some(first), Some(second)) = (ids.first(), ids.get(1)) {
            record(&mut actions, *first, Team::A, ActionKind::Ban);
            record(&mut actions, *second, Team::B, ActionKind::Pick);
            assert!(!is_available(&pool, &actions, *first));
            assert!(!is_available(&pool, &actions, *second));
            assert_eq!(banned_maps(&actions), vec![*first]);
            assert_eq!(picked_maps(&actions), vec![*second]);
        }
        assert_eq!(survivor_count(&pool, &actions), 3);
        assert_eq!(pick_count(&actions), 1);
    }

    #[test]
    fn maps_outside_the_pool_are_never_available() {
        let pool = pool(3);
        assert!(!is_available(&pool, &[], MapId::new()));
    }

    #[test]
    fn survivors_keep_pool_order() {
        let pool = pool(4);
        let mut actions = Vec::new();
        if let Some(second) = pool.maps.get(1) {
            record(&mut actions, second.id, Team::A, ActionKind::Ban);
        }
        let names: Vec<&str> = survivors(&pool, &actions)
            .iter()
            .map(|m| m.slug.as_str())
            .collect();
        assert_eq!(names, ["map-0", "map-2", "map-3"]);
    }
}
