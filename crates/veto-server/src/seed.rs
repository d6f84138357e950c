//! Built-in map catalog for the in-memory backend.
//!
//! A fresh process has no pools to negotiate from, so the memory backend
//! starts with the full map list and the competitive rotation.

use veto_db::InMemoryStore;
use veto_types::{GameId, GameMap, MapId, MapPool, MapPoolId};

/// Every map, in catalog order.
const ALL_MAPS: [&str; 12] = [
    "Abyss", "Ascent", "Bind", "Breeze", "Corrode", "Fracture", "Haven", "Icebox", "Lotus",
    "Pearl", "Split", "Sunset",
];

/// The competitive rotation.
const COMPETITIVE_MAPS: [&str; 7] = ["Abyss", "Bind", "Corrode", "Haven", "Pearl", "Split", "Sunset"];

/// Build the two default pools. Maps shared between pools keep one id.
pub fn default_pools() -> Vec<MapPool> {
    let game_id = GameId::new();
    let maps: Vec<GameMap> = ALL_MAPS
        .iter()
        .map(|name| GameMap {
            id: MapId::new(),
            name: (*name).to_owned(),
            slug: name.to_lowercase(),
        })
        .collect();

    let competitive = maps
        .iter()
        .filter(|map| COMPETITIVE_MAPS.contains(&map.name.as_str()))
        .cloned()
        .collect();

    vec![
        MapPool {
            id: MapPoolId::new(),
            game_id,
            name: "All Maps".to_owned(),
            maps,
        },
        MapPool {
            id: MapPoolId::new(),
            game_id,
            name: "Competitive Maps".to_owned(),
            maps: competitive,
        },
    ]
}

/// Insert the default pools into `store` and return them.
pub async fn seed_memory(store: &InMemoryStore) -> Vec<MapPool> {
    let pools = default_pools();
    for pool in &pools {
        store.insert_pool(pool.clone()).await;
        tracing::info!(
            pool_id = %pool.id,
            name = %pool.name,
            maps = pool.maps.len(),
            "Seeded map pool"
        );
    }
    pools
}
