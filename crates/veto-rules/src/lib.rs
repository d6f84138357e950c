//! Negotiation rules engine for the map veto service.
//!
//! Pure functions over a format, an ordered action history and (where map
//! availability matters) the session's map pool. Nothing here performs I/O
//! or holds state; randomness for the decider draw is passed in by the
//! caller.
//!
//! # Modules
//!
//! - [`script`] -- Turn order and per-format legal action kinds
//! - [`survivors`] -- Map availability derived from the history
//! - [`sides`] -- Side selection after picks
//! - [`progress`] -- Termination, legality and the next-action summary
//! - [`decider`] -- Decider map and side resolution

pub mod decider;
pub mod progress;
pub mod script;
pub mod sides;
pub mod survivors;

pub use decider::{Decider, random_side, resolve_decider};
pub use progress::{NextAction, can_perform, is_complete, is_finished, legal_kinds, next_action};
pub use script::{LegalKinds, current_step, current_team, scripted_kinds, team_for_step};
pub use sides::{PendingSide, pending_side_selection, side_selection_team};
pub use survivors::{
    banned_maps, is_available, is_used, pick_count, picked_maps, survivor_count, survivors,
};

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the unit tests.

    use chrono::Utc;
    use veto_types::{
        Action, ActionId, ActionKind, GameId, GameMap, MapId, MapPool, MapPoolId, Session,
        SessionId, SessionStatus, Team, VetoFormat,
    };

    use crate::script::current_step;

    /// A pool of `size` maps named `map-0`, `map-1`, ...
    pub fn pool(size: usize) -> MapPool {
        MapPool {
            id: MapPoolId::new(),
            game_id: GameId::new(),
            name: String::from("Test pool"),
            maps: (0..size)
                .map(|i| GameMap {
                    id: MapId::new(),
                    name: format!("Map {i}"),
                    slug: format!("map-{i}"),
                })
                .collect(),
        }
    }

    /// Append one action at the next step.
    pub fn record(actions: &mut Vec<Action>, map_id: MapId, team: Team, kind: ActionKind) {
        let step = current_step(actions);
        actions.push(Action {
            id: ActionId::new(),
            session_id: SessionId::new(),
            map_id,
            team,
            kind,
            step,
            selected_side: None,
            created_at: Utc::now(),
        });
    }

    /// A history of the given kinds on fresh maps, teams taken from the step.
    pub fn history(kinds: &[ActionKind]) -> Vec<Action> {
        let mut actions = Vec::new();
        for kind in kinds {
            let team = crate::script::current_team(&actions);
            record(&mut actions, MapId::new(), team, *kind);
        }
        actions
    }

    /// A fresh, not-started session on `pool`.
    pub fn session(format: VetoFormat, pool: &MapPool) -> Session {
        let now = Utc::now();
        Session {
            id: SessionId::new(),
            owner_id: None,
            map_pool_id: pool.id,
            format,
            status: SessionStatus::NotStarted,
            team_a_name: String::from("Alpha"),
            team_b_name: String::from("Bravo"),
            current_team: Team::A,
            decider_map_id: None,
            decider_side: None,
            timer_seconds: 0,
            share_token: String::from("00000000000000000000000000000000"),
            created_at: now,
            updated_at: now,
            finished_at: None,
            actions: Vec::new(),
        }
    }
}
