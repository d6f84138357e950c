//! Side selection after picks.

use veto_types::{Action, ActionId, Team, VetoFormat};

use crate::script::team_for_step;

/// A pick still waiting for its starting side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSide {
    /// The pick awaiting a side.
    pub action_id: ActionId,
    /// Step of that pick.
    pub step: u32,
    /// Team entitled to choose the side.
    pub team: Team,
}

/// The team entitled to choose the side after a pick at `pick_step`.
///
/// Always the opponent of the picking team. `bo1` has no picks; `bo3` only
/// schedules side selections after its fixed picks on steps 3 and 6.
pub const fn side_selection_team(format: VetoFormat, pick_step: u32) -> Option<Team> {
    let chooser = team_for_step(pick_step).opponent();
    match format {
        VetoFormat::Bo1 => None,
        VetoFormat::Bo3 => match pick_step {
            3 | 6 => Some(chooser),
            _ => None,
        },
        VetoFormat::Bo5 => Some(chooser),
    }
}

/// The outstanding side selection, if the latest action is an unsided pick.
///
/// Only the most recent action can be pending: no further ban or pick is
/// accepted until the side is chosen.
pub fn pending_side_selection(format: VetoFormat, actions: &[Action]) -> Option<PendingSide> {
    let last = actions.last().filter(|a| a.awaits_side())?;
    let team = side_selection_team(format, last.step)?;
    Some(PendingSide {
        action_id: last.id,
        step: last.step,
        team,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::history;
    use veto_types::{ActionKind, Side};

    #[test]
    fn bo3_choosers() {
        assert_eq!(side_selection_team(VetoFormat::Bo3, 3), Some(Team::B));
        assert_eq!(side_selection_team(VetoFormat::Bo3, 6), Some(Team::A));
        assert_eq!(side_selection_team(VetoFormat::Bo3, 4), None);
    }

    #[test]
    fn bo5_chooser_is_picking_teams_opponent() {
        assert_eq!(side_selection_team(VetoFormat::Bo5, 4), Some(Team::A));
        assert_eq!(side_selection_team(VetoFormat::Bo5, 5), Some(Team::B));
        assert_eq!(side_selection_team(VetoFormat::Bo5, 9), Some(Team::B));
    }

    #[test]
    fn bo1_never_selects_sides() {
        assert_eq!(side_selection_team(VetoFormat::Bo1, 3), None);
    }

    #[test]
    fn unsided_pick_is_pending() {
        use ActionKind::{Ban, Pick};
        let actions = history(&[Ban, Ban, Pick]);
        let pending = pending_side_selection(VetoFormat::Bo3, &actions);
        assert_eq!(pending.map(|p| (p.step, p.team)), Some((3, Team::B)));
    }

    #[test]
    fn sided_pick_is_not_pending() {
        use ActionKind::{Ban, Pick};
        let mut actions = history(&[Ban, Ban, Pick]);
        if let Some(last) = actions.last_mut() {
            last.selected_side = Some(Side::Attack);
        }
        assert_eq!(pending_side_selection(VetoFormat::Bo3, &actions), None);
    }

    #[test]
    fn ban_is_never_pending() {
        let actions = history(&[ActionKind::Ban; 2]);
        assert_eq!(pending_side_selection(VetoFormat::Bo5, &actions), None);
    }
}
