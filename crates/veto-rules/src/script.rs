//! Per-format negotiation scripts: whose turn it is and which action kinds
//! the script allows at a step.
//!
//! | Format | Script by step |
//! |--------|----------------|
//! | `bo1` | every step bans |
//! | `bo3` | ban, ban, pick, ban, ban, pick, then bans |
//! | `bo5` | ban x3, ban-or-pick, (pick if 4 banned else ban), picks on 6, 9, 12, bans elsewhere |
//!
//! Turn order depends only on step parity, never on the action kind.

use serde::Serialize;
use ts_rs::TS;
use veto_types::{Action, ActionKind, Team, VetoFormat};

/// Action kinds the script allows at a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LegalKinds {
    /// Only a ban is allowed.
    Ban,
    /// Only a pick is allowed.
    Pick,
    /// The acting team chooses between a ban and a pick.
    Both,
}

impl LegalKinds {
    /// Whether `kind` is allowed.
    pub const fn permits(self, kind: ActionKind) -> bool {
        matches!(
            (self, kind),
            (Self::Both, _) | (Self::Ban, ActionKind::Ban) | (Self::Pick, ActionKind::Pick)
        )
    }
}

/// The step the next action will occupy: recorded actions plus one.
pub fn current_step(actions: &[Action]) -> u32 {
    u32::try_from(actions.len())
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}

/// Team A acts on odd steps, team B on even steps.
pub const fn team_for_step(step: u32) -> Team {
    if step % 2 == 1 { Team::A } else { Team::B }
}

/// The team whose turn it is given the recorded history.
pub fn current_team(actions: &[Action]) -> Team {
    team_for_step(current_step(actions))
}

/// The kinds the script allows for the next step.
///
/// This reads the format table only; it does not consider termination or
/// pending side selections (see [`crate::progress`]).
pub fn scripted_kinds(format: VetoFormat, actions: &[Action]) -> LegalKinds {
    let step = current_step(actions);
    match format {
        VetoFormat::Bo1 => LegalKinds::Ban,
        VetoFormat::Bo3 => match step {
            3 | 6 => LegalKinds::Pick,
            _ => LegalKinds::Ban,
        },
        VetoFormat::Bo5 => match step {
            4 => LegalKinds::Both,
            // Step 5 mirrors whatever step 4 was not.
            5 => match actions.last().map(|a| a.kind) {
                Some(ActionKind::Ban) => LegalKinds::Pick,
                _ => LegalKinds::Ban,
            },
            6 | 9 | 12 => LegalKinds::Pick,
            _ => LegalKinds::Ban,
        },
    }
}
