//! Termination, legality and the client-facing next-action summary.
//!
//! Every predicate derives the survivor set from exactly the history it is
//! handed. Legality checks receive the history before the proposed action;
//! termination checks after an append receive the history including it.

use serde::Serialize;
use ts_rs::TS;
use veto_types::{Action, ActionKind, MapPool, Session, SessionStatus, Team, VetoFormat};

use crate::script::{LegalKinds, current_step, current_team, scripted_kinds};
use crate::sides::pending_side_selection;
use crate::survivors::{pick_count, survivor_count};

/// Whether the format's script has run its course.
///
/// `bo1` completes when exactly one map survives; `bo3` and `bo5` complete
/// on their pick count regardless of how many maps survive. Any format is
/// complete once no map is left to act on.
pub fn is_complete(format: VetoFormat, pool: &MapPool, actions: &[Action]) -> bool {
    let survivors = survivor_count(pool, actions);
    if survivors == 0 {
        return true;
    }
    match format {
        VetoFormat::Bo1 => survivors <= 1,
        VetoFormat::Bo3 | VetoFormat::Bo5 => pick_count(actions) >= format.required_picks(),
    }
}

/// Complete and no side selection outstanding: the decider may be resolved.
pub fn is_finished(format: VetoFormat, pool: &MapPool, actions: &[Action]) -> bool {
    is_complete(format, pool, actions) && pending_side_selection(format, actions).is_none()
}

/// Kinds legal for the next step, or `None` when no ban or pick is accepted.
pub fn legal_kinds(format: VetoFormat, pool: &MapPool, actions: &[Action]) -> Option<LegalKinds> {
    if pending_side_selection(format, actions).is_some() || is_complete(format, pool, actions) {
        return None;
    }
    Some(scripted_kinds(format, actions))
}

/// Whether `team` may perform `kind` next.
///
/// Map membership and availability are checked separately (see
/// [`crate::survivors::is_available`]) so callers can report them distinctly.
pub fn can_perform(
    status: SessionStatus,
    format: VetoFormat,
    pool: &MapPool,
    actions: &[Action],
    kind: ActionKind,
    team: Team,
) -> bool {
    if status.is_terminal() || team != current_team(actions) {
        return false;
    }
    legal_kinds(format, pool, actions).is_some_and(|legal| legal.permits(kind))
}

/// What the negotiation is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NextAction {
    /// Step the next ban or pick would occupy.
    pub step: u32,
    /// Team expected to act; the side-selecting team while one is pending.
    pub team: Team,
    /// Kinds the acting team may perform, absent when none.
    pub legal: Option<LegalKinds>,
    /// A ban would be accepted from `team`.
    pub can_ban: bool,
    /// A pick would be accepted from `team`.
    pub can_pick: bool,
    /// The latest pick still needs its starting side.
    pub needs_side_selection: bool,
    /// Team entitled to choose that side.
    pub side_selection_team: Option<Team>,
    /// No further actions are accepted.
    pub finished: bool,
    /// Human-readable hint for clients.
    pub message: Option<String>,
}

/// Summarize the session's next expected move.
pub fn next_action(session: &Session, pool: &MapPool) -> NextAction {
    let actions = &session.actions;
    let step = current_step(actions);

    if let Some(pending) = pending_side_selection(session.format, actions) {
        return NextAction {
            step,
            team: pending.team,
            legal: None,
            can_ban: false,
            can_pick: false,
            needs_side_selection: true,
            side_selection_team: Some(pending.team),
            finished: false,
            message: Some(String::from("Side selection required")),
        };
    }

    let legal = if session.status.is_terminal() {
        None
    } else {
        legal_kinds(session.format, pool, actions)
    };
    let message = match (legal, session.status) {
        (_, SessionStatus::Cancelled) => Some(String::from("Veto process was cancelled")),
        (None, _) => Some(String::from("Veto process is finished")),
        (Some(_), SessionStatus::NotStarted) => Some(String::from("Waiting for the first action")),
        (Some(_), _) => None,
    };

    NextAction {
        step,
        team: current_team(actions),
        legal,
        can_ban: legal.is_some_and(|l| l.permits(ActionKind::Ban)),
        can_pick: legal.is_some_and(|l| l.permits(ActionKind::Pick)),
        needs_side_selection: false,
        side_selection_team: None,
        finished: legal.is_none(),
        message,
    }
}
