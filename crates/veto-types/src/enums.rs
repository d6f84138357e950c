//! Enumeration types for the veto service.
//!
//! Every enum has a stable lowercase wire/database form exposed through
//! `as_str` and parsed back through [`FromStr`].

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when a string does not name a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    /// The enum that failed to parse.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Match format
// ---------------------------------------------------------------------------

/// The match format, which fixes the negotiation script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum VetoFormat {
    /// Single-map: teams ban alternately until one map survives.
    Bo1,
    /// Three-map: two picks with side selection, decider drawn from survivors.
    Bo3,
    /// Five-map: four picks with side selection, decider drawn from survivors.
    Bo5,
}

impl VetoFormat {
    /// Number of picks after which the negotiation terminates.
    ///
    /// Zero for [`VetoFormat::Bo1`], which terminates on survivor count.
    pub const fn required_picks(self) -> usize {
        match self {
            Self::Bo1 => 0,
            Self::Bo3 => 2,
            Self::Bo5 => 4,
        }
    }

    /// Smallest pool on which every scripted ban and pick has a map to
    /// act on.
    pub const fn min_pool_size(self) -> usize {
        match self {
            Self::Bo1 => 2,
            Self::Bo3 => 6,
            Self::Bo5 => 12,
        }
    }

    /// Whether picks (and therefore side selections) exist in this format.
    pub const fn allows_picks(self) -> bool {
        !matches!(self, Self::Bo1)
    }

    /// The team acting on step 1.
    pub const fn first_team(self) -> Team {
        Team::A
    }

    /// Stable string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bo1 => "bo1",
            Self::Bo3 => "bo3",
            Self::Bo5 => "bo5",
        }
    }
}

impl FromStr for VetoFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bo1" => Ok(Self::Bo1),
            "bo3" => Ok(Self::Bo3),
            "bo5" => Ok(Self::Bo5),
            other => Err(ParseEnumError::new("format", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of a veto session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SessionStatus {
    /// Created, no action accepted yet.
    NotStarted,
    /// At least one action accepted or explicitly started.
    InProgress,
    /// The script has completed and the decider is resolved.
    Finished,
    /// Abandoned; no further actions are accepted.
    Cancelled,
}

impl SessionStatus {
    /// Whether the session can no longer accept actions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Stable string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "finished" => Ok(Self::Finished),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ParseEnumError::new("status", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The kind of a veto action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionKind {
    /// Remove a map from consideration.
    Ban,
    /// Select a map to be played.
    Pick,
}

impl ActionKind {
    /// Stable string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Pick => "pick",
        }
    }
}

impl FromStr for ActionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ban" => Ok(Self::Ban),
            "pick" => Ok(Self::Pick),
            other => Err(ParseEnumError::new("action kind", other)),
        }
    }
}

/// One of the two negotiating teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Team {
    /// The team acting on odd steps.
    A,
    /// The team acting on even steps.
    B,
}

impl Team {
    /// The other team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Stable string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl FromStr for Team {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(ParseEnumError::new("team", other)),
        }
    }
}

/// Starting side on a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Side {
    /// Attacking side.
    Attack,
    /// Defending side.
    Defence,
}

impl Side {
    /// Stable string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Defence => "defence",
        }
    }
}

impl FromStr for Side {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attack" => Ok(Self::Attack),
            "defence" => Ok(Self::Defence),
            other => Err(ParseEnumError::new("side", other)),
        }
    }
}
