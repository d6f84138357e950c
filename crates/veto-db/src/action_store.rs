//! `PostgreSQL` persistence for the action history (`veto_actions` table).
//!
//! `UNIQUE (session_id, step_number)` backs the one-action-per-step rule;
//! a violating insert is reported as [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use veto_types::{Action, ActionId, SessionId, Side};

use crate::contracts::ActionStore;
use crate::error::StoreError;
use crate::postgres::PgVetoStore;
use crate::session_store::parse_column;

/// A row from the `veto_actions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActionRow {
    /// Action ID.
    pub id: Uuid,
    /// Owning session.
    pub session_id: Uuid,
    /// Banned or picked map.
    pub map_id: Uuid,
    /// `A` or `B`.
    pub team: String,
    /// `ban` or `pick`.
    pub action_type: String,
    /// 1-based step.
    pub step_number: i32,
    /// Side chosen after a pick.
    pub selected_side: Option<String>,
    /// Insert time.
    pub created_at: DateTime<Utc>,
}

impl ActionRow {
    /// Decode into a domain [`Action`].
    pub fn into_action(self) -> Result<Action, StoreError> {
        Ok(Action {
            id: self.id.into(),
            session_id: self.session_id.into(),
            map_id: self.map_id.into(),
            team: parse_column(&self.team)?,
            kind: parse_column(&self.action_type)?,
            step: u32::try_from(self.step_number).map_err(|e| {
                StoreError::Corrupt(format!("step_number {}: {e}", self.step_number))
            })?,
            selected_side: self.selected_side.as_deref().map(parse_column).transpose()?,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl ActionStore for PgVetoStore {
    async fn append(&self, action: &Action) -> Result<(), StoreError> {
        let step = i32::try_from(action.step)
            .map_err(|e| StoreError::Corrupt(format!("step {}: {e}", action.step)))?;
        sqlx::query(
            r"INSERT INTO veto_actions (id, session_id, map_id, team, action_type, step_number, selected_side, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(action.id.into_inner())
        .bind(action.session_id.into_inner())
        .bind(action.map_id.into_inner())
        .bind(action.team.as_str())
        .bind(action.kind.as_str())
        .bind(step)
        .bind(action.selected_side.map(Side::as_str))
        .bind(action.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, "append action"))?;
        Ok(())
    }

    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Action>, StoreError> {
        let rows = sqlx::query_as::<_, ActionRow>(
            r"SELECT id, session_id, map_id, team, action_type, step_number, selected_side, created_at
              FROM veto_actions
              WHERE session_id = $1
              ORDER BY step_number",
        )
        .bind(session_id.into_inner())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ActionRow::into_action).collect()
    }

    async fn update_side(&self, action_id: ActionId, side: Side) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE veto_actions SET selected_side = $2 WHERE id = $1")
            .bind(action_id.into_inner())
            .bind(side.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_action(&self, action_id: ActionId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM veto_actions WHERE id = $1")
            .bind(action_id.into_inner())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_for_session(&self, session_id: SessionId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM veto_actions WHERE session_id = $1")
            .bind(session_id.into_inner())
            .execute(&self.pool)
            .await?;
        tracing::debug!(%session_id, removed = result.rows_affected(), "Cleared session actions");
        Ok(result.rows_affected())
    }
}
