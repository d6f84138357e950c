//! `PostgreSQL` persistence for veto sessions (`veto_sessions` table).

use core::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use veto_types::{ParseEnumError, Session, SessionId};

use crate::contracts::{ActionStore, SessionStore};
use crate::error::StoreError;
use crate::postgres::PgVetoStore;

const SESSION_COLUMNS: &str = "id, owner_id, map_pool_id, format, status, team_a_name, \
     team_b_name, current_team, decider_map_id, decider_side, timer_seconds, share_token, \
     created_at, updated_at, finished_at";

/// A row from the `veto_sessions` table.
///
/// Enum columns are stored as `TEXT` and decoded with the domain `FromStr`
/// impls; an unknown value surfaces as [`StoreError::Corrupt`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    /// Session ID.
    pub id: Uuid,
    /// Creating user, if any.
    pub owner_id: Option<Uuid>,
    /// Pool the maps come from.
    pub map_pool_id: Uuid,
    /// `bo1`, `bo3` or `bo5`.
    pub format: String,
    /// Lifecycle status.
    pub status: String,
    /// Team A display name.
    pub team_a_name: String,
    /// Team B display name.
    pub team_b_name: String,
    /// `A` or `B`.
    pub current_team: String,
    /// Decider map, once resolved.
    pub decider_map_id: Option<Uuid>,
    /// Decider side, once resolved.
    pub decider_side: Option<String>,
    /// Per-turn timer in seconds.
    pub timer_seconds: i32,
    /// Public share token.
    pub share_token: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Completion time.
    pub finished_at: Option<DateTime<Utc>>,
}

impl SessionRow {
    /// Decode into a domain [`Session`] with an empty action list.
    pub fn into_session(self) -> Result<Session, StoreError> {
        Ok(Session {
            id: self.id.into(),
            owner_id: self.owner_id.map(Into::into),
            map_pool_id: self.map_pool_id.into(),
            format: parse_column(&self.format)?,
            status: parse_column(&self.status)?,
            team_a_name: self.team_a_name,
            team_b_name: self.team_b_name,
            current_team: parse_column(&self.current_team)?,
            decider_map_id: self.decider_map_id.map(Into::into),
            decider_side: self.decider_side.as_deref().map(parse_column).transpose()?,
            timer_seconds: u16::try_from(self.timer_seconds).map_err(|e| {
                StoreError::Corrupt(format!("timer_seconds {}: {e}", self.timer_seconds))
            })?,
            share_token: self.share_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
            finished_at: self.finished_at,
            actions: Vec::new(),
        })
    }
}

/// Decode a `TEXT` enum column.
pub(crate) fn parse_column<T>(value: &str) -> Result<T, StoreError>
where
    T: FromStr<Err = ParseEnumError>,
{
    value
        .parse()
        .map_err(|e: ParseEnumError| StoreError::Corrupt(e.to_string()))
}

impl PgVetoStore {
    async fn fetch_session(
        &self,
        filter: &str,
        bind: SessionFilter<'_>,
    ) -> Result<Option<Session>, StoreError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM veto_sessions WHERE {filter}");
        let query = sqlx::query_as::<_, SessionRow>(&sql);
        let query = match bind {
            SessionFilter::Id(id) => query.bind(id),
            SessionFilter::Token(token) => query.bind(token.to_owned()),
        };
        let Some(row) = query.fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let mut session = row.into_session()?;
        session.actions = self.list_by_session(session.id).await?;
        Ok(Some(session))
    }
}

enum SessionFilter<'a> {
    Id(Uuid),
    Token(&'a str),
}

#[async_trait]
impl SessionStore for PgVetoStore {
    async fn load(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        self.fetch_session("id = $1", SessionFilter::Id(id.into_inner()))
            .await
    }

    async fn load_by_share_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        self.fetch_session("share_token = $1", SessionFilter::Token(token))
            .await
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO veto_sessions (id, owner_id, map_pool_id, format, status, team_a_name, team_b_name, current_team, decider_map_id, decider_side, timer_seconds, share_token, created_at, updated_at, finished_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
              ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                team_a_name = EXCLUDED.team_a_name,
                team_b_name = EXCLUDED.team_b_name,
                current_team = EXCLUDED.current_team,
                decider_map_id = EXCLUDED.decider_map_id,
                decider_side = EXCLUDED.decider_side,
                timer_seconds = EXCLUDED.timer_seconds,
                updated_at = EXCLUDED.updated_at,
                finished_at = EXCLUDED.finished_at",
        )
        .bind(session.id.into_inner())
        .bind(session.owner_id.map(veto_types::UserId::into_inner))
        .bind(session.map_pool_id.into_inner())
        .bind(session.format.as_str())
        .bind(session.status.as_str())
        .bind(&session.team_a_name)
        .bind(&session.team_b_name)
        .bind(session.current_team.as_str())
        .bind(session.decider_map_id.map(veto_types::MapId::into_inner))
        .bind(session.decider_side.map(veto_types::Side::as_str))
        .bind(i32::from(session.timer_seconds))
        .bind(&session.share_token)
        .bind(session.created_at)
        .bind(session.updated_at)
        .bind(session.finished_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, "save session"))?;

        tracing::debug!(session_id = %session.id, status = session.status.as_str(), "Saved session");
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM veto_sessions WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
