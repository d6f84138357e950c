//! `PostgreSQL` persistence for map pools and rooms.
//!
//! The map catalog is maintained by the surrounding application and only
//! read here. Rooms and their participants are written through
//! [`RoomStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use veto_types::{GameId, GameMap, MapPool, MapPoolId, Room, RoomId, SessionId, UserId};

use crate::contracts::{MapPoolStore, RoomDirectory, RoomStore};
use crate::error::StoreError;
use crate::postgres::PgVetoStore;

/// A row from the `map_pools` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MapPoolRow {
    /// Pool ID.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// Display name.
    pub name: String,
}

/// A map joined through `map_pool_maps`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PoolMapRow {
    /// Map ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// URL-safe short name.
    pub slug: String,
}

/// A row from the `rooms` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomRow {
    /// Room ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Creating user, if any.
    pub owner_id: Option<Uuid>,
    /// Attached session, if any.
    pub veto_session_id: Option<Uuid>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl PgVetoStore {
    async fn pool_maps(&self, pool_id: Uuid) -> Result<Vec<GameMap>, StoreError> {
        let maps = sqlx::query_as::<_, PoolMapRow>(
            r"SELECT m.id, m.name, m.slug
              FROM map_pool_maps pm
              JOIN maps m ON m.id = pm.map_id
              WHERE pm.pool_id = $1
              ORDER BY pm.position, m.name",
        )
        .bind(pool_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(maps
            .into_iter()
            .map(|m| GameMap {
                id: m.id.into(),
                name: m.name,
                slug: m.slug,
            })
            .collect())
    }

    async fn assemble_pool(&self, row: MapPoolRow) -> Result<MapPool, StoreError> {
        let maps = self.pool_maps(row.id).await?;
        Ok(MapPool {
            id: row.id.into(),
            game_id: row.game_id.into(),
            name: row.name,
            maps,
        })
    }
}

#[async_trait]
impl MapPoolStore for PgVetoStore {
    async fn load_pool(&self, id: MapPoolId) -> Result<Option<MapPool>, StoreError> {
        let Some(row) = sqlx::query_as::<_, MapPoolRow>(
            "SELECT id, game_id, name FROM map_pools WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };
        Ok(Some(self.assemble_pool(row).await?))
    }

    async fn list_pools(&self, game_id: GameId) -> Result<Vec<MapPool>, StoreError> {
        let rows = sqlx::query_as::<_, MapPoolRow>(
            "SELECT id, game_id, name FROM map_pools WHERE game_id = $1 ORDER BY name",
        )
        .bind(game_id.into_inner())
        .fetch_all(&self.pool)
        .await?;

        let mut pools = Vec::with_capacity(rows.len());
        for row in rows {
            pools.push(self.assemble_pool(row).await?);
        }
        Ok(pools)
    }
}

#[async_trait]
impl RoomDirectory for PgVetoStore {
    async fn room_owning(&self, session_id: SessionId) -> Result<Option<RoomId>, StoreError> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM rooms WHERE veto_session_id = $1 LIMIT 1")
                .bind(session_id.into_inner())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id,)| id.into()))
    }

    async fn active_session(&self, room_id: RoomId) -> Result<Option<SessionId>, StoreError> {
        let row: Option<(Option<Uuid>,)> =
            sqlx::query_as("SELECT veto_session_id FROM rooms WHERE id = $1")
                .bind(room_id.into_inner())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(id,)| id).map(Into::into))
    }

    async fn is_participant(&self, room_id: RoomId, user_id: UserId) -> Result<bool, StoreError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM room_participants WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl RoomStore for PgVetoStore {
    async fn create_room(&self, room: &Room) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"INSERT INTO rooms (id, name, owner_id, veto_session_id, created_at)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(room.id.into_inner())
        .bind(&room.name)
        .bind(room.owner_id.map(UserId::into_inner))
        .bind(room.session_id.map(SessionId::into_inner))
        .bind(room.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::from_write(e, "room"))?;

        // clock_timestamp() advances inside the transaction, keeping join order.
        for user_id in &room.participants {
            sqlx::query(
                r"INSERT INTO room_participants (room_id, user_id, joined_at)
                  VALUES ($1, $2, clock_timestamp())
                  ON CONFLICT DO NOTHING",
            )
            .bind(room.id.into_inner())
            .bind(user_id.into_inner())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn load_room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        let Some(row) = sqlx::query_as::<_, RoomRow>(
            "SELECT id, name, owner_id, veto_session_id, created_at FROM rooms WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let participants: Vec<(Uuid,)> = sqlx::query_as(
            r"SELECT user_id FROM room_participants
              WHERE room_id = $1
              ORDER BY joined_at, user_id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Room {
            id: row.id.into(),
            name: row.name,
            owner_id: row.owner_id.map(Into::into),
            session_id: row.veto_session_id.map(Into::into),
            participants: participants.into_iter().map(|(id,)| id.into()).collect(),
            created_at: row.created_at,
        }))
    }

    async fn join_room(&self, id: RoomId, user_id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"INSERT INTO room_participants (room_id, user_id, joined_at)
              SELECT id, $2, clock_timestamp() FROM rooms WHERE id = $1
              ON CONFLICT DO NOTHING",
        )
        .bind(id.into_inner())
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn leave_room(&self, id: RoomId, user_id: UserId) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM room_participants WHERE room_id = $1 AND user_id = $2")
                .bind(id.into_inner())
                .bind(user_id.into_inner())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await?;
        tracing::debug!(room_id = %id, removed = result.rows_affected(), "Room deleted");
        Ok(result.rows_affected() > 0)
    }
}
