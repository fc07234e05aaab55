//! Player rows, keyed by the server's player id.

use crate::error::Result;
use orbit_core::NO_PLAYER_ID;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

/// A game account referenced by a body in some sector.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, FromRow)]
#[allow(clippy::struct_excessive_bools)]
pub struct PlayerRecord {
    /// External player id
    pub player_id: i64,
    /// Display name
    pub name: Option<String>,
    /// Alliance id, if any
    pub alliance_id: Option<i64>,
    /// Alliance tag, if any
    pub alliance_tag: Option<String>,
    /// Highscore position
    pub rank_position: Option<i64>,
    /// Recently active
    pub is_active: bool,
    /// Flagged inactive
    pub is_inactive: bool,
    /// On vacation mode
    pub is_vacation: bool,
    /// Banned
    pub is_banned: bool,
}

/// Insert or overwrite a player row.
///
/// Returns `false` without touching the table for the "no player" sentinel id.
pub async fn upsert_player<'e, E>(executor: E, player: &PlayerRecord) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    if player.player_id == NO_PLAYER_ID {
        tracing::trace!("Skipping sentinel player id {}", NO_PLAYER_ID);
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO players (player_id, name, alliance_id, alliance_tag, rank_position,
                              is_active, is_inactive, is_vacation, is_banned)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(player_id) DO UPDATE SET
             name = excluded.name,
             alliance_id = excluded.alliance_id,
             alliance_tag = excluded.alliance_tag,
             rank_position = excluded.rank_position,
             is_active = excluded.is_active,
             is_inactive = excluded.is_inactive,
             is_vacation = excluded.is_vacation,
             is_banned = excluded.is_banned",
    )
    .bind(player.player_id)
    .bind(&player.name)
    .bind(player.alliance_id)
    .bind(&player.alliance_tag)
    .bind(player.rank_position)
    .bind(player.is_active)
    .bind(player.is_inactive)
    .bind(player.is_vacation)
    .bind(player.is_banned)
    .execute(executor)
    .await?;

    Ok(true)
}

/// Get a player by id.
pub async fn get_player<'e, E>(executor: E, player_id: i64) -> Result<Option<PlayerRecord>>
where
    E: SqliteExecutor<'e>,
{
    let player = sqlx::query_as::<_, PlayerRecord>(
        "SELECT player_id, name, alliance_id, alliance_tag, rank_position,
                is_active, is_inactive, is_vacation, is_banned
         FROM players WHERE player_id = ?",
    )
    .bind(player_id)
    .fetch_optional(executor)
    .await?;

    Ok(player)
}
