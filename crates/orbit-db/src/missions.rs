//! Read access to the static mission catalogue seeded by migration 002.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

/// Mission type with its label and client link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MissionRecord {
    /// Wire id
    pub mission_type: i64,
    /// Human-readable label
    pub name: String,
    /// Client link fragment
    pub link: String,
}

/// Every seeded mission, ordered by type.
pub async fn list_missions<'e, E>(executor: E) -> Result<Vec<MissionRecord>>
where
    E: SqliteExecutor<'e>,
{
    let missions = sqlx::query_as::<_, MissionRecord>(
        "SELECT mission_type, name, link FROM missions ORDER BY mission_type",
    )
    .fetch_all(executor)
    .await?;

    Ok(missions)
}
