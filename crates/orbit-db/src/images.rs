//! Deduplicated image references.
//!
//! Rows are insert-if-absent: the first source recorded for a name wins.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

/// Visual asset identifier and its source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ImageRecord {
    /// Asset name used as key
    pub image_name: String,
    /// Source URL
    pub image_src: String,
}

/// Insert an image reference unless one with the same name exists.
///
/// Returns `true` if a new row was written.
pub async fn ensure_image<'e, E>(executor: E, image: &ImageRecord) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result =
        sqlx::query("INSERT OR IGNORE INTO images (image_name, image_src) VALUES (?, ?)")
            .bind(&image.image_name)
            .bind(&image.image_src)
            .execute(executor)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Get an image reference by name.
pub async fn get_image<'e, E>(executor: E, image_name: &str) -> Result<Option<ImageRecord>>
where
    E: SqliteExecutor<'e>,
{
    let image = sqlx::query_as::<_, ImageRecord>(
        "SELECT image_name, image_src FROM images WHERE image_name = ?",
    )
    .bind(image_name)
    .fetch_optional(executor)
    .await?;

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_ensure_image_never_updates() {
        let db = Database::new(":memory:").await.expect("create database");
        db.run_migrations().await.expect("run migrations");

        let first = ImageRecord {
            image_name: "planet_dry_3".to_string(),
            image_src: "https://cdn.example.test/a.png".to_string(),
        };
        let second = ImageRecord {
            image_name: "planet_dry_3".to_string(),
            image_src: "https://cdn.example.test/b.png".to_string(),
        };

        assert!(ensure_image(db.pool(), &first).await.expect("insert image"));
        assert!(!ensure_image(db.pool(), &second).await.expect("ignore image"));

        let stored = get_image(db.pool(), "planet_dry_3")
            .await
            .expect("get image")
            .expect("image exists");
        assert_eq!(stored, first);
    }
}
