//! SQLite backend for the `LinkStore` port.
//!
//! One `links` table keyed by the `link:{group_id}:{user_id}` string the
//! original key-value deployment used, so records stay greppable with plain
//! sqlite3 tooling.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use ilb_core::domain::{link_key, link_key_prefix, user_from_key, GroupId, InviteLink, UserId};
use ilb_core::errors::Error;
use ilb_core::ports::LinkStore;
use ilb_core::Result;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Page size for `list_group`. Groups are unbounded; paging by keyset keeps
/// a scan from materializing everything in one query.
const SCAN_PAGE: i64 = 500;

pub struct SqliteLinkStore {
    pool: SqlitePool,
}

impl SqliteLinkStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(backend)?;
        MIGRATOR.run(&pool).await.map_err(backend)?;
        info!(path = %path.display(), "link store opened");
        Ok(Self { pool })
    }

    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(backend)?;
        MIGRATOR.run(&pool).await.map_err(backend)?;
        Ok(Self { pool })
    }
}

fn backend(e: impl std::fmt::Display) -> Error {
    Error::Store(e.to_string())
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    async fn get(&self, group: GroupId, user: UserId) -> Result<Option<InviteLink>> {
        let row = sqlx::query("SELECT invite_link FROM links WHERE key = ?")
            .bind(link_key(group, user))
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.map(|r| InviteLink(r.get(0))))
    }

    async fn put(&self, group: GroupId, user: UserId, link: &InviteLink) -> Result<()> {
        sqlx::query(
            "INSERT INTO links (key, invite_link) VALUES (?, ?)
             ON CONFLICT (key) DO UPDATE SET invite_link = excluded.invite_link",
        )
        .bind(link_key(group, user))
        .bind(&link.0)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn put_if_absent(
        &self,
        group: GroupId,
        user: UserId,
        link: &InviteLink,
    ) -> Result<Option<InviteLink>> {
        loop {
            let res = sqlx::query("INSERT OR IGNORE INTO links (key, invite_link) VALUES (?, ?)")
                .bind(link_key(group, user))
                .bind(&link.0)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
            if res.rows_affected() == 1 {
                return Ok(None);
            }
            // Lost to a concurrent writer: surface the winner. If the row
            // vanished again in between, take another turn at inserting.
            if let Some(existing) = self.get(group, user).await? {
                return Ok(Some(existing));
            }
        }
    }

    async fn delete(&self, group: GroupId, user: UserId) -> Result<()> {
        sqlx::query("DELETE FROM links WHERE key = ?")
            .bind(link_key(group, user))
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_group(&self, group: GroupId) -> Result<Vec<(UserId, InviteLink)>> {
        // Keyset pagination: group ids are numeric, so the prefix contains no
        // LIKE wildcards.
        let like = format!("{}%", link_key_prefix(group));
        let mut out = Vec::new();
        let mut last = String::new();

        loop {
            let rows = sqlx::query(
                "SELECT key, invite_link FROM links
                 WHERE key LIKE ? AND key > ? ORDER BY key LIMIT ?",
            )
            .bind(&like)
            .bind(&last)
            .bind(SCAN_PAGE)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

            let page_len = rows.len();
            for row in rows {
                let key: String = row.get(0);
                let value: String = row.get(1);
                if let Some(user) = user_from_key(&key) {
                    out.push((user, InviteLink(value)));
                }
                last = key;
            }

            if (page_len as i64) < SCAN_PAGE {
                return Ok(out);
            }
        }
    }
}
