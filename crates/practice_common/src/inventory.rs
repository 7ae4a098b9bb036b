//! Per-user multiset of earned reward items.

use crate::db::PracticeDb;
use anyhow::Result;
use rusqlite::params;
use tracing::{debug, info};

#[derive(Clone)]
pub struct InventoryStore {
    db: PracticeDb,
}

impl InventoryStore {
    pub fn new(db: PracticeDb) -> Self {
        Self { db }
    }

    /// Append one item. Duplicates are kept.
    pub async fn add(&self, username: &str, item: &str) -> Result<()> {
        let user = username.to_string();
        let title = item.to_string();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO inventory (username, item) VALUES (?1, ?2)",
                    params![user, title],
                )?;
                Ok(())
            })
            .await?;

        debug!("Added '{}' to inventory of {}", item, username);
        Ok(())
    }

    /// Item titles in the order they were earned
    pub async fn list(&self, username: &str) -> Result<Vec<String>> {
        let user = username.to_string();
        self.db
            .execute(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT item FROM inventory WHERE username = ?1 ORDER BY rowid")?;
                let items = stmt
                    .query_map(params![user], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(items)
            })
            .await
    }

    /// Remove every item the user owns; returns how many were removed
    pub async fn clear(&self, username: &str) -> Result<usize> {
        let user = username.to_string();
        let removed = self
            .db
            .execute(move |conn| {
                Ok(conn.execute("DELETE FROM inventory WHERE username = ?1", params![user])?)
            })
            .await?;

        info!("Cleared {} inventory items for {}", removed, username);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbLocation;
    use tempfile::{tempdir, TempDir};

    async fn store() -> (InventoryStore, TempDir) {
        let dir = tempdir().unwrap();
        let db = PracticeDb::open(DbLocation::Custom(dir.path().join("test.db")))
            .await
            .unwrap();
        (InventoryStore::new(db), dir)
    }

    #[tokio::test]
    async fn test_multiset_in_storage_order() {
        let (store, _dir) = store().await;

        store.add("alice", "Comet").await.unwrap();
        store.add("alice", "Anchor").await.unwrap();
        store.add("alice", "Comet").await.unwrap();
        store.add("bob", "Bell").await.unwrap();

        assert_eq!(
            store.list("alice").await.unwrap(),
            vec!["Comet", "Anchor", "Comet"]
        );
        assert_eq!(store.list("bob").await.unwrap(), vec!["Bell"]);
        assert!(store.list("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_only_touches_one_user() {
        let (store, _dir) = store().await;

        store.add("alice", "Comet").await.unwrap();
        store.add("alice", "Anchor").await.unwrap();
        store.add("bob", "Bell").await.unwrap();

        assert_eq!(store.clear("alice").await.unwrap(), 2);
        assert!(store.list("alice").await.unwrap().is_empty());
        assert_eq!(store.list("bob").await.unwrap(), vec!["Bell"]);

        // Clearing an empty inventory is fine
        assert_eq!(store.clear("alice").await.unwrap(), 0);
    }
}
