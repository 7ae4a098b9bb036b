//! Append-only log of answered questions.

use crate::db::PracticeDb;
use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One answered question, as written to `subtraction_practice`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeEntry {
    pub username: String,
    pub question: String,
    pub user_answer: i64,
    pub correct_answer: i64,
    pub is_correct: bool,
}

/// Aggregate over a user's history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeStats {
    pub answered: u64,
    pub correct: u64,
    pub last_practiced: Option<NaiveDateTime>,
}

#[derive(Clone)]
pub struct PracticeLog {
    db: PracticeDb,
}

impl PracticeLog {
    pub fn new(db: PracticeDb) -> Self {
        Self { db }
    }

    /// Record one answer; the store stamps the date. Returns the row id.
    pub async fn append(&self, entry: PracticeEntry) -> Result<i64> {
        self.append_with_reward(entry, None).await
    }

    /// Record one answer together with the item it earned.
    ///
    /// Both rows are written in one transaction: either the answer and its
    /// reward are stored, or neither is.
    pub async fn append_with_reward(
        &self,
        entry: PracticeEntry,
        reward: Option<String>,
    ) -> Result<i64> {
        let id = self
            .db
            .execute(move |conn| {
                let tx = conn.unchecked_transaction()?;
                tx.execute(
                    "INSERT INTO subtraction_practice
                        (username, question, user_answer, correct_answer, is_correct)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        entry.username,
                        entry.question,
                        entry.user_answer,
                        entry.correct_answer,
                        entry.is_correct
                    ],
                )?;
                let id = tx.last_insert_rowid();

                if let Some(item) = &reward {
                    tx.execute(
                        "INSERT INTO inventory (username, item) VALUES (?1, ?2)",
                        params![entry.username, item],
                    )?;
                }

                tx.commit()?;
                Ok(id)
            })
            .await?;

        debug!("Recorded practice answer with ID: {}", id);
        Ok(id)
    }

    pub async fn stats(&self, username: &str) -> Result<PracticeStats> {
        let user = username.to_string();
        self.db
            .execute(move |conn| {
                let stats = conn.query_row(
                    "SELECT COUNT(*),
                            COALESCE(SUM(CASE WHEN is_correct THEN 1 ELSE 0 END), 0),
                            MAX(date)
                     FROM subtraction_practice WHERE username = ?1",
                    params![user],
                    |row| {
                        Ok(PracticeStats {
                            answered: row.get::<_, i64>(0)? as u64,
                            correct: row.get::<_, i64>(1)? as u64,
                            last_practiced: row.get(2)?,
                        })
                    },
                )?;
                Ok(stats)
            })
            .await
    }
}
