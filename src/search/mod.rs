pub mod handlers;
pub mod sync;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Jsonb, Text};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::shared::utils::{get_conn, DbPool};

pub use sync::SearchSynchronizer;

pub const INVALID_TARGET: &str = "Invalid target parameter";

/// Source fields of an indexed document.
pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTarget {
    Task,
    Comment,
}

impl fmt::Display for SearchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

impl FromStr for SearchTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(Self::Task),
            "comment" => Ok(Self::Comment),
            _ => Err(INVALID_TARGET.to_string()),
        }
    }
}

/// One search result: the document id followed by its source fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: Uuid,
    #[serde(flatten)]
    pub source: Document,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Index connection failed: {0}")]
    Connection(String),
    #[error("Index query failed: {0}")]
    Query(String),
}

#[async_trait]
pub trait DocumentIndex: Send + Sync {
    async fn get(&self, target: SearchTarget, id: Uuid) -> Result<Option<Document>, IndexError>;
    /// Inserts or fully replaces the document.
    async fn put(&self, target: SearchTarget, id: Uuid, source: Document) -> Result<(), IndexError>;
    async fn delete(&self, target: SearchTarget, id: Uuid) -> Result<(), IndexError>;
    /// Matches ordered by relevance, best first.
    async fn search(&self, target: SearchTarget, query: &str) -> Result<Vec<SearchHit>, IndexError>;
}

#[derive(QueryableByName, Debug)]
struct SourceRow {
    #[diesel(sql_type = Jsonb)]
    source: Value,
}

#[derive(QueryableByName, Debug)]
struct HitRow {
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    id: Uuid,
    #[diesel(sql_type = Jsonb)]
    source: Value,
}

pub(crate) fn into_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// PostgreSQL full-text index over the `search_index` table. The
/// `search_vector` column is maintained by a trigger: `title` is weighted
/// above `description` and `text`.
#[derive(Clone)]
pub struct PgSearchIndex {
    pool: DbPool,
}

impl PgSearchIndex {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, IndexError>
    where
        T: Send + 'static,
        F: FnOnce(&mut diesel::PgConnection) -> Result<T, diesel::result::Error> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn =
                get_conn(&pool).map_err(|e| IndexError::Connection(e.to_string()))?;
            f(&mut *conn).map_err(|e| {
                error!("Search index query failed: {e}");
                IndexError::Query(e.to_string())
            })
        })
        .await
        .map_err(|e| IndexError::Query(e.to_string()))?
    }
}

#[async_trait]
impl DocumentIndex for PgSearchIndex {
    async fn get(&self, target: SearchTarget, id: Uuid) -> Result<Option<Document>, IndexError> {
        let rows: Vec<SourceRow> = self
            .run(move |conn| {
                diesel::sql_query("SELECT source FROM search_index WHERE id = $1 AND target = $2")
                    .bind::<diesel::sql_types::Uuid, _>(id)
                    .bind::<Text, _>(target.to_string())
                    .load(conn)
            })
            .await?;
        Ok(rows.into_iter().next().map(|row| into_document(row.source)))
    }

    async fn put(
        &self,
        target: SearchTarget,
        id: Uuid,
        source: Document,
    ) -> Result<(), IndexError> {
        let sql = r#"
            INSERT INTO search_index (id, target, source)
            VALUES ($1, $2, $3)
            ON CONFLICT (id, target) DO UPDATE SET source = EXCLUDED.source
        "#;
        self.run(move |conn| {
            diesel::sql_query(sql)
                .bind::<diesel::sql_types::Uuid, _>(id)
                .bind::<Text, _>(target.to_string())
                .bind::<Jsonb, _>(Value::Object(source))
                .execute(conn)
        })
        .await?;
        debug!("Indexed {target} {id}");
        Ok(())
    }

    async fn delete(&self, target: SearchTarget, id: Uuid) -> Result<(), IndexError> {
        self.run(move |conn| {
            diesel::sql_query("DELETE FROM search_index WHERE id = $1 AND target = $2")
                .bind::<diesel::sql_types::Uuid, _>(id)
                .bind::<Text, _>(target.to_string())
                .execute(conn)
        })
        .await?;
        debug!("Removed {target} {id} from index");
        Ok(())
    }

    async fn search(
        &self,
        target: SearchTarget,
        query: &str,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let sql = r#"
            SELECT id, source
            FROM search_index
            WHERE target = $1
              AND search_vector @@ plainto_tsquery('english', $2)
            ORDER BY ts_rank(search_vector, plainto_tsquery('english', $2)) DESC, id ASC
        "#;
        let query = query.to_string();
        let rows: Vec<HitRow> = self
            .run(move |conn| {
                diesel::sql_query(sql)
                    .bind::<Text, _>(target.to_string())
                    .bind::<Text, _>(query)
                    .load(conn)
            })
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| SearchHit {
                id: row.id,
                source: into_document(row.source),
            })
            .collect())
    }
}
