//! `PostgreSQL` implementation of the `EntityStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use catalog_core::error::DomainError;
use catalog_core::store::{EntityRecord, EntityStore, Mutation};

use crate::schema::CREATE_ENTITIES_TABLE;

/// PostgreSQL-backed entity store. Each row holds one entity snapshot as
/// JSONB, keyed by entity name and id.
#[derive(Debug, Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    /// Creates a new `PgEntityStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the entities table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(CREATE_ENTITIES_TABLE)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(())
    }
}

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {err}"))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_row(row: &PgRow) -> Result<EntityRecord, DomainError> {
    Ok(EntityRecord {
        entity_name: row.try_get("entity_name").map_err(infrastructure)?,
        id: row.try_get("id").map_err(infrastructure)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(infrastructure)?,
        updated_at: row
            .try_get::<Option<DateTime<Utc>>, _>("updated_at")
            .map_err(infrastructure)?,
        data: row.try_get("data").map_err(infrastructure)?,
    })
}

const SELECT_COLUMNS: &str = "SELECT entity_name, id, created_at, updated_at, data FROM entities";

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn find(&self, entity_name: &str, id: Uuid) -> Result<Option<EntityRecord>, DomainError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE entity_name = $1 AND id = $2"))
            .bind(entity_name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?;
        row.as_ref().map(from_row).transpose()
    }

    async fn list(&self, entity_name: &str) -> Result<Vec<EntityRecord>, DomainError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE entity_name = $1"))
            .bind(entity_name)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        rows.iter().map(from_row).collect()
    }

    async fn scan(
        &self,
        entity_name: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<EntityRecord>, DomainError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE entity_name = $1 ORDER BY created_at ASC, id ASC OFFSET $2 LIMIT $3"
        ))
        .bind(entity_name)
        .bind(to_i64(offset))
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;
        rows.iter().map(from_row).collect()
    }

    async fn count(&self, entity_name: &str) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entities WHERE entity_name = $1")
            .bind(entity_name)
            .fetch_one(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn exists(&self, entity_name: &str, id: Uuid) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM entities WHERE entity_name = $1 AND id = $2)",
        )
        .bind(entity_name)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)
    }

    #[instrument(skip(self, mutations), fields(mutations = mutations.len()))]
    async fn persist(&self, mutations: &[Mutation]) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        for mutation in mutations {
            let (entity_name, id, affected) = match mutation {
                Mutation::Insert(record) => {
                    let result = sqlx::query(
                        "INSERT INTO entities (entity_name, id, created_at, updated_at, data) \
                         VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
                    )
                    .bind(&record.entity_name)
                    .bind(record.id)
                    .bind(record.created_at)
                    .bind(record.updated_at)
                    .bind(&record.data)
                    .execute(&mut *tx)
                    .await
                    .map_err(infrastructure)?;
                    (&record.entity_name, record.id, result.rows_affected())
                }
                Mutation::Update(record) => {
                    let result = sqlx::query(
                        "UPDATE entities SET updated_at = $3, data = $4 \
                         WHERE entity_name = $1 AND id = $2",
                    )
                    .bind(&record.entity_name)
                    .bind(record.id)
                    .bind(record.updated_at)
                    .bind(&record.data)
                    .execute(&mut *tx)
                    .await
                    .map_err(infrastructure)?;
                    (&record.entity_name, record.id, result.rows_affected())
                }
                Mutation::Delete { entity_name, id } => {
                    let result =
                        sqlx::query("DELETE FROM entities WHERE entity_name = $1 AND id = $2")
                            .bind(entity_name)
                            .bind(*id)
                            .execute(&mut *tx)
                            .await
                            .map_err(infrastructure)?;
                    (entity_name, *id, result.rows_affected())
                }
            };

            if affected != 1 {
                // Dropping `tx` rolls the transaction back.
                return Err(DomainError::Conflict(format!(
                    "{entity_name} {id} was not written ({affected} rows affected)"
                )));
            }
        }

        tx.commit().await.map_err(infrastructure)?;
        debug!("entity changes persisted");
        Ok(())
    }
}
