use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::{EntityStore, FlagStore};
use crate::common::EntityId;
use crate::domains::moderation::errors::{ModerationError, ModerationResult};
use crate::domains::moderation::models::{
    Actor, AutomationFlag, AutomationMode, Entity, EntityKind, EntityState,
};

/// Raw row of `moderation_entities`
#[derive(Debug, sqlx::FromRow)]
struct EntityRow {
    id: Uuid,
    kind: String,
    state: String,
    owner_id: Option<Uuid>,
    payload: serde_json::Value,
    suspicion: bool,
    submitted_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<String>,
}

impl TryFrom<EntityRow> for Entity {
    type Error = ModerationError;

    fn try_from(row: EntityRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, detail: String| {
            ModerationError::Internal(anyhow!(
                "corrupt moderation_entities row {}: {} ({})",
                row.id,
                field,
                detail
            ))
        };

        let kind = row
            .kind
            .parse::<EntityKind>()
            .map_err(|e| corrupt("kind", e.to_string()))?;
        let state = row
            .state
            .parse::<EntityState>()
            .map_err(|e| corrupt("state", e.to_string()))?;
        let resolved_by = row
            .resolved_by
            .clone()
            .map(Actor::try_from)
            .transpose()
            .map_err(|e| corrupt("resolved_by", e.to_string()))?;

        Ok(Entity {
            id: EntityId::from_uuid(row.id),
            kind,
            state,
            owner_id: row.owner_id.map(EntityId::from_uuid),
            payload: row.payload,
            suspicion: row.suspicion,
            submitted_at: row.submitted_at,
            resolved_at: row.resolved_at,
            resolved_by,
        })
    }
}

/// Raw row of `automation_flag`
#[derive(Debug, sqlx::FromRow)]
struct FlagRow {
    mode: String,
    version: i64,
    updated_at: DateTime<Utc>,
    updated_by: String,
}

impl TryFrom<FlagRow> for AutomationFlag {
    type Error = ModerationError;

    fn try_from(row: FlagRow) -> Result<Self, Self::Error> {
        let mode = row
            .mode
            .parse::<AutomationMode>()
            .map_err(|e| ModerationError::Internal(anyhow!("corrupt automation_flag row: {}", e)))?;
        let updated_by = Actor::try_from(row.updated_by)
            .map_err(|e| ModerationError::Internal(anyhow!("corrupt automation_flag row: {}", e)))?;

        Ok(AutomationFlag {
            mode,
            version: row.version,
            updated_at: row.updated_at,
            updated_by,
        })
    }
}

/// Durable store on PostgreSQL.
///
/// Conditional writes are single `UPDATE ... WHERE <expected> RETURNING *`
/// statements; an empty result is disambiguated into `NotFound`, `Conflict`
/// or a kind/state error with a follow-up read.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_optional(&self, id: EntityId) -> ModerationResult<Option<Entity>> {
        let row = sqlx::query_as::<_, EntityRow>("SELECT * FROM moderation_entities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Entity::try_from).transpose()
    }

    async fn fetch_all(
        &self,
        query: QueryAs<'_, Postgres, EntityRow, PgArguments>,
    ) -> ModerationResult<Vec<Entity>> {
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Entity::try_from)
            .collect()
    }
}

#[async_trait]
impl EntityStore for PostgresStore {
    async fn put(&self, entity: Entity) -> ModerationResult<Entity> {
        if !entity.state.is_pending() || !entity.invariants_hold() || entity.suspicion {
            return Err(ModerationError::InvalidState(Box::new(entity)));
        }

        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            INSERT INTO moderation_entities (id, kind, state, owner_id, payload, suspicion, submitted_at)
            VALUES ($1, $2, 'pending', $3, $4, FALSE, $5)
            ON CONFLICT (id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(entity.id)
        .bind(entity.kind.as_str())
        .bind(entity.owner_id)
        .bind(&entity.payload)
        .bind(entity.submitted_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Entity::try_from(row),
            None => Err(ModerationError::Conflict(entity.id)),
        }
    }

    async fn get(&self, id: EntityId) -> ModerationResult<Entity> {
        self.find_optional(id)
            .await?
            .ok_or(ModerationError::NotFound(id))
    }

    async fn list_by_kind_and_state(
        &self,
        kind: EntityKind,
        state: EntityState,
    ) -> ModerationResult<Vec<Entity>> {
        let query = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT * FROM moderation_entities
            WHERE kind = $1 AND state = $2
            ORDER BY submitted_at ASC, id ASC
            "#,
        )
        .bind(kind.as_str())
        .bind(state.as_str());
        self.fetch_all(query).await
    }

    async fn compare_and_swap_state(
        &self,
        id: EntityId,
        expected: EntityState,
        new: EntityState,
        resolved_by: Actor,
    ) -> ModerationResult<Entity> {
        if !expected.can_transition_to(new) {
            let current = self.get(id).await?;
            return Err(ModerationError::InvalidState(Box::new(current)));
        }

        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            UPDATE moderation_entities SET
                state = $3,
                resolved_at = NOW(),
                resolved_by = $4,
                suspicion = CASE
                    WHEN kind = 'partner' AND $3 = 'rejected' THEN FALSE
                    ELSE suspicion
                END
            WHERE id = $1 AND state = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(new.as_str())
        .bind(resolved_by.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Entity::try_from(row),
            None => match self.find_optional(id).await? {
                Some(_) => Err(ModerationError::Conflict(id)),
                None => Err(ModerationError::NotFound(id)),
            },
        }
    }

    async fn compare_and_swap_suspicion(
        &self,
        id: EntityId,
        expected: bool,
        new: bool,
    ) -> ModerationResult<Entity> {
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            UPDATE moderation_entities SET suspicion = $3
            WHERE id = $1
              AND kind = 'partner'
              AND state <> 'rejected'
              AND suspicion = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(new)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Entity::try_from(row);
        }

        let current = self.get(id).await?;
        if !current.is_partner() {
            return Err(ModerationError::InvalidKind {
                id,
                actual: current.kind,
                expected: EntityKind::Partner,
            });
        }
        if !current.is_active_partner() {
            return Err(ModerationError::InvalidState(Box::new(current)));
        }
        Err(ModerationError::Conflict(id))
    }

    async fn list_partners(&self, suspicion: bool) -> ModerationResult<Vec<Entity>> {
        let query = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT * FROM moderation_entities
            WHERE kind = 'partner' AND state <> 'rejected' AND suspicion = $1
            ORDER BY submitted_at ASC, id ASC
            "#,
        )
        .bind(suspicion);
        self.fetch_all(query).await
    }

    async fn count_by_kind_and_state(
        &self,
        kind: EntityKind,
        state: EntityState,
    ) -> ModerationResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM moderation_entities WHERE kind = $1 AND state = $2",
        )
        .bind(kind.as_str())
        .bind(state.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> ModerationResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl FlagStore for PostgresStore {
    async fn load_or_init(&self) -> ModerationResult<AutomationFlag> {
        sqlx::query(
            r#"
            INSERT INTO automation_flag (id, mode, version, updated_at, updated_by)
            VALUES (1, 'manual', 0, NOW(), 'system')
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, FlagRow>(
            "SELECT mode, version, updated_at, updated_by FROM automation_flag WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        AutomationFlag::try_from(row)
    }

    async fn compare_and_swap_mode(
        &self,
        expected_version: i64,
        mode: AutomationMode,
        updated_by: Actor,
    ) -> ModerationResult<AutomationFlag> {
        let row = sqlx::query_as::<_, FlagRow>(
            r#"
            UPDATE automation_flag SET
                mode = $2,
                version = version + 1,
                updated_at = NOW(),
                updated_by = $3
            WHERE id = 1 AND version = $1
            RETURNING mode, version, updated_at, updated_by
            "#,
        )
        .bind(expected_version)
        .bind(mode.as_str())
        .bind(updated_by.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => AutomationFlag::try_from(row),
            None => {
                let current = self.load_or_init().await?;
                Err(ModerationError::ModeConflict { current })
            }
        }
    }
}
