use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, SqlErr, TransactionError,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};

use realworld_auth_schema::{outbox_events, refresh_tokens};
use realworld_domain::id::{RefreshTokenId, UserId};

use crate::domain::repository::RefreshTokenRepository;
use crate::domain::types::{OutboxEvent, RefreshToken};
use crate::error::AuthServiceError;

// ── RefreshToken repository ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRefreshTokenRepository {
    pub db: DatabaseConnection,
}

impl RefreshTokenRepository for DbRefreshTokenRepository {
    async fn insert(&self, token: &RefreshToken) -> Result<(), AuthServiceError> {
        insert_refresh_token(&self.db, token)
            .await
            .map_err(|e| classify_insert_error(e, "insert refresh token"))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, AuthServiceError> {
        let model = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::Token.eq(token))
            .one(&self.db)
            .await
            .context("find refresh token")?;
        Ok(model.map(refresh_token_from_model))
    }

    async fn consume_and_replace(
        &self,
        consumed: RefreshTokenId,
        replacement: &RefreshToken,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError> {
        self.db
            .transaction::<_, bool, DbErr>(|txn| {
                let replacement = replacement.clone();
                Box::pin(async move {
                    // Row lock + predicate re-check: a concurrent consumer waits for
                    // this commit and then matches nothing.
                    let marked = refresh_tokens::Entity::update_many()
                        .col_expr(refresh_tokens::Column::IsUsed, Expr::value(true))
                        .col_expr(refresh_tokens::Column::UsedAt, Expr::value(now))
                        .col_expr(refresh_tokens::Column::LastUsedAt, Expr::value(now))
                        .filter(refresh_tokens::Column::Id.eq(consumed.0))
                        .filter(refresh_tokens::Column::IsUsed.eq(false))
                        .filter(refresh_tokens::Column::ExpiresAt.gt(now))
                        .exec(txn)
                        .await?;
                    if marked.rows_affected == 0 {
                        return Ok(false);
                    }
                    insert_refresh_token(txn, &replacement).await?;
                    Ok(true)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(e) | TransactionError::Transaction(e) => {
                    classify_insert_error(e, "rotate refresh token")
                }
            })
    }

    async fn delete_stale(&self, older_than: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let result = refresh_tokens::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(refresh_tokens::Column::IsUsed.eq(true))
                    .add(refresh_tokens::Column::ExpiresAt.lte(older_than)),
            )
            .exec(&self.db)
            .await
            .context("delete stale refresh tokens")?;
        Ok(result.rows_affected)
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, AuthServiceError> {
        let result = refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::Token.eq(token))
            .exec(&self.db)
            .await
            .context("delete refresh token")?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_by_user(&self, user_id: UserId) -> Result<u64, AuthServiceError> {
        let result = refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::UserId.eq(user_id.0))
            .exec(&self.db)
            .await
            .context("delete refresh tokens by user")?;
        Ok(result.rows_affected)
    }

    async fn delete_by_user_with_outbox(
        &self,
        user_id: UserId,
        event: &OutboxEvent,
    ) -> Result<u64, AuthServiceError> {
        let removed = self
            .db
            .transaction::<_, u64, DbErr>(|txn| {
                let event = event.clone();
                Box::pin(async move {
                    let result = refresh_tokens::Entity::delete_many()
                        .filter(refresh_tokens::Column::UserId.eq(user_id.0))
                        .exec(txn)
                        .await?;
                    insert_outbox_event(txn, &event).await?;
                    Ok(result.rows_affected)
                })
            })
            .await
            .context("revoke refresh token family with outbox")?;
        Ok(removed)
    }
}

async fn insert_refresh_token<C: ConnectionTrait>(
    conn: &C,
    token: &RefreshToken,
) -> Result<(), DbErr> {
    refresh_tokens::ActiveModel {
        id: Set(token.id.0),
        user_id: Set(token.user_id.0),
        token: Set(token.token.clone()),
        created_at: Set(token.created_at),
        last_used_at: Set(token.last_used_at),
        expires_at: Set(token.expires_at),
        is_used: Set(token.is_used),
        used_at: Set(token.used_at),
    }
    .insert(conn)
    .await?;
    Ok(())
}

async fn insert_outbox_event<C: ConnectionTrait>(
    conn: &C,
    event: &OutboxEvent,
) -> Result<(), DbErr> {
    let model = outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        created_at: Set(Utc::now()),
        processed_at: Set(None),
    };
    outbox_events::Entity::insert(model)
        .on_conflict(
            OnConflict::column(outbox_events::Column::IdempotencyKey)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Map constraint violations on insert to domain errors.
fn classify_insert_error(err: DbErr, context: &'static str) -> AuthServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AuthServiceError::Conflict,
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => AuthServiceError::UserNotFound,
        _ => AuthServiceError::Internal(anyhow::Error::new(err).context(context)),
    }
}

fn refresh_token_from_model(model: refresh_tokens::Model) -> RefreshToken {
    RefreshToken {
        id: RefreshTokenId(model.id),
        user_id: UserId(model.user_id),
        token: model.token,
        created_at: model.created_at,
        last_used_at: model.last_used_at,
        expires_at: model.expires_at,
        is_used: model.is_used,
        used_at: model.used_at,
    }
}
