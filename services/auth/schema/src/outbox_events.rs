use sea_orm::entity::prelude::*;

/// Security event queued for asynchronous delivery (alert email, audit sink).
/// Written in the same transaction as the state change it reports; the
/// dispatcher that drains it lives outside this service.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "outbox_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: String,
    pub payload: Json,
    /// Duplicate enqueues of the same event collapse onto this key.
    #[sea_orm(unique)]
    pub idempotency_key: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
