//! sea-orm entities for the auth service tables.

pub mod outbox_events;
pub mod refresh_tokens;
pub mod users;
