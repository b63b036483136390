use chrono::Duration;
use sea_orm::DatabaseConnection;

use crate::infra::db::DbRefreshTokenRepository;
use crate::usecase::refresh_token::{
    CleanupTokensUseCase, IssueTokenUseCase, LookupTokenUseCase, RotateTokenUseCase,
};
use crate::usecase::session::{LogoutUseCase, RefreshSessionUseCase, RevokeAllSessionsUseCase};

/// Shared handles the authentication flow builds its use cases from.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub refresh_token_ttl: Duration,
}

impl AppState {
    pub fn refresh_token_repo(&self) -> DbRefreshTokenRepository {
        DbRefreshTokenRepository {
            db: self.db.clone(),
        }
    }

    pub fn issue_token(&self) -> IssueTokenUseCase<DbRefreshTokenRepository> {
        IssueTokenUseCase {
            tokens: self.refresh_token_repo(),
            ttl: self.refresh_token_ttl,
        }
    }

    pub fn lookup_token(&self) -> LookupTokenUseCase<DbRefreshTokenRepository> {
        LookupTokenUseCase {
            tokens: self.refresh_token_repo(),
        }
    }

    pub fn rotate_token(&self) -> RotateTokenUseCase<DbRefreshTokenRepository> {
        RotateTokenUseCase {
            tokens: self.refresh_token_repo(),
            ttl: self.refresh_token_ttl,
        }
    }

    pub fn refresh_session(&self) -> RefreshSessionUseCase<DbRefreshTokenRepository> {
        RefreshSessionUseCase {
            tokens: self.refresh_token_repo(),
            ttl: self.refresh_token_ttl,
        }
    }

    pub fn logout(&self) -> LogoutUseCase<DbRefreshTokenRepository> {
        LogoutUseCase {
            tokens: self.refresh_token_repo(),
        }
    }

    pub fn revoke_all_sessions(&self) -> RevokeAllSessionsUseCase<DbRefreshTokenRepository> {
        RevokeAllSessionsUseCase {
            tokens: self.refresh_token_repo(),
        }
    }

    pub fn cleanup_tokens(&self) -> CleanupTokensUseCase<DbRefreshTokenRepository> {
        CleanupTokensUseCase {
            tokens: self.refresh_token_repo(),
        }
    }
}
