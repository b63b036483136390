use realworld_domain::id::{RefreshTokenId, UserId};

/// Refresh-token store and session error variants.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("refresh token not found")]
    NotFound,
    #[error("refresh token expired")]
    Expired,
    /// An already-consumed token was presented again. The whole token family
    /// of `user_id` must be treated as compromised.
    #[error("refresh token reuse detected")]
    ReuseDetected {
        user_id: UserId,
        token_id: RefreshTokenId,
    },
    #[error("refresh token collision")]
    Conflict,
    #[error("user not found")]
    UserNotFound,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "REFRESH_TOKEN_NOT_FOUND",
            Self::Expired => "REFRESH_TOKEN_EXPIRED",
            Self::ReuseDetected { .. } => "REFRESH_TOKEN_REUSE_DETECTED",
            Self::Conflict => "REFRESH_TOKEN_CONFLICT",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Transient failures that a fresh attempt may resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    /// Text for log lines. `Internal` renders its whole anyhow chain here since
    /// `Display` keeps it out of caller-facing messages.
    pub fn log_detail(&self) -> String {
        match self {
            Self::Internal(e) => format!("{e:#}"),
            other => other.to_string(),
        }
    }

    /// Failures the caller should answer by forcing the client to log in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::Expired | Self::ReuseDetected { .. } | Self::UserNotFound
        )
    }
}
