use chrono::{Duration, Utc};

use realworld_auth::domain::types::{MAX_ISSUE_ATTEMPTS, REFRESH_TOKEN_LEN, TokenState};
use realworld_auth::error::AuthServiceError;
use realworld_auth::usecase::refresh_token::{
    IssueTokenUseCase, LookupTokenUseCase, RotateTokenUseCase,
};
use realworld_auth::usecase::session::LogoutUseCase;

use crate::helpers::{
    MockRefreshTokenRepo, active_token, expired_token, test_ttl, test_user_id, token_issued_at,
    used_token,
};

// ── IssueTokenUseCase ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_issue_unused_token_expiring_after_configured_ttl() {
    let repo = MockRefreshTokenRepo::empty();
    let usecase = IssueTokenUseCase {
        tokens: repo.clone(),
        ttl: Duration::hours(12),
    };

    let before = Utc::now();
    let token = usecase.execute(test_user_id()).await.unwrap();
    let after = Utc::now();

    assert_eq!(token.user_id, test_user_id());
    assert_eq!(token.token.len(), REFRESH_TOKEN_LEN);
    assert!(!token.is_used);
    assert!(token.used_at.is_none());
    assert_eq!(token.expires_at, token.created_at + Duration::hours(12));
    assert!(token.created_at >= before && token.created_at <= after);
    assert_eq!(repo.get(&token.token), Some(token));
}

#[tokio::test]
async fn should_retry_issue_after_value_collision() {
    let repo = MockRefreshTokenRepo::empty();
    repo.force_conflicts(MAX_ISSUE_ATTEMPTS - 1);
    let usecase = IssueTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let token = usecase.execute(test_user_id()).await.unwrap();

    assert_eq!(repo.len(), 1);
    assert!(repo.get(&token.token).is_some());
}

#[tokio::test]
async fn should_surface_conflict_when_every_attempt_collides() {
    let repo = MockRefreshTokenRepo::empty();
    repo.force_conflicts(MAX_ISSUE_ATTEMPTS);
    let usecase = IssueTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let result = usecase.execute(test_user_id()).await;

    assert!(
        matches!(result, Err(AuthServiceError::Conflict)),
        "expected Conflict, got {result:?}"
    );
    assert_eq!(repo.len(), 0);
}

#[tokio::test]
async fn should_issue_distinct_tokens_for_the_same_user() {
    let repo = MockRefreshTokenRepo::empty();
    let usecase = IssueTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let a = usecase.execute(test_user_id()).await.unwrap();
    let b = usecase.execute(test_user_id()).await.unwrap();

    assert_ne!(a.token, b.token);
    assert_ne!(a.id, b.id);
    assert_eq!(repo.count_for(test_user_id()), 2);
}

// ── LookupTokenUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_look_up_token_by_value() {
    let stored = active_token(test_user_id(), "lookup-me");
    let usecase = LookupTokenUseCase {
        tokens: MockRefreshTokenRepo::new(vec![stored.clone()]),
    };

    let found = usecase.execute("lookup-me").await.unwrap();

    assert_eq!(found, stored);
}

#[tokio::test]
async fn should_return_not_found_for_unknown_value() {
    let usecase = LookupTokenUseCase {
        tokens: MockRefreshTokenRepo::empty(),
    };

    let result = usecase.execute("missing").await;

    assert!(
        matches!(result, Err(AuthServiceError::NotFound)),
        "expected NotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_return_used_and_expired_tokens_from_lookup() {
    let repo = MockRefreshTokenRepo::new(vec![
        used_token(test_user_id(), "used"),
        expired_token(test_user_id(), "expired"),
    ]);
    let usecase = LookupTokenUseCase { tokens: repo };

    let used = usecase.execute("used").await.unwrap();
    let expired = usecase.execute("expired").await.unwrap();

    assert_eq!(used.state_at(Utc::now()), TokenState::Used);
    assert_eq!(expired.state_at(Utc::now()), TokenState::Expired);
}

// ── RotateTokenUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_rotate_active_token_into_fresh_replacement() {
    let old = active_token(test_user_id(), "old");
    let repo = MockRefreshTokenRepo::new(vec![old.clone()]);
    let usecase = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let new = usecase.execute("old").await.unwrap();

    assert_ne!(new.token, old.token);
    assert_eq!(new.user_id, old.user_id);
    assert!(!new.is_used);
    assert_eq!(new.expires_at, new.created_at + test_ttl());

    let consumed = repo.get("old").unwrap();
    assert!(consumed.is_used);
    assert_eq!(consumed.used_at, Some(new.created_at));
    assert_eq!(consumed.last_used_at, new.created_at);
    assert_eq!(repo.get(&new.token), Some(new));
}

#[tokio::test]
async fn should_return_not_found_when_rotating_unknown_token() {
    let repo = MockRefreshTokenRepo::empty();
    let usecase = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let result = usecase.execute("nope").await;

    assert!(
        matches!(result, Err(AuthServiceError::NotFound)),
        "expected NotFound, got {result:?}"
    );
    assert_eq!(repo.len(), 0);
}

#[tokio::test]
async fn should_report_expired_not_reuse_for_expired_unused_token() {
    let repo = MockRefreshTokenRepo::new(vec![expired_token(test_user_id(), "stale")]);
    let usecase = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let result = usecase.execute("stale").await;

    assert!(
        matches!(result, Err(AuthServiceError::Expired)),
        "expected Expired, got {result:?}"
    );
    let row = repo.get("stale").unwrap();
    assert!(!row.is_used);
    assert!(row.used_at.is_none());
    assert_eq!(repo.len(), 1);
}

#[tokio::test]
async fn should_detect_reuse_of_consumed_token() {
    let used = used_token(test_user_id(), "replayed");
    let repo = MockRefreshTokenRepo::new(vec![used.clone()]);
    let usecase = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let result = usecase.execute("replayed").await;

    match result {
        Err(AuthServiceError::ReuseDetected { user_id, token_id }) => {
            assert_eq!(user_id, used.user_id);
            assert_eq!(token_id, used.id);
        }
        other => panic!("expected ReuseDetected, got {other:?}"),
    }
    assert_eq!(repo.len(), 1, "store only reports; revocation is the caller's");
}

#[tokio::test]
async fn should_never_rotate_a_consumed_token_again() {
    let repo = MockRefreshTokenRepo::new(vec![active_token(test_user_id(), "once")]);
    let usecase = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    usecase.execute("once").await.unwrap();
    for _ in 0..3 {
        let result = usecase.execute("once").await;
        assert!(
            matches!(result, Err(AuthServiceError::ReuseDetected { .. })),
            "expected ReuseDetected, got {result:?}"
        );
    }
    let row = repo.get("once").unwrap();
    assert!(row.is_used);
    assert!(row.used_at.is_some());
    assert_eq!(repo.len(), 2);
}

#[tokio::test]
async fn should_let_exactly_one_concurrent_rotation_win() {
    let repo = MockRefreshTokenRepo::new(vec![active_token(test_user_id(), "contested")]);
    let usecase = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let (a, b) = tokio::join!(usecase.execute("contested"), usecase.execute("contested"));

    let (winner, loser) = match (a, b) {
        (Ok(new), Err(e)) | (Err(e), Ok(new)) => (new, e),
        other => panic!("expected exactly one success, got {other:?}"),
    };
    assert!(
        matches!(loser, AuthServiceError::ReuseDetected { .. }),
        "expected ReuseDetected, got {loser:?}"
    );
    assert_eq!(repo.len(), 2, "only the winner's replacement is stored");
    assert!(repo.get(&winner.token).is_some());
    assert!(repo.get("contested").unwrap().is_used);
}

#[tokio::test]
async fn should_report_not_found_when_token_is_revoked_mid_rotation() {
    let repo = MockRefreshTokenRepo::new(vec![active_token(test_user_id(), "revoked")]);
    let rotate = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };
    let logout = LogoutUseCase {
        tokens: repo.clone(),
    };

    // Rotation suspends after its lookup; logout deletes the row before the consume.
    let (rotated, removed) = tokio::join!(rotate.execute("revoked"), logout.execute("revoked"));

    assert!(removed.unwrap());
    assert!(
        matches!(rotated, Err(AuthServiceError::NotFound)),
        "expected NotFound, got {rotated:?}"
    );
    assert_eq!(repo.len(), 0, "no replacement is stored");
}

#[tokio::test]
async fn should_keep_presented_token_active_when_replacement_collides() {
    let repo = MockRefreshTokenRepo::new(vec![active_token(test_user_id(), "retry-me")]);
    repo.force_conflicts(1);
    let usecase = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let first = usecase.execute("retry-me").await;
    assert!(
        matches!(first, Err(AuthServiceError::Conflict)),
        "expected Conflict, got {first:?}"
    );
    assert!(!repo.get("retry-me").unwrap().is_used);

    let second = usecase.execute("retry-me").await;
    assert!(second.is_ok(), "retry should succeed, got {second:?}");
}

#[tokio::test]
async fn should_follow_issue_rotate_replay_expire_timeline() {
    // Issue(U) at T0 → A; Rotate(A) at T0+1h → B; Rotate(A) again → reuse;
    // Rotate(B) once B's own expiry has passed → expired.
    let t0 = Utc::now() - Duration::days(8);
    let a = token_issued_at(test_user_id(), "token-a", t0);
    assert_eq!(a.expires_at, t0 + Duration::days(7));

    let b = token_issued_at(test_user_id(), "token-b", t0 + Duration::hours(1));
    let mut a_used = a.clone();
    a_used.consume(t0 + Duration::hours(1));

    let repo = MockRefreshTokenRepo::new(vec![a_used.clone(), b.clone()]);
    let usecase = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    assert_eq!(a_used.used_at, Some(t0 + Duration::hours(1)));

    let replay = usecase.execute("token-a").await;
    assert!(
        matches!(replay, Err(AuthServiceError::ReuseDetected { .. })),
        "expected ReuseDetected, got {replay:?}"
    );

    let late = usecase.execute("token-b").await;
    assert!(
        matches!(late, Err(AuthServiceError::Expired)),
        "expected Expired, got {late:?}"
    );
}

#[tokio::test]
async fn should_rotate_within_lifetime_then_reject_replay() {
    let repo = MockRefreshTokenRepo::empty();
    let issue = IssueTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };
    let rotate = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let a = issue.execute(test_user_id()).await.unwrap();
    let b = rotate.execute(&a.token).await.unwrap();

    let a_row = repo.get(&a.token).unwrap();
    assert!(a_row.is_used);
    assert_eq!(a_row.used_at, Some(b.created_at));

    let replay = rotate.execute(&a.token).await;
    assert!(
        matches!(replay, Err(AuthServiceError::ReuseDetected { .. })),
        "expected ReuseDetected, got {replay:?}"
    );

    let c = rotate.execute(&b.token).await.unwrap();
    assert_eq!(c.user_id, test_user_id());
}

#[tokio::test]
async fn should_keep_used_at_and_is_used_in_lockstep_for_every_row() {
    let repo = MockRefreshTokenRepo::empty();
    let issue = IssueTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };
    let rotate = RotateTokenUseCase {
        tokens: repo.clone(),
        ttl: test_ttl(),
    };

    let mut current = issue.execute(test_user_id()).await.unwrap();
    for _ in 0..5 {
        current = rotate.execute(&current.token).await.unwrap();
    }
    let _ = rotate.execute("unknown").await;

    for row in repo.tokens.lock().unwrap().iter() {
        assert_eq!(row.is_used, row.used_at.is_some(), "row {row:?}");
    }
    assert_eq!(repo.len(), 6);
}
