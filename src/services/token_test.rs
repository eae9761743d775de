use super::*;
use crate::services::test_support::{PASSWORD, registration, signed_in};
use crate::state::test_helpers::{test_app_state, test_app_state_with};
use crate::store::FileStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn store_token(state: &AppState, token: &Token) {
    store::insert(state.store.as_ref(), Collection::Tokens, &token.token, token)
        .await
        .unwrap();
}

fn expired_token(email: &str) -> Token {
    Token { email: email.into(), token: generate_id(TOKEN_ID_LEN), expires: now_millis() - 1 }
}

// =============================================================================
// generate_id
// =============================================================================

#[test]
fn generate_id_has_requested_length() {
    assert_eq!(generate_id(TOKEN_ID_LEN).len(), 50);
    assert_eq!(generate_id(20).len(), 20);
}

#[test]
fn generate_id_is_alphanumeric() {
    assert!(generate_id(200).chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn generate_id_two_calls_differ() {
    assert_ne!(generate_id(TOKEN_ID_LEN), generate_id(TOKEN_ID_LEN));
}

// =============================================================================
// issue
// =============================================================================

#[tokio::test]
async fn issue_returns_fifty_char_token_expiring_in_a_day() {
    let (state, _) = test_app_state();
    user::register(&state, &registration("a@x.com")).await.unwrap();

    let before = now_millis();
    let token = issue(&state, &json!({"email": "a@x.com", "password": PASSWORD}))
        .await
        .unwrap();

    assert_eq!(token.email, "a@x.com");
    assert_eq!(token.token.len(), TOKEN_ID_LEN);
    let day_ms = 86_400_000;
    assert!(token.expires >= before + day_ms);
    assert!(token.expires <= now_millis() + day_ms);
}

#[tokio::test]
async fn issue_persists_token() {
    let (state, store) = test_app_state();
    let id = signed_in(&state, "a@x.com").await;
    assert_eq!(store.count(Collection::Tokens).await, 1);
    assert_eq!(fetch(&state, Some(id.as_str())).await.unwrap().email, "a@x.com");
}

#[tokio::test]
async fn issue_wrong_password_is_invalid_credentials() {
    let (state, store) = test_app_state();
    user::register(&state, &registration("a@x.com")).await.unwrap();

    let err = issue(&state, &json!({"email": "a@x.com", "password": "nope"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials));
    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(store.count(Collection::Tokens).await, 0);
}

#[tokio::test]
async fn issue_unknown_user_is_not_found() {
    let (state, _) = test_app_state();
    let err = issue(&state, &json!({"email": "ghost@x.com", "password": "pw"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn issue_missing_fields_is_bad_request() {
    let (state, _) = test_app_state();
    for body in [json!({}), json!({"email": "a@x.com"}), json!({"email": "a@x.com", "password": "  "})] {
        let err = issue(&state, &body).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)), "body {body}");
    }
}

#[tokio::test]
async fn issue_allows_multiple_tokens_per_user() {
    let (state, store) = test_app_state();
    signed_in(&state, "a@x.com").await;
    issue(&state, &json!({"email": "a@x.com", "password": PASSWORD}))
        .await
        .unwrap();
    assert_eq!(store.count(Collection::Tokens).await, 2);
}

// =============================================================================
// fetch
// =============================================================================

#[tokio::test]
async fn fetch_rejects_wrong_length() {
    let (state, _) = test_app_state();
    let err = fetch(&state, Some("short")).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    let err = fetch(&state, None).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
}

#[tokio::test]
async fn fetch_unknown_is_not_found() {
    let (state, _) = test_app_state();
    let err = fetch(&state, Some(generate_id(TOKEN_ID_LEN).as_str())).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

// =============================================================================
// extend
// =============================================================================

#[tokio::test]
async fn extend_pushes_expiry_forward() {
    let (state, _) = test_app_state();
    let id = signed_in(&state, "a@x.com").await;

    let mut stale = fetch(&state, Some(id.as_str())).await.unwrap();
    stale.expires = now_millis() + 1_000;
    store::put(state.store.as_ref(), Collection::Tokens, &id, &stale).await.unwrap();

    let extended = extend(&state, &json!({"id": id, "extend": true})).await.unwrap();
    assert!(extended.expires > stale.expires + 80_000_000);
    assert_eq!(fetch(&state, Some(id.as_str())).await.unwrap(), extended);
}

#[tokio::test]
async fn extend_requires_extend_true() {
    let (state, _) = test_app_state();
    let id = signed_in(&state, "a@x.com").await;
    for body in [json!({"id": id}), json!({"id": id, "extend": false}), json!({"id": id, "extend": "true"})] {
        let err = extend(&state, &body).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)), "body {body}");
    }
}

#[tokio::test]
async fn extend_refuses_expired_token() {
    let (state, _) = test_app_state();
    let dead = expired_token("a@x.com");
    store_token(&state, &dead).await;

    let err = extend(&state, &json!({"id": dead.token, "extend": true})).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("expired")));
    assert_eq!(fetch(&state, Some(dead.token.as_str())).await.unwrap().expires, dead.expires);
}

#[tokio::test]
async fn extend_unknown_is_bad_request() {
    let (state, _) = test_app_state();
    let err = extend(&state, &json!({"id": generate_id(TOKEN_ID_LEN), "extend": true}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
}

// =============================================================================
// revoke
// =============================================================================

#[tokio::test]
async fn revoke_deletes_and_returns_token() {
    let (state, store) = test_app_state();
    let id = signed_in(&state, "a@x.com").await;

    let revoked = revoke(&state, Some(id.as_str())).await.unwrap();
    assert_eq!(revoked.token_info.token, id);
    assert_eq!(store.count(Collection::Tokens).await, 0);
    assert!(!verify(&state, Some(id.as_str()), "a@x.com").await);
}

#[tokio::test]
async fn revoke_waits_for_token_lock() {
    let (state, store) = test_app_state();
    let id = signed_in(&state, "a@x.com").await;

    let held = state.locks.lock(Collection::Tokens, &id).await;
    let pending = {
        let state = state.clone();
        let id = id.clone();
        tokio::spawn(async move { revoke(&state, Some(id.as_str())).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished());
    assert_eq!(store.count(Collection::Tokens).await, 1);

    drop(held);
    assert!(pending.await.unwrap().is_ok());
    assert_eq!(store.count(Collection::Tokens).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn extend_racing_revoke_never_fails_on_storage() {
    let (state, _) = test_app_state();
    signed_in(&state, "a@x.com").await;

    for _ in 0..50 {
        let id = issue(&state, &json!({"email": "a@x.com", "password": PASSWORD}))
            .await
            .unwrap()
            .token;
        let extender = {
            let state = state.clone();
            let body = json!({"id": id, "extend": true});
            tokio::spawn(async move { extend(&state, &body).await })
        };
        let revoker = {
            let state = state.clone();
            let id = id.clone();
            tokio::spawn(async move { revoke(&state, Some(id.as_str())).await })
        };

        assert!(revoker.await.unwrap().is_ok());
        if let Err(e) = extender.await.unwrap() {
            assert!(matches!(e, ApiError::BadRequest(_)), "unexpected {e:?}");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn verify_stays_true_while_file_backed_token_is_extended() {
    let dir = tempfile::tempdir().unwrap();
    let files = FileStore::open(dir.path()).await.unwrap();
    let state = test_app_state_with(Arc::new(files));
    let id = signed_in(&state, "a@x.com").await;

    let extender = {
        let state = state.clone();
        let body = json!({"id": id, "extend": true});
        tokio::spawn(async move {
            for _ in 0..200 {
                extend(&state, &body).await.unwrap();
            }
        })
    };

    let mut checks = 0;
    while !extender.is_finished() {
        assert!(verify(&state, Some(id.as_str()), "a@x.com").await, "live token denied");
        checks += 1;
    }
    extender.await.unwrap();
    assert!(checks > 0);
}

#[tokio::test]
async fn revoke_unknown_is_bad_request() {
    let (state, _) = test_app_state();
    let err = revoke(&state, Some(generate_id(TOKEN_ID_LEN).as_str())).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
}

// =============================================================================
// verify
// =============================================================================

#[tokio::test]
async fn verify_true_for_live_matching_token() {
    let (state, _) = test_app_state();
    let id = signed_in(&state, "a@x.com").await;
    assert!(verify(&state, Some(id.as_str()), "a@x.com").await);
}

#[tokio::test]
async fn verify_false_for_other_email() {
    let (state, _) = test_app_state();
    let id = signed_in(&state, "a@x.com").await;
    assert!(!verify(&state, Some(id.as_str()), "b@x.com").await);
}

#[tokio::test]
async fn verify_false_for_expired() {
    let (state, _) = test_app_state();
    let dead = expired_token("a@x.com");
    store_token(&state, &dead).await;
    assert!(!verify(&state, Some(dead.token.as_str()), "a@x.com").await);
}

#[tokio::test]
async fn verify_false_for_unknown_missing_or_malformed() {
    let (state, _) = test_app_state();
    assert!(!verify(&state, Some(generate_id(TOKEN_ID_LEN).as_str()), "a@x.com").await);
    assert!(!verify(&state, None, "a@x.com").await);
    assert!(!verify(&state, Some(""), "a@x.com").await);
    assert!(!verify(&state, Some("../users/a@x.com"), "a@x.com").await);
}

#[test]
fn is_live_at_boundary() {
    let t = Token { email: "a@x.com".into(), token: "t".into(), expires: 1_000 };
    assert!(t.is_live_at(999));
    assert!(!t.is_live_at(1_000));
}
