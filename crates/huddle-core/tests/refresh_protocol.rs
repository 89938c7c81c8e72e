//! Integration tests for the authenticated request layer.
//!
//! Each test runs against a mock backend and counts the calls made for one
//! originating request.


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use fixtures::{Harness, can_bind_localhost, envelope, tokens_json, unauthorized, user_json};
use huddle_core::client::ImageUpload;
use huddle_core::{ApiError, RefreshPolicy, Route, TokenStore};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, Request, ResponseTemplate};

#[tokio::test]
async fn test_success_is_a_single_call() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::start("access-1", "refresh-1").await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "bearer access-1"))
        .respond_with(envelope(user_json("u1", "Ada")))
        .expect(1)
        .mount(&h.server)
        .await;

    let user = h.api.me().await.expect("me");

    assert_eq!(user.id, "u1");
    assert_eq!(h.request_count().await, 1);
}

#[tokio::test]
async fn test_non_authorization_error_is_returned_without_retry() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::start("access-1", "refresh-1").await;

    Mock::given(method("GET"))
        .and(path("/group/public"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.api.public_groups().await.unwrap_err();

    assert!(matches!(err, ApiError::Http { status: 500, .. }));
    assert_eq!(err.user_message(), "boom");
    assert_eq!(h.request_count().await, 1);
    assert!(h.session.is_logged_in());
}

#[tokio::test]
async fn test_plain_401_is_not_an_authorization_failure() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::start("access-1", "refresh-1").await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Token malformed"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.api.me().await.unwrap_err();

    assert!(matches!(err, ApiError::Http { status: 401, .. }));
    assert_eq!(h.request_count().await, 1);
    assert!(h.navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_refresh_then_retry_makes_three_calls() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::start("stale", "refresh-1").await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "bearer stale"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/refresh-token"))
        .and(body_json(json!({"refreshToken": "refresh-1"})))
        .respond_with(envelope(tokens_json("fresh", "refresh-2")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "bearer fresh"))
        .respond_with(envelope(user_json("u1", "Ada")))
        .expect(1)
        .mount(&h.server)
        .await;

    let user = h.api.me().await.expect("me after refresh");

    assert_eq!(user.name, "Ada");
    assert_eq!(h.request_count().await, 3);
    assert_eq!(h.session.access_token(), "fresh");
    assert_eq!(h.session.refresh_token(), "refresh-2");
    assert_eq!(h.store.load().unwrap().access_token, "fresh");
    assert_eq!(h.session.user().map(|u| u.id), Some("u1".to_string()));
}

#[tokio::test]
async fn test_refresh_exchange_carries_no_bearer_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::start("stale", "refresh-1").await;
    let saw_auth = Arc::new(AtomicBool::new(false));
    let saw_auth_clone = Arc::clone(&saw_auth);

    Mock::given(method("GET"))
        .and(path("/users/get-user-groups"))
        .and(header("authorization", "bearer stale"))
        .respond_with(unauthorized())
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/refresh-token"))
        .respond_with(move |req: &Request| {
            if req.headers.contains_key("authorization") {
                saw_auth_clone.store(true, Ordering::SeqCst);
            }
            envelope(tokens_json("fresh", "refresh-2"))
        })
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/get-user-groups"))
        .and(header("authorization", "bearer fresh"))
        .respond_with(envelope(json!({"groups": []})))
        .mount(&h.server)
        .await;

    let groups = h.api.user_groups().await.expect("groups");

    assert!(groups.is_empty());
    assert!(!saw_auth.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_missing_refresh_token_ends_session_after_one_call() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::start("stale", "").await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/refresh-token"))
        .respond_with(envelope(tokens_json("never", "never")))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h.api.me().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert!(err.is_session_ended());
    assert_eq!(h.request_count().await, 1);
    assert!(!h.session.is_logged_in());
    assert!(h.session.user().is_none());
    assert!(h.store.load().unwrap().is_empty());
    assert_eq!(h.navigator.last(), Some(Route::Login));
}

#[tokio::test]
async fn test_refresh_failure_ends_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::start("stale", "revoked").await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/refresh-token"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "Invalid refresh token"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.api.me().await.unwrap_err();

    assert!(matches!(err, ApiError::RefreshFailed { .. }));
    assert_eq!(err.user_message(), "Invalid refresh token");
    assert_eq!(h.request_count().await, 2);
    assert!(!h.session.is_logged_in());
    assert!(h.store.load().unwrap().is_empty());
    assert_eq!(h.navigator.last(), Some(Route::Login));
}

#[tokio::test]
async fn test_retry_rejected_again_is_final() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::start("stale", "refresh-1").await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/refresh-token"))
        .respond_with(envelope(tokens_json("fresh", "refresh-2")))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.api.me().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(h.request_count().await, 3);
    // The exchange itself succeeded, so its tokens stay installed.
    assert_eq!(h.session.access_token(), "fresh");
    assert!(h.navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_upload_is_resent_on_retry() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::start("stale", "refresh-1").await;

    Mock::given(method("POST"))
        .and(path("/users/upload-image"))
        .and(header("authorization", "bearer stale"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/refresh-token"))
        .respond_with(envelope(tokens_json("fresh", "refresh-2")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/upload-image"))
        .and(header("authorization", "bearer fresh"))
        .and(body_string_contains("name=\"image\""))
        .and(body_string_contains("avatar-bytes"))
        .respond_with(envelope(user_json("u1", "Ada")))
        .expect(1)
        .mount(&h.server)
        .await;

    let user = h
        .api
        .upload_image(ImageUpload {
            file_name: "avatar.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: b"avatar-bytes".to_vec(),
        })
        .await
        .expect("upload after refresh");

    assert_eq!(user.id, "u1");
}

async fn mount_concurrent_backend(h: &Harness, expected_exchanges: u64) {
    for route in ["/users/me", "/users/get-user-groups"] {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("authorization", "bearer stale"))
            .respond_with(unauthorized())
            .mount(&h.server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "bearer fresh"))
        .respond_with(envelope(user_json("u1", "Ada")))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/get-user-groups"))
        .and(header("authorization", "bearer fresh"))
        .respond_with(envelope(json!({"groups": []})))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/refresh-token"))
        .respond_with(
            envelope(tokens_json("fresh", "refresh-2")).set_delay(Duration::from_millis(50)),
        )
        .expect(expected_exchanges)
        .mount(&h.server)
        .await;
}

#[tokio::test]
async fn test_single_flight_shares_one_exchange() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::with_policy("stale", "refresh-1", RefreshPolicy::SingleFlight).await;
    mount_concurrent_backend(&h, 1).await;

    let (me, groups) = tokio::join!(h.api.me(), h.api.user_groups());

    assert!(me.is_ok());
    assert!(groups.is_ok());
    assert_eq!(h.session.access_token(), "fresh");
}

#[tokio::test]
async fn test_independent_policy_refreshes_per_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let h = Harness::with_policy("stale", "refresh-1", RefreshPolicy::Independent).await;
    mount_concurrent_backend(&h, 2).await;

    let (me, groups) = tokio::join!(h.api.me(), h.api.user_groups());

    assert!(me.is_ok());
    assert!(groups.is_ok());
}
