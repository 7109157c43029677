//! Wiremock tests for the 401 refresh-and-retry cycle.
//!
//! Exactly one refresh per original request; a second 401 on the
//! retried request must not loop, and must clear the session and emit
//! the signed-out event.

use std::time::Duration;

use hermod::auth::{AuthSession, SessionEvent, SignOutReason, TokenPair};
use hermod::http::{HttpClient, HttpConfig};
use hermod::HermodError;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_client(server: &MockServer, auth: AuthSession) -> HttpClient {
    HttpClient::new(
        &HttpConfig {
            base_url: format!("{}/", server.uri()),
            timeout: Duration::from_secs(5),
        },
        auth,
    )
    .expect("valid config")
}

#[tokio::test]
async fn expired_token_refreshes_once_and_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/clients/"))
        .and(header("Authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .and(body_json(serde_json::json!({ "refresh": "refresh-token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access": "fresh-access"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/clients/"))
        .and(header("Authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 1, "name": "ACME", "kind": "COMPANY", "phone": "", "email": "",
              "address": "", "city": "", "status": "ACTIVE", "created_at": "2024-01-01" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthSession::with_tokens(TokenPair::new("stale-access", "refresh-token"));
    let client = http_client(&server, auth.clone());

    let list: Vec<serde_json::Value> = client.get_list("/clients/").await.expect("retried ok");
    assert_eq!(list.len(), 1);
    assert_eq!(auth.access_token().as_deref(), Some("fresh-access"));
    assert_eq!(auth.refresh_token().as_deref(), Some("refresh-token"));
}

#[tokio::test]
async fn second_401_does_not_loop_and_clears_session() {
    let server = MockServer::start().await;

    // Every data request is rejected, fresh token or not.
    Mock::given(method("GET"))
        .and(path("/projects/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2) // original + exactly one retry
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access": "fresh-access"
        })))
        .expect(1) // one refresh cycle, never a second
        .mount(&server)
        .await;

    let auth = AuthSession::with_tokens(TokenPair::new("stale-access", "refresh-token"));
    let client = http_client(&server, auth.clone());

    let result: hermod::Result<Vec<serde_json::Value>> = client.get_list("/projects/").await;
    assert!(matches!(result, Err(HermodError::SessionExpired)));
    assert!(auth.tokens().is_none(), "session cleared");
    assert_eq!(
        *auth.events().borrow(),
        SessionEvent::SignedOut(SignOutReason::RefreshFailed)
    );
}

#[tokio::test]
async fn refresh_failure_clears_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quotes/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "detail": "Token is invalid or expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthSession::with_tokens(TokenPair::new("stale-access", "dead-refresh"));
    let client = http_client(&server, auth.clone());

    let result: hermod::Result<Vec<serde_json::Value>> = client.get_list("/quotes/").await;
    assert!(matches!(result, Err(HermodError::SessionExpired)));
    assert!(auth.tokens().is_none());
}

#[tokio::test]
async fn unauthenticated_request_skips_refresh_cycle() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/suppliers/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let auth = AuthSession::new();
    let client = http_client(&server, auth.clone());

    let result: hermod::Result<Vec<serde_json::Value>> = client.get_list("/suppliers/").await;
    assert!(matches!(result, Err(HermodError::AuthenticationFailed)));
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/invoices/"))
        .and(header("Authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access": "fresh-access" }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/invoices/"))
        .and(header("Authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let auth = AuthSession::with_tokens(TokenPair::new("stale-access", "refresh-token"));
    let client = http_client(&server, auth);

    let (a, b) = tokio::join!(
        client.get_list::<serde_json::Value>("/invoices/"),
        client.get_list::<serde_json::Value>("/invoices/"),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
}

#[tokio::test]
async fn unauthenticated_401_maps_to_authentication_failed() {
    let server = MockServer::start().await;

    // A bad login is a plain 401, not a refresh trigger: the login
    // endpoint is called without a session.
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;

    let auth = AuthSession::new();
    let client = http_client(&server, auth);

    let result: hermod::Result<serde_json::Value> = client
        .post_json(
            "/auth/login/",
            &serde_json::json!({ "username": "admin", "password": "wrong" }),
        )
        .await;
    assert!(matches!(result, Err(HermodError::AuthenticationFailed)));
}
