//! Integration tests for the API client's retry conventions

mod common;

use std::time::Duration;

use common::{bearer, make_token};
use mockito::{Matcher, Server};
use serde::Deserialize;
use tableside_core::auth::{MemoryTokenStore, WHOAMI_PATH};
use tableside_core::models::UserRole;
use tableside_core::{ApiClient, ApiError, SessionError};

#[derive(Debug, Deserialize)]
struct Order {
    id: i64,
    status: String,
}

fn client_for(server: &Server, token: Option<&str>) -> ApiClient {
    let client = ApiClient::new(
        &server.url(),
        Box::new(MemoryTokenStore::new()),
        Duration::from_secs(5),
    )
    .expect("Failed to build client")
    .with_initial_backoff(Duration::from_millis(1));

    if let Some(token) = token {
        client.session().set_token(token).expect("Failed to set token");
    }
    client
}

#[tokio::test]
async fn unauthorized_refreshes_and_retries_once() {
    //* Given
    let mut server = Server::new_async().await;
    let t1 = make_token("waiter1", 60);
    let t2 = make_token("waiter1", 1800);

    let stale = server
        .mock("GET", "/api/v1/orders/3")
        .match_header("authorization", bearer(&t1).as_str())
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let whoami = server
        .mock("GET", WHOAMI_PATH)
        .match_header("authorization", bearer(&t1).as_str())
        .with_status(200)
        .with_header("x-new-token", &t2)
        .with_body(r#"{"id": 1, "username": "waiter1", "email": "w1@example.com", "role": "waiter"}"#)
        .expect(1)
        .create_async()
        .await;
    let fresh = server
        .mock("GET", "/api/v1/orders/3")
        .match_header("authorization", bearer(&t2).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 3, "status": "pending"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Some(&t1));

    //* When
    let order: Order = client.get("/api/v1/orders/3").await.expect("get failed");

    //* Then
    stale.assert_async().await;
    whoami.assert_async().await;
    fresh.assert_async().await;
    assert_eq!(order.id, 3);
    assert_eq!(order.status, "pending");
    assert_eq!(client.session().get_token(), Some(t2));
}

#[tokio::test]
async fn second_unauthorized_is_terminal() {
    //* Given
    let mut server = Server::new_async().await;
    let t1 = make_token("waiter1", 600);

    let orders = server
        .mock("GET", "/api/v1/orders")
        .with_status(401)
        .expect(2) // first attempt + one retry
        .create_async()
        .await;
    let whoami = server
        .mock("GET", WHOAMI_PATH)
        .with_status(200)
        .with_body(r#"{"id": 1, "username": "waiter1", "email": "w1@example.com", "role": "waiter"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Some(&t1));

    //* When
    let result: Result<Vec<Order>, ApiError> = client.get("/api/v1/orders").await;

    //* Then
    orders.assert_async().await;
    whoami.assert_async().await;
    let err = result.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(err.requires_login());
}

#[tokio::test]
async fn rejected_refresh_surfaces_refresh_failed() {
    //* Given
    let mut server = Server::new_async().await;
    let t1 = make_token("waiter1", 600);

    let _orders = server
        .mock("GET", "/api/v1/orders")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let _whoami = server
        .mock("GET", WHOAMI_PATH)
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Some(&t1));

    //* When
    let result: Result<Vec<Order>, ApiError> = client.get("/api/v1/orders").await;

    //* Then
    assert!(matches!(
        result,
        Err(ApiError::Session(SessionError::RefreshFailed { status: 401, .. }))
    ));
    assert_eq!(client.session().get_token(), None);
}

#[tokio::test]
async fn login_stores_issued_token() {
    //* Given
    let mut server = Server::new_async().await;
    let issued = make_token("waiter1", 1800);

    let login = server
        .mock("POST", "/api/v1/auth/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("username".into(), "waiter1".into()),
            Matcher::UrlEncoded("password".into(), "Kitchen#42".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"access_token": "{}", "token_type": "bearer"}}"#, issued))
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, None);
    assert!(!client.session().is_authenticated());

    //* When
    let token = client.login("waiter1", "Kitchen#42").await.expect("login failed");

    //* Then
    login.assert_async().await;
    assert_eq!(token.token_type, "bearer");
    assert_eq!(client.session().get_token(), Some(issued));
    assert!(client.session().is_authenticated());
    let info = client.session().token_info().expect("token info");
    assert_eq!(info.subject.as_deref(), Some("waiter1"));
}

#[tokio::test]
async fn bad_credentials_do_not_store_a_token() {
    //* Given
    let mut server = Server::new_async().await;
    let _login = server
        .mock("POST", "/api/v1/auth/token")
        .with_status(401)
        .with_body(r#"{"detail": "Incorrect username or password"}"#)
        .create_async()
        .await;

    let client = client_for(&server, None);

    //* When
    let result = client.login("waiter1", "wrong").await;

    //* Then
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(client.session().get_token(), None);
}

#[tokio::test]
async fn me_returns_identity() {
    //* Given
    let mut server = Server::new_async().await;
    let t1 = make_token("chef", 1800);
    let _me = server
        .mock("GET", WHOAMI_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 9, "username": "chef", "email": "chef@example.com", "role": "kitchen", "is_currently_working": true}"#)
        .create_async()
        .await;

    let client = client_for(&server, Some(&t1));

    //* When
    let me = client.me().await.expect("me failed");

    //* Then
    assert_eq!(me.username, "chef");
    assert_eq!(me.role, UserRole::Kitchen);
    assert!(me.is_currently_working);
}

#[tokio::test]
async fn rate_limit_retries_then_gives_up() {
    //* Given
    let mut server = Server::new_async().await;
    let t1 = make_token("waiter1", 1800);

    let menu = server
        .mock("GET", "/api/v1/menu-items")
        .with_status(429)
        .expect(4) // first attempt + 3 retries
        .create_async()
        .await;

    let client = client_for(&server, Some(&t1));

    //* When
    let result: Result<Vec<Order>, ApiError> = client.get("/api/v1/menu-items").await;

    //* Then
    menu.assert_async().await;
    assert!(matches!(result, Err(ApiError::RateLimited)));
}

#[tokio::test]
async fn logout_forgets_token() {
    let server = Server::new_async().await;
    let client = client_for(&server, Some(&make_token("admin", 600)));

    client.logout().expect("logout failed");

    assert_eq!(client.session().get_token(), None);
    assert!(!client.session().is_authenticated());
}
