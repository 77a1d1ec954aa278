//! The show screen end to end: in-process identity, mock GraphQL endpoint.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map};
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{MockIdentity, PASSWORD, USERNAME};
use showdesk_core::{
    AuthorizationMode, CredentialProvider, GraphQlClient, LoginForm, Screen,
};

fn screen(server: &MockServer, password: &str) -> Screen {
    let config = Arc::new(common::config(
        &format!("{}/graphql", server.uri()),
        AuthorizationMode::BearerToken,
    ));
    let provider = Arc::new(CredentialProvider::with_identity_service(
        Arc::clone(&config),
        MockIdentity::new(),
    ));
    let client = GraphQlClient::new(config, provider.clone()).unwrap();
    let login = LoginForm {
        username: USERNAME.to_string(),
        password: password.to_string(),
    };
    Screen::new(provider, client, login)
}

#[tokio::test]
async fn test_sign_in_load_and_sign_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "access-signin-1"))
        .and(body_partial_json(json!({ "variables": { "sID": "3" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "getShow": {
                    "sName": "got Topmodel 2020",
                    "description": "this is fake to test functionality"
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut screen = screen(&server, PASSWORD);

    screen.sign_in().await.unwrap();
    assert_eq!(screen.next_result().await, "logged in test@test.de");
    assert!(screen.provider().is_signed_in().await);

    screen.load_show("3").await.unwrap();
    assert_eq!(screen.next_result().await, "got Topmodel 2020");

    screen.sign_out().await.unwrap();
    assert_eq!(screen.next_result().await, "logged out");
    assert!(!screen.provider().is_signed_in().await);
}

#[tokio::test]
async fn test_wrong_password_is_reported() {
    let server = MockServer::start().await;
    let mut screen = screen(&server, "wrong");

    screen.sign_in().await.unwrap();
    assert_eq!(screen.check_background_tasks(), 1);
    assert_eq!(screen.display(), "login failed: invalid username or password");
}

#[tokio::test]
async fn test_query_before_sign_in_asks_for_sign_in() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(0)
        .mount(&server)
        .await;

    let mut screen = screen(&server, PASSWORD);

    screen.load_show("3").await.unwrap();
    assert_eq!(screen.next_result().await, "please sign in");

    screen.who_am_i().await.unwrap();
    assert_eq!(screen.next_result().await, "please sign in");
}

#[tokio::test]
async fn test_who_am_i_after_sign_in() {
    let server = MockServer::start().await;
    let mut screen = screen(&server, PASSWORD);

    screen.sign_in().await.unwrap();
    screen.who_am_i().await.unwrap();
    assert_eq!(screen.check_background_tasks(), 2);
    assert_eq!(
        screen.display(),
        format!("signed in as {} ({})", USERNAME, common::USER_ID)
    );
}

#[tokio::test]
async fn test_rejected_delete_shows_server_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "sID": 3 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "deleteShow": null },
            "errors": [{
                "path": ["deleteShow"],
                "errorType": "Unauthorized",
                "message": "Not Authorized to access deleteShow on type Mutation"
            }]
        })))
        .mount(&server)
        .await;

    let mut screen = screen(&server, PASSWORD);
    screen.sign_in().await.unwrap();
    screen.delete_show(3).await.unwrap();

    assert_eq!(screen.check_background_tasks(), 2);
    assert_eq!(
        screen.display(),
        "Not Authorized to access deleteShow on type Mutation"
    );
}

#[tokio::test]
async fn test_partial_show_keeps_field_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "getShow": { "sName": "X" } },
            "errors": [{ "message": "partial" }]
        })))
        .mount(&server)
        .await;

    let mut screen = screen(&server, PASSWORD);
    screen.sign_in().await.unwrap();
    screen.load_show("3").await.unwrap();

    assert_eq!(screen.check_background_tasks(), 2);
    assert_eq!(screen.display(), "X (partial data: partial)");
}

#[tokio::test]
async fn test_later_completion_wins_the_display() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "which": "slow" } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "answer": "slow" } }))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "which": "fast" } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "answer": "fast" } }))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let mut screen = screen(&server, PASSWORD);
    screen.sign_in().await.unwrap();
    screen.check_background_tasks();

    let document = "query answer($which: String!) { answer(which: $which) }";
    let mut slow_vars = Map::new();
    slow_vars.insert("which".to_string(), json!("slow"));
    let mut fast_vars = Map::new();
    fast_vars.insert("which".to_string(), json!("fast"));

    // Started first, finishes last.
    let slow = screen.run_query(document, slow_vars);
    let fast = screen.run_query(document, fast_vars);

    fast.await.unwrap();
    assert_eq!(screen.check_background_tasks(), 1);
    assert_eq!(screen.display(), r#"{"answer":"fast"}"#);

    slow.await.unwrap();
    assert_eq!(screen.check_background_tasks(), 1);
    assert_eq!(screen.display(), r#"{"answer":"slow"}"#);
}
