#![allow(clippy::unwrap_used)]
// Integration tests for `AcosClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use acoslb_api::{AcosClient, AxapiVersion, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(version: AxapiVersion) -> (MockServer, AcosClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = AcosClient::with_client(
        reqwest::Client::new(),
        base_url,
        version,
        "admin",
        SecretString::from("a10".to_string()),
    );
    (server, client)
}

const V21_PATH: &str = "/services/rest/V2.1/";

async fn mount_v21_login(server: &MockServer, session_id: &str) {
    Mock::given(method("POST"))
        .and(path(V21_PATH))
        .and(query_param("method", "authenticate"))
        .and(body_json(json!({ "username": "admin", "password": "a10" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "session_id": session_id })))
        .mount(server)
        .await;
}

async fn mount_v30_login(server: &MockServer, signature: &str) {
    Mock::given(method("POST"))
        .and(path("/axapi/v3/auth"))
        .and(body_json(json!({
            "credentials": { "username": "admin", "password": "a10" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authresponse": { "signature": signature, "description": "the signature should be set in Authorization header for following request." }
        })))
        .mount(server)
        .await;
}

// ── v2.1 ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_v21_authenticate_stores_session() {
    let (server, client) = setup(AxapiVersion::V21).await;
    mount_v21_login(&server, "sess-21").await;

    let token = client.authenticate().await.unwrap();

    assert_eq!(token, "sess-21");
    assert_eq!(client.session_id().as_deref(), Some("sess-21"));
}

#[tokio::test]
async fn test_v21_authenticate_fail_envelope() {
    let (server, client) = setup(AxapiVersion::V21).await;

    Mock::given(method("POST"))
        .and(path(V21_PATH))
        .and(query_param("method", "authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "status": "fail", "err": { "code": 520486915, "msg": "Admin password error" } }
        })))
        .mount(&server)
        .await;

    let result = client.authenticate().await;

    match result {
        Err(Error::Axapi { ref message, code }) => {
            assert!(message.contains("password"), "unexpected message: {message}");
            assert_eq!(code, Some(520_486_915));
        }
        other => panic!("expected Axapi error, got: {other:?}"),
    }
    assert!(!client.has_session());
}

#[tokio::test]
async fn test_v21_close_session_ok() {
    let (server, client) = setup(AxapiVersion::V21).await;
    mount_v21_login(&server, "sess-21").await;

    Mock::given(method("POST"))
        .and(path(V21_PATH))
        .and(query_param("method", "session.close"))
        .and(query_param("session_id", "sess-21"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "response": { "status": "OK" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    client.ensure_session().await.unwrap();
    let status = client.close_session().await.unwrap();

    assert!(status.ok);
    assert!(!client.has_session());
}

#[tokio::test]
async fn test_v21_close_session_not_acknowledged_keeps_token() {
    let (server, client) = setup(AxapiVersion::V21).await;
    mount_v21_login(&server, "sess-21").await;

    Mock::given(method("POST"))
        .and(path(V21_PATH))
        .and(query_param("method", "session.close"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "status": "fail", "err": { "code": 1009, "msg": "Invalid session ID" } }
        })))
        .mount(&server)
        .await;

    client.ensure_session().await.unwrap();
    let status = client.close_session().await.unwrap();

    assert!(!status.ok);
    assert_eq!(client.session_id().as_deref(), Some("sess-21"));
}

#[tokio::test]
async fn test_v21_system_information() {
    let (server, client) = setup(AxapiVersion::V21).await;
    mount_v21_login(&server, "sess-21").await;

    Mock::given(method("GET"))
        .and(path(V21_PATH))
        .and(query_param("method", "system.information.get"))
        .and(query_param("session_id", "sess-21"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "system_information": { "software_version": "2.7.2-P4", "serial_number": "AX10A1234" }
        })))
        .mount(&server)
        .await;

    client.ensure_session().await.unwrap();
    let info = client.system_information().await.unwrap();

    assert_eq!(
        info.pointer("/system_information/software_version"),
        Some(&json!("2.7.2-P4"))
    );
}

// ── v3.0 ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_v30_authenticate_and_authorized_request() {
    let (server, client) = setup(AxapiVersion::V30).await;
    mount_v30_login(&server, "sig-30").await;

    Mock::given(method("GET"))
        .and(path("/axapi/v3/version/oper"))
        .and(header("Authorization", "A10 sig-30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": { "oper": { "sw-version": "4.1.4-GR1" } }
        })))
        .mount(&server)
        .await;

    client.ensure_session().await.unwrap();
    let info = client.system_information().await.unwrap();

    assert_eq!(info.pointer("/version/oper/sw-version"), Some(&json!("4.1.4-GR1")));
}

#[tokio::test]
async fn test_v30_login_rejected() {
    let (server, client) = setup(AxapiVersion::V30).await;

    Mock::given(method("POST"))
        .and(path("/axapi/v3/auth"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "authorizationschema": { "code": 403, "error": "Authentication failed." }
        })))
        .mount(&server)
        .await;

    let result = client.ensure_session().await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_v30_logoff() {
    let (server, client) = setup(AxapiVersion::V30).await;
    mount_v30_login(&server, "sig-30").await;

    Mock::given(method("POST"))
        .and(path("/axapi/v3/logoff"))
        .and(header("Authorization", "A10 sig-30"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "response": { "status": "OK" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    client.ensure_session().await.unwrap();
    let status = client.close_session().await.unwrap();

    assert!(status.ok);
    assert!(!client.has_session());
}

// ── Session edge cases ──────────────────────────────────────────────

#[tokio::test]
async fn test_ensure_session_reuses_token() {
    let (server, client) = setup(AxapiVersion::V21).await;

    Mock::given(method("POST"))
        .and(path(V21_PATH))
        .and(query_param("method", "authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "session_id": "once" })))
        .expect(1)
        .mount(&server)
        .await;

    client.ensure_session().await.unwrap();
    client.ensure_session().await.unwrap();

    assert_eq!(client.session_id().as_deref(), Some("once"));
}

#[tokio::test]
async fn test_close_without_session_is_noop() {
    let (_server, client) = setup(AxapiVersion::V30).await;

    let status = client.close_session().await.unwrap();

    assert!(status.ok);
}

#[tokio::test]
async fn test_system_information_requires_session() {
    let (_server, client) = setup(AxapiVersion::V21).await;

    let result = client.system_information().await;

    assert!(matches!(result, Err(Error::NoSession)));
}
