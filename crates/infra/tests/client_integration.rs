//! Integration tests for the request pipeline
//!
//! **Coverage:**
//! - Raw path bypasses interceptors entirely
//! - No `Authorization` header after logout
//! - Unhandled statuses, empty bodies and decode failures
//! - Header merging and interceptor ordering
//! - File-backed credentials survive a client restart

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use async_trait::async_trait;
use eatsorder_domain::{ClientConfig, ClientError, CredentialPair, Endpoint, SessionState};
use eatsorder_infra::{
    ApiClient, CredentialStore, FileBackend, HttpResponse, Interceptor, PreparedRequest, Verdict,
};
use http::header::AUTHORIZATION;
use parking_lot::Mutex;
use support::{requests_to, token, Profile, TestClient, API_KEY, PROFILE_PATH, REFRESH_PATH};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok_profile() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "nick": "eater" }))
}

#[tokio::test]
async fn test_raw_execute_bypasses_interceptors() {
    let server = MockServer::start().await;
    Mock::given(path(PROFILE_PATH)).respond_with(ResponseTemplate::new(419)).mount(&server).await;
    Mock::given(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fx = TestClient::new(&server).signed_in(&token("old", 3600), "refresh-1");
    let endpoint = Endpoint::get(server.uri(), PROFILE_PATH).authenticated();

    let error = fx.client.raw_execute::<Profile>(&endpoint).await.unwrap_err();

    assert_eq!(error.status(), Some(419));
    let requests = requests_to(&server, PROFILE_PATH).await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert!(requests[0].headers.get("x-request-id").is_none());
    assert_eq!(fx.client.session_state(), SessionState::Active);
}

#[tokio::test]
async fn test_login_after_logout_sends_no_stale_credentials() {
    let server = MockServer::start().await;
    Mock::given(path(PROFILE_PATH)).respond_with(ok_profile()).mount(&server).await;

    let first = token("first", 3600);
    let fx = TestClient::new(&server).signed_in(&first, "refresh-1");
    let endpoint = Endpoint::get(server.uri(), PROFILE_PATH).authenticated();

    fx.client.logout();
    fx.client.execute::<Profile>(&endpoint).await.unwrap();

    let second = token("second", 3600);
    fx.client.sign_in(CredentialPair::new(second.clone(), "refresh-2"));
    fx.client.execute::<Profile>(&endpoint).await.unwrap();

    let requests = requests_to(&server, PROFILE_PATH).await;
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(requests[1].headers.get("authorization").unwrap().to_str().unwrap(), second);
}

#[tokio::test]
async fn test_unauthenticated_endpoint_never_carries_credentials() {
    let server = MockServer::start().await;
    Mock::given(path("/stores")).respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let fx = TestClient::new(&server).signed_in(&token("old", 3600), "refresh-1");
    let stores: Vec<serde_json::Value> =
        fx.client.execute(&Endpoint::get(server.uri(), "/stores")).await.unwrap();

    assert!(stores.is_empty());
    assert!(requests_to(&server, "/stores").await[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_server_error_is_returned_with_body() {
    let server = MockServer::start().await;
    Mock::given(path("/orders"))
        .respond_with(ResponseTemplate::new(500).set_body_string("kitchen closed"))
        .expect(1)
        .mount(&server)
        .await;

    let fx = TestClient::new(&server);
    let error = fx
        .client
        .execute::<serde_json::Value>(&Endpoint::get(server.uri(), "/orders"))
        .await
        .unwrap_err();

    assert_eq!(error, ClientError::Server { status: 500, message: Some("kitchen closed".into()) });
}

#[tokio::test]
async fn test_no_content_decodes_as_unit() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/orders/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let fx = TestClient::new(&server);
    let _: () = fx.client.execute(&Endpoint::delete(server.uri(), "/orders/7")).await.unwrap();
}

#[tokio::test]
async fn test_decode_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fx = TestClient::new(&server);
    let error =
        fx.client.execute::<Profile>(&Endpoint::get(server.uri(), PROFILE_PATH)).await.unwrap_err();

    assert!(matches!(error, ClientError::Decoding(_)));
}

#[tokio::test]
async fn test_invalid_base_url_fails_before_network() {
    let server = MockServer::start().await;
    let fx = TestClient::new(&server);

    let error = fx
        .client
        .execute::<Profile>(&Endpoint::get("eatsorder.test", PROFILE_PATH))
        .await
        .unwrap_err();

    assert!(matches!(error, ClientError::InvalidUrl(_)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_default_headers_merge_under_endpoint_headers() {
    let server = MockServer::start().await;
    Mock::given(path("/stores")).respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let mut config = ClientConfig::new(server.uri());
    config.api_key = Some(API_KEY.to_string());
    config.default_headers.insert("Accept-Language".into(), "ko-KR".into());
    let fx = TestClient::with_config(config);

    let endpoint = Endpoint::get(server.uri(), "/stores").try_header("accept-language", "en-US").unwrap();
    let _: Vec<serde_json::Value> = fx.client.execute(&endpoint).await.unwrap();

    let request = &requests_to(&server, "/stores").await[0];
    assert_eq!(request.headers.get("sesackey").unwrap(), API_KEY);
    assert_eq!(request.headers.get("accept-language").unwrap(), "en-US");
    assert!(request.headers.get("x-request-id").is_some());
}

/// Records which headers already exist when it runs.
struct HeaderRecorder {
    seen: Arc<Mutex<Vec<(bool, bool)>>>,
}

#[async_trait]
impl Interceptor for HeaderRecorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn prepare(&self, request: &mut PreparedRequest) {
        let headers = request.headers();
        self.seen.lock().push((headers.contains_key("x-request-id"), headers.contains_key(AUTHORIZATION)));
    }

    async fn on_response(&self, _: &PreparedRequest, response: &HttpResponse) -> Verdict {
        if response.status() == 404 {
            Verdict::Fail(ClientError::InvalidResponse("not found".into()))
        } else {
            Verdict::Continue
        }
    }
}

#[tokio::test]
async fn test_extra_interceptors_run_after_builtins() {
    let server = MockServer::start().await;
    Mock::given(path(PROFILE_PATH)).respond_with(ok_profile()).mount(&server).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let client = ApiClient::builder()
        .config(ClientConfig::new(server.uri()))
        .interceptor(Arc::new(HeaderRecorder { seen: seen.clone() }))
        .build()
        .unwrap();
    client.sign_in(CredentialPair::new(token("user", 3600), "refresh"));

    client.execute::<Profile>(&Endpoint::get(server.uri(), PROFILE_PATH).authenticated()).await.unwrap();
    let error = client
        .execute::<Profile>(&Endpoint::get(server.uri(), "/missing"))
        .await
        .unwrap_err();

    assert_eq!(*seen.lock(), vec![(true, true), (true, false)]);
    assert_eq!(error, ClientError::InvalidResponse("not found".into()));
}

#[tokio::test]
async fn test_file_backed_session_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(path(PROFILE_PATH)).respond_with(ok_profile()).mount(&server).await;
    let dir = TempDir::new().unwrap();
    let access = token("user", 3600);

    let open = || {
        let config = ClientConfig::new(server.uri());
        let backend = Arc::new(FileBackend::in_dir(dir.path()));
        let store = Arc::new(CredentialStore::open(backend, config.auth.expiry_leeway()).unwrap());
        ApiClient::builder().config(config).credential_store(store).build().unwrap()
    };

    open().sign_in(CredentialPair::new(access.clone(), "refresh"));

    let restarted = open();
    assert_eq!(restarted.session_state(), SessionState::Active);
    restarted
        .execute::<Profile>(&Endpoint::get(server.uri(), PROFILE_PATH).authenticated())
        .await
        .unwrap();

    let requests = requests_to(&server, PROFILE_PATH).await;
    assert_eq!(requests[0].headers.get("authorization").unwrap().to_str().unwrap(), access);
}
