//! End-to-end tests for the HTTP gateway.
//!
//! Each test starts a real Axum server on a random port in front of a
//! wiremock registry/AI service and drives it with reqwest:
//! - assistant resolution and admin detection
//! - admin-gated knowledge file management
//! - wallet challenge/verify (both endpoint forms)
//! - chat continuity, the anonymous login prompt, and upstream fallback
//! - malformed request bodies and slow upstreams

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ouf_gateway::AssistantGateway;
use ouf_gateway::config::{ChatConfig, RegistryConfig};
use ouf_gateway::conversation::ChatPolicy;
use ouf_gateway::gateway::GatewayOptions;
use ouf_gateway::registry::{HttpAskBackend, HttpRegistry};
use ouf_gateway::web::{GatewayState, RunningServer, ServerOptions, start_server};

const ADMIN: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
const ADMIN_LOWER: &str = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359";
const STRANGER: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
const FALLBACK: &str = "Sorry, something went wrong.";
const LOGIN_PROMPT: &str = "Connect a wallet first.";

fn is_bind_permission_error<E: std::fmt::Display>(err: &E) -> bool {
    let text = err.to_string().to_lowercase();
    text.contains("operation not permitted") || text.contains("failed to bind")
}

/// Gateway wired to `upstream` for both the registry and the AI service.
async fn start_gateway(upstream: &MockServer) -> Option<RunningServer> {
    start_gateway_with_timeout(upstream, Duration::from_secs(5)).await
}

async fn start_gateway_with_timeout(
    upstream: &MockServer,
    timeout: Duration,
) -> Option<RunningServer> {
    let registry = RegistryConfig {
        base_url: upstream.uri(),
        api_key: None,
        timeout,
    };
    let chat = ChatConfig {
        base_url: upstream.uri(),
        timeout,
        require_wallet: true,
        login_prompt: LOGIN_PROMPT.to_string(),
        fallback_answer: FALLBACK.to_string(),
    };
    let gateway = AssistantGateway::new(
        Arc::new(HttpRegistry::new(&registry)),
        Arc::new(HttpAskBackend::new(&chat, None)),
        GatewayOptions {
            local_signature_check: false,
            chat: ChatPolicy {
                require_wallet: chat.require_wallet,
                login_prompt: chat.login_prompt.clone(),
            },
        },
    );
    let state = Arc::new(GatewayState::new(gateway, FALLBACK));

    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    match start_server(addr, state, ServerOptions::default()).await {
        Ok(server) => Some(server),
        Err(e) if is_bind_permission_error(&e) => None,
        Err(e) => panic!("Failed to start test server: {e:?}"),
    }
}

async fn mount_acme(upstream: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api-keys/details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "slug": "acme",
                "name": "Acme DAO",
                "introPhrase": "Welcome to Acme.",
                "contextId": "ctx-acme",
                "adminAddress": ADMIN_LOWER
            }
        ])))
        .mount(upstream)
        .await;
}

fn url(server: &RunningServer, route: &str) -> String {
    format!("http://{}{}", server.local_addr(), route)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

#[tokio::test]
async fn health_reports_service() {
    let upstream = MockServer::start().await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };

    let resp = client().get(url(&server, "/api/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "ouf-gateway");

    server.shutdown().await;
}

#[tokio::test]
async fn admin_match_ignores_address_case() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };
    let http = client();

    let body: Value = http
        .get(url(&server, "/api/assistants/acme"))
        .header("x-wallet-address", ADMIN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["name"], "Acme DAO");
    assert_eq!(body["intro_phrase"], "Welcome to Acme.");
    assert_eq!(body["admin_address"], ADMIN);
    assert_eq!(body["is_admin"], true);

    let body: Value = http
        .get(url(&server, "/api/assistants/acme"))
        .header("x-wallet-address", STRANGER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["is_admin"], false);

    let body: Value = http
        .get(url(&server, "/api/assistants/acme"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["is_admin"], false);

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };

    let resp = client()
        .get(url(&server, "/api/assistants/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
    assert!(body["request_id"].as_str().is_some());

    server.shutdown().await;
}

#[tokio::test]
async fn malformed_wallet_header_is_rejected() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };

    let resp = client()
        .get(url(&server, "/api/assistants/acme"))
        .header("x-wallet-address", "0x1234")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "validation.invalid_address");

    server.shutdown().await;
}

#[tokio::test]
async fn create_assistant_conflicts_and_succeeds() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    Mock::given(method("POST"))
        .and(path("/api-keys"))
        .and(body_json(json!({
            "walletAddress": ADMIN,
            "slug": "beta",
            "assistantName": "Beta",
            "introPhrase": "",
            "daoAddress": "",
            "daoNetwork": ""
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&upstream)
        .await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };
    let http = client();

    let resp = http
        .post(url(&server, "/api/assistants"))
        .header("x-wallet-address", ADMIN)
        .json(&json!({ "slug": "acme" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = http
        .post(url(&server, "/api/assistants"))
        .json(&json!({ "slug": "beta", "name": "Beta" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = http
        .post(url(&server, "/api/assistants"))
        .header("x-wallet-address", ADMIN)
        .json(&json!({ "slug": "beta", "name": "Beta" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["slug"], "beta");
    assert_eq!(body["is_admin"], true);

    server.shutdown().await;
}

#[tokio::test]
async fn wallet_challenge_round_trip() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/message"))
        .and(body_json(json!({ "address": ADMIN })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Sign nonce 7" })),
        )
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "verified": true, "address": ADMIN_LOWER })),
        )
        .mount(&upstream)
        .await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };
    let http = client();

    let body: Value = http
        .post(url(&server, "/api/auth/challenge"))
        .json(&json!({ "address": ADMIN_LOWER }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Sign nonce 7");

    let body: Value = http
        .post(url(&server, "/api/auth/verify"))
        .json(&json!({ "address": ADMIN_LOWER, "message": "Sign nonce 7", "signature": "0xdead" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["verified"], true);
    assert_eq!(body["address"], ADMIN);

    let body: Value = http
        .post(url(&server, "/api/auth"))
        .json(&json!({ "action": "getMessage", "address": ADMIN }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Sign nonce 7");

    let resp = http
        .post(url(&server, "/api/auth"))
        .json(&json!({ "action": "logout" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "validation.invalid_request");

    server.shutdown().await;
}

#[tokio::test]
async fn admin_uploads_lists_and_deletes_markdown() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    // Mounted in order: empty, after upload, after delete.
    for files in [json!([]), json!(["policy.md"]), json!([])] {
        Mock::given(method("POST"))
            .and(path("/context-files/list-files"))
            .and(header("x-wallet-address", ADMIN))
            .and(body_json(json!({ "id": "ctx-acme", "walletAddress": ADMIN })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": files })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&upstream)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/context-files/add-context"))
        .and(header("x-wallet-address", ADMIN))
        .and(header("x-context-id", "ctx-acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/context-files/delete-context"))
        .and(header("x-wallet-address", ADMIN))
        .and(body_json(json!({ "filename": "policy.md" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&upstream)
        .await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };
    let http = client();

    let body: Value = http
        .get(url(&server, "/api/assistants/acme/files"))
        .header("x-wallet-address", ADMIN_LOWER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "files": [] }));

    let part = reqwest::multipart::Part::bytes(b"# Policy\n".to_vec())
        .file_name("policy.md")
        .mime_str("text/markdown")
        .unwrap();
    let resp = http
        .post(url(&server, "/api/assistants/acme/files"))
        .header("x-wallet-address", ADMIN_LOWER)
        .multipart(reqwest::multipart::Form::new().part("file", part))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "files": ["policy.md"] }));

    let resp = http
        .delete(url(&server, "/api/assistants/acme/files/policy.md"))
        .header("x-wallet-address", ADMIN_LOWER)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "files": [] }));

    server.shutdown().await;
}

#[tokio::test]
async fn non_markdown_upload_is_rejected_before_upstream() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    Mock::given(method("POST"))
        .and(path("/context-files/add-context"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };

    let part = reqwest::multipart::Part::bytes(b"%PDF-1.7".to_vec()).file_name("report.pdf");
    let resp = client()
        .post(url(&server, "/api/assistants/acme/files"))
        .header("x-wallet-address", ADMIN)
        .multipart(reqwest::multipart::Form::new().part("file", part))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 415);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "validation.invalid_file_type");

    server.shutdown().await;
}

#[tokio::test]
async fn non_admin_cannot_touch_files() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    for (verb, route) in [
        ("POST", "/context-files/list-files"),
        ("POST", "/context-files/add-context"),
        ("DELETE", "/context-files/delete-context"),
    ] {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;
    }
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };
    let http = client();

    let resp = http
        .get(url(&server, "/api/assistants/acme/files"))
        .header("x-wallet-address", STRANGER)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "auth.unauthorized");
    assert!(!body["message"].as_str().unwrap().contains(STRANGER));

    let resp = http
        .delete(url(&server, "/api/assistants/acme/files/policy.md"))
        .header("x-wallet-address", STRANGER)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = http
        .get(url(&server, "/api/assistants/acme/files"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    server.shutdown().await;
}

#[tokio::test]
async fn chat_carries_conversation_id_between_turns() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    Mock::given(method("POST"))
        .and(path("/ai/ask"))
        .and(header("x-wallet-address", ADMIN))
        .and(header("x-context-id", "ctx-acme"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "Acme answer", "conversationId": "abc123" })),
        )
        .expect(2)
        .mount(&upstream)
        .await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };
    let http = client();

    let body: Value = http
        .post(url(&server, "/api/assistants/acme/chat"))
        .header("x-wallet-address", ADMIN_LOWER)
        .json(&json!({ "message": "What is Acme?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["answer"], "Acme answer");
    assert_eq!(body["conversation_id"], "abc123");
    assert_eq!(body["authenticated"], true);

    let resp = http
        .post(url(&server, "/api/assistants/acme/chat"))
        .header("x-wallet-address", ADMIN_LOWER)
        .json(&json!({ "message": "And then?", "conversationId": "abc123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let requests = upstream.received_requests().await.unwrap();
    let asks: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/ai/ask")
        .collect();
    assert_eq!(asks.len(), 2);
    let first = String::from_utf8_lossy(&asks[0].body);
    let second = String::from_utf8_lossy(&asks[1].body);
    assert!(!first.contains("conversationId"));
    assert!(second.contains("conversationId"));
    assert!(second.contains("abc123"));

    server.shutdown().await;
}

#[tokio::test]
async fn anonymous_chat_gets_login_prompt() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    Mock::given(method("POST"))
        .and(path("/ai/ask"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };

    let resp = client()
        .post(url(&server, "/api/assistants/acme/chat"))
        .json(&json!({ "message": "Hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["answer"], LOGIN_PROMPT);
    assert_eq!(body["authenticated"], false);

    server.shutdown().await;
}

#[tokio::test]
async fn empty_chat_message_is_rejected() {
    let upstream = MockServer::start().await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };

    let resp = client()
        .post(url(&server, "/api/assistants/acme/chat"))
        .header("x-wallet-address", ADMIN)
        .json(&json!({ "message": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "validation.empty_message");

    server.shutdown().await;
}

#[tokio::test]
async fn upstream_chat_failure_returns_fallback() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    Mock::given(method("POST"))
        .and(path("/ai/ask"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&upstream)
        .await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };

    let resp = client()
        .post(url(&server, "/api/assistants/acme/chat"))
        .header("x-wallet-address", ADMIN)
        .json(&json!({ "message": "Hello", "conversationId": "abc123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "upstream.ask_failed");
    assert_eq!(body["retryable"], true);
    assert_eq!(body["fallback_answer"], FALLBACK);
    assert_eq!(body["conversation_id"], "abc123");
    assert!(!body["message"].as_str().unwrap().contains("boom"));

    server.shutdown().await;
}

#[tokio::test]
async fn malformed_json_gets_error_payload() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    let Some(server) = start_gateway(&upstream).await else {
        return;
    };
    let http = client();

    let resp = http
        .post(url(&server, "/api/assistants/acme/chat"))
        .header("x-wallet-address", ADMIN)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "validation.invalid_request");
    assert_eq!(body["retryable"], false);
    assert!(body["request_id"].as_str().is_some_and(|id| !id.is_empty()));

    let resp = http
        .post(url(&server, "/api/auth/challenge"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "validation.invalid_request");

    let resp = http
        .post(url(&server, "/api/assistants"))
        .header("x-wallet-address", ADMIN)
        .json(&json!({ "name": "No slug" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "validation.invalid_request");

    let requests = upstream.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/ai/ask"));

    server.shutdown().await;
}

#[tokio::test]
async fn slow_ask_backend_returns_fallback() {
    let upstream = MockServer::start().await;
    mount_acme(&upstream).await;
    Mock::given(method("POST"))
        .and(path("/ai/ask"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "late", "conversationId": "other" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&upstream)
        .await;
    let Some(server) = start_gateway_with_timeout(&upstream, Duration::from_millis(500)).await
    else {
        return;
    };

    let resp = client()
        .post(url(&server, "/api/assistants/acme/chat"))
        .header("x-wallet-address", ADMIN)
        .json(&json!({ "message": "Hello", "conversationId": "abc123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "upstream.ask_failed");
    assert_eq!(body["retryable"], true);
    assert_eq!(body["fallback_answer"], FALLBACK);
    assert_eq!(body["conversation_id"], "abc123");

    server.shutdown().await;
}

#[tokio::test]
async fn slow_registry_is_unavailable() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api-keys/details"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&upstream)
        .await;
    let Some(server) = start_gateway_with_timeout(&upstream, Duration::from_millis(500)).await
    else {
        return;
    };

    let resp = client()
        .get(url(&server, "/api/assistants/acme"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "upstream.unavailable");
    assert_eq!(body["retryable"], true);

    server.shutdown().await;
}
