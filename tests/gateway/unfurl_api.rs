use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use unfurler::Config;
use unfurler::gateway::run_gateway_with_listener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct GatewayTestServer {
    port: u16,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl GatewayTestServer {
    async fn start(config: Config) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral gateway listener should expose local address")
            .port();

        let handle = tokio::spawn(async move { run_gateway_with_listener(listener, config).await });
        wait_until_gateway_ready(port).await;

        Self { port, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_until_gateway_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let health = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await;
        if matches!(health, Ok(resp) if resp.status() == StatusCode::OK) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("gateway did not become ready on port {port}");
}

fn local_config() -> Config {
    let mut config = Config::default();
    config.unfurl.private_host_allowlist = vec!["127.0.0.1".to_string()];
    config.safety.blocklist = vec!["*/quarantine/*".to_string()];
    config
}

async fn post_unfurl(server: &GatewayTestServer, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(server.url("/link/unfurl"))
        .json(&body)
        .send()
        .await
        .expect("unfurl request should complete");
    let status = response.status();
    let body = response.json().await.expect("gateway response should be json");
    (status, body)
}

#[tokio::test]
async fn health_reports_ok() {
    let server = GatewayTestServer::start(local_config()).await;

    let body: Value = reqwest::get(server.url("/health"))
        .await
        .expect("health request should complete")
        .json()
        .await
        .expect("health response should be json");
    assert_eq!(body, serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn preview_is_returned_as_json() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(
                    concat!(
                        r#"<meta property="og:title" content="Hello">"#,
                        r#"<meta property="og:type" content="website">"#,
                    ),
                    "text/html",
                ),
        )
        .mount(&upstream)
        .await;
    let server = GatewayTestServer::start(local_config()).await;

    let (status, body) =
        post_unfurl(&server, serde_json::json!({"url": format!("{}/post", upstream.uri())})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Hello");
    assert_eq!(body["type"], "website");
    assert_eq!(body["site_name"], "127.0.0.1");
    assert_eq!(body["canonical_url"], format!("{}/post", upstream.uri()));
    assert!(body.get("description").is_none());
}

#[tokio::test]
async fn blocked_link_maps_to_forbidden() {
    let server = GatewayTestServer::start(local_config()).await;
    let url = "http://127.0.0.1:9/quarantine/file";

    let (status, body) = post_unfurl(&server, serde_json::json!({"url": url})).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        serde_json::json!({"error": "unsafe_content_blocked", "url": url})
    );
}

#[tokio::test]
async fn failures_map_to_server_error() {
    let server = GatewayTestServer::start(local_config()).await;

    for url in ["file:///etc/passwd", "http://169.254.169.254/latest/meta-data/"] {
        let (status, body) = post_unfurl(&server, serde_json::json!({"url": url})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{url}");
        assert_eq!(body["error"], "failed_to_unfurl", "{url}");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn missing_url_is_unprocessable() {
    let server = GatewayTestServer::start(local_config()).await;

    for payload in [serde_json::json!({}), serde_json::json!({"url": "   "})] {
        let (status, body) = post_unfurl(&server, payload).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_failed");
    }
}
