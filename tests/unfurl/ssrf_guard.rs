use std::sync::Arc;

use crate::unfurl_harness::{
    StaticResolver, html, local_config, mount_get, redirect, request_count,
};
use unfurler::{Config, FailureKind, Unfurler};
use wiremock::MockServer;

#[tokio::test]
async fn loopback_target_is_refused_without_a_request() {
    let server = MockServer::start().await;
    mount_get(&server, "/", html("<title>internal</title>")).await;
    let unfurler = Unfurler::from_config(&Config::default()).expect("unfurler should build");

    let outcome = unfurler.unfurl(&format!("{}/", server.uri())).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::BlockedHost));
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn private_and_metadata_addresses_are_blocked() {
    let unfurler = Unfurler::from_config(&Config::default()).expect("unfurler should build");

    for raw in [
        "http://169.254.169.254/latest/meta-data/",
        "http://10.0.0.5/",
        "http://192.168.1.1/admin",
        "http://172.16.0.1/",
        "http://[::1]/",
        "http://[fd00::1]/",
        "http://0.0.0.0/",
        "http://localhost/",
        "http://api.localhost/",
    ] {
        let outcome = unfurler.unfurl(raw).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::BlockedHost), "{raw}");
    }
}

#[tokio::test]
async fn dns_answer_in_private_range_is_blocked() {
    let resolver = Arc::new(
        StaticResolver::default()
            .with("intranet.example.com", &["10.20.30.40"])
            .with("rebind.example.com", &["93.184.216.34", "127.0.0.1"]),
    );
    let unfurler = Unfurler::builder(&Config::default())
        .resolver(resolver.clone())
        .build()
        .expect("unfurler should build");

    for raw in ["https://intranet.example.com/", "https://rebind.example.com/"] {
        let outcome = unfurler.unfurl(raw).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::BlockedHost), "{raw}");
    }
    assert_eq!(resolver.lookups(), 2);
}

#[tokio::test]
async fn unknown_host_is_unresolvable() {
    let resolver = Arc::new(StaticResolver::default());
    let unfurler = Unfurler::builder(&Config::default())
        .resolver(resolver)
        .build()
        .expect("unfurler should build");

    let outcome = unfurler.unfurl("https://no-such-host.example/").await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::UnresolvableHost));
}

#[tokio::test]
async fn non_http_schemes_fail_before_dns() {
    let resolver = Arc::new(StaticResolver::default());
    let unfurler = Unfurler::builder(&Config::default())
        .resolver(resolver.clone())
        .build()
        .expect("unfurler should build");

    for raw in [
        "file:///etc/passwd",
        "ftp://files.example.com/",
        "javascript:alert(1)",
        "data:text/html,<title>x</title>",
        "example.com/no-scheme",
    ] {
        let outcome = unfurler.unfurl(raw).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidUrl), "{raw}");
    }
    assert_eq!(resolver.lookups(), 0);
}

#[tokio::test]
async fn redirect_into_private_range_is_blocked() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/to-metadata",
        redirect(302, "http://169.254.169.254/latest/meta-data/"),
    )
    .await;
    mount_get(&server, "/to-lan", redirect(301, "http://10.0.0.5/admin")).await;
    let unfurler = Unfurler::from_config(&local_config()).expect("unfurler should build");

    for route in ["/to-metadata", "/to-lan"] {
        let outcome = unfurler.unfurl(&format!("{}{route}", server.uri())).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::BlockedHost), "{route}");
    }
}

#[tokio::test]
async fn redirect_to_localhost_name_is_blocked() {
    let server = MockServer::start().await;
    let port = server.address().port();
    mount_get(
        &server,
        "/bounce",
        redirect(302, &format!("http://localhost:{port}/secret")),
    )
    .await;
    mount_get(&server, "/secret", html("<title>secret</title>")).await;
    let unfurler = Unfurler::from_config(&local_config()).expect("unfurler should build");

    let outcome = unfurler.unfurl(&format!("{}/bounce", server.uri())).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::BlockedHost));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn redirect_to_non_http_scheme_is_invalid() {
    let server = MockServer::start().await;
    mount_get(&server, "/to-file", redirect(302, "file:///etc/passwd")).await;
    let unfurler = Unfurler::from_config(&local_config()).expect("unfurler should build");

    let outcome = unfurler.unfurl(&format!("{}/to-file", server.uri())).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidUrl));
}
