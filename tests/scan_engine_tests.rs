//! End-to-end scan tests against real loopback listeners

mod common;

use common::{closed_port, html_response, redirect_response, TestHttpServer};
use devscope::network::{LoopbackProber, MetadataFetcher, ServiceMetadata};
use devscope::{PortSpec, ScanConfig, ScanEngine};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn config_for(ports: &[u16]) -> ScanConfig {
    ScanConfig::new(ports.iter().copied().map(PortSpec::from).collect())
        .with_self_port(None)
        .with_fetch_timeout(500)
}

#[tokio::test]
async fn test_probe_without_listener_is_bounded_by_timeout() {
    let port = closed_port();
    let prober = LoopbackProber::from_config(&ScanConfig::default());

    let start = Instant::now();
    let outcome = prober.probe(port).await;

    assert!(!outcome.reachable);
    assert!(start.elapsed() < Duration::from_secs(1), "probe took {:?}", start.elapsed());
}

#[tokio::test]
async fn test_probe_with_ipv4_listener_is_reachable() {
    let server = TestHttpServer::start("<title>up</title>").await;
    let prober = LoopbackProber::from_config(&ScanConfig::default());

    let outcome = prober.probe(server.port).await;
    assert!(outcome.reachable);
    assert!(outcome.attempts.is_empty());
}

#[tokio::test]
async fn test_fetch_title_and_relative_favicon() {
    let server = TestHttpServer::start(r#"<html><head><title>Hi</title><link rel="icon" href="/f.ico"></head></html>"#).await;
    let fetcher = MetadataFetcher::from_config(&ScanConfig::default()).unwrap();

    let outcome = fetcher.fetch(server.port).await;
    assert_eq!(outcome.metadata.title, "Hi");
    assert_eq!(
        outcome.metadata.favicon,
        Some(format!("http://127.0.0.1:{}/f.ico", server.port))
    );
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_fetch_without_title_uses_port_fallback() {
    let server = TestHttpServer::start("<html><body>hello</body></html>").await;
    let fetcher = MetadataFetcher::from_config(&ScanConfig::default()).unwrap();

    let outcome = fetcher.fetch(server.port).await;
    assert_eq!(outcome.metadata.title, format!("Service ({})", server.port));
    assert_eq!(
        outcome.metadata.favicon,
        Some(format!("http://127.0.0.1:{}/favicon.ico", server.port))
    );
}

#[tokio::test]
async fn test_fetch_with_no_responding_host() {
    let port = closed_port();
    let fetcher = MetadataFetcher::from_config(&ScanConfig::default().with_fetch_timeout(500)).unwrap();

    let outcome = fetcher.fetch(port).await;
    assert_eq!(outcome.metadata, ServiceMetadata::unknown(port));
    assert_eq!(outcome.metadata.title, format!("Unknown Service ({})", port));
    assert_eq!(outcome.failures.len(), 2);
}

#[tokio::test]
async fn test_fetch_falls_back_to_next_host() {
    let server = TestHttpServer::start("<title>Second host</title>").await;
    // 127.0.0.2 has no listener for this port; the next host answers
    let fetcher = MetadataFetcher::new(
        vec!["127.0.0.2".to_string(), "127.0.0.1".to_string()],
        Duration::from_millis(500),
        "host.docker.internal",
    )
    .unwrap();

    let outcome = fetcher.fetch(server.port).await;
    assert_eq!(outcome.metadata.title, "Second host");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "127.0.0.2");
}

fn ipv4_fetcher() -> MetadataFetcher {
    MetadataFetcher::new(vec!["127.0.0.1".to_string()], Duration::from_millis(500), "host.docker.internal").unwrap()
}

#[tokio::test]
async fn test_same_host_redirect_resolves_favicon_against_final_url() {
    let server = TestHttpServer::routed(|path| match path {
        "/" => redirect_response("/app/"),
        _ => html_response(r#"<title>App</title><link rel="icon" href="icon.png">"#),
    })
    .await;

    let outcome = ipv4_fetcher().fetch(server.port).await;
    assert_eq!(outcome.metadata.title, "App");
    assert_eq!(
        outcome.metadata.favicon,
        Some(format!("http://127.0.0.1:{}/app/icon.png", server.port))
    );
}

#[tokio::test]
async fn test_cross_host_redirect_is_not_followed() {
    let server = TestHttpServer::routed(|_| redirect_response("http://example.invalid/")).await;

    let outcome = ipv4_fetcher().fetch(server.port).await;
    assert_eq!(outcome.metadata.title, format!("Service ({})", server.port));
    assert_eq!(
        outcome.metadata.favicon,
        Some(format!("http://127.0.0.1:{}/favicon.ico", server.port))
    );
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_endless_same_host_redirects_stop_after_five_hops() {
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = requests.clone();
    let server = TestHttpServer::routed(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        redirect_response(&format!("/hop/{}", n))
    })
    .await;

    let outcome = ipv4_fetcher().fetch(server.port).await;
    assert_eq!(outcome.metadata.title, format!("Service ({})", server.port));
    assert!(outcome.failures.is_empty());
    // The original request plus five followed redirects
    assert_eq!(requests.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_ipv6_only_service_is_found_with_default_hosts() {
    let Some(server) = TestHttpServer::start_ipv6(r#"<title>V6</title><link rel="icon" href="/vite.svg">"#).await else {
        eprintln!("IPv6 loopback unavailable, skipping");
        return;
    };

    let snapshot = ScanEngine::new(config_for(&[server.port])).unwrap().run_scan().await;
    assert_eq!(snapshot.ports(), vec![server.port]);

    let record = &snapshot.records()[0];
    assert_eq!(record.title, "V6");
    assert_eq!(record.url, format!("http://localhost:{}", server.port));
    assert_eq!(record.favicon, Some(format!("http://[::1]:{}/vite.svg", server.port)));
}

#[tokio::test]
async fn test_full_scan_contains_exactly_reachable_ports_in_order() {
    let vite = TestHttpServer::start(r#"<title>Vite App</title><link rel="icon" href="/vite.svg">"#).await;
    let api = TestHttpServer::start("<p>api</p>").await;
    let closed = closed_port();

    let mut ports = vec![api.port, closed, vite.port];
    let engine = ScanEngine::new(config_for(&ports)).unwrap();
    let snapshot = engine.run_scan().await;

    ports.retain(|&p| p != closed);
    ports.sort_unstable();
    assert_eq!(snapshot.ports(), ports);

    for record in snapshot.records() {
        assert_eq!(record.url, format!("http://localhost:{}", record.port));
        assert!(record.favicon.is_some());
    }

    let vite_record = snapshot.records().iter().find(|r| r.port == vite.port).unwrap();
    assert_eq!(vite_record.title, "Vite App");
    assert_eq!(
        vite_record.favicon,
        Some(format!("http://127.0.0.1:{}/vite.svg", vite.port))
    );

    let api_record = snapshot.records().iter().find(|r| r.port == api.port).unwrap();
    assert_eq!(api_record.title, format!("Service ({})", api.port));
}

#[tokio::test]
async fn test_scans_are_independent() {
    let server = TestHttpServer::start("<title>Short lived</title>").await;
    let port = server.port;
    let engine = ScanEngine::new(config_for(&[port])).unwrap();

    assert_eq!(engine.run_scan().await.ports(), vec![port]);

    drop(server);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(engine.run_scan().await.is_empty());
}
