//! End-to-end tests: client → proxy → mock upstream.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use path_proxy::config::parse_route;
use path_proxy::http::ProxyHandler;
use path_proxy::net::Upstream;

mod common;

#[tokio::test]
async fn handler_forwards_exact_route_scenario() {
    let backend = common::start_echo_backend().await;
    let route = parse_route(&format!("/a=http://{backend}/b"), false, false).unwrap();
    let handler = ProxyHandler::new(route, Upstream::new(Duration::from_secs(5)).unwrap());

    let request = Request::get("/a/foo")
        .header(header::HOST, "proxy.local:9001")
        .body(Body::empty())
        .unwrap();
    let response = handler.handle(request, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let echoed = String::from_utf8_lossy(&body).to_ascii_lowercase();
    assert!(echoed.starts_with("get /b/foo http/1.1\r\n"), "{echoed}");
    assert!(echoed.contains("x-forwarded-host: proxy.local:9001\r\n"), "{echoed}");
}

#[tokio::test]
async fn rewrites_path_and_forwards_headers() {
    let backend = common::start_echo_backend().await;
    let route = format!("/a/=http://{backend}/b/");
    let proxy = common::start_proxy(&[&route]).await;

    let response = common::client()
        .get(proxy.url("/a/foo?x=1"))
        .header("x-forwarded-for", "203.0.113.9")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let echoed = response.text().await.unwrap().to_ascii_lowercase();
    assert!(echoed.starts_with("get /b/foo?x=1 http/1.1\r\n"), "{echoed}");
    assert!(echoed.contains(&format!("host: {backend}\r\n")), "{echoed}");
    assert!(
        echoed.contains(&format!("x-forwarded-host: {}\r\n", proxy.addr)),
        "{echoed}"
    );
    assert!(
        echoed.contains("x-forwarded-for: 203.0.113.9, 127.0.0.1\r\n"),
        "{echoed}"
    );

    assert_eq!(proxy.stop().await, 0);
}

#[tokio::test]
async fn request_body_reaches_upstream() {
    let backend = common::start_echo_backend().await;
    let route = format!("/=http://{backend}");
    let proxy = common::start_proxy(&[&route]).await;

    let echoed = common::client()
        .post(proxy.url("/submit"))
        .body("hello upstream")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(echoed.starts_with("POST /submit HTTP/1.1\r\n"), "{echoed}");
    assert!(echoed.contains("hello upstream"), "{echoed}");

    proxy.stop().await;
}

#[tokio::test]
async fn upstream_status_and_headers_are_relayed() {
    static HEADERS: [(&str, &str); 2] = [("X-Upstream", "yes"), ("Location", "/elsewhere")];
    let backend = common::start_fixed_backend(302, &HEADERS, "moved").await;
    let route = format!("/old=http://{backend}");
    let proxy = common::start_proxy(&[&route]).await;

    let response = common::client().get(proxy.url("/old")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["x-upstream"], "yes");
    assert_eq!(response.headers()[header::LOCATION], "/elsewhere");
    assert_eq!(response.text().await.unwrap(), "moved");

    proxy.stop().await;
}

#[tokio::test]
async fn longest_prefix_selects_the_upstream() {
    static API: [(&str, &str); 0] = [];
    let web = common::start_fixed_backend(200, &API, "web").await;
    let api = common::start_fixed_backend(200, &API, "api").await;
    let web_route = format!("/=http://{web}");
    let api_route = format!("/api/=http://{api}");
    let proxy = common::start_proxy(&[&web_route, &api_route]).await;
    let client = common::client();

    let body = client.get(proxy.url("/api/users")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "api");
    let body = client.get(proxy.url("/index.html")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "web");

    proxy.stop().await;
}

#[tokio::test]
async fn unmatched_path_is_not_found() {
    let backend = common::start_echo_backend().await;
    let route = format!("/a=http://{backend}");
    let proxy = common::start_proxy(&[&route]).await;

    let response = common::client().get(proxy.url("/b")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "404 page not found\n");

    proxy.stop().await;
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = closed.local_addr().unwrap();
    drop(closed);

    let route = format!("/a=http://{addr}");
    let proxy = common::start_proxy(&[&route]).await;

    let response = common::client().get(proxy.url("/a")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    proxy.stop().await;
}

#[tokio::test]
async fn route_without_host_is_bad_gateway() {
    let proxy = common::start_proxy(&["/a=/b"]).await;

    let response = common::client().get(proxy.url("/a")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    proxy.stop().await;
}

#[tokio::test]
async fn subtree_and_unclean_paths_redirect() {
    let backend = common::start_echo_backend().await;
    let route = format!("/docs/=http://{backend}");
    let proxy = common::start_proxy(&[&route]).await;
    let client = common::client();

    let response = client.get(proxy.url("/docs?page=2")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], "/docs/?page=2");

    let response = client.get(proxy.url("/docs//intro")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], "/docs/intro");

    proxy.stop().await;
}

#[tokio::test]
async fn escaped_dot_segments_cannot_leave_the_destination() {
    let backend = common::start_echo_backend().await;
    let route = format!("/a/=http://{backend}/b/");
    let proxy = common::start_proxy(&[&route]).await;

    for target in ["/a/%2e%2e/secret", "/a/%2E%2E/secret", "/a/.%2e/secret"] {
        let reply = common::raw_request(
            proxy.addr,
            &format!("GET {target} HTTP/1.1\r\nHost: proxy.local\r\nConnection: close\r\n\r\n"),
        )
        .await;
        let lower = reply.to_ascii_lowercase();
        assert!(lower.starts_with("http/1.1 301"), "{target}: {reply}");
        assert!(lower.contains("location: /secret\r\n"), "{target}: {reply}");
    }

    // Plain paths under the prefix are still forwarded.
    let reply = common::raw_request(
        proxy.addr,
        "GET /a/x/y HTTP/1.1\r\nHost: proxy.local\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(reply.starts_with("HTTP/1.1 200"), "{reply}");
    assert!(reply.contains("GET /b/x/y HTTP/1.1"), "{reply}");

    proxy.stop().await;
}

#[tokio::test]
async fn in_flight_request_completes_during_shutdown() {
    let backend = common::start_slow_backend(Duration::from_millis(300)).await;
    let route = format!("/=http://{backend}");
    let proxy = common::start_proxy(&[&route]).await;

    let request = tokio::spawn(common::client().get(proxy.url("/slow")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(proxy.stop().await, 0);
    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
