//! Per-route proxy handler.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::config::RouteConfig;
use crate::http::request;
use crate::http::response;
use crate::net::transport::Upstream;

/// Forwards requests for one route to its upstream.
#[derive(Debug, Clone)]
pub struct ProxyHandler {
    route: RouteConfig,
    upstream: Upstream,
}

impl ProxyHandler {
    pub fn new(route: RouteConfig, upstream: Upstream) -> Self {
        Self { route, upstream }
    }

    pub fn route(&self) -> &RouteConfig {
        &self.route
    }

    /// Rewrite the request, send it upstream and relay the answer.
    ///
    /// Transport failures are logged and answered with 502; nothing is retried.
    pub async fn handle(&self, request: Request<Body>, peer: Option<SocketAddr>) -> Response {
        let (parts, body) = request.into_parts();
        let outbound = request::prepare(&self.route, &parts, peer);

        if self.route.verbose {
            tracing::info!(
                "{} {} => {}{}",
                parts.method,
                parts.uri.path(),
                self.route.host,
                outbound.path
            );
        }

        let url = match Upstream::target_url(
            self.route.scheme,
            &self.route.host,
            &outbound.path,
            outbound.query.as_deref(),
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(route = %self.route.source_path, error = %e, "Proxy error");
                return response::bad_gateway();
            }
        };

        match self
            .upstream
            .send(outbound.method, url, outbound.headers, body)
            .await
        {
            Ok(upstream) => response::relay(upstream),
            Err(e) => {
                tracing::warn!(
                    route = %self.route.source_path,
                    upstream = %self.route.host,
                    timeout = e.is_timeout(),
                    error = %e,
                    cause = ?std::error::Error::source(&e).and_then(|source| source.source()),
                    "Proxy error"
                );
                response::bad_gateway()
            }
        }
    }
}
