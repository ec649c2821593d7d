//! HTTP server setup and the accept loop.
//!
//! # Responsibilities
//! - Create the Axum app: one fallback that dispatches through the route table
//! - Serve HTTP/1.1 and HTTP/2 (h2c) on every accepted connection
//! - Stop accepting on shutdown and drain in-flight connections within a deadline
//!
//! # Design Decisions
//! - The route table is immutable and shared through `Arc`; no locks on the request path
//! - Accept errors are logged and retried, never fatal
//! - Connections still open when the drain deadline passes are aborted

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use hyper_util::service::TowerToHyperService;
use thiserror::Error;
use tokio::net::TcpStream;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::http::proxy::ProxyHandler;
use crate::http::response;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::connection::{ConnectionId, Connections, DrainOutcome};
use crate::net::listener::Listener;
use crate::routing::{Resolution, RouteTable};

/// Pause after a failed accept before trying again.
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(100);

/// Error type for the serve loop.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable<ProxyHandler>>,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    app: Router,
    drain_timeout: Duration,
}

impl HttpServer {
    pub fn new(routes: Arc<RouteTable<ProxyHandler>>, drain_timeout: Duration) -> Self {
        let app = Self::build_router(AppState { routes });
        Self { app, drain_timeout }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The Axum app, for serving without a listener.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Serve connections until `shutdown` fires, then drain.
    pub async fn run(self, listener: Listener, mut shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        tracing::debug!(address = %addr, "HTTP server starting");

        let mut connections = Connections::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let id = ConnectionId::next();
                        let span = tracing::debug_span!("connection", id = %id, peer = %peer);
                        let app = self.app.clone();
                        let signal = shutdown.clone();
                        connections.spawn(serve_connection(stream, peer, app, signal).instrument(span));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_PAUSE).await;
                    }
                },
                _ = connections.reap(), if !connections.is_empty() => {}
                _ = shutdown.recv() => break,
            }
        }

        drop(listener);
        tracing::debug!(open = connections.len(), "Draining connections");
        match connections.drain(self.drain_timeout).await {
            DrainOutcome::Completed => tracing::debug!("HTTP server stopped"),
            DrainOutcome::Forced(count) => {
                tracing::warn!(
                    count,
                    timeout = ?self.drain_timeout,
                    "Connections still open after drain deadline were closed"
                );
            }
        }
        Ok(())
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, app: Router, mut shutdown: ShutdownSignal) {
    let service = app.map_request(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        request
    });
    let builder = AutoBuilder::new(TokioExecutor::new());
    let connection = builder.serve_connection_with_upgrades(
        TokioIo::new(stream),
        TowerToHyperService::new(service),
    );
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = shutdown.recv() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Connection closed with error");
    }
}

/// Resolve the request against the route table and hand it to the route's handler.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let resolution = state.routes.resolve(
        request.method(),
        request.uri().path(),
        request.uri().query(),
    );
    match resolution {
        Resolution::Matched { handler, .. } => handler.handle(request, peer).await,
        Resolution::Redirect(location) => response::redirect(&location),
        Resolution::NotFound => response::not_found(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{header, StatusCode};

    use super::*;
    use crate::config::{RouteConfig, Scheme};
    use crate::net::transport::Upstream;

    fn server(sources: &[&str]) -> HttpServer {
        let upstream = Upstream::new(Duration::from_secs(5)).unwrap();
        let table = RouteTable::from_routes(sources.iter().map(|source| {
            let route = RouteConfig {
                source_path: source.to_string(),
                destination_path: source.to_string(),
                host: String::new(),
                scheme: Scheme::Http,
                verbose: false,
            };
            (source.to_string(), ProxyHandler::new(route, upstream.clone()))
        }))
        .unwrap();
        HttpServer::new(Arc::new(table), Duration::from_secs(1))
    }

    async fn call(app: Router, uri: &str) -> Response {
        app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unmatched_path_is_not_found() {
        let response = call(server(&["/a"]).app(), "/b").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn subtree_without_slash_redirects() {
        let response = call(server(&["/docs/"]).app(), "/docs?x=1").await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/docs/?x=1");
    }

    #[tokio::test]
    async fn matched_route_reaches_its_handler() {
        // Empty upstream host: the handler answers 502 without any network access.
        let response = call(server(&["/a"]).app(), "/a").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
