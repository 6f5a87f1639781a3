//! In-process HTTP server for client tests
//!
//! Serves canned responses per path and records every request target, so tests
//! can assert which of the two requests were issued and with what query.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::OriginalUri;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

/// Canned response for one path
#[derive(Debug, Clone)]
pub struct Route {
    pub path: &'static str,
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl Route {
    pub fn new(path: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self {
            path,
            status,
            body: body.into(),
            delay: None,
        }
    }

    /// Wait before answering
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Running test server
pub struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Bind to an ephemeral port and start serving `routes`
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let app = router(routes, Arc::clone(&requests));
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    /// Absolute URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Request targets received so far (path plus query)
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Request targets whose path is `path`
    pub fn requests_to(&self, path: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|target| target.split('?').next() == Some(path))
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One GET route per canned path; anything else is recorded and answered 404
fn router(routes: Vec<Route>, requests: Arc<Mutex<Vec<String>>>) -> Router {
    let mut app = Router::new();

    for route in routes {
        let requests = Arc::clone(&requests);
        app = app.route(
            route.path,
            get(move |OriginalUri(uri): OriginalUri| {
                let route = route.clone();
                let requests = Arc::clone(&requests);
                async move {
                    record(&requests, &uri);
                    if let Some(delay) = route.delay {
                        tokio::time::sleep(delay).await;
                    }
                    let status =
                        StatusCode::from_u16(route.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    (status, route.body)
                }
            }),
        );
    }

    app.fallback(move |OriginalUri(uri): OriginalUri| {
        let requests = Arc::clone(&requests);
        async move {
            record(&requests, &uri);
            (StatusCode::NOT_FOUND, "not found")
        }
    })
}

fn record(requests: &Mutex<Vec<String>>, uri: &Uri) {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    requests.lock().unwrap().push(target);
}

/// An address nothing listens on
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}/", addr)
}
