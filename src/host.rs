//! Static content host – serves a pre-built directory over HTTP on a local
//! port for the lifetime of one export run.

use std::io;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path as UrlPath, State},
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use mime_guess::Mime;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::error::PipelineError;

const INDEX_FILE: &str = "index.html";

/// Handle to a running static file server.
pub struct StaticHost {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<io::Result<()>>>,
}

impl StaticHost {
    /// Bind `config.bind:config.port` and start serving `config.static_dir`.
    ///
    /// Returns once the listener is accepting connections.
    pub async fn start(config: &ServerConfig) -> Result<Self, PipelineError> {
        let is_dir = tokio::fs::metadata(&config.static_dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            log::warn!(
                "Static directory '{}' does not exist; every request will 404",
                config.static_dir.display()
            );
        }

        let listener = TcpListener::bind((config.bind, config.port))
            .await
            .map_err(|source| PipelineError::HostStart {
                port: config.port,
                source,
            })?;
        let addr = listener
            .local_addr()
            .map_err(|source| PipelineError::HostStart {
                port: config.port,
                source,
            })?;

        let router = build_router(config.static_dir.clone());
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
        });

        log::info!("Server running on http://{addr}");
        Ok(Self {
            addr,
            shutdown: Some(tx),
            task: Some(task),
        })
    }

    /// Base URL of the hosted content.
    pub fn origin(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Stop accepting connections and wait for the server task to finish.
    /// Calling it again is a no-op.
    pub async fn stop(&mut self) -> Result<(), PipelineError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(Ok(())) => {
                log::info!("Server on {} stopped", self.addr);
                Ok(())
            }
            Ok(Err(err)) => Err(PipelineError::HostStop(err.to_string())),
            Err(err) => Err(PipelineError::HostStop(format!("server task failed: {err}"))),
        }
    }
}

/// Router answering every path from `root`. The wildcard capture is
/// percent-decoded by the extractor before it reaches [`resolve_path`].
pub fn build_router(root: PathBuf) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_path))
        .with_state(Arc::new(root))
}

async fn serve_index(State(root): State<Arc<PathBuf>>) -> Response {
    serve_file(&root.join(INDEX_FILE), "/").await
}

async fn serve_path(
    State(root): State<Arc<PathBuf>>,
    UrlPath(path): UrlPath<String>,
    uri: Uri,
) -> Response {
    let Some(resolved) = resolve_path(&root, &path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let is_dir = tokio::fs::metadata(&resolved)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if is_dir {
        // Relative links inside the index must resolve against the directory.
        return redirect_to_directory(&uri);
    }
    serve_file(&resolved, uri.path()).await
}

async fn serve_file(path: &Path, request_path: &str) -> Response {
    match tokio::fs::read(path).await {
        Ok(contents) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            build_response(Bytes::from(contents), mime)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log::debug!("404 {request_path}");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            log::warn!("Failed to read '{}': {err}", path.display());
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn redirect_to_directory(uri: &Uri) -> Response {
    let mut location = format!("{}/", uri.path());
    if let Some(query) = uri.query() {
        location.push('?');
        location.push_str(query);
    }
    match HeaderValue::from_str(&location) {
        Ok(value) => {
            let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Map a decoded request path onto a file below `root`. Paths that try to
/// leave the root resolve to `None`.
pub fn resolve_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    if relative.is_empty() {
        return Some(root.join(INDEX_FILE));
    }

    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if request_path.ends_with('/') {
        resolved.push(INDEX_FILE);
    }
    Some(resolved)
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    response
}
