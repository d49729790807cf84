//! Axum web server exposing the tag listing.
//!
//! `GET /tags` runs the tool once per request and streams its tags as
//! `{"tags":[...]}` while they are being converted.

use std::io;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{stream, StreamExt};
use log::{error, info};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Settings;
use crate::stream::{StreamAborted, TagStream};
use crate::tool::{ToolError, ToolLauncher};

const INTERNAL_SERVER_ERROR: &str = "internal server error";

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Launcher for the metadata tool.
    pub launcher: ToolLauncher,
}

impl AppState {
    /// Create state around a launcher.
    pub fn new(launcher: ToolLauncher) -> Self {
        Self { launcher }
    }
}

/// Errors that stop the server from starting or running.
#[derive(Error, Debug)]
pub enum ServeError {
    /// The `[tool]` settings are unusable.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The server loop failed.
    #[error("server error: {0}")]
    Io(#[from] io::Error),
}

/// Build the axum router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tags", get(get_tags))
        .layer(cors)
        .with_state(state)
}

/// Start the web server and run it until Ctrl-C.
pub async fn serve(settings: Settings) -> Result<(), ServeError> {
    let launcher = ToolLauncher::from_settings(&settings.tool)?;
    let state = Arc::new(AppState::new(launcher));
    let app = router(state);

    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("Serving on {}...", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: INTERNAL_SERVER_ERROR,
        }),
    )
        .into_response()
}

/// GET /tags - Stream every tag known to the tool
///
/// The status line is only committed once the first chunk is ready, so a
/// failure before anything was streamed still becomes a 500. Later failures
/// end the chunked body without its closing `]}`.
async fn get_tags(State(state): State<Arc<AppState>>) -> Response {
    let run = match state.launcher.launch() {
        Ok(run) => run,
        Err(e) => {
            error!(
                "[web] starting `{} {}` failed: {}",
                state.launcher.program(),
                state.launcher.args().join(" "),
                e
            );
            return internal_error();
        }
    };

    let TagStream { mut chunks, .. } = TagStream::spawn(run);

    let first = match chunks.recv().await {
        Some(Ok(first)) => first,
        Some(Err(e)) => {
            error!("[web] tag stream failed before the first record: {}", e);
            return internal_error();
        }
        None => {
            error!("[web] tag stream ended without output");
            return internal_error();
        }
    };

    let body = stream::once(async move { Ok::<_, StreamAborted>(first) })
        .chain(ReceiverStream::new(chunks));

    (
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(body),
    )
        .into_response()
}
