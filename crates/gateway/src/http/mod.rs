//! HTTP/WS surface (§6.3). Routes are split across `routes` (plain REST)
//! and `ws` (the three upgrade paths); this module only assembles the
//! router and owns the listener task.

pub mod routes;
pub mod ws;

use std::net::SocketAddr;

use axum::Router;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::SharedState;

/// Owns the listener task and its graceful-shutdown trigger. Dropping this
/// without calling [`ServerHandle::shutdown`] leaves the listener running
/// until the process exits — `shutdown` is the only clean teardown path.
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl ServerHandle {
    /// Signal graceful shutdown and wait for in-flight requests to drain.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.join.await;
    }
}

fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .merge(ws::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and spawn the listener (§4.4 boot step 6). Returns once the socket
/// is bound, not once it's serving — callers that need "serving" as a
/// readiness signal should hit `/health` in a loop.
pub async fn serve(state: SharedState) -> std::io::Result<ServerHandle> {
    let config = state.current_config().await;
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let listener = TcpListener::bind(addr).await?;
    let app = router(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tracing::info!(%addr, "gateway HTTP/WS surface listening");
    let join = tokio::spawn(async move {
        let result = axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(err) = result {
            tracing::error!(error = %err, "HTTP server task exited with an error");
        }
    });

    Ok(ServerHandle { shutdown_tx: Some(shutdown_tx), join })
}
