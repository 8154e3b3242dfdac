use std::future::Future;
use std::io;

use axum::Router;
use tokio::net::TcpListener;

/// Serve `router` on `listener` until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(router: Router, listener: TcpListener, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    match listener.local_addr() {
        Ok(addr) => tracing::info!("listening on {:?}", addr),
        Err(e) => tracing::warn!("listening on unknown address: {}", e),
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
