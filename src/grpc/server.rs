//! gRPC listener hosting both authorization API versions.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::authz::Checker;
use crate::grpc::v2::AuthorizationV2;
use crate::grpc::v3::AuthorizationV3;
use crate::lifecycle::shutdown::signalled;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// The external authorization gRPC server.
pub struct AuthzServer {
    checker: Arc<dyn Checker>,
}

impl AuthzServer {
    /// Create a server that answers every check with `checker`.
    pub fn new(checker: Arc<dyn Checker>) -> Self {
        Self { checker }
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// In-flight calls are allowed to finish before this returns.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        info!(address = %addr, "Authorization server listening");

        Server::builder()
            .layer(TraceLayer::new_for_grpc())
            .add_service(AuthorizationV2::new(self.checker.clone()).into_server())
            .add_service(AuthorizationV3::new(self.checker).into_server())
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                signalled(shutdown).await;
                info!("Authorization server shutting down");
            })
            .await?;

        Ok(())
    }
}
