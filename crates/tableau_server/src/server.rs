//! The HTTP server.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{HandlerContext, RequestHandler};
use crate::router::route;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// The site server.
///
/// Binding opens the document store, so a second server on the same site root
/// fails with a lock error instead of racing the first one.
///
/// # Example
///
/// ```no_run
/// use tableau_server::{ServerConfig, SiteServer};
///
/// # async fn run() -> tableau_server::ServerResult<()> {
/// let config = ServerConfig::new("0.0.0.0:8000".parse().unwrap()).with_root("site");
/// let server = SiteServer::bind(config).await?;
/// server.run().await
/// # }
/// ```
pub struct SiteServer {
    listener: TcpListener,
    handler: Arc<RequestHandler>,
}

impl SiteServer {
    /// Binds the listener and opens the store.
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound or the store cannot be opened.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let port = listener.local_addr()?.port();
        let context = HandlerContext::new(config, port)?;

        Ok(Self {
            listener,
            handler: Arc::new(RequestHandler::new(context)),
        })
    }

    /// Returns the address the server is listening on.
    ///
    /// # Errors
    ///
    /// Fails if the socket address cannot be read.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Returns the shared request handler.
    pub fn handler(&self) -> Arc<RequestHandler> {
        Arc::clone(&self.handler)
    }

    /// Serves until the process is stopped.
    ///
    /// # Errors
    ///
    /// Fails if accepting connections fails.
    pub async fn run(self) -> ServerResult<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes.
    ///
    /// Stops accepting new connections once `shutdown` resolves; requests
    /// already in flight keep their own tasks.
    ///
    /// # Errors
    ///
    /// Fails if accepting connections fails.
    pub async fn run_until<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.listener.local_addr()?;
        let host = self.handler.host_address();
        info!(
            %addr,
            root = %self.handler.context().config.root.display(),
            "serving on http://{}:{}",
            host.ip,
            host.port
        );

        tokio::pin!(shutdown);
        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => accepted?,
                () = &mut shutdown => {
                    info!("shutting down");
                    return Ok(());
                }
            };
            debug!(%peer, "connection accepted");

            let io = TokioIo::new(stream);
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                let service = service_fn(move |req| route(req, Arc::clone(&handler)));
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(%peer, error = %err, "connection error");
                }
            });
        }
    }
}
