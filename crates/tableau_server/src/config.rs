//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 8000;

/// Largest request body accepted by default (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Site root: static files are served from here, and the store keeps
    /// `data/` and `assets/images/` below it.
    pub root: PathBuf,
    /// Maximum declared `Content-Length` for POST bodies.
    pub max_body_bytes: u64,
    /// Whether to send permissive CORS headers.
    pub cors: bool,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            root: PathBuf::from("."),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cors: true,
        }
    }

    /// Sets the site root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets the maximum request body size.
    pub fn with_max_body_bytes(mut self, max: u64) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Enables or disables CORS headers.
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))
    }
}
