//! Request handlers for the JSON endpoints.
//!
//! Handlers take already-read request bodies and return typed replies; the
//! router owns everything HTTP-specific. Handlers block on file I/O and are
//! run on the blocking thread pool.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::net::{advertised_ip, HostAddress};
use crate::static_files::StaticFiles;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tableau_store::{AssetStore, ChangeClock, DocumentStore, Item, SiteLayout, Version};
use tracing::debug;

/// Body of `/api/save` and `/api/delete`.
#[derive(Debug, Deserialize)]
struct ItemRequest {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    item: Option<Value>,
}

impl ItemRequest {
    fn parse(body: &[u8]) -> ServerResult<(String, Item)> {
        let request: ItemRequest = serde_json::from_slice(body)
            .map_err(|err| ServerError::InvalidRequest(format!("Invalid JSON: {err}")))?;

        let category = request.category.filter(|c| !c.is_empty());
        let item = request
            .item
            .and_then(Item::from_value)
            .filter(|item| !item.is_empty());

        match (category, item) {
            (Some(category), Some(item)) => Ok((category, item)),
            _ => Err(ServerError::InvalidRequest(
                "Missing category or item".into(),
            )),
        }
    }
}

/// Reply of the mutating endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReply {
    /// Always `"success"`.
    pub status: &'static str,
}

impl StatusReply {
    /// The success reply.
    pub const SUCCESS: StatusReply = StatusReply { status: "success" };
}

/// Reply of `/api/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReply {
    /// Stored file path relative to the site root.
    pub path: String,
}

/// Shared state for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// The document store (shared across all handlers).
    pub store: DocumentStore,
    /// Upload storage.
    pub assets: AssetStore,
    /// Static file server for the site root.
    pub static_files: StaticFiles,
    clock: ChangeClock,
    host: HostAddress,
}

impl HandlerContext {
    /// Opens the store under the configured root.
    ///
    /// `port` is the port advertised by `/api/ip`; pass the bound port when
    /// the configured one is `0`.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be opened (for example, another server
    /// already owns the site's data directory).
    pub fn new(config: ServerConfig, port: u16) -> ServerResult<Self> {
        let layout = SiteLayout::new(config.root.clone());
        let store = DocumentStore::open(layout.clone())?;
        let clock = store.clock();
        let host = HostAddress {
            ip: advertised_ip(config.bind_addr.ip()),
            port,
        };

        Ok(Self {
            static_files: StaticFiles::new(config.root.clone()),
            assets: AssetStore::new(layout),
            store,
            clock,
            host,
            config,
        })
    }
}

/// Handler for API requests.
pub struct RequestHandler {
    context: HandlerContext,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: HandlerContext) -> Self {
        Self { context }
    }

    /// Returns the handler context.
    pub fn context(&self) -> &HandlerContext {
        &self.context
    }

    /// Handles `GET /api/last-modified`.
    pub fn last_modified(&self) -> ServerResult<Version> {
        Ok(self.context.clock.last_modified()?)
    }

    /// Handles `GET /api/ip`.
    pub fn host_address(&self) -> HostAddress {
        self.context.host
    }

    /// Handles `POST /api/save`.
    pub fn save(&self, body: &[u8]) -> ServerResult<StatusReply> {
        let (category, item) = ItemRequest::parse(body)?;
        debug!(%category, "save request");
        self.context.store.append(&category, item)?;
        Ok(StatusReply::SUCCESS)
    }

    /// Handles `POST /api/delete`.
    pub fn delete(&self, body: &[u8]) -> ServerResult<StatusReply> {
        let (category, item) = ItemRequest::parse(body)?;
        debug!(%category, "delete request");
        self.context.store.delete(&category, &item)?;
        Ok(StatusReply::SUCCESS)
    }

    /// Handles `POST /api/upload?filename=...`.
    pub fn upload(&self, filename: Option<&str>, body: &[u8]) -> ServerResult<UploadReply> {
        let path = self.context.assets.upload(filename, body)?;
        Ok(UploadReply { path })
    }
}
