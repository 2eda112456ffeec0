//! # Tableau Server
//!
//! HTTP front end for a Tableau site.
//!
//! This crate provides:
//! - JSON endpoints to append and delete board items
//! - Change polling (`/api/last-modified`) and host discovery (`/api/ip`)
//! - Image uploads into `assets/images/`
//! - Static file serving for the site itself
//!
//! # Architecture
//!
//! [`SiteServer`] accepts connections and hands every request to the router,
//! which reads the body, calls [`RequestHandler`] on the blocking pool and
//! turns the result into JSON. All persistence lives in `tableau_store`.
//!
//! Error responses carry a `detail` field:
//!
//! ```json
//! {"detail": "Invalid category: flashNews"}
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod net;
mod router;
mod server;
mod static_files;

pub use config::{ServerConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler, StatusReply, UploadReply};
pub use net::{advertised_ip, outbound_ipv4, HostAddress};
pub use router::route;
pub use server::SiteServer;
pub use static_files::{content_type, StaticFiles};
