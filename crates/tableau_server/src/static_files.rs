//! Static files from the site root.

use crate::error::{ServerError, ServerResult};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Path, PathBuf};

const INDEX_FILE: &str = "index.html";

/// Serves files below a root directory.
///
/// Request paths are percent-decoded and must stay inside the root: any `..`
/// segment, backslash or NUL makes the file not found. Directories serve
/// their `index.html`; there are no listings.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    /// Serves files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a request path to a file system path below the root.
    ///
    /// Returns `None` for paths that try to leave the root.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
        if decoded.contains(['\0', '\\']) {
            return None;
        }

        let mut path = self.root.clone();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => return None,
                part => path.push(part),
            }
        }
        Some(path)
    }

    /// Builds the response for `request_path`.
    ///
    /// With `head_only`, the body is left empty but `Content-Length` still
    /// reports the file size.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotFound`] when no file matches.
    pub async fn serve(
        &self,
        request_path: &str,
        head_only: bool,
    ) -> ServerResult<Response<Full<Bytes>>> {
        let not_found = || ServerError::NotFound("File not found".into());

        let mut path = self.resolve(request_path).ok_or_else(not_found)?;
        let mut metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(err) => return Err(err.into()),
        };
        if metadata.is_dir() {
            path.push(INDEX_FILE);
            metadata = tokio::fs::metadata(&path).await.map_err(|_| not_found())?;
        }
        if !metadata.is_file() {
            return Err(not_found());
        }

        let body = if head_only {
            Bytes::new()
        } else {
            Bytes::from(tokio::fs::read(&path).await?)
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type(&path))
            .header(CONTENT_LENGTH, metadata.len())
            .header(CACHE_CONTROL, "no-cache")
            .body(Full::new(body))
            .map_err(|err| ServerError::Internal(err.to_string()))
    }
}

/// Guesses a content type from the file extension.
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("avif") => "image/avif",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("pdf") => "application/pdf",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
