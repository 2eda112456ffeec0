//! HTTP routing.
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/api/last-modified` | [`RequestHandler::last_modified`] |
//! | GET | `/api/ip` | [`RequestHandler::host_address`] |
//! | POST | `/api/save` | [`RequestHandler::save`] |
//! | POST | `/api/delete` | [`RequestHandler::delete`] |
//! | POST | `/api/upload?filename=X` | [`RequestHandler::upload`] |
//! | OPTIONS | any | CORS preflight |
//! | GET, HEAD | anything else | [`StaticFiles`](crate::StaticFiles) |
//!
//! Errors are answered as `{"detail": "..."}` with the status from
//! [`ServerError::status`].

use crate::error::{ServerError, ServerResult};
use crate::handler::RequestHandler;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, CONTENT_TYPE,
};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error};
use url::form_urlencoded;

const API_ROUTES: [&str; 5] = [
    "/api/last-modified",
    "/api/ip",
    "/api/save",
    "/api/delete",
    "/api/upload",
];

/// Routes one request. Never fails: every error becomes a response.
pub async fn route<B>(
    req: Request<B>,
    handler: Arc<RequestHandler>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let cors = handler.context().config.cors;

    let mut response = match dispatch(req, &handler).await {
        Ok(response) => response,
        Err(err) => {
            if err.is_server_error() {
                error!(%method, %path, error = %err, "request failed");
            } else {
                debug!(%method, %path, error = %err, "request rejected");
            }
            json_error(err.status(), &err.to_string())
        }
    };

    if cors {
        let headers = response.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
    Ok(response)
}

async fn dispatch<B>(
    req: Request<B>,
    handler: &Arc<RequestHandler>,
) -> ServerResult<Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let path = req.uri().path().to_string();

    match (req.method().clone(), path.as_str()) {
        (Method::GET, "/api/last-modified") => {
            let version = blocking(handler, |h| h.last_modified()).await?;
            Ok(json_response(StatusCode::OK, &version))
        }
        (Method::GET, "/api/ip") => Ok(json_response(StatusCode::OK, &handler.host_address())),
        (Method::POST, "/api/save") => {
            let body = read_body(req, handler).await?;
            let reply = blocking(handler, move |h| h.save(&body)).await?;
            Ok(json_response(StatusCode::OK, &reply))
        }
        (Method::POST, "/api/delete") => {
            let body = read_body(req, handler).await?;
            let reply = blocking(handler, move |h| h.delete(&body)).await?;
            Ok(json_response(StatusCode::OK, &reply))
        }
        (Method::POST, "/api/upload") => {
            let filename = query_param(req.uri().query(), "filename");
            let body = read_body(req, handler).await?;
            let reply = blocking(handler, move |h| h.upload(filename.as_deref(), &body)).await?;
            Ok(json_response(StatusCode::OK, &reply))
        }
        (_, p) if API_ROUTES.contains(&p) && req.method() != Method::OPTIONS => {
            Err(ServerError::MethodNotAllowed)
        }
        (Method::OPTIONS, _) => Ok(preflight()),
        (Method::GET, _) => handler.context().static_files.serve(&path, false).await,
        (Method::HEAD, _) => handler.context().static_files.serve(&path, true).await,
        _ => Err(ServerError::NotFound("Not Found".into())),
    }
}

/// Runs a handler call on the blocking pool.
async fn blocking<T, F>(handler: &Arc<RequestHandler>, f: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&RequestHandler) -> ServerResult<T> + Send + 'static,
{
    let handler = Arc::clone(handler);
    tokio::task::spawn_blocking(move || f(&handler))
        .await
        .map_err(|err| ServerError::Internal(format!("handler task failed: {err}")))?
}

/// Reads exactly the number of bytes the client declared.
async fn read_body<B>(req: Request<B>, handler: &RequestHandler) -> ServerResult<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .ok_or_else(|| ServerError::InvalidRequest("Missing Content-Length".into()))?
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .ok_or_else(|| ServerError::InvalidRequest("Invalid Content-Length".into()))?;

    let limit = handler.context().config.max_body_bytes;
    if declared > limit {
        return Err(ServerError::PayloadTooLarge { declared, limit });
    }

    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|err| ServerError::InvalidRequest(format!("Failed to read body: {err}")))?
        .to_bytes();

    if body.len() as u64 != declared {
        return Err(ServerError::InvalidRequest(format!(
            "Body length {} does not match Content-Length {declared}",
            body.len()
        )));
    }
    Ok(body)
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn preflight() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{\"detail\":\"serialize\"}".to_vec());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"{\"detail\":\"internal\"}"))))
}

fn json_error(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    let v = serde_json::json!({ "detail": msg });
    json_response(status, &v)
}
