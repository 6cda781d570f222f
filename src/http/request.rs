//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Extract the data templates can reference into a [`RequestContext`]
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `application/x-www-form-urlencoded` and `multipart/form-data` bodies
//!   populate `form.*`; multipart file parts are ignored
//! - An unreadable or oversized body yields an empty form, not an error

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequest, Multipart};
use axum::http::{header, request::Parts, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::template::RequestContext;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(value))
    }
}

/// Request ID of a request, or `"unknown"`.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

fn parse_pairs(input: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(input).into_owned().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormEncoding {
    UrlEncoded,
    Multipart,
}

fn form_encoding(request: &Request<Body>) -> Option<FormEncoding> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())?;

    if content_type.starts_with("application/x-www-form-urlencoded") {
        Some(FormEncoding::UrlEncoded)
    } else if content_type.starts_with("multipart/form-data") {
        Some(FormEncoding::Multipart)
    } else {
        None
    }
}

/// Text fields of a multipart body, in order. File parts are skipped.
async fn multipart_fields(parts: Parts, body: Body, max_body_bytes: usize) -> Vec<(String, String)> {
    let bytes = match axum::body::to_bytes(body, max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Could not read multipart body");
            return Vec::new();
        }
    };

    let request = Request::from_parts(parts, Body::from(bytes));
    let mut multipart = match Multipart::from_request(request, &()).await {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Malformed multipart body");
            return Vec::new();
        }
    };

    let mut fields = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.file_name().is_some() {
                    continue;
                }
                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };
                match field.text().await {
                    Ok(value) => fields.push((name, value)),
                    Err(e) => {
                        tracing::debug!(field = %name, error = %e, "Could not read multipart field");
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Malformed multipart body");
                break;
            }
        }
    }
    fields
}

/// Build the template-visible view of a request, consuming its body.
pub async fn extract_context(request: Request<Body>, max_body_bytes: usize) -> RequestContext {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default();

    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    let query = request
        .uri()
        .query()
        .map(|q| parse_pairs(q.as_bytes()))
        .unwrap_or_default();

    let method = request.method().to_string();
    let url = request.uri().to_string();
    let encoding = form_encoding(&request);
    let (parts, body) = request.into_parts();

    let form = match encoding {
        Some(FormEncoding::UrlEncoded) => match axum::body::to_bytes(body, max_body_bytes).await {
            Ok(bytes) => parse_pairs(&bytes),
            Err(e) => {
                tracing::debug!(error = %e, "Could not read form body");
                Vec::new()
            }
        },
        Some(FormEncoding::Multipart) => multipart_fields(parts, body, max_body_bytes).await,
        None => Vec::new(),
    };

    RequestContext {
        method,
        url,
        host,
        remote_addr,
        query,
        form,
    }
}
