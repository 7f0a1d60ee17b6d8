//! Resolves the uploading principal for each request.
//!
//! By default the identity is the peer IP address. When `IDENTITY_HEADER` is
//! configured, a trusted upstream (auth proxy, gateway) injects the principal
//! in that header and it takes priority. Client-supplied headers are never
//! consulted otherwise. The identity only keys the upload quota; it is not
//! authentication.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

const MAX_IDENTITY_LEN: usize = 128;
const ANONYMOUS: &str = "anonymous";

/// Identity attached to the request extensions by [`identity_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

fn from_header(headers: &HeaderMap, header_name: &str) -> Option<String> {
    let value = headers.get(header_name)?.to_str().ok()?.trim();
    if value.is_empty() || value.len() > MAX_IDENTITY_LEN {
        return None;
    }
    Some(format!("user:{}", value))
}

/// Requests without a trusted header or a known peer share one quota.
pub fn resolve_identity(
    headers: &HeaderMap,
    trusted_header: Option<&str>,
    peer: Option<SocketAddr>,
) -> ClientIdentity {
    let identity = trusted_header
        .and_then(|name| from_header(headers, name))
        .or_else(|| peer.map(|addr| format!("ip:{}", addr.ip())))
        .unwrap_or_else(|| ANONYMOUS.to_string());
    ClientIdentity(identity)
}

pub async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = resolve_identity(
        request.headers(),
        state.config.identity_header.as_deref(),
        peer,
    );
    request.extensions_mut().insert(identity);
    next.run(request).await
}
