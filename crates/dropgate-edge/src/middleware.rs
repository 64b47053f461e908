//! Gate middleware: runs the gatekeeper in front of every route.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use dropgate_core::{GateDecision, GateRequest, SetCookie};
use tracing::warn;

use crate::EdgeState;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

pub async fn gate_requests(
    State(state): State<Arc<EdgeState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let gate_request = gate_request_from(&request);
    let outcome = state.gatekeeper.evaluate(&gate_request).await;

    let mut response = match outcome.decision {
        GateDecision::Next => {
            if !outcome.cookies.is_empty() {
                // Let the page render with the rotated credentials too.
                rewrite_request_cookies(request.headers_mut(), &outcome.cookies);
            }
            next.run(request).await
        }
        GateDecision::Redirect(ref location) => redirect_to(location),
    };

    attach_cookies(response.headers_mut(), &outcome.cookies);
    response
}

/// Extract what the gatekeeper needs from an incoming request.
pub fn gate_request_from(request: &Request) -> GateRequest {
    let headers = request.headers();
    let cookie_header = cookie_header(headers);
    let secure = request.uri().scheme_str() == Some("https")
        || headers
            .get(FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));

    GateRequest {
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        cookie_header,
        secure,
    }
}

/// All `Cookie` headers joined; HTTP/2 clients may send one per cookie.
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    (!parts.is_empty()).then(|| parts.join("; "))
}

fn redirect_to(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, value)]).into_response(),
        Err(_) => {
            warn!(location = %location, "Unusable redirect location");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn attach_cookies(headers: &mut HeaderMap, cookies: &[SetCookie]) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.header_value()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(_) => warn!(name = %cookie.name, "Dropping unencodable cookie"),
        }
    }
}

/// Replace the forwarded `Cookie` header with one reflecting this evaluation's writes.
///
/// Fragments for cookies the gate did not write are kept byte-for-byte.
fn rewrite_request_cookies(headers: &mut HeaderMap, written: &[SetCookie]) {
    let mut fragments: Vec<String> = cookie_header(headers)
        .map(|header| {
            header
                .split(';')
                .map(str::trim)
                .filter(|fragment| !fragment.is_empty())
                .filter(|fragment| !written.iter().any(|c| fragment_name(fragment) == c.name))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    fragments.extend(
        written
            .iter()
            .filter(|c| !c.is_removal())
            .map(|c| format!("{}={}", urlencoding::encode(&c.name), urlencoding::encode(&c.value))),
    );

    headers.remove(COOKIE);
    if fragments.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&fragments.join("; ")) {
        headers.insert(COOKIE, value);
    }
}

fn fragment_name(fragment: &str) -> &str {
    fragment
        .split_once('=')
        .map_or(fragment, |(name, _)| name)
        .trim()
}
