//! Token extraction from inbound requests.

use axum::http::{
    HeaderMap, Uri,
    header::{AUTHORIZATION, COOKIE},
    request::Parts,
};

use crate::config::{TokenTransport, TransportConfig};

/// Something a raw token can be read from.
pub trait TokenSource {
    /// Returns the raw token carried on the configured transport, if any.
    /// Empty values count as absent.
    fn get_token(&self, transport: &TransportConfig) -> Option<String>;
}

/// [`TokenSource`] over the headers and URI of an HTTP request.
#[derive(Debug, Clone, Copy)]
pub struct RequestTokenSource<'a> {
    headers: &'a HeaderMap,
    uri: &'a Uri,
}

impl<'a> RequestTokenSource<'a> {
    /// Creates a source over request headers and URI.
    #[must_use]
    pub fn new(headers: &'a HeaderMap, uri: &'a Uri) -> Self {
        Self { headers, uri }
    }
}

impl<'a> From<&'a Parts> for RequestTokenSource<'a> {
    fn from(parts: &'a Parts) -> Self {
        Self::new(&parts.headers, &parts.uri)
    }
}

impl TokenSource for RequestTokenSource<'_> {
    fn get_token(&self, transport: &TransportConfig) -> Option<String> {
        match transport.kind {
            TokenTransport::Header => extract_bearer(self.headers),
            TokenTransport::Query => extract_from_query(self.uri, &transport.name),
            TokenTransport::Cookie => extract_from_cookie(self.headers, &transport.name),
        }
    }
}

/// `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    non_empty(token)
}

fn extract_from_query(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;

    // simple key=value&key=value format
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| non_empty(value))
}

fn extract_from_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .and_then(|(_, value)| non_empty(value))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
