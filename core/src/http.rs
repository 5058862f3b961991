//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The core builds `HttpRequest`
//! values and parses `HttpResponse` values; a `Transport` executes the
//! round-trip. An `HttpRequest` is never mutated once built: re-attaching a
//! credential produces a new descriptor via `with_header`, which is how the
//! refresh-and-retry loop rebuilds a pending request.

/// Name of the header carrying the bearer credential.
pub const AUTHORIZATION: &str = "authorization";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `PatientClient::build_*` methods and sent through
/// `AuthClient::dispatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup. Returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns a copy of this request with `name` set to `value`, replacing
    /// every existing header of the same name.
    pub fn with_header(&self, name: &str, value: &str) -> HttpRequest {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(key, _)| !key.eq_ignore_ascii_case(name))
            .cloned()
            .collect();
        headers.push((name.to_string(), value.to_string()));
        HttpRequest {
            method: self.method,
            path: self.path.clone(),
            headers,
            body: self.body.clone(),
        }
    }

    /// The token of an `Authorization: Bearer <token>` header, if present.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(AUTHORIZATION)
            .and_then(|value| value.strip_prefix("Bearer "))
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}
