//! Derived endpoint specifications.

use serde::{Deserialize, Serialize};

/// HTTP method of a derived endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Read a collection or entity.
    Get,
    /// Create an entity.
    Post,
    /// Replace an entity.
    Put,
    /// Delete an entity.
    Delete,
}

impl HttpMethod {
    /// Returns the method as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A derived description of one externally-published operation.
///
/// Endpoint specs are derived from resource definitions by the schema
/// analyzer, never hand-authored. A resource yields a deterministic set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template, e.g. `/widgets/{id}`.
    pub path: String,
    /// Human-readable summary.
    pub summary: String,
    /// Whether the endpoint requires authentication.
    pub requires_auth: bool,
    /// Request body schema (None for reads and deletes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_schema: Option<serde_json::Value>,
    /// Response body schema.
    pub response_schema: serde_json::Value,
}

impl EndpointSpec {
    /// Returns a short label like `GET /widgets/{id}` for logs.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}
