//! Error types for SCIM server operations.
//!
//! Every fallible operation in this crate returns a [`ScimError`]. Each variant
//! maps to exactly one SCIM error kind from RFC 7644 §3.12, which in turn maps
//! to an HTTP status and `scimType` token via [`ScimError::http_status`] and
//! [`ScimError::scim_type`]. Hosts building the HTTP surface use those two
//! accessors to produce the wire error body; this crate never serializes an
//! error itself beyond [`ScimErrorBody`].

use serde::{Deserialize, Serialize};

/// Main error type for SCIM server operations.
///
/// Variant names are chosen so that [`ScimError::scim_type`] is a direct
/// lowercase rendering of the variant, rather than needing a separate
/// mapping table to RFC 7644 §3.12's `scimType` vocabulary.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// The request body or query parameters are malformed.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of what makes the request invalid.
        message: String,
    },

    /// A SCIM filter or path expression failed to lex or parse.
    #[error("invalid filter '{expression}': {message}")]
    InvalidFilter {
        /// The filter or path expression that failed to compile.
        expression: String,
        /// Description of the compilation failure.
        message: String,
    },

    /// A query would return more results than `maxResults` permits.
    #[error("query would return {requested} results, exceeding maxResults of {max}")]
    TooMany {
        /// The number of results the query would return.
        requested: usize,
        /// The configured maximum.
        max: usize,
    },

    /// A `uniqueness` constraint (server or global) was violated.
    #[error("attribute '{path}' value is not unique")]
    Uniqueness {
        /// The dotted path of the attribute that violated uniqueness.
        path: String,
    },

    /// A mutation attempted to change an `immutable` or `readOnly` attribute.
    #[error("attribute '{path}' is immutable and cannot be changed")]
    Mutability {
        /// The dotted path of the offending attribute.
        path: String,
    },

    /// A scalar value did not match the lexical form its type requires.
    #[error("attribute '{path}' has invalid syntax: {message}")]
    InvalidSyntax {
        /// The dotted path of the offending attribute.
        path: String,
        /// Description of the syntax violation.
        message: String,
    },

    /// A path expression named an attribute the schema doesn't define.
    #[error("invalid path '{path}': {message}")]
    InvalidPath {
        /// The path expression that failed to resolve.
        path: String,
        /// Description of why the path is invalid.
        message: String,
    },

    /// A PATCH `remove` operation named a path with nothing to remove.
    #[error("no target for path '{path}'")]
    NoTarget {
        /// The path expression with no matching target.
        path: String,
    },

    /// A required attribute was unassigned, or a canonical-value constraint failed.
    #[error("invalid value for '{path}': {message}")]
    InvalidValue {
        /// The dotted path of the offending attribute.
        path: String,
        /// Description of the invalid value.
        message: String,
    },

    /// An `If-Match`/`If-None-Match` precondition failed to hold.
    #[error("precondition failed: expected version {expected:?}, found {actual}")]
    PreCondition {
        /// The version the caller asserted, if any.
        expected: Option<String>,
        /// The resource's actual current version.
        actual: String,
    },

    /// A value was rejected for carrying sensitive data in the wrong place.
    #[error("sensitive value rejected for '{path}'")]
    Sensitive {
        /// The dotted path of the offending attribute.
        path: String,
    },

    /// The requested resource does not exist.
    #[error("{resource_type} with id '{id}' not found")]
    NotFound {
        /// The SCIM resource type (e.g. "User").
        resource_type: String,
        /// The resource id that was not found.
        id: String,
    },

    /// A schema or resource type URN had no registered entry.
    #[error("schema not found: {schema_id}")]
    SchemaNotFound {
        /// The schema URN that was not registered.
        schema_id: String,
    },

    /// The underlying resource store (or broker) reported a failure.
    #[error("store error: {message}")]
    Store {
        /// Description of the underlying failure.
        message: String,
    },

    /// Anything else — programmer errors, invariant violations, I/O failures.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal failure.
        message: String,
    },
}

impl ScimError {
    /// Construct an [`ScimError::Internal`] from any display-able cause.
    pub fn internal(message: impl Into<String>) -> Self {
        ScimError::Internal {
            message: message.into(),
        }
    }

    /// Construct a [`ScimError::Store`] from any display-able cause.
    pub fn store(message: impl Into<String>) -> Self {
        ScimError::Store {
            message: message.into(),
        }
    }

    /// The HTTP status code a host's router should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ScimError::InvalidRequest { .. }
            | ScimError::InvalidFilter { .. }
            | ScimError::TooMany { .. }
            | ScimError::Mutability { .. }
            | ScimError::InvalidSyntax { .. }
            | ScimError::InvalidPath { .. }
            | ScimError::NoTarget { .. }
            | ScimError::InvalidValue { .. }
            | ScimError::Sensitive { .. } => 400,
            ScimError::Uniqueness { .. } => 409,
            ScimError::PreCondition { .. } => 412,
            ScimError::NotFound { .. } | ScimError::SchemaNotFound { .. } => 404,
            ScimError::Store { .. } | ScimError::Internal { .. } => 500,
        }
    }

    /// The SCIM `scimType` token for the error response body, when one applies.
    ///
    /// `notFound`, `preCondition`, and `internal` carry no `scimType` per
    /// RFC 7644 §3.12 — those map to `None`.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            ScimError::InvalidRequest { .. } => Some("invalidRequest"),
            ScimError::InvalidFilter { .. } => Some("invalidFilter"),
            ScimError::TooMany { .. } => Some("tooMany"),
            ScimError::Uniqueness { .. } => Some("uniqueness"),
            ScimError::Mutability { .. } => Some("mutability"),
            ScimError::InvalidSyntax { .. } => Some("invalidSyntax"),
            ScimError::InvalidPath { .. } => Some("invalidPath"),
            ScimError::NoTarget { .. } => Some("noTarget"),
            ScimError::InvalidValue { .. } => Some("invalidValue"),
            ScimError::Sensitive { .. } => Some("sensitive"),
            ScimError::PreCondition { .. }
            | ScimError::NotFound { .. }
            | ScimError::SchemaNotFound { .. }
            | ScimError::Store { .. }
            | ScimError::Internal { .. } => None,
        }
    }

    /// Render the RFC 7644 §3.12 error body for this error.
    pub fn to_body(&self) -> ScimErrorBody {
        ScimErrorBody {
            schemas: vec!["urn:ietf:params:scim:api:messages:2.0:Error".to_string()],
            status: self.http_status().to_string(),
            scim_type: self.scim_type().map(|s| s.to_string()),
            detail: self.to_string(),
        }
    }
}

impl From<serde_json::Error> for ScimError {
    fn from(err: serde_json::Error) -> Self {
        ScimError::InvalidRequest {
            message: err.to_string(),
        }
    }
}

/// Wire shape of a SCIM error response, per RFC 7644 §3.12.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScimErrorBody {
    /// Always `["urn:ietf:params:scim:api:messages:2.0:Error"]`.
    pub schemas: Vec<String>,
    /// HTTP status code, as a string, duplicated from the response line.
    pub status: String,
    /// SCIM error detail code, when one applies.
    #[serde(rename = "scimType", skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<String>,
    /// Human-readable error detail.
    pub detail: String,
}

/// Convenience alias used throughout the crate.
pub type ScimResult<T> = Result<T, ScimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniqueness_maps_to_409() {
        let err = ScimError::Uniqueness {
            path: "userName".into(),
        };
        assert_eq!(err.http_status(), 409);
        assert_eq!(err.scim_type(), Some("uniqueness"));
    }

    #[test]
    fn not_found_has_no_scim_type() {
        let err = ScimError::NotFound {
            resource_type: "User".into(),
            id: "abc".into(),
        };
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.scim_type(), None);
    }

    #[test]
    fn precondition_maps_to_412() {
        let err = ScimError::PreCondition {
            expected: Some("W/\"1\"".into()),
            actual: "W/\"2\"".into(),
        };
        assert_eq!(err.http_status(), 412);
    }

    #[test]
    fn body_serializes_without_scim_type_when_absent() {
        let err = ScimError::Internal {
            message: "boom".into(),
        };
        let body = err.to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("scimType").is_none());
    }
}
