//! [`ServiceProviderConfig`] (RFC 7643 §5): the static,
//! server-wide capability document a host serves from
//! `GET /ServiceProviderConfig`. Modeled as a plain struct rather than a
//! Property Tree resource — it is immutable and
//! never goes through the filter chain, grounded on `scim-server`'s
//! `server::ServiceProviderConfig`.

use serde::{Deserialize, Serialize};

/// One `supported` flag, the shape RFC 7643 §5 repeats for every optional
/// capability (`patch`, `bulk`, `filter`, `changePassword`, `sort`, `etag`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Supported {
    pub supported: bool,
}

impl Supported {
    pub const fn yes() -> Self {
        Supported { supported: true }
    }

    pub const fn no() -> Self {
        Supported { supported: false }
    }
}

/// `bulk`'s extra capacity limits, present even when `supported: false`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkConfig {
    pub supported: bool,
    pub max_operations: usize,
    pub max_payload_size: usize,
}

/// `filter`'s extra `maxResults` cap — this is also the limit the Query
/// service enforces via [`crate::error::ScimError::TooMany`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    pub supported: bool,
    pub max_results: usize,
}

/// The `/ServiceProviderConfig` document (RFC 7643 §5): what a client can
/// rely on this server supporting. `/Bulk` is out of scope for this
/// server, so [`ServiceProviderConfig::default`] reports it
/// unsupported with zero capacity rather than omitting the section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderConfig {
    pub schemas: Vec<String>,
    #[serde(default)]
    pub documentation_uri: Option<String>,
    pub patch: Supported,
    pub bulk: BulkConfig,
    pub filter: FilterConfig,
    pub change_password: Supported,
    pub sort: Supported,
    pub etag: Supported,
    /// bcrypt cost factor the `bcryptPassword` chain stage uses.
    /// Not part of RFC 7643 §5's document shape; carried
    /// here because this struct is the natural place a host constructs
    /// once and threads through to the chain.
    #[serde(skip)]
    pub bcrypt_cost: u32,
    /// `trialLimit` the group-sync worker enforces,
    /// `0` meaning unlimited.
    #[serde(skip)]
    pub sync_trial_limit: u32,
}

impl Default for ServiceProviderConfig {
    fn default() -> Self {
        ServiceProviderConfig {
            schemas: vec!["urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig".to_string()],
            documentation_uri: None,
            patch: Supported::yes(),
            bulk: BulkConfig {
                supported: false,
                max_operations: 0,
                max_payload_size: 0,
            },
            filter: FilterConfig {
                supported: true,
                max_results: 200,
            },
            change_password: Supported::yes(),
            sort: Supported::yes(),
            etag: Supported::yes(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            sync_trial_limit: 5,
        }
    }
}

impl ServiceProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `ServiceProviderConfig` from its RFC 7643 §5 JSON document.
    /// `bcryptCost`/`syncTrialLimit` aren't part of the wire document (both
    /// are `#[serde(skip)]`), so a host that needs non-default values sets
    /// them on the parsed struct directly.
    pub fn from_json(json: &serde_json::Value) -> crate::error::ScimResult<Self> {
        let mut cfg: ServiceProviderConfig = serde_json::from_value(json.clone())?;
        cfg.bcrypt_cost = bcrypt::DEFAULT_COST;
        cfg.sync_trial_limit = 5;
        Ok(cfg)
    }
}
