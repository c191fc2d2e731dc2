//! `Replace` (RFC 7644 §3.5.1): fetch-check-decode-chain-
//! write-if-changed. A Replace whose body is identical to the stored
//! resource short-circuits to `replaced: false` (the chain's `stampMeta`
//! stage found nothing to rotate) rather than writing an unchanged copy
//! and bumping the version for no reason.

use crate::chain;
use crate::codec;
use crate::config::ServiceProviderConfig;
use crate::error::{ScimError, ScimResult};
use crate::schema::{ResourceType, SchemaRegistry};
use crate::storage::ResourceStore;
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;

use super::{check_precondition, ReplaceOutcome};

#[allow(clippy::too_many_arguments)]
pub async fn replace<S: ResourceStore>(
    resource_type: &str,
    id: &str,
    body: &Json,
    if_match: Option<&str>,
    registry: &SchemaRegistry,
    rt: &ResourceType,
    cfg: &ServiceProviderConfig,
    store: &S,
    now: chrono::DateTime<chrono::Utc>,
    cancel: &CancellationToken,
) -> ScimResult<ReplaceOutcome> {
    let reference = store
        .get(resource_type, id, cancel)
        .await?
        .ok_or_else(|| ScimError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        })?;
    check_precondition(cfg, if_match, &reference)?;

    let mut payload = codec::decode(registry, rt, body)?;
    chain::replace_chain(&mut payload, &reference, registry, rt, store, cfg.bcrypt_cost, now, cancel).await?;

    if payload.version() == reference.version() {
        return Ok(ReplaceOutcome { replaced: false, resource: reference });
    }
    store.replace(resource_type, &reference, payload.clone(), cancel).await?;
    Ok(ReplaceOutcome { replaced: true, resource: payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Value;
    use crate::storage::InMemoryResourceStore;
    use serde_json::json;

    async fn seed(store: &InMemoryResourceStore, registry: &SchemaRegistry, rt: &ResourceType) -> String {
        let mut res = crate::resource::Resource::empty(registry, rt).unwrap();
        res.set_id("u1").unwrap();
        res.dot_mut("userName").unwrap().set_simple(Value::String("bjensen".into())).unwrap();
        crate::chain::stamp_meta::run(&mut res, None, rt, chrono::Utc::now());
        store.insert("User", res, &CancellationToken::new()).await.unwrap();
        "u1".to_string()
    }

    #[tokio::test]
    async fn replace_changes_and_rotates_version() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap().clone();
        let store = InMemoryResourceStore::new();
        let cfg = ServiceProviderConfig::default();
        let id = seed(&store, &registry, &rt).await;
        let original = store.get("User", &id, &CancellationToken::new()).await.unwrap().unwrap();

        let body = json!({ "userName": "bjensen", "displayName": "Babs" });
        let outcome = replace("User", &id, &body, None, &registry, &rt, &cfg, &store, chrono::Utc::now(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.replaced);
        assert_ne!(outcome.resource.version(), original.version());
    }

    #[tokio::test]
    async fn replace_with_identical_body_does_not_write() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap().clone();
        let store = InMemoryResourceStore::new();
        let cfg = ServiceProviderConfig::default();
        let id = seed(&store, &registry, &rt).await;
        let original = store.get("User", &id, &CancellationToken::new()).await.unwrap().unwrap();

        let body = json!({ "userName": "bjensen" });
        let outcome = replace("User", &id, &body, None, &registry, &rt, &cfg, &store, chrono::Utc::now(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.replaced);
        assert_eq!(outcome.resource.version(), original.version());
    }

    #[tokio::test]
    async fn mismatched_if_match_is_precondition_failure() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap().clone();
        let store = InMemoryResourceStore::new();
        let cfg = ServiceProviderConfig::default();
        let id = seed(&store, &registry, &rt).await;

        let body = json!({ "userName": "bjensen" });
        let err = replace("User", &id, &body, Some("W/\"bogus\""), &registry, &rt, &cfg, &store, chrono::Utc::now(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScimError::PreCondition { .. }));
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap().clone();
        let store = InMemoryResourceStore::new();
        let cfg = ServiceProviderConfig::default();
        let body = json!({ "userName": "bjensen" });
        let err = replace("User", "missing", &body, None, &registry, &rt, &cfg, &store, chrono::Utc::now(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScimError::NotFound { .. }));
    }
}
