//! Group wrappers: the same
//! Create/Replace/Patch/Delete orchestrators, with an added step after a
//! successful mutation that diffs pre/post Group state
//! ([`crate::sync::diff::compare`]) and submits one
//! [`crate::sync::GroupSyncMessage`] per joined or left member to a
//! [`crate::sync::SyncQueue`] — the entry point into the group-sync engine.
//!
//! These are thin wrappers, not a reimplementation: each delegates to the
//! plain service ([`super::create`], [`super::replace`], [`super::patch`],
//! [`super::delete`]) and only adds the diff-and-publish step, so the
//! Create/Replace/Patch/Delete contracts (readonly clearing, uniqueness,
//! optimistic concurrency, ...) stay in exactly one place.

use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;

use crate::config::ServiceProviderConfig;
use crate::error::ScimResult;
use crate::resource::Resource;
use crate::schema::{ResourceType, SchemaRegistry};
use crate::storage::ResourceStore;
use crate::sync::{self, GroupSyncMessage, SyncQueue};

use super::patch::PatchOperation;
use super::{create, delete, patch, replace, PatchOutcome, ReplaceOutcome};

/// Create a Group, then publish a sync message for every member the new
/// Group carries (`diff::compare(None, Some(created))` is all-joins).
pub async fn create_group<S: ResourceStore, Q: SyncQueue>(
    body: &Json,
    registry: &SchemaRegistry,
    rt: &ResourceType,
    cfg: &ServiceProviderConfig,
    store: &S,
    queue: &Q,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> ScimResult<Resource> {
    let created = create::create(body, registry, rt, cfg, store, now, cancel).await?;
    publish_diff(&created.id().unwrap_or_default(), &sync::compare(None, Some(&created)), queue).await?;
    Ok(created)
}

/// Replace a Group, diffing against the resource as it stood just before
/// the write. No messages are published when `stampMeta` found nothing to
/// change (`outcome.replaced == false`), since nothing could have joined
/// or left.
#[allow(clippy::too_many_arguments)]
pub async fn replace_group<S: ResourceStore, Q: SyncQueue>(
    resource_type: &str,
    id: &str,
    body: &Json,
    if_match: Option<&str>,
    registry: &SchemaRegistry,
    rt: &ResourceType,
    cfg: &ServiceProviderConfig,
    store: &S,
    queue: &Q,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> ScimResult<ReplaceOutcome> {
    let prior = store.get(resource_type, id, cancel).await?;
    let outcome = replace::replace(resource_type, id, body, if_match, registry, rt, cfg, store, now, cancel).await?;
    if outcome.replaced {
        publish_diff(id, &sync::compare(prior.as_ref(), Some(&outcome.resource)), queue).await?;
    }
    Ok(outcome)
}

/// Patch a Group, same pre/post diffing as [`replace_group`].
#[allow(clippy::too_many_arguments)]
pub async fn patch_group<S: ResourceStore, Q: SyncQueue>(
    resource_type: &str,
    id: &str,
    operations: &[PatchOperation],
    if_match: Option<&str>,
    registry: &SchemaRegistry,
    rt: &ResourceType,
    cfg: &ServiceProviderConfig,
    store: &S,
    queue: &Q,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> ScimResult<PatchOutcome> {
    let prior = store.get(resource_type, id, cancel).await?;
    let outcome = patch::patch(resource_type, id, operations, if_match, registry, rt, cfg, store, now, cancel).await?;
    if outcome.patched {
        publish_diff(id, &sync::compare(prior.as_ref(), Some(&outcome.resource)), queue).await?;
    }
    Ok(outcome)
}

/// Delete a Group: every member it carried just before deletion has left
/// (`diff::compare(Some(deleted), None)` is all-leaves).
pub async fn delete_group<S: ResourceStore, Q: SyncQueue>(
    resource_type: &str,
    id: &str,
    if_match: Option<&str>,
    cfg: &ServiceProviderConfig,
    store: &S,
    queue: &Q,
    cancel: &CancellationToken,
) -> ScimResult<Resource> {
    let deleted = delete::delete(resource_type, id, if_match, cfg, store, cancel).await?;
    publish_diff(id, &sync::compare(Some(&deleted), None), queue).await?;
    Ok(deleted)
}

async fn publish_diff<Q: SyncQueue>(group_id: &str, diff: &sync::Diff, queue: &Q) -> ScimResult<()> {
    for member in diff.affected() {
        queue.publish(GroupSyncMessage::new(group_id.to_string(), member.clone())).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryResourceStore;
    use crate::sync::InMemorySyncQueue;
    use serde_json::json;

    #[tokio::test]
    async fn create_group_publishes_one_message_per_member() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("Group").unwrap().clone();
        let store = InMemoryResourceStore::new();
        let queue = InMemorySyncQueue::new();
        let cfg = ServiceProviderConfig::default();

        let body = json!({ "displayName": "Engineers", "members": [{"value": "u1"}, {"value": "u2"}] });
        let created = create_group(&body, &registry, &rt, &cfg, &store, &queue, Utc::now(), &CancellationToken::new())
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let mut members = vec![
            queue.receive(&cancel).await.unwrap().member_id,
            queue.receive(&cancel).await.unwrap().member_id,
        ];
        members.sort();
        assert_eq!(members, vec!["u1".to_string(), "u2".to_string()]);
        assert!(created.id().is_some());
    }

    #[tokio::test]
    async fn patch_add_member_publishes_only_the_joined_member() {
        // Patching a member list from {u1} to {u1, u2} only u2 joined, so
        // exactly one sync message should be published.
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("Group").unwrap().clone();
        let store = InMemoryResourceStore::new();
        let queue = InMemorySyncQueue::new();
        let cfg = ServiceProviderConfig::default();

        let body = json!({ "displayName": "Engineers", "members": [{"value": "u1"}] });
        let created = create_group(&body, &registry, &rt, &cfg, &store, &queue, Utc::now(), &CancellationToken::new())
            .await
            .unwrap();
        let id = created.id().unwrap();
        let cancel = CancellationToken::new();
        queue.receive(&cancel).await.unwrap(); // drain the create-time message for u1

        let ops = vec![PatchOperation {
            op: patch::PatchOpKind::Add,
            path: Some("members".to_string()),
            value: Some(json!({"value": "u2"})),
        }];
        let outcome = patch_group("Group", &id, &ops, None, &registry, &rt, &cfg, &store, &queue, Utc::now(), &cancel)
            .await
            .unwrap();
        assert!(outcome.patched);

        let msg = queue.receive(&cancel).await.unwrap();
        assert_eq!(msg.member_id, "u2");
        assert_eq!(msg.group_id, id);
    }

    #[tokio::test]
    async fn delete_group_publishes_a_leave_for_every_member() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("Group").unwrap().clone();
        let store = InMemoryResourceStore::new();
        let queue = InMemorySyncQueue::new();
        let cfg = ServiceProviderConfig::default();

        let body = json!({ "displayName": "Engineers", "members": [{"value": "u1"}] });
        let created = create_group(&body, &registry, &rt, &cfg, &store, &queue, Utc::now(), &CancellationToken::new())
            .await
            .unwrap();
        let id = created.id().unwrap();
        let cancel = CancellationToken::new();
        queue.receive(&cancel).await.unwrap(); // drain the create-time message

        delete_group("Group", &id, None, &cfg, &store, &queue, &cancel).await.unwrap();
        let msg = queue.receive(&cancel).await.unwrap();
        assert_eq!(msg.member_id, "u1");
    }
}
