//! End-to-end coverage driven through the public service layer the way a
//! host binding the HTTP router would call it — as opposed to the unit
//! tests alongside each module, which exercise one stage in isolation.

use chrono::Utc;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use scim_server::codec::{self, Projection};
use scim_server::config::ServiceProviderConfig;
use scim_server::schema::SchemaRegistry;
use scim_server::services::{self, group, patch::PatchOpKind, patch::PatchOperation};
use scim_server::storage::{InMemoryResourceStore, QuerySpec, ResourceStore};
use scim_server::sync::{self, InMemorySyncQueue};
use scim_server::{Resource, ScimError, SyncQueue, Value};

fn token() -> CancellationToken {
    CancellationToken::new()
}

/// Creating a User with no `id` gets a generated UUID, `meta.location`,
/// a suppressed `password` in the response, and a `meta.version`.
#[tokio::test]
async fn create_user_literal_scenario() {
    let registry = SchemaRegistry::with_embedded_schemas().unwrap();
    let rt = registry.resource_type("User").unwrap().clone();
    let store = InMemoryResourceStore::new();
    let cfg = ServiceProviderConfig::default();

    let body = json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "userName": "imulab",
        "password": "pw",
    });
    let created = services::create(&body, &registry, &rt, &cfg, &store, Utc::now(), &token())
        .await
        .unwrap();

    let id = created.id().expect("generated id");
    assert!(uuid::Uuid::parse_str(&id).is_ok());
    assert!(created.version().is_some());

    let wire = codec::encode(&registry, &rt, &created, &Projection::none());
    let location = wire.pointer("/meta/location").and_then(|v| v.as_str()).unwrap();
    assert_eq!(location, format!("/Users/{id}"));
    assert!(wire.get("password").is_none(), "password is returned=never");
    assert!(wire.pointer("/meta/version").is_some());
}

/// A second create with the same `userName` is a 409 `uniqueness` conflict.
#[tokio::test]
async fn duplicate_username_is_uniqueness_conflict() {
    let registry = SchemaRegistry::with_embedded_schemas().unwrap();
    let rt = registry.resource_type("User").unwrap().clone();
    let store = InMemoryResourceStore::new();
    let cfg = ServiceProviderConfig::default();
    let body = json!({ "userName": "imulab" });

    services::create(&body, &registry, &rt, &cfg, &store, Utc::now(), &token()).await.unwrap();
    let err = services::create(&body, &registry, &rt, &cfg, &store, Utc::now(), &token())
        .await
        .unwrap_err();

    assert!(matches!(err, ScimError::Uniqueness { .. }));
    assert_eq!(err.http_status(), 409);
    assert_eq!(err.scim_type(), Some("uniqueness"));
}

/// Replace changing an `immutable` attribute is a `mutability` conflict.
/// Adapted to the one attribute the bundled schemas actually declare
/// `immutable` (`Group.members.value`/`$ref` — `User.id` is `readOnly`
/// and silently restored by `clearReadOnly` instead, so it can't surface
/// a `mutability` error through `Replace`).
#[tokio::test]
async fn replace_changing_an_immutable_reference_is_mutability_conflict() {
    let registry = SchemaRegistry::with_embedded_schemas().unwrap();
    let rt = registry.resource_type("Group").unwrap().clone();
    let store = InMemoryResourceStore::new();
    let cfg = ServiceProviderConfig::default();

    let body = json!({ "displayName": "Engineers", "members": [{"value": "u1", "$ref": "/Users/u1"}] });
    let created = services::create(&body, &registry, &rt, &cfg, &store, Utc::now(), &token())
        .await
        .unwrap();
    let id = created.id().unwrap();

    let changed_ref = json!({
        "displayName": "Engineers",
        "members": [{"value": "u1", "$ref": "/Users/other"}],
    });
    let err = services::replace("Group", &id, &changed_ref, None, &registry, &rt, &cfg, &store, Utc::now(), &token())
        .await
        .unwrap_err();

    assert!(matches!(err, ScimError::Mutability { .. }));
    assert_eq!(err.http_status(), 400);
    assert_eq!(err.scim_type(), Some("mutability"));
}

/// PATCH adding `u2` to `g1 {members:[u1]}`, carried all the way into the
/// worker: the Group wrapper publishes exactly one join message, and
/// draining it through the worker leaves `u2.groups` (not `u1.groups`,
/// which was already current) holding `g1`.
#[tokio::test]
async fn patch_add_member_drives_one_message_through_the_worker() {
    let registry = SchemaRegistry::with_embedded_schemas().unwrap();
    let user_rt = registry.resource_type("User").unwrap().clone();
    let group_rt = registry.resource_type("Group").unwrap().clone();
    let store = InMemoryResourceStore::new();
    let queue = InMemorySyncQueue::new();
    let cfg = ServiceProviderConfig::default();
    let cancel = token();

    for uid in ["u1", "u2"] {
        let mut user = Resource::empty(&registry, &user_rt).unwrap();
        user.set_id(uid).unwrap();
        user.dot_mut("userName").unwrap().set_simple(Value::String(uid.to_string())).unwrap();
        scim_server::chain::stamp_meta::run(&mut user, None, &user_rt, Utc::now());
        store.insert("User", user, &cancel).await.unwrap();
    }

    let body = json!({ "displayName": "Engineers", "members": [{"value": "u1"}] });
    let created = group::create_group(&body, &registry, &group_rt, &cfg, &store, &queue, Utc::now(), &cancel)
        .await
        .unwrap();
    let group_id = created.id().unwrap();
    queue.receive(&cancel).await.unwrap(); // drain the create-time join for u1

    let ops = vec![PatchOperation {
        op: PatchOpKind::Add,
        path: Some("members".to_string()),
        value: Some(json!({"value": "u2"})),
    }];
    let outcome = group::patch_group(
        "Group", &group_id, &ops, None, &registry, &group_rt, &cfg, &store, &queue, Utc::now(), &cancel,
    )
    .await
    .unwrap();
    assert!(outcome.patched);

    let message = queue.receive(&cancel).await.unwrap();
    assert_eq!(message.group_id, group_id);
    assert_eq!(message.member_id, "u2");
    sync::process_message(message, &store, &queue, &user_rt, &group_rt, 5, Utc::now(), &cancel)
        .await
        .unwrap();

    let u2 = store.get("User", "u2", &cancel).await.unwrap().unwrap();
    let groups = u2.dot("groups").unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups.at(0).unwrap().dot("value").and_then(|p| p.value()), Some(&Value::String(group_id)));

    let u1 = store.get("User", "u1", &cancel).await.unwrap().unwrap();
    assert!(u1.dot("groups").unwrap().is_empty(), "u1's membership was never re-synced by this message");
}

/// Query with a filter, sort, and a page window.
#[tokio::test]
async fn query_with_sort_and_page() {
    let registry = SchemaRegistry::with_embedded_schemas().unwrap();
    let rt = registry.resource_type("User").unwrap().clone();
    let store = InMemoryResourceStore::new();
    let cfg = ServiceProviderConfig::default();
    let cancel = token();

    for i in 0..10 {
        let mut user = Resource::empty(&registry, &rt).unwrap();
        user.set_id(format!("u{i}")).unwrap();
        user.dot_mut("userName").unwrap().set_simple(Value::String(format!("user{i:02}"))).unwrap();
        user.dot_mut("active").unwrap().set_simple(Value::Bool(true)).unwrap();
        store.insert("User", user, &cancel).await.unwrap();
    }

    let filter = scim_server::filter::compile("active eq true").unwrap();
    let sort_by = scim_server::filter::compile_path_only("userName").unwrap();
    let spec = QuerySpec {
        filter: Some(filter),
        sort_by: Some(sort_by),
        sort_order: Default::default(),
        start_index: 5,
        count: 2,
    };

    let result = services::query("User", &spec, &cfg, &store, &cancel).await.unwrap();
    assert_eq!(result.total_results, 10);
    assert_eq!(result.resources.len(), 2);

    let names: Vec<String> = result
        .resources
        .iter()
        .map(|r| match r.dot("userName").and_then(|p| p.value()) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        })
        .collect();
    // 1-based start_index=5 into a 10-element ascending sort is "user04","user05".
    assert_eq!(names, vec!["user04".to_string(), "user05".to_string()]);
}
