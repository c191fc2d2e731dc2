//! `Get`: fetch one resource by id, translating a missing
//! row into [`ScimError::NotFound`] — the only job the store's `Ok(None)`
//! can't do itself, since only the caller knows which resource type label
//! belongs in the error.

use crate::error::{ScimError, ScimResult};
use crate::resource::Resource;
use crate::storage::ResourceStore;
use tokio_util::sync::CancellationToken;

pub async fn get<S: ResourceStore>(
    resource_type: &str,
    id: &str,
    store: &S,
    cancel: &CancellationToken,
) -> ScimResult<Resource> {
    store
        .get(resource_type, id, cancel)
        .await?
        .ok_or_else(|| ScimError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Value;
    use crate::schema::SchemaRegistry;
    use crate::storage::InMemoryResourceStore;

    #[tokio::test]
    async fn fetches_an_existing_resource() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap();
        let store = InMemoryResourceStore::new();
        let mut res = Resource::empty(&registry, rt).unwrap();
        res.set_id("u1").unwrap();
        res.dot_mut("userName").unwrap().set_simple(Value::String("bjensen".into())).unwrap();
        store.insert("User", res, &CancellationToken::new()).await.unwrap();

        let fetched = get("User", "u1", &store, &CancellationToken::new()).await.unwrap();
        assert_eq!(fetched.id(), Some("u1".to_string()));
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let store = InMemoryResourceStore::new();
        let err = get("User", "missing", &store, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ScimError::NotFound { .. }));
    }
}
