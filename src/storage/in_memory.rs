//! An in-memory [`ResourceStore`] backed by a `RwLock<HashMap<..>>`,
//! grounded on `scim-server`'s `storage::in_memory::InMemoryStorage` (same
//! `tokio::sync::RwLock`-guarded-`HashMap` shape), simplified off its
//! multi-tenant key. Intended for tests and for running end-to-end
//! scenarios without a real database.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::{QueryResult, QuerySpec, ResourceStore, SortOrder};
use crate::error::{ScimError, ScimResult};
use crate::filter::{evaluate, extract_sort_key, Expr};
use crate::resource::Resource;

#[derive(Default)]
pub struct InMemoryResourceStore {
    // resource_type -> id -> resource
    data: Arc<RwLock<HashMap<String, HashMap<String, Resource>>>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        InMemoryResourceStore {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn matches(resource: &Resource, filter: Option<&Expr>) -> bool {
        match filter {
            None => true,
            Some(expr) => evaluate(expr, resource.root()).unwrap_or(false),
        }
    }
}

impl ResourceStore for InMemoryResourceStore {
    async fn insert(
        &self,
        resource_type: &str,
        resource: Resource,
        _cancel: &CancellationToken,
    ) -> ScimResult<()> {
        let id = resource
            .id()
            .ok_or_else(|| ScimError::internal("cannot insert a resource with no id"))?;
        let mut guard = self.data.write().await;
        guard.entry(resource_type.to_string()).or_default().insert(id, resource);
        Ok(())
    }

    async fn get(
        &self,
        resource_type: &str,
        id: &str,
        _cancel: &CancellationToken,
    ) -> ScimResult<Option<Resource>> {
        let guard = self.data.read().await;
        Ok(guard.get(resource_type).and_then(|m| m.get(id)).cloned())
    }

    async fn replace(
        &self,
        resource_type: &str,
        reference: &Resource,
        resource: Resource,
        _cancel: &CancellationToken,
    ) -> ScimResult<()> {
        let id = resource
            .id()
            .ok_or_else(|| ScimError::internal("cannot replace a resource with no id"))?;
        let mut guard = self.data.write().await;
        let bucket = guard.entry(resource_type.to_string()).or_default();
        let current = bucket.get(&id).ok_or_else(|| ScimError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.clone(),
        })?;
        if current.version() != reference.version() {
            return Err(ScimError::PreCondition {
                expected: reference.version(),
                actual: current.version().unwrap_or_default(),
            });
        }
        bucket.insert(id, resource);
        Ok(())
    }

    async fn delete(
        &self,
        resource_type: &str,
        id: &str,
        _cancel: &CancellationToken,
    ) -> ScimResult<()> {
        let mut guard = self.data.write().await;
        if let Some(bucket) = guard.get_mut(resource_type) {
            bucket.remove(id);
        }
        Ok(())
    }

    async fn count(
        &self,
        resource_type: &str,
        filter: Option<&Expr>,
        _cancel: &CancellationToken,
    ) -> ScimResult<usize> {
        let guard = self.data.read().await;
        let count = guard
            .get(resource_type)
            .map(|m| m.values().filter(|r| Self::matches(r, filter)).count())
            .unwrap_or(0);
        Ok(count)
    }

    async fn query(
        &self,
        resource_type: &str,
        spec: &QuerySpec,
        _cancel: &CancellationToken,
    ) -> ScimResult<QueryResult> {
        let guard = self.data.read().await;
        let mut candidates: Vec<Resource> = guard
            .get(resource_type)
            .map(|m| m.values().filter(|r| Self::matches(r, spec.filter.as_ref())).cloned().collect())
            .unwrap_or_default();

        if let Some(path) = &spec.sort_by {
            candidates.sort_by(|a, b| {
                let ka = extract_sort_key(a.root(), path);
                let kb = extract_sort_key(b.root(), path);
                match (ka, kb) {
                    (Some(a), Some(b)) => a.partial_compare(&b, false).unwrap_or(std::cmp::Ordering::Equal),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            });
            if spec.sort_order == SortOrder::Descending {
                candidates.reverse();
            }
        }

        let total_results = candidates.len();
        // `startIndex` is 1-based (RFC 7644 §3.4.2.4); clamp the upper bound
        // to `candidates.len()` rather than erroring on an out-of-range page.
        let lb = (spec.start_index.max(1) - 1).min(candidates.len());
        let ub = (lb + spec.count).min(candidates.len());
        let resources = candidates[lb..ub].to_vec();

        Ok(QueryResult { resources, total_results })
    }
}
