//! The DB contract: a single-tenant resource store the
//! Filter Chain's `validate` stage and the Resource Services talk to.
//! Every call accepts a [`CancellationToken`] so a caller with a deadline
//! can abandon an in-flight query without the store needing to know why.
//!
//! Resources are keyed by `(resource_type, id)` rather than `scim-server`'s
//! multi-tenant `(tenant_id, resource_type, resource_id)` — this crate has
//! no tenancy concept; every deployment is single-tenant.

pub mod in_memory;

use crate::error::ScimResult;
use crate::filter::Expr;
use crate::resource::Resource;
use tokio_util::sync::CancellationToken;

pub use in_memory::InMemoryResourceStore;

/// Sort direction for [`QuerySpec::sort_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A query against one resource type's collection.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub filter: Option<Expr>,
    pub sort_by: Option<crate::filter::PathExpr>,
    pub sort_order: SortOrder,
    /// 1-based index of the first result to return, per RFC 7644 §3.4.2.4.
    pub start_index: usize,
    pub count: usize,
}

impl QuerySpec {
    pub fn new(start_index: usize, count: usize) -> Self {
        QuerySpec {
            filter: None,
            sort_by: None,
            sort_order: SortOrder::Ascending,
            start_index: start_index.max(1),
            count,
        }
    }
}

/// The page of resources a `Query` produced, plus the total match count
/// before pagination — the Resource Services layer needs `total_results`
/// to fill in the ListResponse envelope.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub resources: Vec<Resource>,
    pub total_results: usize,
}

/// The DB contract every Resource Service is generic over.
/// Modeled as native `async fn`s returning `impl Future` rather than
/// `#[async_trait]`, since nothing in this crate needs `dyn ResourceStore`
/// — every caller is generic over a concrete `S: ResourceStore`.
pub trait ResourceStore: Send + Sync {
    /// Insert a brand-new resource. The caller has already run the create
    /// chain (id assigned, meta stamped) before this is called.
    fn insert(
        &self,
        resource_type: &str,
        resource: Resource,
        cancel: &CancellationToken,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    /// Fetch one resource by id. `Ok(None)` means no such resource — callers
    /// translate that into [`crate::error::ScimError::NotFound`] themselves,
    /// since only they know the right `resource_type` label to report.
    fn get(
        &self,
        resource_type: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = ScimResult<Option<Resource>>> + Send;

    /// Replace the resource at `resource.id()`, optimistically: the current
    /// stored version must match `reference`'s version or this fails with
    /// [`crate::error::ScimError::PreCondition`]. `reference` is the tree the
    /// caller read just before running its chain, so a concurrent writer
    /// racing in between is detected rather than silently overwritten.
    fn replace(
        &self,
        resource_type: &str,
        reference: &Resource,
        resource: Resource,
        cancel: &CancellationToken,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    /// Remove a resource. Not an error if it's already gone — the caller
    /// (the Delete service) already did its own existence check.
    fn delete(
        &self,
        resource_type: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    /// Count resources of `resource_type` matching `filter` (`None` matches
    /// everything). Used by `validate`'s server-uniqueness check and by
    /// `Query` to fill in `totalResults`.
    fn count(
        &self,
        resource_type: &str,
        filter: Option<&Expr>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = ScimResult<usize>> + Send;

    /// Filter, sort, and paginate a resource type's collection.
    fn query(
        &self,
        resource_type: &str,
        spec: &QuerySpec,
        cancel: &CancellationToken,
    ) -> impl Future<Output = ScimResult<QueryResult>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_spec_clamps_start_index_to_one() {
        let spec = QuerySpec::new(0, 10);
        assert_eq!(spec.start_index, 1);
    }
}
