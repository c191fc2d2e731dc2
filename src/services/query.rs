//! `Query` (RFC 7644 §3.4.2/§3.4.3): count first so an
//! over-broad filter is rejected with `TooMany` before the store does the
//! work of actually paging it.

use crate::config::ServiceProviderConfig;
use crate::error::ScimResult;
use crate::storage::{QueryResult, QuerySpec, ResourceStore};
use tokio_util::sync::CancellationToken;

pub async fn query<S: ResourceStore>(
    resource_type: &str,
    spec: &QuerySpec,
    cfg: &ServiceProviderConfig,
    store: &S,
    cancel: &CancellationToken,
) -> ScimResult<QueryResult> {
    let total = store.count(resource_type, spec.filter.as_ref(), cancel).await?;
    if cfg.filter.max_results > 0 && total > cfg.filter.max_results {
        return Err(crate::error::ScimError::TooMany {
            requested: total,
            max: cfg.filter.max_results,
        });
    }
    store.query(resource_type, spec, cancel).await
}
