//! `Delete`: fetch-check-remove, returning the deleted
//! resource so a caller wrapping this in the Group sync hook
//! (`services::group`) has the pre-deletion membership to diff against.

use crate::config::ServiceProviderConfig;
use crate::error::{ScimError, ScimResult};
use crate::resource::Resource;
use crate::storage::ResourceStore;
use tokio_util::sync::CancellationToken;

use super::check_precondition;

pub async fn delete<S: ResourceStore>(
    resource_type: &str,
    id: &str,
    if_match: Option<&str>,
    cfg: &ServiceProviderConfig,
    store: &S,
    cancel: &CancellationToken,
) -> ScimResult<Resource> {
    let reference = store
        .get(resource_type, id, cancel)
        .await?
        .ok_or_else(|| ScimError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        })?;
    check_precondition(cfg, if_match, &reference)?;
    store.delete(resource_type, id, cancel).await?;
    Ok(reference)
}
