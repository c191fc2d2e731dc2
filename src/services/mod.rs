//! Resource Services: the Create/Replace/Patch/Delete/Get/
//! Query orchestrators that sit between the wire layer (out of scope) and
//! the Filter Chain + DB contract.
//! Grounded on `scim-server`'s `providers` request-handling layer,
//! generalized away from its HTTP-bound `actix_web::web::Json` extractors
//! since the HTTP router binding itself is out of scope.
//!
//! Every service is generic over `S: ResourceStore` and takes a
//! [`CancellationToken`] through to the store, so a caller with a deadline
//! can cancel a long-running operation.

pub mod create;
pub mod delete;
pub mod get;
pub mod group;
pub mod patch;
pub mod query;
pub mod replace;

pub use create::create;
pub use delete::delete;
pub use get::get;
pub use group::{create_group, delete_group, patch_group, replace_group};
pub use patch::{patch, PatchOperation, PatchOpKind};
pub use query::query;
pub use replace::replace;

use crate::config::ServiceProviderConfig;
use crate::error::{ScimError, ScimResult};
use crate::resource::Resource;

/// The outcome of a Replace: `replaced=false` means the
/// payload's meta stamper found no change against `reference` and nothing
/// was written, so the host should answer `204`; `replaced=true` means
/// `DB.Replace` ran and the host should answer `200` with `resource`.
#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    pub replaced: bool,
    pub resource: Resource,
}

/// The outcome of a Patch, same status-code convention as
/// [`ReplaceOutcome`].
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub patched: bool,
    pub resource: Resource,
}

/// Check an `If-Match` precondition against `reference`'s current version,
/// when etags are supported and the caller supplied one. A mismatch fails
/// the request with [`ScimError::PreCondition`]; when etags aren't
/// supported or the caller didn't supply `If-Match`, there's nothing to
/// check and the service proceeds unconditionally.
pub(crate) fn check_precondition(
    cfg: &ServiceProviderConfig,
    if_match: Option<&str>,
    reference: &Resource,
) -> ScimResult<()> {
    if !cfg.etag.supported {
        return Ok(());
    }
    let Some(expected) = if_match else { return Ok(()) };
    let actual = reference.version().unwrap_or_default();
    if expected != actual {
        return Err(ScimError::PreCondition {
            expected: Some(expected.to_string()),
            actual,
        });
    }
    Ok(())
}
