//! The Filter Chain: an ordered sequence of stages the
//! Resource Services run a payload through before it reaches the DB.
//! Grounded on `scim-server`'s `providers/helpers/{metadata,validation,patch,
//! conditional}.rs` stage-per-concern style, with this ordering per
//! operation:
//!
//! * Create:  `clearReadOnly -> assignUuid -> bcryptPassword -> stampMeta -> validate`
//! * Replace: `clearReadOnly -> bcryptPassword -> validate -> stampMeta`
//! * Patch (post-apply): `clearReadOnly -> bcryptPassword -> validate -> stampMeta`
//! * Delete: no chain; the Delete service calls the DB directly.

pub mod assign_uuid;
pub mod bcrypt_password;
pub mod clear_read_only;
pub mod stamp_meta;
pub mod validate;

use crate::error::ScimResult;
use crate::resource::Resource;
use crate::schema::{ResourceType, SchemaRegistry};
use crate::storage::ResourceStore;
use tokio_util::sync::CancellationToken;

/// Run the Create chain against a brand-new payload. `payload` has already
/// been decoded by the Codec; there is no `reference` since nothing exists
/// yet.
pub async fn create_chain<S: ResourceStore>(
    payload: &mut Resource,
    registry: &SchemaRegistry,
    rt: &ResourceType,
    store: &S,
    bcrypt_cost: u32,
    now: chrono::DateTime<chrono::Utc>,
    cancel: &CancellationToken,
) -> ScimResult<()> {
    clear_read_only::run(payload, None);
    assign_uuid::run(payload);
    bcrypt_password::run(payload, rt, bcrypt_cost)?;
    stamp_meta::run(payload, None, rt, now);
    payload.sync_schemas(rt);
    validate::run(payload, None, registry, rt, store, cancel).await?;
    Ok(())
}

/// Run the Replace chain: `payload` is the caller's full replacement body,
/// `reference` is the resource as it was read from the DB just before this
/// call (so `clearReadOnly` can restore server-owned fields and `validate`
/// can enforce `immutable`).
pub async fn replace_chain<S: ResourceStore>(
    payload: &mut Resource,
    reference: &Resource,
    registry: &SchemaRegistry,
    rt: &ResourceType,
    store: &S,
    bcrypt_cost: u32,
    now: chrono::DateTime<chrono::Utc>,
    cancel: &CancellationToken,
) -> ScimResult<()> {
    clear_read_only::run(payload, Some(reference));
    bcrypt_password::run(payload, rt, bcrypt_cost)?;
    payload.sync_schemas(rt);
    validate::run(payload, Some(reference), registry, rt, store, cancel).await?;
    stamp_meta::run(payload, Some(reference), rt, now);
    Ok(())
}

/// Run the post-apply Patch chain: `payload` is `reference` cloned and
/// mutated by the PATCH operations, same stage order as Replace.
pub async fn patch_post_chain<S: ResourceStore>(
    payload: &mut Resource,
    reference: &Resource,
    registry: &SchemaRegistry,
    rt: &ResourceType,
    store: &S,
    bcrypt_cost: u32,
    now: chrono::DateTime<chrono::Utc>,
    cancel: &CancellationToken,
) -> ScimResult<()> {
    replace_chain(payload, reference, registry, rt, store, bcrypt_cost, now, cancel).await
}
