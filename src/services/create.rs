//! `Create`: decode the wire body, run the create chain,
//! persist. Grounded on `scim-server`'s `resourcedb` create handler,
//! generalized from its HTTP-bound signature to a bare `Resource` in and
//! `Resource` out.

use crate::chain;
use crate::codec;
use crate::config::ServiceProviderConfig;
use crate::error::ScimResult;
use crate::resource::Resource;
use crate::schema::{ResourceType, SchemaRegistry};
use crate::storage::ResourceStore;
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;

pub async fn create<S: ResourceStore>(
    body: &Json,
    registry: &SchemaRegistry,
    rt: &ResourceType,
    cfg: &ServiceProviderConfig,
    store: &S,
    now: chrono::DateTime<chrono::Utc>,
    cancel: &CancellationToken,
) -> ScimResult<Resource> {
    let mut payload = codec::decode(registry, rt, body)?;
    chain::create_chain(&mut payload, registry, rt, store, cfg.bcrypt_cost, now, cancel).await?;
    store.insert(&rt.name, payload.clone(), cancel).await?;
    Ok(payload)
}
