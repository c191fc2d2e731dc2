//! The `/Health` contract: 200 when the DB and broker are both reachable,
//! else 500. A trivial check, but the host still needs something to call —
//! this module supplies it against the two abstractions this crate owns
//! (`ResourceStore`, `SyncQueue`); TLS/auth and the HTTP response mapping
//! stay with the host.

use tokio_util::sync::CancellationToken;

use crate::storage::ResourceStore;
use crate::sync::SyncQueue;

/// Ping the store with a cheap, side-effect-free call. Any resource type
/// name works since a `count` against an empty/unknown bucket is `Ok(0)`,
/// not an error — only a genuinely unreachable backend fails this.
pub async fn store_reachable<S: ResourceStore>(store: &S, cancel: &CancellationToken) -> bool {
    store.count("User", None, cancel).await.is_ok()
}

/// Ping the broker via [`SyncQueue::is_connected`] — side-effect-free,
/// unlike `publish`/`receive`.
pub async fn broker_reachable<Q: SyncQueue>(queue: &Q) -> bool {
    queue.is_connected().await
}

/// Both checks together, the shape `GET /Health` needs: `true` means 200,
/// `false` means 500.
pub async fn healthy<S: ResourceStore, Q: SyncQueue>(store: &S, queue: &Q, cancel: &CancellationToken) -> bool {
    store_reachable(store, cancel).await && broker_reachable(queue).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryResourceStore;
    use crate::sync::InMemorySyncQueue;

    #[tokio::test]
    async fn in_memory_backends_are_always_reachable() {
        let store = InMemoryResourceStore::new();
        let queue = InMemorySyncQueue::new();
        assert!(healthy(&store, &queue, &CancellationToken::new()).await);
    }
}
