//! The Group-Membership Synchronization Engine: an
//! event-driven, queue-backed worker that keeps the derived `User.groups`
//! field consistent with `Group.members`, including transitive (nested)
//! group relationships, with bounded retry and cancellation-safe shutdown.
//!
//! * [`diff`] — [`diff::Diff`]/[`diff::compare`], the set-difference
//!   between two Group snapshots `services::group` diffs pre/post state
//!   with to decide which members to notify.
//! * [`queue`] — the [`queue::SyncQueue`] broker contract plus
//!   [`queue::InMemorySyncQueue`], the default in-process implementation.
//! * [`worker`] — [`worker::run`]/[`worker::process_message`], the
//!   message-driven state machine that consumes the queue.

pub mod diff;
pub mod queue;
pub mod worker;

pub use diff::{compare, Diff};
pub use queue::{GroupSyncMessage, InMemorySyncQueue, SyncQueue};
pub use worker::{process_message, run, Outcome};
