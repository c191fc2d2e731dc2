//! The Property Tree and the [`Resource`] it's rooted at.
//!
//! # Module organization
//!
//! * [`value`] — the scalar [`Value`] variants a `Property::Simple` holds.
//! * [`event`] — [`Event`]/[`Reaction`], the vocabulary a property's
//!   annotation-driven reactions (`@ExclusivePrimary`, `@AutoCompact`,
//!   `@StateSummary`, `@SyncSchema`) use to describe a follow-up without
//!   mutating the tree mid-dispatch.
//! * [`property`] — [`Property`] itself: navigation, mutation, hashing,
//!   comparators, and the concrete `@ExclusivePrimary`/`@AutoCompact`/
//!   `@StateSummary` reactions.
//! * [`resource`] — [`Resource`], the rooted tree plus `schemas`/`meta`
//!   scaffolding and the `@SyncSchema` reaction.

pub mod event;
pub mod property;
pub mod resource;
pub mod value;

pub use event::{Event, EventKind, Reaction};
pub use property::{Node, Property};
pub use resource::Resource;
pub use value::Value;
