//! A SCIM 2.0 (RFC 7643/7644) identity-management server core.
//!
//! This crate implements the three subsystems that carry the hard
//! engineering of a SCIM server:
//!
//! 1. The [`resource`] module — a reflective, schema-driven Property Tree
//!    that enforces SCIM's typing, mutability, uniqueness, and identity
//!    rules, and reacts to changes via annotation-wired subscribers.
//! 2. The [`chain`] module — the ordered per-resource filter chain
//!    ([`chain::create_chain`], [`chain::replace_chain`],
//!    [`chain::patch_post_chain`]) that runs around each mutation.
//! 3. The [`sync`] module — the group-membership synchronization engine
//!    that keeps `User.groups` consistent with `Group.members`, including
//!    transitive nested-group expansion.
//!
//! Supporting modules: [`schema`] (the Schema Registry), [`filter`] (the
//! SCIM filter/path compiler and evaluator), [`codec`] (schema-directed
//! JSON serialization), [`storage`] (the `DB` contract plus an in-memory
//! implementation), [`services`] (Create/Replace/Patch/Delete/Get/Query
//! orchestrators), [`config`] ([`config::ServiceProviderConfig`]), and
//! [`health`] (the `GET /Health` contract).
//!
//! The HTTP router binding, CLI/flag parsing, logging sink configuration,
//! and concrete MongoDB/AMQP backends are out of scope — this crate supplies
//! the traits and in-memory implementations a host wires those up against.

pub mod chain;
pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod health;
pub mod resource;
pub mod schema;
pub mod services;
pub mod storage;
pub mod sync;

pub use config::ServiceProviderConfig;
pub use error::{ScimError, ScimResult};
pub use resource::{Property, Resource, Value};
pub use schema::{Attribute, ResourceType, Schema, SchemaRegistry};
pub use storage::{InMemoryResourceStore, ResourceStore};
pub use sync::{Diff, GroupSyncMessage, InMemorySyncQueue, SyncQueue};
