//! Schema declarations for SCIM resources: [`Attribute`]/[`Schema`]/
//! [`ResourceType`], and the [`SchemaRegistry`] that resolves them.
//!
//! ## Organization
//!
//! - [`types`] — `Attribute`, `Schema`, `ResourceType`, and the enums
//!   (`AttributeType`, `Mutability`, `Returned`, `Uniqueness`) that describe
//!   them, plus the `@Annotation` keys the Property Tree's reactions key
//!   off of.
//! - [`path`] — URN-prefixed dotted path parsing, shared with the
//!   Filter/Path Compiler.
//! - [`registry`] — the `SchemaRegistry` itself.
//! - [`embedded`] — the bundled core `User`/`Group` schemas and the
//!   `EnterpriseUser` extension, so a server can start without external
//!   schema files.

pub mod embedded;
pub mod path;
pub mod registry;
pub mod types;

pub use registry::SchemaRegistry;
pub use types::{
    annotation, Attribute, AttributeType, Mutability, ResourceType, Returned, Schema,
    SchemaExtension, Uniqueness,
};
