//! Schema registry: holds parsed [`Schema`]s and [`ResourceType`]s, and
//! resolves attribute paths and URNs.
//!
//! Population (`register_schema`, `register_resource_type`) happens once at
//! startup and is single-threaded; after that the registry is read-mostly
//! and safe to share behind an `Arc` across concurrently handled requests —
//! no interior mutability, no locks needed for lookups.

use super::embedded;
use super::path::AttrPath;
use super::types::{Attribute, ResourceType, Schema};
use crate::error::{ScimError, ScimResult};
use std::collections::HashMap;

/// Owns every registered [`Schema`] and [`ResourceType`], keyed by URN and
/// name respectively. Constructed once per server instance and passed to
/// services by reference as an explicit context rather than resolved from
/// a global, so multiple registries (e.g. in tests) never collide.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
    resource_types: HashMap<String, ResourceType>,
}

impl SchemaRegistry {
    /// An empty registry with nothing bundled — tests build their own
    /// schema sets from here.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the bundled core `User`/`Group`
    /// schemas, the `EnterpriseUser` extension, and the matching
    /// `ResourceType`s for `/Users` and `/Groups`.
    pub fn with_embedded_schemas() -> ScimResult<Self> {
        let mut registry = Self::new();
        registry.register_schema(embedded::core_user_schema()?)?;
        registry.register_schema(embedded::core_group_schema()?)?;
        registry.register_schema(embedded::enterprise_user_extension_schema()?)?;
        registry.register_resource_type(embedded::user_resource_type())?;
        registry.register_resource_type(embedded::group_resource_type())?;
        Ok(registry)
    }

    /// Register a schema by its URN. Replaces any prior schema with the
    /// same URN (used by tests that want to override the embedded set).
    pub fn register_schema(&mut self, schema: Schema) -> ScimResult<()> {
        self.schemas.insert(schema.id.clone(), schema);
        Ok(())
    }

    /// Register a resource type by its name.
    pub fn register_resource_type(&mut self, rt: ResourceType) -> ScimResult<()> {
        self.resource_types.insert(rt.name.clone(), rt);
        Ok(())
    }

    /// Look up a schema by its URN.
    pub fn lookup(&self, urn: &str) -> Option<&Schema> {
        self.schemas.get(urn)
    }

    /// Look up a resource type by name (e.g. `"User"`).
    pub fn resource_type(&self, name: &str) -> Option<&ResourceType> {
        self.resource_types.get(name)
    }

    /// Look up a resource type by its endpoint (e.g. `"/Users"`).
    pub fn resource_type_by_endpoint(&self, endpoint: &str) -> Option<&ResourceType> {
        self.resource_types
            .values()
            .find(|rt| rt.endpoint.eq_ignore_ascii_case(endpoint))
    }

    /// All registered schemas, for a `/Schemas` listing.
    pub fn all_schemas(&self) -> Vec<&Schema> {
        self.schemas.values().collect()
    }

    /// All registered resource types, for a `/ResourceTypes` listing.
    pub fn all_resource_types(&self) -> Vec<&ResourceType> {
        self.resource_types.values().collect()
    }

    /// Resolve a dotted (optionally URN-prefixed) path against a resource
    /// type, returning the chain of [`Attribute`] nodes from root to leaf.
    ///
    /// When the path carries no URN, the main schema is searched first,
    /// then each extension in declaration order — the first schema that
    /// defines the leading segment wins.
    pub fn resolve_path(&self, rt: &ResourceType, raw_path: &str) -> ScimResult<Vec<&Attribute>> {
        let path = AttrPath::parse(raw_path);
        let candidate_urns: Vec<&str> = match &path.urn {
            Some(urn) => vec![urn.as_str()],
            None => rt.all_schema_urns(),
        };

        for urn in candidate_urns {
            let schema = match self.lookup(urn) {
                Some(s) => s,
                None => continue,
            };
            if let Some(chain) = Self::walk_schema(schema, &path.segments) {
                return Ok(chain);
            }
        }

        Err(ScimError::InvalidPath {
            path: raw_path.to_string(),
            message: "attribute not found in any schema of resource type".to_string(),
        })
    }

    fn walk_schema<'a>(schema: &'a Schema, segments: &[String]) -> Option<Vec<&'a Attribute>> {
        let (head, rest) = segments.split_first()?;
        let mut attr = schema.find_attribute(head)?;
        let mut chain = vec![attr];
        for seg in rest {
            attr = attr.find_sub_attribute(seg)?;
            chain.push(attr);
        }
        Some(chain)
    }
}
