//! Core schema type definitions for SCIM resources.
//!
//! These types model RFC 7643 schema declarations: [`Attribute`] nodes
//! assembled into a [`Schema`], addressed by URN, and composed by a
//! [`ResourceType`] into the shape of a concrete endpoint (`/Users`,
//! `/Groups`, ...). Attributes are immutable once loaded — the registry
//! that owns them is populated once at startup (see [`crate::schema::registry`]).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// SCIM attribute data types (RFC 7643 §2.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    String,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Reference,
    Binary,
    Complex,
}

impl Default for AttributeType {
    fn default() -> Self {
        Self::String
    }
}

/// Attribute mutability characteristics (RFC 7643 §2.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    ReadOnly,
    ReadWrite,
    Immutable,
    WriteOnly,
}

impl Default for Mutability {
    fn default() -> Self {
        Self::ReadWrite
    }
}

/// Controls whether an attribute is included in a serialized resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Returned {
    Always,
    Never,
    Default,
    Request,
}

impl Default for Returned {
    fn default() -> Self {
        Self::Default
    }
}

/// Attribute uniqueness constraints (RFC 7643 §2.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    None,
    Server,
    Global,
}

impl Default for Uniqueness {
    fn default() -> Self {
        Self::None
    }
}

/// Annotation keys recognized by the Property Tree's reaction wiring.
/// Stored as a free-form map on [`Attribute`] so schema
/// authors can attach behavior without widening the core struct.
pub mod annotation {
    pub const EXCLUSIVE_PRIMARY: &str = "@ExclusivePrimary";
    pub const AUTO_COMPACT: &str = "@AutoCompact";
    pub const STATE_SUMMARY: &str = "@StateSummary";
    pub const SYNC_SCHEMA: &str = "@SyncSchema";
    pub const IDENTITY: &str = "@Identity";
    pub const PRIMARY: &str = "@Primary";
    pub const RELAX_CANONICAL: &str = "@RelaxCanonical";
}

/// A schema node describing one attribute (or, for complex attributes, a
/// subtree of sub-attributes).
///
/// Attributes are immutable after the owning [`Schema`] is loaded; all
/// fields are plain values rather than `RefCell`/`Cell` wrappers; an
/// `Attribute` is always reached through a shared reference from the
/// registry that owns it, never cloned into a `Property`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Bare attribute name (e.g. `"userName"`, `"value"`).
    pub name: String,
    /// Namespaced full path, e.g. `"urn:...:User:name.givenName"`.
    #[serde(default)]
    pub id: String,
    /// Dotted path from the resource root, e.g. `"name.givenName"`.
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub data_type: AttributeType,
    #[serde(default, rename = "multiValued")]
    pub multi_valued: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "caseExact")]
    pub case_exact: bool,
    #[serde(default)]
    pub mutability: Mutability,
    #[serde(default)]
    pub returned: Returned,
    #[serde(default)]
    pub uniqueness: Uniqueness,
    #[serde(default, rename = "canonicalValues")]
    pub canonical_values: Vec<String>,
    #[serde(default, rename = "referenceTypes")]
    pub reference_types: Vec<String>,
    #[serde(default, rename = "subAttributes")]
    pub sub_attributes: Vec<Attribute>,
    /// Free-form behavioral annotations (see [`annotation`]).
    #[serde(default)]
    pub annotations: HashMap<String, bool>,
}

impl Attribute {
    /// `true` iff `annotation::IDENTITY` is set — identity sub-attributes
    /// are what `Property::hash` keys on for a complex value when any are
    /// present.
    pub fn is_identity(&self) -> bool {
        self.annotations.get(annotation::IDENTITY).copied().unwrap_or(false)
    }

    /// `true` iff `annotation::PRIMARY` is set.
    pub fn is_primary_marker(&self) -> bool {
        self.annotations.get(annotation::PRIMARY).copied().unwrap_or(false)
    }

    /// `true` iff `annotation::EXCLUSIVE_PRIMARY` is set.
    pub fn is_exclusive_primary(&self) -> bool {
        self.annotations
            .get(annotation::EXCLUSIVE_PRIMARY)
            .copied()
            .unwrap_or(false)
    }

    /// `true` iff `annotation::AUTO_COMPACT` is set.
    pub fn is_auto_compact(&self) -> bool {
        self.annotations.get(annotation::AUTO_COMPACT).copied().unwrap_or(false)
    }

    /// `true` iff `annotation::STATE_SUMMARY` is set.
    pub fn is_state_summary(&self) -> bool {
        self.annotations.get(annotation::STATE_SUMMARY).copied().unwrap_or(false)
    }

    /// `true` iff `annotation::SYNC_SCHEMA` is set.
    pub fn is_sync_schema(&self) -> bool {
        self.annotations.get(annotation::SYNC_SCHEMA).copied().unwrap_or(false)
    }

    /// `true` iff `annotation::RELAX_CANONICAL` is set.
    pub fn relaxes_canonical(&self) -> bool {
        self.annotations
            .get(annotation::RELAX_CANONICAL)
            .copied()
            .unwrap_or(false)
    }

    /// The singular form of a multivalued attribute's element schema: same
    /// node, but `multi_valued = false`. Used when constructing an element
    /// `Property` inside a `Multi` container.
    pub fn as_singular(&self) -> Attribute {
        let mut singular = self.clone();
        singular.multi_valued = false;
        singular
    }

    /// Find a direct sub-attribute by case-insensitive name.
    pub fn find_sub_attribute(&self, name: &str) -> Option<&Attribute> {
        self.sub_attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// Ordered collection of attributes addressed by URN.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// URN identifying this schema, e.g.
    /// `"urn:ietf:params:scim:schemas:core:2.0:User"`.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    /// Find a top-level attribute by case-insensitive name.
    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// One extension schema composed into a [`ResourceType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaExtension {
    /// URN of the extension schema.
    pub schema: String,
    /// Whether every resource of this type must carry the extension.
    pub required: bool,
}

/// Composes a main schema plus zero or more extensions into the shape of a
/// concrete endpoint, e.g. `/Users` → User main schema + EnterpriseUser
/// extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    /// Resource type name, e.g. `"User"`.
    pub name: String,
    /// Endpoint path, e.g. `"/Users"`.
    pub endpoint: String,
    /// URN of the main schema.
    pub schema: String,
    #[serde(default)]
    pub schema_extensions: Vec<SchemaExtension>,
}

impl ResourceType {
    /// All schema URNs a resource of this type may carry: the main schema
    /// followed by extensions in declaration order.
    pub fn all_schema_urns(&self) -> Vec<&str> {
        let mut urns = vec![self.schema.as_str()];
        urns.extend(self.schema_extensions.iter().map(|e| e.schema.as_str()));
        urns
    }
}


impl Default for Attribute {
    fn default() -> Self {
        Self {
            name: String::new(),
            id: String::new(),
            path: String::new(),
            data_type: AttributeType::default(),
            multi_valued: false,
            required: false,
            case_exact: false,
            mutability: Mutability::default(),
            returned: Returned::default(),
            uniqueness: Uniqueness::default(),
            canonical_values: Vec::new(),
            reference_types: Vec::new(),
            sub_attributes: Vec::new(),
            annotations: HashMap::new(),
        }
    }
}
