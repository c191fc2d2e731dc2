//! [`Resource`]: a [`Property`] tree rooted at a main-schema attribute,
//! augmented with the `schemas` multivalued reference property and `meta`
//! children.
//!
//! Ownership is exclusive: a `Resource` owns its entire tree, and cloning
//! produces a disjoint tree that shares only the immutable [`Attribute`]
//! values each [`Property`] carries a copy of — `Attribute` is `Clone`
//! rather than `Rc`-shared, since schema attributes are small and the
//! registry, not the resource, is the long-lived owner of the canonical
//! copy.

use super::event::{Event, Reaction};
use super::property::Property;
use super::value::Value;
use crate::error::{ScimError, ScimResult};
use crate::schema::{Attribute, AttributeType, ResourceType, SchemaRegistry};

/// A single SCIM resource instance: its `resourceType` name, the property
/// tree holding every attribute value (main schema plus any assigned
/// extensions), and the owning `ResourceType`'s declared schema URNs.
#[derive(Debug, Clone)]
pub struct Resource {
    /// The `ResourceType` name this resource was built from, e.g. `"User"`.
    pub resource_type: String,
    /// The root complex property: one child per top-level attribute of the
    /// main schema, one child named after each extension URN, a `schemas`
    /// multivalued string property, and a `meta` complex property.
    root: Property,
}

impl Resource {
    /// Build an empty resource for `rt`, with every attribute of the main
    /// schema and every extension schema present as an unassigned child,
    /// keyed by extension URN for the extension subtrees, plus the
    /// `schemas` and `meta` scaffolding attributes.
    pub fn empty(registry: &SchemaRegistry, rt: &ResourceType) -> ScimResult<Resource> {
        let main = registry
            .lookup(&rt.schema)
            .ok_or_else(|| ScimError::SchemaNotFound { schema_id: rt.schema.clone() })?;

        let mut children: Vec<Property> = main
            .attributes
            .iter()
            .map(Property::for_attribute)
            .collect();

        for ext in &rt.schema_extensions {
            let ext_schema = registry
                .lookup(&ext.schema)
                .ok_or_else(|| ScimError::SchemaNotFound { schema_id: ext.schema.clone() })?;
            let ext_attr = Attribute {
                name: ext.schema.clone(),
                id: ext.schema.clone(),
                path: ext.schema.clone(),
                data_type: AttributeType::Complex,
                multi_valued: false,
                required: ext.required,
                case_exact: false,
                mutability: crate::schema::Mutability::ReadWrite,
                returned: crate::schema::Returned::Default,
                uniqueness: crate::schema::Uniqueness::None,
                canonical_values: Vec::new(),
                reference_types: Vec::new(),
                sub_attributes: ext_schema.attributes.clone(),
                annotations: [(crate::schema::annotation::SYNC_SCHEMA.to_string(), true)]
                    .into_iter()
                    .collect(),
            };
            children.push(Property::for_attribute(&ext_attr));
        }

        children.push(schemas_attribute_value(&[rt.schema.clone()]));
        children.push(meta_child());

        let root_attr = Attribute {
            name: rt.name.clone(),
            id: rt.schema.clone(),
            path: String::new(),
            data_type: AttributeType::Complex,
            multi_valued: false,
            required: false,
            case_exact: false,
            mutability: crate::schema::Mutability::ReadWrite,
            returned: crate::schema::Returned::Default,
            uniqueness: crate::schema::Uniqueness::None,
            canonical_values: Vec::new(),
            reference_types: Vec::new(),
            sub_attributes: Vec::new(),
            annotations: Default::default(),
        };

        Ok(Resource {
            resource_type: rt.name.clone(),
            root: Property {
                attr: root_attr,
                node: super::property::Node::Complex(children),
            },
        })
    }

    /// Borrow the root property tree.
    pub fn root(&self) -> &Property {
        &self.root
    }

    /// Mutably borrow the root property tree.
    pub fn root_mut(&mut self) -> &mut Property {
        &mut self.root
    }

    /// Descend to a direct top-level child by name (case-insensitive), or
    /// into an extension subtree by URN.
    pub fn dot(&self, name: &str) -> Option<&Property> {
        self.root.dot(name)
    }

    pub fn dot_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.root.dot_mut(name)
    }

    /// The root `id` attribute's string value, if assigned.
    pub fn id(&self) -> Option<String> {
        match self.dot("id").and_then(Property::value) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) -> ScimResult<()> {
        self.dot_mut("id")
            .ok_or_else(|| ScimError::internal("resource has no id attribute"))?
            .set_simple(Value::String(id.into()))
    }

    /// The `schemas` multivalued property.
    pub fn schemas(&self) -> Vec<String> {
        self.dot("schemas")
            .map(|p| {
                p.elements()
                    .iter()
                    .filter_map(|e| match e.value() {
                        Some(Value::String(s)) => Some(s.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `meta.version`'s string value, if assigned.
    pub fn version(&self) -> Option<String> {
        match self.dot("meta").and_then(|m| m.dot("version")).and_then(Property::value) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Stable content hash of the whole tree.
    /// `r.hash() == clone(r).hash()` is a crate-level invariant tested in
    /// `resource` unit tests and the chain's `stampMeta` stage.
    pub fn hash(&self) -> u64 {
        self.root.hash()
    }

    /// `@SyncSchema`: recompute the `schemas` list so it
    /// contains the main schema URN unconditionally, and each extension URN
    /// iff at least one attribute under that extension's subtree is
    /// assigned. Called by the codec after decode and by the chain's
    /// `validate`/`stampMeta` stages after any mutation, since the Property
    /// Tree has no global event bus to drive this automatically from a
    /// root that doesn't exist as a node of its own tree.
    pub fn sync_schemas(&mut self, rt: &ResourceType) {
        let mut urns = vec![rt.schema.clone()];
        for ext in &rt.schema_extensions {
            let assigned = self.dot(&ext.schema).map(Property::is_assigned).unwrap_or(false);
            if assigned {
                urns.push(ext.schema.clone());
            }
        }
        self.set_schemas(&urns);
    }

    fn set_schemas(&mut self, urns: &[String]) {
        let Some(schemas) = self.dot_mut("schemas") else { return };
        schemas.clear();
        for urn in urns {
            if let Ok(idx) = schemas.push_element() {
                let _ = schemas
                    .at_mut(idx)
                    .expect("just pushed")
                    .set_simple(Value::String(urn.clone()));
            }
        }
    }

    /// Apply a [`Reaction`] produced by [`Property::propagate`] against
    /// this resource's `schemas` list. Only `RegisterSchemaUrn` reactions
    /// are meaningful at the resource level; anything else is a no-op here
    /// since those are already applied in place by the originating node.
    pub fn apply_root_reaction(&mut self, reaction: Reaction, rt: &ResourceType) {
        if matches!(reaction, Reaction::RegisterSchemaUrn { .. }) {
            self.sync_schemas(rt);
        }
    }

    /// Raise a synthetic event for the named extension subtree and apply
    /// whatever reaction results — a thin convenience over
    /// [`Property::propagate`] + [`Resource::apply_root_reaction`] for
    /// callers (the codec) that just assigned or cleared a whole extension.
    pub fn notify_extension_changed(&mut self, urn: &str, rt: &ResourceType) {
        let assigned = self.dot(urn).map(Property::is_assigned).unwrap_or(false);
        let event = if assigned {
            Event::assigned(urn, Value::String(String::new()))
        } else {
            Event::unassigned(urn)
        };
        if let Some(ext) = self.dot(urn) {
            let reaction = ext.propagate(&event);
            self.apply_root_reaction(reaction, rt);
        }
    }
}

fn schemas_attribute_value(urns: &[String]) -> Property {
    let attr = Attribute {
        name: "schemas".to_string(),
        id: "schemas".to_string(),
        path: "schemas".to_string(),
        data_type: AttributeType::String,
        multi_valued: true,
        required: true,
        case_exact: true,
        mutability: crate::schema::Mutability::ReadWrite,
        returned: crate::schema::Returned::Always,
        uniqueness: crate::schema::Uniqueness::None,
        canonical_values: Vec::new(),
        reference_types: Vec::new(),
        sub_attributes: Vec::new(),
        annotations: Default::default(),
    };
    let mut prop = Property::for_attribute(&attr);
    for urn in urns {
        if let Ok(idx) = prop.push_element() {
            let _ = prop.at_mut(idx).expect("just pushed").set_simple(Value::String(urn.clone()));
        }
    }
    prop
}

fn meta_child() -> Property {
    let ro_string = |name: &str, data_type: AttributeType| Attribute {
        name: name.to_string(),
        id: name.to_string(),
        path: format!("meta.{name}"),
        data_type,
        multi_valued: false,
        required: false,
        case_exact: true,
        mutability: crate::schema::Mutability::ReadOnly,
        returned: crate::schema::Returned::Default,
        uniqueness: crate::schema::Uniqueness::None,
        canonical_values: Vec::new(),
        reference_types: Vec::new(),
        sub_attributes: Vec::new(),
        annotations: Default::default(),
    };
    let attr = Attribute {
        name: "meta".to_string(),
        id: "meta".to_string(),
        path: "meta".to_string(),
        data_type: AttributeType::Complex,
        multi_valued: false,
        required: false,
        case_exact: false,
        mutability: crate::schema::Mutability::ReadOnly,
        returned: crate::schema::Returned::Default,
        uniqueness: crate::schema::Uniqueness::None,
        canonical_values: Vec::new(),
        reference_types: Vec::new(),
        sub_attributes: vec![
            ro_string("resourceType", AttributeType::String),
            ro_string("created", AttributeType::DateTime),
            ro_string("lastModified", AttributeType::DateTime),
            ro_string("location", AttributeType::Reference),
            ro_string("version", AttributeType::String),
        ],
        annotations: Default::default(),
    };
    Property::for_attribute(&attr)
}
