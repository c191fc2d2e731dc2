//! `validate`: the last chain stage before a mutation is
//! persisted. Enforces, in order, `required`, canonical-value conformance,
//! `immutable` mutability, and `uniqueness`.
//!
//! `server` uniqueness is enforced by querying the DB with
//! `(id ne "<self>") and (<path> eq <value>)`; `global` uniqueness is
//! enforced structurally by `assignUuid` and isn't
//! re-checked here.

use crate::error::{ScimError, ScimResult};
use crate::filter;
use crate::resource::property::Node;
use crate::resource::{Property, Resource, Value};
use crate::schema::{Mutability, ResourceType, SchemaRegistry, Uniqueness};
use crate::storage::ResourceStore;
use chrono::SecondsFormat;
use tokio_util::sync::CancellationToken;

pub async fn run<S: ResourceStore>(
    payload: &mut Resource,
    reference: Option<&Resource>,
    _registry: &SchemaRegistry,
    rt: &ResourceType,
    store: &S,
    cancel: &CancellationToken,
) -> ScimResult<()> {
    check_node(payload.root(), reference.map(Resource::root), "")?;

    let mut unique_candidates = Vec::new();
    collect_unique(payload.root(), "", &mut unique_candidates);

    let self_id = payload.id().unwrap_or_default();
    for (path, value) in unique_candidates {
        let filter_src = format!(
            "(id ne \"{}\") and ({} eq {})",
            escape(&self_id),
            path,
            filter_literal(&value)
        );
        let expr = filter::compile(&filter_src)?;
        let count = store.count(&rt.name, Some(&expr), cancel).await?;
        if count > 0 {
            log::warn!("uniqueness violation on '{path}' for resource type '{}'", rt.name);
            return Err(ScimError::Uniqueness { path });
        }
    }

    Ok(())
}

fn check_node(node: &Property, reference: Option<&Property>, path: &str) -> ScimResult<()> {
    let attr = &node.attr;
    if attr.required && !node.is_assigned() {
        return Err(ScimError::InvalidValue {
            path: path.to_string(),
            message: "required attribute is unassigned".to_string(),
        });
    }

    match &node.node {
        Node::Simple(Some(v)) => {
            if !attr.canonical_values.is_empty() && !attr.relaxes_canonical() {
                let matches = attr.canonical_values.iter().any(|c| {
                    if attr.case_exact {
                        c == &v.canonical_string(true)
                    } else {
                        c.to_lowercase() == v.canonical_string(false)
                    }
                });
                if !matches {
                    return Err(ScimError::InvalidValue {
                        path: path.to_string(),
                        message: format!("value not among canonical values {:?}", attr.canonical_values),
                    });
                }
            }
            if attr.mutability == Mutability::Immutable {
                if let Some(refv) = reference.and_then(Property::value) {
                    if refv != v {
                        return Err(ScimError::Mutability { path: path.to_string() });
                    }
                }
            }
            Ok(())
        }
        Node::Simple(None) => Ok(()),
        Node::Complex(children) => {
            for child in children {
                let child_path = child_path(path, &child.attr.name);
                let ref_child = reference.and_then(|r| r.dot(&child.attr.name));
                check_node(child, ref_child, &child_path)?;
            }
            Ok(())
        }
        Node::Multi(elements) => {
            if let Some(refp) = reference {
                check_immutable_multi(attr, node, refp, path)?;
            }
            for el in elements {
                check_node(el, None, path)?;
            }
            Ok(())
        }
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Immutable elements of a multivalued complex attribute are matched
/// across payload and reference by their `@Identity` sub-attribute (e.g.
/// `members.value`); an identity that still exists in the payload but
/// carries a different value for an `immutable` sub-attribute is a
/// mutability violation. An identity dropped entirely is a removal, not a
/// mutation, and isn't checked here.
fn check_immutable_multi(attr: &crate::schema::Attribute, payload: &Property, reference: &Property, path: &str) -> ScimResult<()> {
    let Some(identity_name) = attr.sub_attributes.iter().find(|a| a.is_identity()).map(|a| a.name.clone()) else {
        return Ok(());
    };
    let immutable_subs: Vec<&str> = attr
        .sub_attributes
        .iter()
        .filter(|a| a.mutability == Mutability::Immutable)
        .map(|a| a.name.as_str())
        .collect();
    if immutable_subs.is_empty() {
        return Ok(());
    }

    for ref_el in reference.elements() {
        let Some(id_val) = ref_el.dot(&identity_name).and_then(Property::value) else {
            continue;
        };
        let payload_el = payload
            .elements()
            .iter()
            .find(|e| e.dot(&identity_name).and_then(Property::value) == Some(id_val));
        let Some(payload_el) = payload_el else { continue };
        for sub in &immutable_subs {
            let ref_v = ref_el.dot(sub).and_then(Property::value);
            let payload_v = payload_el.dot(sub).and_then(Property::value);
            if ref_v.is_some() && ref_v != payload_v {
                return Err(ScimError::Mutability { path: format!("{path}.{sub}") });
            }
        }
    }
    Ok(())
}

fn collect_unique(node: &Property, path: &str, out: &mut Vec<(String, Value)>) {
    let attr = &node.attr;
    match &node.node {
        Node::Simple(Some(v)) => {
            if attr.uniqueness == Uniqueness::Server {
                out.push((path.to_string(), v.clone()));
            }
        }
        Node::Simple(None) => {}
        Node::Complex(children) => {
            for child in children {
                collect_unique(child, &child_path(path, &child.attr.name), out);
            }
        }
        Node::Multi(_) => {
            // `server` uniqueness is not declared on any multivalued
            // attribute in the bundled schemas — it applies to scalar
            // identity-bearing attributes like `userName` — so no fan-out
            // is needed here.
        }
    }
}

fn filter_literal(v: &Value) -> String {
    match v {
        Value::String(s) => format!("\"{}\"", escape(s)),
        Value::Int(i) => i.to_string(),
        Value::Dec(d) => d.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        Value::Bytes(b) => format!("\"{}\"", base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b)),
        Value::Ref(s) => format!("\"{}\"", escape(s)),
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
