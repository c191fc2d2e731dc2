//! The Property Tree: a dynamic, reflective node type
//! that carries its own [`Attribute`] alongside its runtime value, so a
//! generic reader (the codec, the filter evaluator, the chain's validate
//! stage) can walk any resource without a hand-written accessor per field.

use super::event::{Event, EventKind, Reaction};
use super::value::Value;
use crate::error::{ScimError, ScimResult};
use crate::schema::Attribute;

/// The runtime shape of a property, mirroring its [`Attribute::data_type`]
/// and [`Attribute::multi_valued`].
#[derive(Debug, Clone)]
pub enum Node {
    /// A scalar leaf. `None` means unassigned.
    Simple(Option<Value>),
    /// A complex attribute's sub-attributes, in schema declaration order.
    Complex(Vec<Property>),
    /// A multivalued attribute's elements, each itself a `Simple` or
    /// `Complex` property built from the attribute's singular form.
    Multi(Vec<Property>),
}

/// One node of the Property Tree: an [`Attribute`] paired with its current
/// [`Node`] value and whatever reactions its own annotations trigger on
/// mutation (`@ExclusivePrimary`, `@AutoCompact`, `@StateSummary`).
///
/// `Property` is intentionally *not* `Clone`-on-write-shared: each resource
/// owns its tree outright, so mutation is plain `&mut` — no interior
/// mutability anywhere in the chain from root to leaf.
pub struct Property {
    pub attr: Attribute,
    pub node: Node,
}

impl Clone for Property {
    fn clone(&self) -> Self {
        Property {
            attr: self.attr.clone(),
            node: self.node.clone(),
        }
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("attr", &self.attr.name)
            .field("node", &self.node)
            .finish()
    }
}

impl Property {
    /// Build an empty property tree for `attr`: every complex sub-attribute
    /// present but unassigned, every multivalued attribute an empty list.
    pub fn for_attribute(attr: &Attribute) -> Property {
        let node = if attr.multi_valued {
            Node::Multi(Vec::new())
        } else if attr.data_type == crate::schema::AttributeType::Complex {
            Node::Complex(
                attr.sub_attributes
                    .iter()
                    .map(Property::for_attribute)
                    .collect(),
            )
        } else {
            Node::Simple(None)
        };
        Property {
            attr: attr.clone(),
            node,
        }
    }

    /// Build a single element of a multivalued attribute (its singular
    /// form), used when appending to a `Multi` node.
    fn for_element(attr: &Attribute) -> Property {
        Property::for_attribute(&attr.as_singular())
    }

    // ---- navigation ------------------------------------------------

    /// Descend into a complex child by name. `None` if this isn't a
    /// `Complex` node or the name is unknown.
    pub fn dot(&self, name: &str) -> Option<&Property> {
        match &self.node {
            Node::Complex(children) => children.iter().find(|c| c.attr.name.eq_ignore_ascii_case(name)),
            _ => None,
        }
    }

    pub fn dot_mut(&mut self, name: &str) -> Option<&mut Property> {
        match &mut self.node {
            Node::Complex(children) => children
                .iter_mut()
                .find(|c| c.attr.name.eq_ignore_ascii_case(name)),
            _ => None,
        }
    }

    /// Index into a multivalued attribute's elements.
    pub fn at(&self, index: usize) -> Option<&Property> {
        match &self.node {
            Node::Multi(elements) => elements.get(index),
            _ => None,
        }
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut Property> {
        match &mut self.node {
            Node::Multi(elements) => elements.get_mut(index),
            _ => None,
        }
    }

    /// Element count for a `Multi` node, `0` otherwise.
    pub fn len(&self) -> usize {
        match &self.node {
            Node::Multi(elements) => elements.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All elements of a `Multi` node.
    pub fn elements(&self) -> &[Property] {
        match &self.node {
            Node::Multi(elements) => elements,
            _ => &[],
        }
    }

    pub fn elements_mut(&mut self) -> &mut Vec<Property> {
        match &mut self.node {
            Node::Multi(elements) => elements,
            _ => panic!("elements_mut called on non-Multi property {}", self.attr.name),
        }
    }

    /// All sub-attribute children of a `Complex` node, in schema order.
    pub fn children(&self) -> &[Property] {
        match &self.node {
            Node::Complex(children) => children,
            _ => &[],
        }
    }

    /// The scalar value of a `Simple` node.
    pub fn value(&self) -> Option<&Value> {
        match &self.node {
            Node::Simple(v) => v.as_ref(),
            _ => None,
        }
    }

    /// Whether this property currently carries any value at all: a
    /// non-`None` simple, a non-empty multi, or a complex with at least one
    /// assigned descendant.
    pub fn is_assigned(&self) -> bool {
        match &self.node {
            Node::Simple(v) => v.is_some(),
            Node::Multi(elements) => !elements.is_empty(),
            Node::Complex(children) => children.iter().any(Property::is_assigned),
        }
    }

    /// Whether this property is assigned *and* non-empty: an empty string
    /// or zero-length byte value doesn't count, nor does a `Multi` with no
    /// elements, nor a `Complex` whose descendants are all themselves
    /// absent or empty. This is the predicate the `pr` filter operator
    /// uses; `is_assigned` alone treats `""` as present, which `pr` must
    /// not.
    pub fn is_present(&self) -> bool {
        match &self.node {
            Node::Simple(Some(Value::String(s))) => !s.is_empty(),
            Node::Simple(Some(Value::Bytes(b))) => !b.is_empty(),
            Node::Simple(Some(_)) => true,
            Node::Simple(None) => false,
            Node::Multi(elements) => elements.iter().any(Property::is_present),
            Node::Complex(children) => children.iter().any(Property::is_present),
        }
    }

    // ---- mutation ---------------------------------------------------

    /// Set this `Simple` node's value directly, enforcing its declared
    /// [`crate::schema::AttributeType`]. Returns [`ScimError::InvalidValue`]
    /// on a type mismatch.
    pub fn set_simple(&mut self, value: Value) -> ScimResult<()> {
        match &mut self.node {
            Node::Simple(slot) => {
                check_type(&self.attr, &value)?;
                *slot = Some(value);
                Ok(())
            }
            _ => Err(ScimError::InvalidValue {
                path: self.attr.name.clone(),
                message: "not a simple attribute".to_string(),
            }),
        }
    }

    pub fn clear(&mut self) {
        match &mut self.node {
            Node::Simple(slot) => *slot = None,
            Node::Complex(children) => children.iter_mut().for_each(Property::clear),
            Node::Multi(elements) => elements.clear(),
        }
    }

    /// Append a new element to a `Multi` node, built from the attribute's
    /// singular form, then run this attribute's own annotation-driven
    /// reactions (`@ExclusivePrimary`, `@AutoCompact`) against the
    /// resulting element set. Returns the index of the new element.
    pub fn push_element(&mut self) -> ScimResult<usize> {
        let elem = Property::for_element(&self.attr);
        match &mut self.node {
            Node::Multi(elements) => {
                elements.push(elem);
                let idx = elements.len() - 1;
                self.react_to_multi_change();
                Ok(idx)
            }
            _ => Err(ScimError::InvalidValue {
                path: self.attr.name.clone(),
                message: "not a multivalued attribute".to_string(),
            }),
        }
    }

    /// Remove an element from a `Multi` node by index.
    pub fn remove_element(&mut self, index: usize) -> ScimResult<()> {
        match &mut self.node {
            Node::Multi(elements) => {
                if index >= elements.len() {
                    return Err(ScimError::NoTarget {
                        path: format!("{}[{}]", self.attr.name, index),
                    });
                }
                elements.remove(index);
                Ok(())
            }
            _ => Err(ScimError::InvalidValue {
                path: self.attr.name.clone(),
                message: "not a multivalued attribute".to_string(),
            }),
        }
    }

    /// Apply this attribute's own annotation-wired reactions after an
    /// element's contents changed. Called by callers that mutate an
    /// element's sub-attributes directly (e.g. the codec, PATCH apply)
    /// once they're done, and by [`Property::push_element`].
    pub fn react_to_multi_change(&mut self) {
        let is_exclusive = self
            .attr
            .sub_attributes
            .iter()
            .any(Attribute::is_exclusive_primary);
        if is_exclusive {
            subscriber_exclusive_primary(self);
        }
        if self.attr.is_auto_compact() {
            subscriber_auto_compact(self);
        }
    }

    /// Apply this attribute's `@StateSummary` reaction, if wired, after a
    /// descendant of a `Complex` node changed.
    pub fn react_to_complex_change(&mut self) {
        if self.attr.is_state_summary() {
            subscriber_state_summary(self);
        }
    }

    // ---- hashing ------------------------------------------------------

    /// FNV-1a 64-bit hash of this property's canonical contribution. An
    /// unassigned property — `Simple(None)`, an empty `Multi`, or a
    /// `Complex` with no assigned descendant — always hashes to `0`,
    /// literally, not `fnv1a` over zero bytes. Otherwise: for a `Simple`,
    /// its canonical string; for `Complex`, the hash of its identity
    /// sub-attributes if any are declared, otherwise every sub-attribute;
    /// for `Multi`, the order-independent XOR of each element's hash (so
    /// element reordering doesn't change the parent's hash, matching set
    /// semantics for multivalued membership).
    pub fn hash(&self) -> u64 {
        if !self.is_assigned() {
            return 0;
        }
        match &self.node {
            Node::Simple(Some(v)) => fnv1a(&v.canonical_string(self.attr.case_exact)),
            Node::Simple(None) => 0,
            Node::Complex(children) => {
                let identity_children: Vec<&Property> = children
                    .iter()
                    .filter(|c| c.attr.is_identity())
                    .collect();
                let relevant: Vec<&Property> = if identity_children.is_empty() {
                    children.iter().collect()
                } else {
                    identity_children
                };
                let mut h = FNV_OFFSET_BASIS;
                for child in relevant {
                    h ^= child.hash();
                    h = h.wrapping_mul(FNV_PRIME);
                }
                h
            }
            Node::Multi(elements) => elements.iter().fold(0u64, |acc, e| acc ^ e.hash()),
        }
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// FNV-1a over raw bytes, the hash primitive `Property::hash` folds scalar
/// contributions through.
pub fn fnv1a(data: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in data.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn check_type(attr: &Attribute, value: &Value) -> ScimResult<()> {
    use crate::schema::AttributeType as T;
    let ok = matches!(
        (attr.data_type, value),
        (T::String, Value::String(_))
            | (T::Integer, Value::Int(_))
            | (T::Decimal, Value::Dec(_))
            | (T::Decimal, Value::Int(_))
            | (T::Boolean, Value::Bool(_))
            | (T::DateTime, Value::DateTime(_))
            | (T::Binary, Value::Bytes(_))
            | (T::Reference, Value::Ref(_))
            | (T::Reference, Value::String(_))
    );
    if ok {
        Ok(())
    } else {
        Err(ScimError::InvalidValue {
            path: attr.name.clone(),
            message: format!(
                "expected {:?}, got {}",
                attr.data_type,
                value.type_name()
            ),
        })
    }
}

/// `@ExclusivePrimary`: when more than one element has its marked
/// sub-attribute set `true`, keep only the last one assigned and clear the
/// rest — enforces "at most one primary" without the caller having to
/// remember to demote siblings by hand.
fn subscriber_exclusive_primary(multi: &mut Property) {
    let marker_name = multi
        .attr
        .sub_attributes
        .iter()
        .find(|a| a.is_exclusive_primary())
        .map(|a| a.name.clone());
    let Some(marker_name) = marker_name else { return };

    let elements = multi.elements_mut();
    let mut last_true: Option<usize> = None;
    for (i, el) in elements.iter().enumerate() {
        if let Some(marker) = el.dot(&marker_name) {
            if marker.value() == Some(&Value::Bool(true)) {
                last_true = Some(i);
            }
        }
    }
    if let Some(keep) = last_true {
        for (i, el) in elements.iter_mut().enumerate() {
            if i != keep {
                if let Some(marker) = el.dot_mut(&marker_name) {
                    marker.clear();
                }
            }
        }
    }
}

/// `@AutoCompact`: drop elements that ended up entirely unassigned (every
/// sub-attribute cleared, or a simple element with no value), so a PATCH
/// remove that empties an element doesn't leave a dangling placeholder.
fn subscriber_auto_compact(multi: &mut Property) {
    let elements = multi.elements_mut();
    elements.retain(Property::is_assigned);
}

/// `@StateSummary`: recompute a denormalized `formatted` sub-attribute from
/// its parts when the caller didn't supply one directly (mirrors RFC 7643
/// `name.formatted`'s role as a display summary of `givenName`/`familyName`).
fn subscriber_state_summary(complex: &mut Property) {
    let already_set = complex
        .dot("formatted")
        .and_then(Property::value)
        .is_some();
    if already_set {
        return;
    }
    let given = complex
        .dot("givenName")
        .and_then(Property::value)
        .and_then(|v| if let Value::String(s) = v { Some(s.clone()) } else { None });
    let family = complex
        .dot("familyName")
        .and_then(Property::value)
        .and_then(|v| if let Value::String(s) = v { Some(s.clone()) } else { None });
    let parts: Vec<String> = [given, family].into_iter().flatten().collect();
    if parts.is_empty() {
        return;
    }
    if let Some(formatted) = complex.dot_mut("formatted") {
        let _ = formatted.set_simple(Value::String(parts.join(" ")));
    }
}

impl Property {
    /// Raise `event` against this property and return the [`Reaction`] its
    /// own annotations prescribe, without applying it — callers (the codec,
    /// the chain's PATCH apply, [`super::resource::Resource`]) decide
    /// whether to act on the reaction or let it propagate further up the
    /// tree toward an ancestor that cares.
    ///
    /// The concrete per-node reactions (`@ExclusivePrimary`, `@AutoCompact`,
    /// `@StateSummary`) are already applied eagerly by
    /// [`Property::react_to_multi_change`]/[`Property::react_to_complex_change`]
    /// at the point of mutation; `propagate` exists for reactions that
    /// need to act on an ancestor, chiefly `@SyncSchema` at the resource
    /// root, which has no `Property` node of its own to react from.
    pub fn propagate(&self, event: &Event) -> Reaction {
        match &event.kind {
            EventKind::Assigned { .. } if self.attr.is_sync_schema() => {
                Reaction::RegisterSchemaUrn {
                    urn: self.attr.id.clone(),
                }
            }
            EventKind::Unassigned { .. } if self.attr.is_sync_schema() && !self.is_assigned() => {
                Reaction::RegisterSchemaUrn {
                    urn: self.attr.id.clone(),
                }
            }
            _ => Reaction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::embedded;

    fn emails_attr() -> Attribute {
        embedded::core_user_schema().unwrap().find_attribute("emails").unwrap().clone()
    }

    #[test]
    fn push_element_and_set_simple_round_trip() {
        let attr = emails_attr();
        let mut emails = Property::for_attribute(&attr);
        let idx = emails.push_element().unwrap();
        emails
            .at_mut(idx)
            .unwrap()
            .dot_mut("value")
            .unwrap()
            .set_simple(Value::String("a@b.com".into()))
            .unwrap();
        assert_eq!(
            emails.at(idx).unwrap().dot("value").unwrap().value(),
            Some(&Value::String("a@b.com".into()))
        );
    }

    #[test]
    fn exclusive_primary_demotes_siblings() {
        let attr = emails_attr();
        let mut emails = Property::for_attribute(&attr);
        let i0 = emails.push_element().unwrap();
        emails.at_mut(i0).unwrap().dot_mut("primary").unwrap().set_simple(Value::Bool(true)).unwrap();
        emails.react_to_multi_change();
        let i1 = emails.push_element().unwrap();
        emails.at_mut(i1).unwrap().dot_mut("primary").unwrap().set_simple(Value::Bool(true)).unwrap();
        emails.react_to_multi_change();

        assert_eq!(
            emails.at(i0).unwrap().dot("primary").unwrap().value(),
            Some(&Value::Bool(false))
        );
        assert_eq!(
            emails.at(i1).unwrap().dot("primary").unwrap().value(),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn auto_compact_drops_empty_elements() {
        let attr = emails_attr();
        let mut emails = Property::for_attribute(&attr);
        emails.push_element().unwrap();
        assert_eq!(emails.len(), 1);
        emails.react_to_multi_change();
        assert_eq!(emails.len(), 0);
    }

    #[test]
    fn hash_is_order_independent_for_multi() {
        let attr = emails_attr();
        let mut a = Property::for_attribute(&attr);
        let i0 = a.push_element().unwrap();
        a.at_mut(i0).unwrap().dot_mut("value").unwrap().set_simple(Value::String("x@y.com".into())).unwrap();
        let i1 = a.push_element().unwrap();
        a.at_mut(i1).unwrap().dot_mut("value").unwrap().set_simple(Value::String("z@y.com".into())).unwrap();

        let mut b = Property::for_attribute(&attr);
        let j0 = b.push_element().unwrap();
        b.at_mut(j0).unwrap().dot_mut("value").unwrap().set_simple(Value::String("z@y.com".into())).unwrap();
        let j1 = b.push_element().unwrap();
        b.at_mut(j1).unwrap().dot_mut("value").unwrap().set_simple(Value::String("x@y.com".into())).unwrap();

        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn state_summary_synthesizes_formatted_name() {
        let schema = embedded::core_user_schema().unwrap();
        let attr = schema.find_attribute("name").unwrap().clone();
        let mut name = Property::for_attribute(&attr);
        name.dot_mut("givenName").unwrap().set_simple(Value::String("Ada".into())).unwrap();
        name.dot_mut("familyName").unwrap().set_simple(Value::String("Lovelace".into())).unwrap();
        name.react_to_complex_change();
        assert_eq!(
            name.dot("formatted").unwrap().value(),
            Some(&Value::String("Ada Lovelace".into()))
        );
    }
}
