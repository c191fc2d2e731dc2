//! Schema-directed deserialization.

use crate::error::{ScimError, ScimResult};
use crate::resource::{Property, Resource, Value};
use crate::schema::{Attribute, AttributeType, ResourceType, SchemaRegistry};
use serde_json::Value as Json;

/// Decode a wire JSON body into a [`Resource`] of resource type `rt`.
///
/// Unknown keys at the root, or inside a declared complex attribute, are
/// rejected with [`ScimError::InvalidRequest`]. A `null` value at any
/// assignable key is an explicit delete. A single JSON object/scalar where
/// a multivalued attribute is expected is accepted as a one-element list.
pub fn decode(registry: &SchemaRegistry, rt: &ResourceType, json: &Json) -> ScimResult<Resource> {
    let obj = json.as_object().ok_or_else(|| ScimError::InvalidRequest {
        message: "resource body must be a JSON object".to_string(),
    })?;

    let mut resource = Resource::empty(registry, rt)?;
    let main_schema = registry
        .lookup(&rt.schema)
        .ok_or_else(|| ScimError::SchemaNotFound { schema_id: rt.schema.clone() })?;

    for (key, value) in obj {
        if key.eq_ignore_ascii_case("schemas") {
            continue; // recomputed by `Resource::sync_schemas` after decode
        }
        if let Some(attr) = main_schema.find_attribute(key) {
            let prop = resource
                .dot_mut(&attr.name)
                .ok_or_else(|| ScimError::internal("missing scaffolded property for known attribute"))?;
            assign_into(prop, attr, value, false)?;
            continue;
        }
        if let Some(ext) = rt.schema_extensions.iter().find(|e| e.schema.eq_ignore_ascii_case(key)) {
            let ext_schema = registry
                .lookup(&ext.schema)
                .ok_or_else(|| ScimError::SchemaNotFound { schema_id: ext.schema.clone() })?;
            let ext_obj = value.as_object().ok_or_else(|| ScimError::InvalidRequest {
                message: format!("extension '{key}' must be a JSON object"),
            })?;
            let ext_prop = resource
                .dot_mut(&ext.schema)
                .ok_or_else(|| ScimError::internal("missing scaffolded extension property"))?;
            for (sub_key, sub_value) in ext_obj {
                let sub_attr = ext_schema.find_attribute(sub_key).ok_or_else(|| ScimError::InvalidRequest {
                    message: format!("unknown attribute '{sub_key}' in extension '{key}'"),
                })?;
                let sub_prop = ext_prop.dot_mut(&sub_attr.name).ok_or_else(|| {
                    ScimError::internal("missing scaffolded property for known extension attribute")
                })?;
                assign_into(sub_prop, sub_attr, sub_value, false)?;
            }
            continue;
        }
        return Err(ScimError::InvalidRequest {
            message: format!("unknown attribute '{key}' at resource root"),
        });
    }

    resource.sync_schemas(rt);
    Ok(resource)
}

/// Assign a decoded JSON value into `prop` (whose declared shape is
/// `attr`). `null` is an explicit delete. `append` controls multivalued
/// behavior: `false` (whole-resource decode, PATCH `replace`) clears the
/// existing elements first; `true` (PATCH `add`) leaves them and appends —
/// the distinction `services::patch` needs that a plain decode never does,
/// since [`crate::resource::Resource::empty`] always starts every
/// multivalued attribute empty anyway.
pub(crate) fn assign_into(prop: &mut Property, attr: &Attribute, value: &Json, append: bool) -> ScimResult<()> {
    if value.is_null() {
        prop.clear();
        return Ok(());
    }

    if attr.multi_valued {
        let items: Vec<&Json> = match value.as_array() {
            Some(arr) => arr.iter().collect(),
            None => vec![value], // single element accepted as a one-item list
        };
        if !append {
            prop.clear();
        }
        let singular = attr.as_singular();
        for item in items {
            let idx = prop.push_element()?;
            let elem = prop.at_mut(idx).expect("just pushed");
            assign_non_multi(elem, &singular, item, append)?;
        }
        prop.react_to_multi_change();
        return Ok(());
    }

    assign_non_multi(prop, attr, value, append)
}

pub(crate) fn assign_non_multi(prop: &mut Property, attr: &Attribute, value: &Json, append: bool) -> ScimResult<()> {
    if attr.data_type == AttributeType::Complex {
        let obj = value.as_object().ok_or_else(|| ScimError::InvalidRequest {
            message: format!("attribute '{}' expects a JSON object", attr.name),
        })?;
        for (key, sub_value) in obj {
            let sub_attr = attr.find_sub_attribute(key).ok_or_else(|| ScimError::InvalidRequest {
                message: format!("unknown attribute '{key}' inside complex attribute '{}'", attr.name),
            })?;
            let sub_prop = prop.dot_mut(&sub_attr.name).ok_or_else(|| {
                ScimError::internal("missing scaffolded property for known sub-attribute")
            })?;
            assign_into(sub_prop, sub_attr, sub_value, append)?;
        }
        prop.react_to_complex_change();
        return Ok(());
    }

    let parsed = parse_scalar(attr, value)?;
    prop.set_simple(parsed)
}

fn parse_scalar(attr: &Attribute, value: &Json) -> ScimResult<Value> {
    let syntax_err = |message: String| ScimError::InvalidSyntax { path: attr.name.clone(), message };

    Ok(match attr.data_type {
        AttributeType::String => Value::String(
            value
                .as_str()
                .ok_or_else(|| syntax_err("expected a string".to_string()))?
                .to_string(),
        ),
        AttributeType::Integer => Value::Int(
            value
                .as_i64()
                .ok_or_else(|| syntax_err("expected an integer".to_string()))?,
        ),
        AttributeType::Decimal => Value::Dec(
            value
                .as_f64()
                .ok_or_else(|| syntax_err("expected a number".to_string()))?,
        ),
        AttributeType::Boolean => Value::Bool(
            value
                .as_bool()
                .ok_or_else(|| syntax_err("expected a boolean".to_string()))?,
        ),
        AttributeType::DateTime => {
            let raw = value.as_str().ok_or_else(|| syntax_err("expected an ISO-8601 string".to_string()))?;
            let dt = chrono::DateTime::parse_from_rfc3339(raw)
                .map_err(|e| syntax_err(format!("invalid dateTime: {e}")))?;
            Value::DateTime(dt.with_timezone(&chrono::Utc))
        }
        AttributeType::Binary => {
            let raw = value.as_str().ok_or_else(|| syntax_err("expected a base64 string".to_string()))?;
            let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, raw)
                .map_err(|e| syntax_err(format!("invalid base64: {e}")))?;
            Value::Bytes(bytes)
        }
        AttributeType::Reference => Value::Ref(
            value
                .as_str()
                .ok_or_else(|| syntax_err("expected a reference string".to_string()))?
                .to_string(),
        ),
        AttributeType::Complex => unreachable!("complex handled by assign_non_multi before parse_scalar"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> (SchemaRegistry, ResourceType) {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap().clone();
        (registry, rt)
    }

    #[test]
    fn decodes_simple_and_complex_attributes() {
        let (registry, rt) = setup();
        let body = json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "bjensen",
            "name": { "givenName": "Barbara", "familyName": "Jensen" }
        });
        let res = decode(&registry, &rt, &body).unwrap();
        assert_eq!(
            res.dot("userName").unwrap().value(),
            Some(&Value::String("bjensen".into()))
        );
        assert_eq!(
            res.dot("name").unwrap().dot("givenName").unwrap().value(),
            Some(&Value::String("Barbara".into()))
        );
    }

    #[test]
    fn single_element_accepted_for_multivalued_attribute() {
        let (registry, rt) = setup();
        let body = json!({ "userName": "x", "emails": { "value": "a@b.com" } });
        let res = decode(&registry, &rt, &body).unwrap();
        assert_eq!(res.dot("emails").unwrap().len(), 1);
    }

    #[test]
    fn unknown_root_key_is_rejected() {
        let (registry, rt) = setup();
        let body = json!({ "userName": "x", "bogus": 1 });
        let err = decode(&registry, &rt, &body).unwrap_err();
        assert!(matches!(err, ScimError::InvalidRequest { .. }));
    }

    #[test]
    fn unknown_key_inside_complex_attribute_is_rejected() {
        let (registry, rt) = setup();
        let body = json!({ "userName": "x", "name": { "bogus": "y" } });
        let err = decode(&registry, &rt, &body).unwrap_err();
        assert!(matches!(err, ScimError::InvalidRequest { .. }));
    }

    #[test]
    fn extension_urn_key_populates_extension_subtree_and_schemas() {
        let (registry, rt) = setup();
        let ext_urn = rt.schema_extensions[0].schema.clone();
        let body = json!({
            "userName": "x",
            (ext_urn.clone()): { "employeeNumber": "701" }
        });
        let res = decode(&registry, &rt, &body).unwrap();
        assert!(res.schemas().contains(&ext_urn));
        assert_eq!(
            res.dot(&ext_urn).unwrap().dot("employeeNumber").unwrap().value(),
            Some(&Value::String("701".into()))
        );
    }

    #[test]
    fn null_value_clears_property() {
        let (registry, rt) = setup();
        let body = json!({ "userName": "x", "displayName": "y" });
        let mut res = decode(&registry, &rt, &body).unwrap();
        assert!(res.dot("displayName").unwrap().is_assigned());
        let clear = json!({ "displayName": null });
        for (key, value) in clear.as_object().unwrap() {
            let attr = registry.lookup(&rt.schema).unwrap().find_attribute(key).unwrap().clone();
            let prop = res.dot_mut(&attr.name).unwrap();
            assign_into(prop, &attr, value, false).unwrap();
        }
        assert!(!res.dot("displayName").unwrap().is_assigned());
    }
}
