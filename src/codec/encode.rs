//! Schema-directed serialization with `returned`/projection honoring.

use super::Projection;
use crate::resource::property::Node;
use crate::resource::{Property, Resource};
use crate::schema::{Attribute, ResourceType, SchemaRegistry};
use serde_json::{Map, Value as Json};

/// Encode `resource` to its wire JSON form, applying `projection` on top of
/// each attribute's declared `returned` policy.
pub fn encode(registry: &SchemaRegistry, rt: &ResourceType, resource: &Resource, projection: &Projection) -> Json {
    let mut map = Map::new();
    map.insert(
        "schemas".to_string(),
        Json::Array(resource.schemas().into_iter().map(Json::String).collect()),
    );

    if let Some(main_schema) = registry.lookup(&rt.schema) {
        for attr in &main_schema.attributes {
            if attr.name.eq_ignore_ascii_case("schemas") {
                continue;
            }
            if let Some(child) = resource.dot(&attr.name) {
                encode_into(&mut map, attr, child, &attr.name.to_lowercase(), projection);
            }
        }
    }

    for ext in &rt.schema_extensions {
        if let Some(child) = resource.dot(&ext.schema) {
            if child.is_assigned() {
                if let Some(obj) = encode_complex_object(child, &ext.schema.to_lowercase(), projection) {
                    map.insert(ext.schema.clone(), Json::Object(obj));
                }
            }
        }
    }

    Json::Object(map)
}

fn encode_into(map: &mut Map<String, Json>, attr: &Attribute, prop: &Property, path: &str, projection: &Projection) {
    if !projection.allows(path, attr.returned) {
        return;
    }
    if !prop.is_assigned() && attr.returned != crate::schema::Returned::Always {
        return;
    }
    if let Some(v) = encode_value(prop, path, projection) {
        map.insert(attr.name.clone(), v);
    }
}

fn encode_value(prop: &Property, path: &str, projection: &Projection) -> Option<Json> {
    match &prop.node {
        Node::Simple(Some(v)) => Some(v.to_json()),
        Node::Simple(None) => None,
        Node::Complex(_) => encode_complex_object(prop, path, projection).map(Json::Object),
        Node::Multi(elements) => {
            if elements.is_empty() {
                return None;
            }
            let items: Vec<Json> = elements
                .iter()
                .filter_map(|e| match &e.node {
                    Node::Simple(_) => encode_value(e, path, projection),
                    Node::Complex(_) => encode_complex_object(e, path, projection).map(Json::Object),
                    Node::Multi(_) => None,
                })
                .collect();
            Some(Json::Array(items))
        }
    }
}

fn encode_complex_object(prop: &Property, path: &str, projection: &Projection) -> Option<Map<String, Json>> {
    let mut map = Map::new();
    for child in prop.children() {
        let child_path = format!("{path}.{}", child.attr.name.to_lowercase());
        encode_into(&mut map, &child.attr, child, &child_path, projection);
    }
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use serde_json::json;

    fn setup() -> (SchemaRegistry, ResourceType) {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap().clone();
        (registry, rt)
    }

    #[test]
    fn password_is_never_returned() {
        let (registry, rt) = setup();
        let body = json!({ "userName": "bjensen", "password": "s3cr3t" });
        let res = decode(&registry, &rt, &body).unwrap();
        let out = encode(&registry, &rt, &res, &Projection::none());
        assert!(out.get("password").is_none());
    }

    #[test]
    fn default_returned_is_excluded_by_excludedattributes() {
        let (registry, rt) = setup();
        let body = json!({ "userName": "bjensen", "displayName": "Babs" });
        let res = decode(&registry, &rt, &body).unwrap();
        let exclude = vec![crate::filter::compile_path_only("displayName").unwrap()];
        let proj = Projection::from_paths(&[], &exclude);
        let out = encode(&registry, &rt, &res, &proj);
        assert!(out.get("displayName").is_none());
        assert_eq!(out.get("userName").unwrap(), "bjensen");
    }

    #[test]
    fn unassigned_optional_attribute_is_omitted() {
        let (registry, rt) = setup();
        let body = json!({ "userName": "bjensen" });
        let res = decode(&registry, &rt, &body).unwrap();
        let out = encode(&registry, &rt, &res, &Projection::none());
        assert!(out.get("displayName").is_none());
        assert!(out.get("name").is_none());
    }

    #[test]
    fn schemas_always_present() {
        let (registry, rt) = setup();
        let body = json!({ "userName": "bjensen" });
        let res = decode(&registry, &rt, &body).unwrap();
        let out = encode(&registry, &rt, &res, &Projection::none());
        assert_eq!(
            out.get("schemas").unwrap(),
            &json!(["urn:ietf:params:scim:schemas:core:2.0:User"])
        );
    }
}
