//! `Patch` (RFC 7644 §3.5.2): applies a `PatchOp` request
//! body's `Operations` array to a clone of the stored resource, then runs
//! it through [`crate::chain::patch_post_chain`].
//!
//! The path grammar a PATCH operation's `path` carries
//! (`attrPath ("[" valFilter "]")? ("." subAttr)?`) is richer than what
//! [`crate::filter::compile`]/[`crate::filter::compile_path_only`] parse on
//! their own — `compile_path_only` stops at a bracket, and `compile`'s
//! `attrPath[filter]` production has nothing after the closing bracket.
//! [`parse_patch_path`] below splits the string by hand: the part before
//! `[` goes through `compile_path_only`, the bracket's interior through
//! `compile` (a full boolean `Expr`, evaluated per element), and a
//! trailing `.subAttr` is carried as a bare string rather than re-parsed.

use crate::chain;
use crate::config::ServiceProviderConfig;
use crate::error::{ScimError, ScimResult};
use crate::filter::{self, Expr, PathExpr};
use crate::resource::{Property, Resource};
use crate::schema::{ResourceType, SchemaRegistry};
use crate::storage::ResourceStore;
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;

use super::{check_precondition, PatchOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

#[derive(Debug, Clone)]
pub struct PatchOperation {
    pub op: PatchOpKind,
    pub path: Option<String>,
    pub value: Option<Json>,
}

/// Parse a `PatchOp` request body's `Operations` array.
pub fn parse_operations(body: &Json) -> ScimResult<Vec<PatchOperation>> {
    let ops = body
        .get("Operations")
        .and_then(Json::as_array)
        .ok_or_else(|| ScimError::InvalidRequest {
            message: "PatchOp body must carry an 'Operations' array".to_string(),
        })?;
    ops.iter().map(parse_one).collect()
}

fn parse_one(raw: &Json) -> ScimResult<PatchOperation> {
    let obj = raw.as_object().ok_or_else(|| ScimError::InvalidRequest {
        message: "each PATCH operation must be a JSON object".to_string(),
    })?;
    let op_str = obj
        .get("op")
        .and_then(Json::as_str)
        .ok_or_else(|| ScimError::InvalidRequest {
            message: "PATCH operation missing 'op'".to_string(),
        })?;
    let op = match op_str.to_lowercase().as_str() {
        "add" => PatchOpKind::Add,
        "replace" => PatchOpKind::Replace,
        "remove" => PatchOpKind::Remove,
        other => {
            return Err(ScimError::InvalidRequest {
                message: format!("unknown PATCH op '{other}'"),
            })
        }
    };
    let path = obj.get("path").and_then(Json::as_str).map(str::to_string);
    if op == PatchOpKind::Remove && path.is_none() {
        return Err(ScimError::NoTarget { path: String::new() });
    }
    Ok(PatchOperation {
        op,
        path,
        value: obj.get("value").cloned(),
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn patch<S: ResourceStore>(
    resource_type: &str,
    id: &str,
    operations: &[PatchOperation],
    if_match: Option<&str>,
    registry: &SchemaRegistry,
    rt: &ResourceType,
    cfg: &ServiceProviderConfig,
    store: &S,
    now: chrono::DateTime<chrono::Utc>,
    cancel: &CancellationToken,
) -> ScimResult<PatchOutcome> {
    let reference = store
        .get(resource_type, id, cancel)
        .await?
        .ok_or_else(|| ScimError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        })?;
    check_precondition(cfg, if_match, &reference)?;

    let mut payload = reference.clone();
    for op in operations {
        apply_operation(&mut payload, registry, rt, op)?;
    }
    payload.sync_schemas(rt);

    chain::patch_post_chain(&mut payload, &reference, registry, rt, store, cfg.bcrypt_cost, now, cancel).await?;

    if payload.hash() == reference.hash() {
        return Ok(PatchOutcome { patched: false, resource: reference });
    }
    store.replace(resource_type, &reference, payload.clone(), cancel).await?;
    Ok(PatchOutcome { patched: true, resource: payload })
}

fn apply_operation(resource: &mut Resource, registry: &SchemaRegistry, rt: &ResourceType, op: &PatchOperation) -> ScimResult<()> {
    let append = op.op == PatchOpKind::Add;

    let Some(raw_path) = &op.path else {
        let value = op.value.as_ref().ok_or_else(|| ScimError::InvalidRequest {
            message: "add/replace with no path requires a 'value'".to_string(),
        })?;
        return merge_root(resource, registry, rt, value, append);
    };

    let patch_path = parse_patch_path(raw_path)?;

    match &patch_path.value_filter {
        None => apply_to_path(resource, &patch_path.base, patch_path.sub.as_deref(), op, append, raw_path),
        Some(filter_expr) => apply_to_filtered_elements(resource, &patch_path.base, filter_expr, patch_path.sub.as_deref(), op, append, raw_path),
    }
}

struct PatchPath {
    base: PathExpr,
    value_filter: Option<Expr>,
    sub: Option<String>,
}

fn parse_patch_path(raw: &str) -> ScimResult<PatchPath> {
    let invalid = |message: &str| ScimError::InvalidPath { path: raw.to_string(), message: message.to_string() };

    let Some(lb) = raw.find('[') else {
        return Ok(PatchPath { base: filter::compile_path_only(raw)?, value_filter: None, sub: None });
    };
    let rb = raw.rfind(']').ok_or_else(|| invalid("unterminated '['"))?;
    if rb < lb {
        return Err(invalid("unterminated '['"));
    }

    let base = filter::compile_path_only(&raw[..lb])?;
    let value_filter = filter::compile(&raw[lb + 1..rb])?;
    let rest = &raw[rb + 1..];
    let sub = if rest.is_empty() {
        None
    } else if let Some(stripped) = rest.strip_prefix('.') {
        if stripped.is_empty() {
            return Err(invalid("empty sub-attribute after '.'"));
        }
        Some(stripped.to_string())
    } else {
        return Err(invalid("unexpected trailing characters after ']'"));
    };

    Ok(PatchPath { base, value_filter: Some(value_filter), sub })
}

/// A plain path with no value-filter: `path` (simple/complex/whole multi).
fn apply_to_path(
    resource: &mut Resource,
    base: &PathExpr,
    sub: Option<&str>,
    op: &PatchOperation,
    append: bool,
    raw_path: &str,
) -> ScimResult<()> {
    debug_assert!(sub.is_none(), "a trailing sub-attribute only ever follows a bracket");
    let target = navigate_mut(resource, base).ok_or_else(|| ScimError::InvalidPath {
        path: raw_path.to_string(),
        message: "attribute not found".to_string(),
    })?;

    match op.op {
        PatchOpKind::Remove => {
            target.clear();
            target.react_to_multi_change();
        }
        PatchOpKind::Add | PatchOpKind::Replace => {
            let value = op.value.as_ref().ok_or_else(|| ScimError::InvalidRequest {
                message: format!("op '{}' for path '{raw_path}' requires a 'value'", op_name(op.op)),
            })?;
            let attr = target.attr.clone();
            crate::codec::decode::assign_into(target, &attr, value, append)?;
        }
    }
    Ok(())
}

/// `attrPath[valueFilter]` with an optional trailing `.subAttr` — `base`
/// names a multivalued attribute; every element the filter matches is the
/// operation's target.
fn apply_to_filtered_elements(
    resource: &mut Resource,
    base: &PathExpr,
    filter_expr: &Expr,
    sub: Option<&str>,
    op: &PatchOperation,
    append: bool,
    raw_path: &str,
) -> ScimResult<()> {
    let target = navigate_mut(resource, base).ok_or_else(|| ScimError::InvalidPath {
        path: raw_path.to_string(),
        message: "attribute not found".to_string(),
    })?;

    let mut matches = Vec::new();
    for (idx, el) in target.elements().iter().enumerate() {
        if filter::evaluate(filter_expr, el)? {
            matches.push(idx);
        }
    }
    if matches.is_empty() {
        return Err(ScimError::NoTarget { path: raw_path.to_string() });
    }

    match (op.op, sub) {
        (PatchOpKind::Remove, None) => {
            for idx in matches.into_iter().rev() {
                target.remove_element(idx)?;
            }
        }
        (PatchOpKind::Remove, Some(sub_name)) => {
            for idx in matches {
                let elem = target.at_mut(idx).expect("matched index is in range");
                if let Some(sub_prop) = elem.dot_mut(sub_name) {
                    sub_prop.clear();
                }
                elem.react_to_complex_change();
            }
        }
        (PatchOpKind::Add | PatchOpKind::Replace, None) => {
            let value = op.value.as_ref().ok_or_else(|| ScimError::InvalidRequest {
                message: format!("op '{}' for path '{raw_path}' requires a 'value'", op_name(op.op)),
            })?;
            let obj = value.as_object().ok_or_else(|| ScimError::InvalidRequest {
                message: format!("op '{}' for path '{raw_path}' requires an object 'value'", op_name(op.op)),
            })?;
            for idx in matches {
                let elem = target.at_mut(idx).expect("matched index is in range");
                let elem_attr = elem.attr.clone();
                for (key, sub_value) in obj {
                    let sub_attr = elem_attr.find_sub_attribute(key).ok_or_else(|| ScimError::InvalidRequest {
                        message: format!("unknown attribute '{key}' for path '{raw_path}'"),
                    })?;
                    let sub_prop = elem
                        .dot_mut(&sub_attr.name)
                        .ok_or_else(|| ScimError::internal("missing scaffolded sub-attribute property"))?;
                    crate::codec::decode::assign_into(sub_prop, sub_attr, sub_value, append)?;
                }
                elem.react_to_complex_change();
            }
        }
        (PatchOpKind::Add | PatchOpKind::Replace, Some(sub_name)) => {
            let value = op.value.as_ref().ok_or_else(|| ScimError::InvalidRequest {
                message: format!("op '{}' for path '{raw_path}' requires a 'value'", op_name(op.op)),
            })?;
            for idx in matches {
                let elem = target.at_mut(idx).expect("matched index is in range");
                let elem_attr = elem.attr.clone();
                let sub_attr = elem_attr.find_sub_attribute(sub_name).ok_or_else(|| ScimError::InvalidRequest {
                    message: format!("unknown attribute '{sub_name}' for path '{raw_path}'"),
                })?;
                let sub_prop = elem
                    .dot_mut(&sub_attr.name)
                    .ok_or_else(|| ScimError::internal("missing scaffolded sub-attribute property"))?;
                crate::codec::decode::assign_into(sub_prop, sub_attr, value, append)?;
                elem.react_to_complex_change();
            }
        }
    }

    target.react_to_multi_change();
    Ok(())
}

fn op_name(op: PatchOpKind) -> &'static str {
    match op {
        PatchOpKind::Add => "add",
        PatchOpKind::Replace => "replace",
        PatchOpKind::Remove => "remove",
    }
}

/// Apply a path-less add/replace's object `value` the way
/// [`crate::codec::decode::decode`] routes a whole resource body's
/// top-level keys, including extension URN keys.
fn merge_root(resource: &mut Resource, registry: &SchemaRegistry, rt: &ResourceType, value: &Json, append: bool) -> ScimResult<()> {
    let obj = value.as_object().ok_or_else(|| ScimError::InvalidRequest {
        message: "add/replace with no path requires an object 'value'".to_string(),
    })?;
    let main_schema = registry
        .lookup(&rt.schema)
        .ok_or_else(|| ScimError::SchemaNotFound { schema_id: rt.schema.clone() })?;

    for (key, val) in obj {
        if key.eq_ignore_ascii_case("schemas") {
            continue;
        }
        if let Some(attr) = main_schema.find_attribute(key) {
            let prop = resource
                .dot_mut(&attr.name)
                .ok_or_else(|| ScimError::internal("missing scaffolded property for known attribute"))?;
            crate::codec::decode::assign_into(prop, attr, val, append)?;
            continue;
        }
        if let Some(ext) = rt.schema_extensions.iter().find(|e| e.schema.eq_ignore_ascii_case(key)) {
            let ext_schema = registry
                .lookup(&ext.schema)
                .ok_or_else(|| ScimError::SchemaNotFound { schema_id: ext.schema.clone() })?;
            let ext_obj = val.as_object().ok_or_else(|| ScimError::InvalidRequest {
                message: format!("extension '{key}' must be a JSON object"),
            })?;
            let ext_prop = resource
                .dot_mut(&ext.schema)
                .ok_or_else(|| ScimError::internal("missing scaffolded extension property"))?;
            for (sub_key, sub_val) in ext_obj {
                let sub_attr = ext_schema.find_attribute(sub_key).ok_or_else(|| ScimError::InvalidRequest {
                    message: format!("unknown attribute '{sub_key}' in extension '{key}'"),
                })?;
                let sub_prop = ext_prop.dot_mut(&sub_attr.name).ok_or_else(|| {
                    ScimError::internal("missing scaffolded property for known extension attribute")
                })?;
                crate::codec::decode::assign_into(sub_prop, sub_attr, sub_val, append)?;
            }
            continue;
        }
        return Err(ScimError::InvalidRequest {
            message: format!("unknown attribute '{key}' at resource root"),
        });
    }
    Ok(())
}

/// Descend `resource` to the property `path` names: through the extension
/// subtree keyed by URN first when `path.urn` is set, then every dotted
/// segment in order.
fn navigate_mut<'a>(resource: &'a mut Resource, path: &PathExpr) -> Option<&'a mut Property> {
    let mut node: &mut Property = match &path.urn {
        Some(urn) => resource.dot_mut(urn)?,
        None => resource.root_mut(),
    };
    for seg in &path.segments {
        node = node.dot_mut(seg)?;
    }
    Some(node)
}
