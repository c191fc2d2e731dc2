//! Walks a compiled [`Expr`] against a [`Property`] tree.
//!
//! Multivalued path traversal matches if any element satisfies the
//! remainder of the path — implemented by treating a `Multi` node as
//! transparent during resolution: when the walk reaches one, it fans out
//! into every element with the same remaining segments rather than
//! consuming one.

use super::ast::{CompareOp, Expr, Literal, PathExpr};
use crate::error::ScimError;
use crate::resource::property::Node;
use crate::resource::{Property, Value};
use chrono::{DateTime, Utc};

/// Evaluate `expr` against `root` — typically a [`crate::resource::Resource`]'s
/// root property, but any complex property works (e.g. a value-filter
/// element).
pub fn evaluate(expr: &Expr, root: &Property) -> Result<bool, ScimError> {
    match expr {
        Expr::And(a, b) => Ok(evaluate(a, root)? && evaluate(b, root)?),
        Expr::Or(a, b) => Ok(evaluate(a, root)? || evaluate(b, root)?),
        Expr::Not(inner) => Ok(!evaluate(inner, root)?),
        Expr::Present(path) => Ok(resolve_all(root, path).iter().any(|p| is_present(p))),
        Expr::Compare(path, op, lit) => {
            let candidates = resolve_all(root, path);
            if candidates.is_empty() {
                return Ok(matches!(op, CompareOp::Ne) && matches!(lit, Literal::Null));
            }
            let mut saw_ok_false = false;
            for candidate in candidates {
                match compare_one(candidate, *op, lit) {
                    Ok(true) => return Ok(true),
                    Ok(false) => saw_ok_false = true,
                    Err(e) => {
                        if !saw_ok_false {
                            return Err(e);
                        }
                    }
                }
            }
            Ok(false)
        }
        Expr::ValuePath(path, sub) => match navigate(root, path) {
            None => Ok(false),
            Some(node) => match &node.node {
                Node::Multi(elements) => {
                    for el in elements {
                        if evaluate(sub, el)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                _ => evaluate(sub, node),
            },
        },
    }
}

fn is_present(p: &Property) -> bool {
    p.is_present()
}

/// Resolve every candidate property `path` can reach from `root`, fanning
/// out through any `Multi` node encountered along the way.
fn resolve_all<'a>(root: &'a Property, path: &PathExpr) -> Vec<&'a Property> {
    let start = match &path.urn {
        Some(urn) => match root.dot(urn) {
            Some(p) => p,
            None => return Vec::new(),
        },
        None => root,
    };
    walk(start, &path.segments)
}

fn walk<'a>(node: &'a Property, segments: &[String]) -> Vec<&'a Property> {
    if let Node::Multi(elements) = &node.node {
        return elements.iter().flat_map(|e| walk(e, segments)).collect();
    }
    match segments.split_first() {
        None => vec![node],
        Some((head, rest)) => match node.dot(head) {
            Some(child) => walk(child, rest),
            None => Vec::new(),
        },
    }
}

/// Plain (non-fan-out) navigation: consumes every segment via `dot`,
/// descending straight through without treating `Multi` specially. Used by
/// `ValuePath`, whose container attribute is the multivalued node itself.
fn navigate<'a>(root: &'a Property, path: &PathExpr) -> Option<&'a Property> {
    let mut node = match &path.urn {
        Some(urn) => root.dot(urn)?,
        None => root,
    };
    for seg in &path.segments {
        node = node.dot(seg)?;
    }
    Some(node)
}

fn compare_one(prop: &Property, op: CompareOp, lit: &Literal) -> Result<bool, ScimError> {
    if matches!(lit, Literal::Null) {
        let present = is_present(prop);
        return Ok(match op {
            CompareOp::Eq => !present,
            CompareOp::Ne => present,
            _ => {
                return Err(incompatible_op(prop, op));
            }
        });
    }

    let case_exact = prop.attr.case_exact;
    let rhs = literal_to_value(prop, lit)?;
    let lhs = match prop.value() {
        Some(v) => v,
        None => return Ok(false),
    };

    match op {
        CompareOp::Eq => Ok(lhs.canonical_string(case_exact) == rhs.canonical_string(case_exact)),
        CompareOp::Ne => Ok(lhs.canonical_string(case_exact) != rhs.canonical_string(case_exact)),
        CompareOp::Co | CompareOp::Sw | CompareOp::Ew => {
            let (Value::String(_) | Value::Ref(_), Value::String(_) | Value::Ref(_)) = (lhs, &rhs)
            else {
                return Err(incompatible_op(prop, op));
            };
            let l = lhs.canonical_string(case_exact);
            let r = rhs.canonical_string(case_exact);
            Ok(match op {
                CompareOp::Co => l.contains(&r),
                CompareOp::Sw => l.starts_with(&r),
                CompareOp::Ew => l.ends_with(&r),
                _ => unreachable!(),
            })
        }
        CompareOp::Gt | CompareOp::Ge | CompareOp::Lt | CompareOp::Le => {
            let ord = lhs
                .partial_compare(&rhs, case_exact)
                .ok_or_else(|| incompatible_op(prop, op))?;
            Ok(match op {
                CompareOp::Gt => ord.is_gt(),
                CompareOp::Ge => ord.is_ge(),
                CompareOp::Lt => ord.is_lt(),
                CompareOp::Le => ord.is_le(),
                _ => unreachable!(),
            })
        }
    }
}

fn incompatible_op(prop: &Property, op: CompareOp) -> ScimError {
    ScimError::InvalidFilter {
        expression: prop.attr.path.clone(),
        message: format!(
            "incompatible-op: '{}' is not applicable to attribute '{}' of type {:?}",
            op.as_str(),
            prop.attr.name,
            prop.attr.data_type
        ),
    }
}

fn literal_to_value(prop: &Property, lit: &Literal) -> Result<Value, ScimError> {
    use crate::schema::AttributeType as T;

    if prop.attr.data_type == T::DateTime {
        let raw = match lit {
            Literal::DateTime(s) | Literal::Str(s) => s.as_str(),
            _ => {
                return Err(ScimError::InvalidSyntax {
                    path: prop.attr.path.clone(),
                    message: "expected a dateTime literal".to_string(),
                })
            }
        };
        return Ok(Value::DateTime(parse_datetime(raw)?));
    }

    Ok(match lit {
        Literal::Number(n) if prop.attr.data_type == T::Integer => Value::Int(*n as i64),
        Literal::Number(n) => Value::Dec(*n),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Str(s) => Value::String(s.clone()),
        Literal::DateTime(s) => Value::DateTime(parse_datetime(s)?),
        Literal::Null => unreachable!("Literal::Null handled by compare_one before literal_to_value"),
    })
}

/// Parse an ISO-8601 `dateTime` literal, seconds precision: accepts an
/// explicit offset or a bare `Z`.
fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, ScimError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ScimError::InvalidSyntax {
            path: "dateTime literal".to_string(),
            message: e.to_string(),
        })
}

/// Sort key extraction: single comparable value for a
/// compiled path. For a multivalued complex attribute with an `@Primary`
/// sub-attribute, the key comes from the element whose primary is `true`,
/// else the first element.
pub fn extract_sort_key(root: &Property, path: &PathExpr) -> Option<Value> {
    let start = match &path.urn {
        Some(urn) => root.dot(urn)?,
        None => root,
    };
    extract(start, &path.segments).and_then(Property::value).cloned()
}

fn extract<'a>(node: &'a Property, segments: &[String]) -> Option<&'a Property> {
    if let Node::Multi(elements) = &node.node {
        if elements.is_empty() {
            return None;
        }
        let marker = node
            .attr
            .sub_attributes
            .iter()
            .find(|a| a.is_primary_marker())
            .map(|a| a.name.clone());
        let chosen = marker
            .and_then(|m| {
                elements
                    .iter()
                    .find(|e| matches!(e.dot(&m).and_then(Property::value), Some(Value::Bool(true))))
            })
            .unwrap_or(&elements[0]);
        return extract(chosen, segments);
    }
    match segments.split_first() {
        None => Some(node),
        Some((head, rest)) => node.dot(head).and_then(|c| extract(c, rest)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::compile;
    use crate::resource::Resource;
    use crate::schema::SchemaRegistry;

    fn sample_user() -> Resource {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap();
        let mut res = Resource::empty(&registry, rt).unwrap();
        res.dot_mut("userName")
            .unwrap()
            .set_simple(Value::String("bjensen".into()))
            .unwrap();
        let emails = res.dot_mut("emails").unwrap();
        let i0 = emails.push_element().unwrap();
        emails.at_mut(i0).unwrap().dot_mut("value").unwrap().set_simple(Value::String("b@example.com".into())).unwrap();
        emails.at_mut(i0).unwrap().dot_mut("type").unwrap().set_simple(Value::String("work".into())).unwrap();
        emails.at_mut(i0).unwrap().dot_mut("primary").unwrap().set_simple(Value::Bool(true)).unwrap();
        emails.react_to_multi_change();
        res
    }

    #[test]
    fn pr_matches_presence() {
        let res = sample_user();
        let expr = compile("userName pr").unwrap();
        assert!(evaluate(&expr, res.root()).unwrap());
        let expr = compile("nickName pr").unwrap();
        assert!(!evaluate(&expr, res.root()).unwrap());
    }

    #[test]
    fn not_inverts_result() {
        let res = sample_user();
        let expr = compile("not (userName pr)").unwrap();
        assert!(!evaluate(&expr, res.root()).unwrap());
    }

    #[test]
    fn and_or_are_short_circuit_free_boolean_combinators() {
        let res = sample_user();
        assert!(evaluate(&compile("userName pr and emails pr").unwrap(), res.root()).unwrap());
        assert!(!evaluate(&compile("userName pr and nickName pr").unwrap(), res.root()).unwrap());
        assert!(evaluate(&compile("nickName pr or userName pr").unwrap(), res.root()).unwrap());
    }

    #[test]
    fn multivalued_dotted_path_matches_any_element() {
        let res = sample_user();
        let expr = compile("emails.value eq \"b@example.com\"").unwrap();
        assert!(evaluate(&expr, res.root()).unwrap());
    }

    #[test]
    fn value_path_predicate_matches_element_conjunction() {
        let res = sample_user();
        let expr = compile("emails[type eq \"work\" and primary eq true]").unwrap();
        assert!(evaluate(&expr, res.root()).unwrap());
        let expr = compile("emails[type eq \"home\"]").unwrap();
        assert!(!evaluate(&expr, res.root()).unwrap());
    }

    #[test]
    fn gt_on_boolean_is_incompatible_op() {
        let res = sample_user();
        let expr = compile("active gt true").unwrap();
        assert!(evaluate(&expr, res.root()).is_err());
    }

    #[test]
    fn sort_key_picks_primary_element() {
        let res = sample_user();
        let path = crate::filter::compile_path_only("emails.value").unwrap();
        let key = extract_sort_key(res.root(), &path);
        assert_eq!(key, Some(Value::String("b@example.com".into())));
    }
}
