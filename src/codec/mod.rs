//! The schema-directed JSON Codec: decodes a wire JSON
//! body into a [`crate::resource::Resource`] by routing each key to the
//! matching sub-attribute on the current complex node, and serializes a
//! `Resource` back out honoring each attribute's `returned` policy plus an
//! include/exclude projection.
//!
//! Built directly on `serde_json::Value` rather than `serde`'s derive
//! machinery, since the attribute set is schema-driven at runtime.

pub mod decode;
pub mod encode;

pub use decode::decode;
pub use encode::encode;

use crate::filter::PathExpr;

/// A resolved include/exclude projection: dotted path strings (case folded)
/// an encoded attribute path is checked against.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Projection {
    pub fn none() -> Self {
        Projection::default()
    }

    pub fn from_paths(include: &[PathExpr], exclude: &[PathExpr]) -> Self {
        Projection {
            include: include.iter().map(|p| p.segments.join(".").to_lowercase()).collect(),
            exclude: exclude.iter().map(|p| p.segments.join(".").to_lowercase()).collect(),
        }
    }

    /// Whether `dotted_path` (already lower-cased) should be emitted given
    /// `returned`'s base policy. `returned=never` is handled by the caller
    /// before consulting the projection at all.
    pub fn allows(&self, dotted_path: &str, returned: crate::schema::Returned) -> bool {
        use crate::schema::Returned as R;
        let path = dotted_path.to_lowercase();
        match returned {
            R::Never => false,
            R::Always => true,
            R::Request => self.path_matches(&self.include, &path),
            R::Default => !self.path_matches(&self.exclude, &path),
        }
    }

    fn path_matches(&self, list: &[String], path: &str) -> bool {
        list.iter().any(|p| {
            p == path
                || path.starts_with(&format!("{p}."))
                || p.starts_with(&format!("{path}."))
        })
    }
}
