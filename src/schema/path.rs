//! URN-prefixed dotted path parsing, shared by the Schema Registry
//! (attribute resolution) and the Filter/Path Compiler.
//!
//! `urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager.value`
//! splits into a URN step (`urn:...:User`) followed by dotted attribute
//! steps (`manager`, `value`). A bare `userName` or `name.givenName` has no
//! URN step at all.

/// A parsed `schema:attr.sub` path, URN-prefix-aware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPath {
    /// Registered URN this path is scoped to, if the input had one.
    pub urn: Option<String>,
    /// Dotted attribute name segments, root to leaf.
    pub segments: Vec<String>,
}

impl AttrPath {
    /// Parse a raw path expression. Recognizes a leading `urn:...:` prefix
    /// terminated by the *last* `:` before the attribute path — SCIM URNs
    /// themselves contain colons, so the split point is the final colon in
    /// the string, not the first.
    pub fn parse(raw: &str) -> AttrPath {
        if let Some(idx) = raw.rfind(':') {
            let (urn, rest) = raw.split_at(idx);
            let rest = &rest[1..]; // drop the colon
            if !rest.is_empty() && !urn.is_empty() {
                return AttrPath {
                    urn: Some(urn.to_string()),
                    segments: rest.split('.').map(|s| s.to_string()).collect(),
                };
            }
        }
        AttrPath {
            urn: None,
            segments: raw.split('.').map(|s| s.to_string()).collect(),
        }
    }

    /// The leaf (final) segment name.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(|s| s.as_str()).unwrap_or("")
    }
}
