//! The Filter/Path Compiler and Evaluator (RFC 7644 §3.4.2.2): lexes and
//! parses SCIM filter/path expressions into a binary expression tree, then
//! walks that tree against a [`crate::resource::Property`] tree.
//!
//! ```text
//! lexer (lexer.rs) -> parser (parser.rs, Pratt-style precedence climbing)
//!      -> Expr (ast.rs) -> evaluator (evaluator.rs)
//! ```
//!
//! No parser-generator crate is used; a small hand-written recursive-descent
//! compiler is the idiomatic shape for a DSL this size when nothing in the
//! dependency tree already brings one in.

pub mod ast;
pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use ast::{CompareOp, Expr, Literal, PathExpr};
pub use evaluator::{evaluate, extract_sort_key};

use crate::error::ScimResult;

/// Compile a full filter expression against the RFC 7644 §3.4.2.2 grammar.
pub fn compile(source: &str) -> ScimResult<Expr> {
    parser::Parser::parse(source).map_err(Into::into)
}

/// Compile a bare attribute path with no relational/logical grammar —
/// what `attributes`/`excludedAttributes`/`sortBy` carry.
pub fn compile_path_only(source: &str) -> ScimResult<PathExpr> {
    parser::Parser::parse_path_only(source).map_err(Into::into)
}

/// Split a raw path token into its URN prefix (if any) and dotted
/// segments, reusing the same split rule as [`crate::schema::path::AttrPath`]
/// so a path resolves identically whether the Schema Registry or the
/// Filter Compiler is the one parsing it.
pub(crate) fn compile_path(raw: &str) -> PathExpr {
    let parsed = crate::schema::path::AttrPath::parse(raw);
    PathExpr {
        urn: parsed.urn,
        segments: parsed.segments,
    }
}
