//! The compiled output of the Filter/Path Compiler: a
//! binary expression tree whose nodes are Path, Literal, a relational
//! comparator, or a logical connective.

/// A parsed, URN-prefix-aware attribute path: `a.b` or `urn:...:a.b`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub urn: Option<String>,
    pub segments: Vec<String>,
}

impl PathExpr {
    pub fn bare(segments: Vec<String>) -> Self {
        PathExpr { urn: None, segments }
    }

    /// Render back to a dotted (optionally URN-prefixed) string, mainly
    /// for error messages.
    pub fn to_raw(&self) -> String {
        let body = self.segments.join(".");
        match &self.urn {
            Some(urn) => format!("{urn}:{body}"),
            None => body,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Co => "co",
            CompareOp::Sw => "sw",
            CompareOp::Ew => "ew",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        }
    }
}

/// A literal value appearing on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Number(f64),
    Bool(bool),
    DateTime(String),
    Null,
}

/// A compiled filter or path expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// `attr pr`
    Present(PathExpr),
    /// `attr op value`
    Compare(PathExpr, CompareOp, Literal),
    /// `attr[subFilter]` — `subFilter` is evaluated against each element of
    /// the multivalued complex attribute at `attr`, with paths in
    /// `subFilter` relative to the element (no `attr` prefix repeated).
    ValuePath(PathExpr, Box<Expr>),
}
