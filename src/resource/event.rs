//! Property-local event plumbing: a property's annotation-driven reactions
//! (`@ExclusivePrimary`, `@AutoCompact`, `@StateSummary`, `@SyncSchema`)
//! observe only the events raised on the property they're attached to and
//! its descendants, and describe their follow-up as a [`Reaction`] rather
//! than mutating the tree directly mid-dispatch (the node raising the
//! event is already mutably borrowed). The caller applies the returned
//! reaction afterward. This keeps each reaction local and composable
//! instead of routed through a global dispatcher.

use super::value::Value;

/// What happened to a child slot.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A value was assigned at `path` (complex sub-attribute set, or a new
    /// element appended to a multivalued attribute).
    Assigned { path: String, value: Value },
    /// A previously assigned value at `path` was cleared or removed.
    Unassigned { path: String },
}

/// An event raised against a property, carrying the path relative to the
/// property the subscriber was registered on.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
}

impl Event {
    pub fn assigned(path: impl Into<String>, value: Value) -> Self {
        Event {
            kind: EventKind::Assigned {
                path: path.into(),
                value,
            },
        }
    }

    pub fn unassigned(path: impl Into<String>) -> Self {
        Event {
            kind: EventKind::Unassigned { path: path.into() },
        }
    }
}

/// A side effect a subscriber wants applied to the property it observed.
/// Subscribers don't mutate the tree directly from inside the event
/// dispatch (that would need a second mutable borrow of the same node);
/// instead they describe what should happen and the caller applies it.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// No action needed.
    None,
    /// Clear the named sibling sub-attribute (used by `@ExclusivePrimary`
    /// to demote every other element's `primary` flag).
    ClearSibling { element_path: String, attr: String },
    /// Drop an element that has become entirely empty (`@AutoCompact`).
    DropEmptyElement { element_path: String },
    /// Recompute a denormalized summary field (`@StateSummary`).
    RecomputeSummary,
    /// Register the owning extension schema's URN on the resource's
    /// `schemas` list (`@SyncSchema`).
    RegisterSchemaUrn { urn: String },
}
