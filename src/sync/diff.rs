//! Group-Sync Diff: the set-difference between two Group
//! snapshots' `members[*].value`, grounded on
//! `other_examples/a840475a_oxidecomputer-cio__airtable-src-scim-group.rs.rs`'s
//! member-list modeling, generalized to plain `HashSet<String>` arithmetic
//! since neither side needs to stay a `Resource` past this point.

use std::collections::HashSet;

use crate::resource::{Property, Resource, Value};

/// `joined`/`left` member IDs between a Group's prior and current state.
/// Either side of [`compare`] may be `None` (a brand-new or just-deleted
/// Group), but not both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub joined: HashSet<String>,
    pub left: HashSet<String>,
}

impl Diff {
    /// Every member ID touched by this diff, joined and left alike — the
    /// set the group-sync wrappers (`services::group`) fan a sync message
    /// out to, one per ID.
    pub fn affected(&self) -> impl Iterator<Item = &String> {
        self.joined.iter().chain(self.left.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// `Compare(before, after) -> Diff`. `members` ordering is
/// ignored and duplicates collapse, since both sides are read into sets
/// before differencing.
pub fn compare(before: Option<&Resource>, after: Option<&Resource>) -> Diff {
    debug_assert!(
        before.is_some() || after.is_some(),
        "compare requires at least one non-nil Group snapshot"
    );
    let before_ids = before.map(member_ids).unwrap_or_default();
    let after_ids = after.map(member_ids).unwrap_or_default();

    let left = before_ids.difference(&after_ids).cloned().collect();
    let joined = after_ids.difference(&before_ids).cloned().collect();
    Diff { joined, left }
}

fn member_ids(group: &Resource) -> HashSet<String> {
    let Some(members) = group.dot("members") else {
        return HashSet::new();
    };
    members
        .elements()
        .iter()
        .filter_map(|el| match el.dot("value").and_then(Property::value) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    fn group_with_members(values: &[&str]) -> Resource {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("Group").unwrap().clone();
        let mut group = Resource::empty(&registry, &rt).unwrap();
        group.set_id("g1").unwrap();
        let members = group.dot_mut("members").unwrap();
        for v in values {
            let idx = members.push_element().unwrap();
            members.at_mut(idx).unwrap().dot_mut("value").unwrap().set_simple(Value::String((*v).to_string())).unwrap();
        }
        group
    }

    #[test]
    fn adding_a_member_is_a_pure_join() {
        let before = group_with_members(&["u1"]);
        let after = group_with_members(&["u1", "u2"]);
        let diff = compare(Some(&before), Some(&after));
        assert_eq!(diff.joined, ["u2".to_string()].into_iter().collect());
        assert!(diff.left.is_empty());
    }

    #[test]
    fn removing_a_member_is_a_pure_leave() {
        let before = group_with_members(&["u1", "u2"]);
        let after = group_with_members(&["u1"]);
        let diff = compare(Some(&before), Some(&after));
        assert_eq!(diff.left, ["u2".to_string()].into_iter().collect());
        assert!(diff.joined.is_empty());
    }

    #[test]
    fn new_group_is_all_joins() {
        let after = group_with_members(&["u1", "u2"]);
        let diff = compare(None, Some(&after));
        assert_eq!(diff.joined.len(), 2);
        assert!(diff.left.is_empty());
    }

    #[test]
    fn deleted_group_is_all_leaves() {
        let before = group_with_members(&["u1", "u2"]);
        let diff = compare(Some(&before), None);
        assert_eq!(diff.left.len(), 2);
        assert!(diff.joined.is_empty());
    }

    #[test]
    fn duplicate_member_entries_collapse() {
        let before = group_with_members(&["u1"]);
        let after = group_with_members(&["u1", "u1"]);
        let diff = compare(Some(&before), Some(&after));
        assert!(diff.is_empty());
    }

    #[test]
    fn member_order_is_ignored() {
        let before = group_with_members(&["u1", "u2"]);
        let after = group_with_members(&["u2", "u1"]);
        assert!(compare(Some(&before), Some(&after)).is_empty());
    }
}
