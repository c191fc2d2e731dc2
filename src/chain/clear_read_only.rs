//! `clearReadOnly`: a caller cannot set a `readOnly`
//! attribute by supplying it in the request body. On create there's no
//! prior value to restore, so any such attribute is simply cleared; on
//! replace/patch the prior value from `reference` is copied back in,
//! which is what lets `id`/`meta`/`groups` survive a full-body Replace
//! unscathed even though the client's payload never carries them.

use crate::resource::{Property, Resource};
use crate::schema::Mutability;

pub fn run(payload: &mut Resource, reference: Option<&Resource>) {
    walk(payload.root_mut(), reference.map(Resource::root));
}

fn walk(node: &mut Property, reference: Option<&Property>) {
    if node.attr.mutability == Mutability::ReadOnly {
        match reference {
            Some(refp) => *node = refp.clone(),
            None => node.clear(),
        }
        return;
    }

    match &mut node.node {
        crate::resource::property::Node::Simple(_) => {}
        crate::resource::property::Node::Complex(children) => {
            for child in children.iter_mut() {
                let ref_child = reference.and_then(|r| r.dot(&child.attr.name));
                walk(child, ref_child);
            }
        }
        crate::resource::property::Node::Multi(elements) => {
            for el in elements.iter_mut() {
                walk(el, None);
            }
        }
    }
}
