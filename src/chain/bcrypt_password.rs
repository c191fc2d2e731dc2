//! `bcryptPassword`: hashes the `password` attribute
//! unless its current value already looks like a bcrypt digest. Users-only
//! — the stage is a no-op for resource types with no `password` attribute
//! (e.g. `Group`).
//!
//! `scim-server` never hashes passwords at all, so this stage and its
//! `bcrypt` dependency are a genuine addition rather than something
//! generalized from existing code.

use crate::error::{ScimError, ScimResult};
use crate::resource::{Resource, Value};
use crate::schema::ResourceType;

/// `$2[aby]$<cost>$<53 base64 chars>`, 60 bytes total.
fn looks_like_bcrypt_digest(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 60
        && bytes[0] == b'$'
        && matches!(bytes[1], b'2')
        && matches!(bytes[2], b'a' | b'b' | b'y')
        && bytes[3] == b'$'
}

pub fn run(payload: &mut Resource, rt: &ResourceType, cost: u32) -> ScimResult<()> {
    let Some(password) = payload.dot_mut("password") else {
        return Ok(());
    };
    let Some(Value::String(current)) = password.value().cloned() else {
        return Ok(());
    };
    if looks_like_bcrypt_digest(&current) {
        return Ok(());
    }

    log::debug!("hashing password attribute for resource type '{}'", rt.name);
    let hashed = bcrypt::hash(&current, cost).map_err(|e| ScimError::Internal {
        message: format!("bcrypt hashing failed: {e}"),
    })?;
    password.set_simple(Value::String(hashed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    fn user(registry: &SchemaRegistry, rt: &ResourceType) -> Resource {
        Resource::empty(registry, rt).unwrap()
    }

    #[test]
    fn hashes_a_plaintext_password() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap();
        let mut res = user(&registry, rt);
        res.dot_mut("password").unwrap().set_simple(Value::String("pw".into())).unwrap();
        run(&mut res, rt, 4).unwrap();
        let hashed = res.dot("password").unwrap().value().cloned().unwrap();
        let Value::String(hashed) = hashed else { panic!("expected string") };
        assert!(looks_like_bcrypt_digest(&hashed));
        assert!(bcrypt::verify("pw", &hashed).unwrap());
    }

    #[test]
    fn leaves_an_existing_digest_untouched() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap();
        let mut res = user(&registry, rt);
        let digest = bcrypt::hash("pw", 4).unwrap();
        res.dot_mut("password").unwrap().set_simple(Value::String(digest.clone())).unwrap();
        run(&mut res, rt, 4).unwrap();
        assert_eq!(
            res.dot("password").unwrap().value(),
            Some(&Value::String(digest))
        );
    }

    #[test]
    fn no_op_when_password_unassigned() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap();
        let mut res = user(&registry, rt);
        run(&mut res, rt, 4).unwrap();
        assert!(!res.dot("password").unwrap().is_assigned());
    }

    #[test]
    fn no_op_on_resource_type_without_password_attribute() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("Group").unwrap();
        let mut res = user(&registry, rt);
        run(&mut res, rt, 4).unwrap();
    }
}
