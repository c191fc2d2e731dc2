//! `assignUuid`: the root `id` is the only attribute with
//! `uniqueness=global`, enforced structurally by generating a fresh UUIDv4
//! rather than by a DB round trip — global uniqueness needs no query
//! since the server, not the client, is the only writer of `id`.

use crate::resource::Resource;

pub fn run(payload: &mut Resource) {
    if payload.id().is_some() {
        return;
    }
    let _ = payload.set_id(uuid::Uuid::new_v4().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    #[test]
    fn assigns_uuid_when_unassigned() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap();
        let mut res = Resource::empty(&registry, rt).unwrap();
        run(&mut res);
        assert!(res.id().is_some());
        assert_eq!(res.id().unwrap().len(), 36);
    }

    #[test]
    fn leaves_existing_id_untouched() {
        let registry = SchemaRegistry::with_embedded_schemas().unwrap();
        let rt = registry.resource_type("User").unwrap();
        let mut res = Resource::empty(&registry, rt).unwrap();
        res.set_id("preexisting").unwrap();
        run(&mut res);
        assert_eq!(res.id(), Some("preexisting".to_string()));
    }
}
