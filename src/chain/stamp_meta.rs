//! `stampMeta`: sets `meta.resourceType`, `location`, and
//! (conditionally) `created`/`lastModified`/`version`.
//!
//! `location` is always `<endpoint>/<id>`. On create there's no reference,
//! so `created`/`lastModified` are both stamped to `now` and `version` is
//! freshly minted. On replace/patch, `lastModified`/`version` are only
//! rotated when the payload's tree hash differs from the reference's —
//! a no-op write (e.g. a Replace with an unchanged body) must not bump
//! the ETag or `lastModified`.

use crate::resource::{Resource, Value};
use crate::schema::ResourceType;
use chrono::{DateTime, Utc};
use rand::RngCore;
use sha1::{Digest, Sha1};

pub fn run(payload: &mut Resource, reference: Option<&Resource>, rt: &ResourceType, now: DateTime<Utc>) {
    set_meta_string(payload, "resourceType", &rt.name);
    if let Some(id) = payload.id() {
        set_meta_string(payload, "location", &format!("{}/{}", rt.endpoint, id));
    }

    match reference {
        None => {
            set_meta_datetime(payload, "created", now);
            set_meta_datetime(payload, "lastModified", now);
            set_meta_string(payload, "version", &new_version(&payload.id().unwrap_or_default()));
        }
        Some(reference) => {
            if payload.hash() != reference.hash() {
                set_meta_datetime(payload, "lastModified", now);
                set_meta_string(payload, "version", &new_version(&payload.id().unwrap_or_default()));
            } else {
                // unchanged: carry the reference's timestamps/version forward
                // verbatim rather than leave the payload's scaffolded
                // defaults in place.
                if let Some(created) = reference.dot("meta").and_then(|m| m.dot("created")).and_then(crate::resource::Property::value).cloned() {
                    if let Value::DateTime(dt) = created {
                        set_meta_datetime(payload, "created", dt);
                    }
                }
                if let Some(modified) = reference.dot("meta").and_then(|m| m.dot("lastModified")).and_then(crate::resource::Property::value).cloned() {
                    if let Value::DateTime(dt) = modified {
                        set_meta_datetime(payload, "lastModified", dt);
                    }
                }
                if let Some(version) = reference.version() {
                    set_meta_string(payload, "version", &version);
                }
            }
        }
    }
}

/// `W/"<hex>"` where hex is SHA-1 of (id ‖ 8 random bytes).
fn new_version(id: &str) -> String {
    let mut salt = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut hasher = Sha1::new();
    hasher.update(id.as_bytes());
    hasher.update(salt);
    let digest = hasher.finalize();
    format!("W/\"{}\"", hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn set_meta_string(resource: &mut Resource, field: &str, value: &str) {
    if let Some(meta) = resource.dot_mut("meta") {
        if let Some(prop) = meta.dot_mut(field) {
            let _ = prop.set_simple(Value::String(value.to_string()));
        }
    }
}

fn set_meta_datetime(resource: &mut Resource, field: &str, value: DateTime<Utc>) {
    if let Some(meta) = resource.dot_mut("meta") {
        if let Some(prop) = meta.dot_mut(field) {
            let _ = prop.set_simple(Value::DateTime(value));
        }
    }
}
