//! Embedded core SCIM schemas and resource types.
//!
//! Bundles the RFC 7643 core `User` and `Group` schemas plus the
//! `EnterpriseUser` extension, with the annotations that drive the
//! Property Tree's reactions already attached — no external schema file
//! is required to exercise this crate's full behavior.

use super::types::{
    annotation, Attribute, AttributeType, Mutability, ResourceType, Returned, Schema,
    SchemaExtension, Uniqueness,
};
use crate::error::ScimResult;
use std::collections::HashMap;

const CORE_USER_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
const CORE_GROUP_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
const ENTERPRISE_USER_URN: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

fn ann(keys: &[&str]) -> HashMap<String, bool> {
    keys.iter().map(|k| (k.to_string(), true)).collect()
}

fn simple(
    name: &str,
    data_type: AttributeType,
    mutability: Mutability,
    returned: Returned,
    uniqueness: Uniqueness,
    required: bool,
    case_exact: bool,
) -> Attribute {
    Attribute {
        name: name.to_string(),
        id: String::new(),
        path: name.to_string(),
        data_type,
        multi_valued: false,
        required,
        case_exact,
        mutability,
        returned,
        uniqueness,
        canonical_values: Vec::new(),
        reference_types: Vec::new(),
        sub_attributes: Vec::new(),
        annotations: HashMap::new(),
    }
}

fn rw_string(name: &str) -> Attribute {
    simple(
        name,
        AttributeType::String,
        Mutability::ReadWrite,
        Returned::Default,
        Uniqueness::None,
        false,
        false,
    )
}

fn complex(name: &str, multi_valued: bool, subs: Vec<Attribute>) -> Attribute {
    Attribute {
        name: name.to_string(),
        id: String::new(),
        path: name.to_string(),
        data_type: AttributeType::Complex,
        multi_valued,
        required: false,
        case_exact: false,
        mutability: Mutability::ReadWrite,
        returned: Returned::Default,
        uniqueness: Uniqueness::None,
        canonical_values: Vec::new(),
        reference_types: Vec::new(),
        sub_attributes: subs,
        annotations: HashMap::new(),
    }
}

/// The `value`/`type`/`primary`/`display` sub-attribute set shared by
/// `emails`, `phoneNumbers`, and `addresses`-shaped multivalued complex
/// attributes, with `@ExclusivePrimary`/`@Primary` wired on `primary`.
fn contact_point_subs(canonical_types: &[&str]) -> Vec<Attribute> {
    vec![
        rw_string("value"),
        Attribute {
            canonical_values: canonical_types.iter().map(|s| s.to_string()).collect(),
            ..rw_string("type")
        },
        Attribute {
            annotations: ann(&[annotation::EXCLUSIVE_PRIMARY, annotation::PRIMARY]),
            ..simple(
                "primary",
                AttributeType::Boolean,
                Mutability::ReadWrite,
                Returned::Default,
                Uniqueness::None,
                false,
                false,
            )
        },
        rw_string("display"),
    ]
}

fn meta_attribute() -> Attribute {
    let ro = |name: &str, data_type: AttributeType| {
        simple(
            name,
            data_type,
            Mutability::ReadOnly,
            Returned::Default,
            Uniqueness::None,
            false,
            true,
        )
    };
    complex(
        "meta",
        false,
        vec![
            ro("resourceType", AttributeType::String),
            ro("created", AttributeType::DateTime),
            ro("lastModified", AttributeType::DateTime),
            ro("location", AttributeType::Reference),
            ro("version", AttributeType::String),
        ],
    )
}

fn group_reference_subs(mutability: Mutability) -> Vec<Attribute> {
    vec![
        Attribute {
            annotations: ann(&[annotation::IDENTITY]),
            ..simple(
                "value",
                AttributeType::String,
                mutability,
                Returned::Default,
                Uniqueness::None,
                false,
                true,
            )
        },
        simple(
            "$ref",
            AttributeType::Reference,
            mutability,
            Returned::Default,
            Uniqueness::None,
            false,
            true,
        ),
        rw_string("display"),
        Attribute {
            canonical_values: vec!["direct".to_string(), "indirect".to_string()],
            ..simple(
                "type",
                AttributeType::String,
                Mutability::ReadOnly,
                Returned::Default,
                Uniqueness::None,
                false,
                false,
            )
        },
    ]
}

/// Build the embedded core `User` schema.
pub fn core_user_schema() -> ScimResult<Schema> {
    let attributes = vec![
        simple(
            "id",
            AttributeType::String,
            Mutability::ReadOnly,
            Returned::Always,
            Uniqueness::Server,
            false,
            true,
        ),
        simple(
            "externalId",
            AttributeType::String,
            Mutability::ReadWrite,
            Returned::Default,
            Uniqueness::None,
            false,
            true,
        ),
        Attribute {
            mutability: Mutability::ReadWrite,
            uniqueness: Uniqueness::Server,
            required: true,
            ..rw_string("userName")
        },
        Attribute {
            annotations: ann(&[annotation::STATE_SUMMARY]),
            ..complex(
                "name",
                false,
                vec![
                    rw_string("formatted"),
                    rw_string("familyName"),
                    rw_string("givenName"),
                    rw_string("middleName"),
                    rw_string("honorificPrefix"),
                    rw_string("honorificSuffix"),
                ],
            )
        },
        rw_string("displayName"),
        rw_string("nickName"),
        simple(
            "profileUrl",
            AttributeType::Reference,
            Mutability::ReadWrite,
            Returned::Default,
            Uniqueness::None,
            false,
            false,
        ),
        rw_string("title"),
        rw_string("userType"),
        rw_string("preferredLanguage"),
        rw_string("locale"),
        rw_string("timezone"),
        simple(
            "active",
            AttributeType::Boolean,
            Mutability::ReadWrite,
            Returned::Default,
            Uniqueness::None,
            false,
            false,
        ),
        simple(
            "password",
            AttributeType::String,
            Mutability::WriteOnly,
            Returned::Never,
            Uniqueness::None,
            false,
            true,
        ),
        Attribute {
            annotations: ann(&[annotation::AUTO_COMPACT]),
            ..complex("emails", true, contact_point_subs(&["work", "home", "other"]))
        },
        Attribute {
            annotations: ann(&[annotation::AUTO_COMPACT]),
            ..complex(
                "phoneNumbers",
                true,
                contact_point_subs(&["work", "home", "mobile", "fax", "pager", "other"]),
            )
        },
        Attribute {
            annotations: ann(&[annotation::AUTO_COMPACT]),
            ..complex(
                "addresses",
                true,
                vec![
                    rw_string("formatted"),
                    rw_string("streetAddress"),
                    rw_string("locality"),
                    rw_string("region"),
                    rw_string("postalCode"),
                    rw_string("country"),
                    Attribute {
                        canonical_values: vec!["work".into(), "home".into(), "other".into()],
                        ..rw_string("type")
                    },
                    Attribute {
                        annotations: ann(&[annotation::EXCLUSIVE_PRIMARY, annotation::PRIMARY]),
                        ..simple(
                            "primary",
                            AttributeType::Boolean,
                            Mutability::ReadWrite,
                            Returned::Default,
                            Uniqueness::None,
                            false,
                            false,
                        )
                    },
                ],
            )
        },
        {
            let mut groups = complex("groups", true, group_reference_subs(Mutability::ReadOnly));
            groups.mutability = Mutability::ReadOnly;
            groups
        },
        meta_attribute(),
    ];

    Ok(Schema {
        id: CORE_USER_URN.to_string(),
        name: "User".to_string(),
        description: "User Account".to_string(),
        attributes,
    })
}

/// Build the embedded core `Group` schema.
pub fn core_group_schema() -> ScimResult<Schema> {
    let attributes = vec![
        simple(
            "id",
            AttributeType::String,
            Mutability::ReadOnly,
            Returned::Always,
            Uniqueness::Server,
            false,
            true,
        ),
        simple(
            "externalId",
            AttributeType::String,
            Mutability::ReadWrite,
            Returned::Default,
            Uniqueness::None,
            false,
            true,
        ),
        Attribute {
            required: true,
            ..rw_string("displayName")
        },
        Attribute {
            annotations: ann(&[annotation::AUTO_COMPACT]),
            ..complex("members", true, group_reference_subs(Mutability::Immutable))
        },
        meta_attribute(),
    ];

    Ok(Schema {
        id: CORE_GROUP_URN.to_string(),
        name: "Group".to_string(),
        description: "Group".to_string(),
        attributes,
    })
}

/// Build the embedded `EnterpriseUser` extension schema. This is the
/// schema exercised by `@SyncSchema`: assigning any child
/// here causes its URN to appear in the resource's `schemas` list.
pub fn enterprise_user_extension_schema() -> ScimResult<Schema> {
    let sync = || ann(&[annotation::SYNC_SCHEMA]);
    let attributes = vec![
        Attribute { annotations: sync(), ..rw_string("employeeNumber") },
        Attribute { annotations: sync(), ..rw_string("costCenter") },
        Attribute { annotations: sync(), ..rw_string("organization") },
        Attribute { annotations: sync(), ..rw_string("division") },
        Attribute { annotations: sync(), ..rw_string("department") },
        Attribute {
            annotations: sync(),
            ..complex(
                "manager",
                false,
                vec![
                    rw_string("value"),
                    simple(
                        "$ref",
                        AttributeType::Reference,
                        Mutability::ReadWrite,
                        Returned::Default,
                        Uniqueness::None,
                        false,
                        true,
                    ),
                    simple(
                        "displayName",
                        AttributeType::String,
                        Mutability::ReadOnly,
                        Returned::Default,
                        Uniqueness::None,
                        false,
                        false,
                    ),
                ],
            )
        },
    ];

    Ok(Schema {
        id: ENTERPRISE_USER_URN.to_string(),
        name: "EnterpriseUser".to_string(),
        description: "Enterprise User extension".to_string(),
        attributes,
    })
}

/// The `/Users` resource type: core User schema plus the optional
/// EnterpriseUser extension.
pub fn user_resource_type() -> ResourceType {
    ResourceType {
        name: "User".to_string(),
        endpoint: "/Users".to_string(),
        schema: CORE_USER_URN.to_string(),
        schema_extensions: vec![SchemaExtension {
            schema: ENTERPRISE_USER_URN.to_string(),
            required: false,
        }],
    }
}

/// The `/Groups` resource type: core Group schema, no extensions.
pub fn group_resource_type() -> ResourceType {
    ResourceType {
        name: "Group".to_string(),
        endpoint: "/Groups".to_string(),
        schema: CORE_GROUP_URN.to_string(),
        schema_extensions: Vec::new(),
    }
}
