//! Connector and comment payload shapes.
//!
//! A connector is a `{ type, fields }` pair discriminated by the literal
//! `type`, intersected with its display `name` and its `id`:
//!
//! ```text
//! { id } & ( ({ type: ".jira", fields: JiraFields | null } & { name })
//!          | ({ type: ".none", fields: null } & { name })
//!          | ... )
//! ```

use once_cell::sync::Lazy;

use crate::codec::Schema;

pub const NONE_CONNECTOR_ID: &str = "none";

/// Connector type discriminants.
pub mod connector_types {
    pub const CASES_WEBHOOK: &str = ".cases-webhook";
    pub const JIRA: &str = ".jira";
    pub const NONE: &str = ".none";
    pub const RESILIENT: &str = ".resilient";
    pub const SERVICENOW_ITSM: &str = ".servicenow";
    pub const SERVICENOW_SIR: &str = ".servicenow-sir";
    pub const SWIMLANE: &str = ".swimlane";
}

fn nullable_string() -> Schema {
    Schema::nullable(Schema::String)
}

fn jira_fields() -> Schema {
    Schema::exact()
        .required("issueType", nullable_string())
        .required("priority", nullable_string())
        .required("parent", nullable_string())
        .build()
}

fn resilient_fields() -> Schema {
    Schema::exact()
        .required("incidentTypes", Schema::nullable(Schema::array(Schema::String)))
        .required("severityCode", nullable_string())
        .build()
}

fn servicenow_itsm_fields() -> Schema {
    Schema::exact()
        .required("impact", nullable_string())
        .required("severity", nullable_string())
        .required("urgency", nullable_string())
        .required("category", nullable_string())
        .required("subcategory", nullable_string())
        .build()
}

fn servicenow_sir_fields() -> Schema {
    Schema::exact()
        .required("category", nullable_string())
        .required("destIp", Schema::nullable(Schema::Boolean))
        .required("malwareHash", Schema::nullable(Schema::Boolean))
        .required("malwareUrl", Schema::nullable(Schema::Boolean))
        .required("priority", nullable_string())
        .required("sourceIp", Schema::nullable(Schema::Boolean))
        .required("subcategory", nullable_string())
        .build()
}

fn swimlane_fields() -> Schema {
    Schema::exact().required("caseId", nullable_string()).build()
}

fn type_fields(connector_type: &str, fields: Schema) -> Schema {
    Schema::exact()
        .required("type", Schema::literal(connector_type))
        .required("fields", fields)
        .build()
}

/// One `{ type, fields }` variant per connector type, in declared order.
fn type_field_variants() -> Vec<Schema> {
    use connector_types::*;
    vec![
        type_fields(CASES_WEBHOOK, Schema::Null),
        type_fields(JIRA, Schema::nullable(jira_fields())),
        type_fields(NONE, Schema::Null),
        type_fields(RESILIENT, Schema::nullable(resilient_fields())),
        type_fields(SERVICENOW_ITSM, Schema::nullable(servicenow_itsm_fields())),
        type_fields(SERVICENOW_SIR, Schema::nullable(servicenow_sir_fields())),
        type_fields(SWIMLANE, Schema::nullable(swimlane_fields())),
    ]
}

/// `{ type, fields }` for any connector type.
pub static CONNECTOR_TYPE_FIELDS: Lazy<Schema> = Lazy::new(|| Schema::union(type_field_variants()));

/// Connector as embedded in a user action: type fields plus `name`.
pub static USER_ACTION_CONNECTOR: Lazy<Schema> = Lazy::new(|| {
    let name = Schema::exact().required("name", Schema::String).build();
    Schema::union(
        type_field_variants()
            .into_iter()
            .map(|variant| Schema::intersection([variant, name.clone()])),
    )
});

/// A full case connector: `{ id } & USER_ACTION_CONNECTOR`.
pub static CASE_CONNECTOR: Lazy<Schema> = Lazy::new(|| {
    Schema::intersection([
        Schema::exact().required("id", Schema::String).build(),
        USER_ACTION_CONNECTOR.clone(),
    ])
});

fn user_comment() -> Schema {
    Schema::exact()
        .required("type", Schema::literal("user"))
        .required("comment", Schema::String)
        .required("owner", Schema::String)
        .build()
}

fn alert_comment() -> Schema {
    Schema::exact()
        .required("type", Schema::literal("alert"))
        .required("alertId", Schema::union([Schema::String, Schema::array(Schema::String)]))
        .required("index", Schema::union([Schema::String, Schema::array(Schema::String)]))
        .required(
            "rule",
            Schema::exact()
                .required("id", nullable_string())
                .required("name", nullable_string())
                .build(),
        )
        .required("owner", Schema::String)
        .build()
}

pub static COMMENT_REQUEST: Lazy<Schema> =
    Lazy::new(|| Schema::union([user_comment(), alert_comment()]));

/// `{ type: "comment", payload: { comment } }`
pub static COMMENT_USER_ACTION: Lazy<Schema> = Lazy::new(|| {
    Schema::exact()
        .required("type", Schema::literal("comment"))
        .required(
            "payload",
            Schema::exact()
                .required("comment", COMMENT_REQUEST.clone())
                .build(),
        )
        .build()
});

/// A recorded comment action as returned to clients.
pub static COMMENT_USER_ACTION_RESPONSE: Lazy<Schema> = Lazy::new(|| {
    Schema::intersection([
        COMMENT_USER_ACTION.clone(),
        Schema::exact()
            .required("id", Schema::String)
            .required("caseId", Schema::String)
            .build(),
    ])
});
