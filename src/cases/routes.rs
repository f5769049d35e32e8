//! Case connector and comment endpoints.

use serde::Deserialize;
use serde_json::Value;

use crate::cases::schemas::{CASE_CONNECTOR, COMMENT_USER_ACTION, COMMENT_USER_ACTION_RESPONSE};
use crate::cases::CasesDependencies;
use crate::codec::Schema;
use crate::error::{DomainError, RouteConfigError};
use crate::routing::{EndpointDescriptor, HandlerResources, HandlerResult, Reply, RouteOptions, RouteRepository};

pub const CASES_TAG: &str = "access:cases";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindQuery {
    per_page: Option<f64>,
}

fn path_with(param: &str) -> Schema {
    Schema::exact().required(param, Schema::String).build()
}

/// All case routes.
pub fn repository<D>() -> Result<RouteRepository<D>, RouteConfigError>
where
    D: CasesDependencies + Send + Sync + 'static,
{
    let options = RouteOptions::tagged([CASES_TAG]);

    RouteRepository::new()
        .add(
            EndpointDescriptor::new("GET /api/cases/connectors", find_connectors::<D>)?
                .with_params(
                    Schema::exact()
                        .optional(
                            "query",
                            Schema::exact().optional("perPage", Schema::NumberFromString).build(),
                        )
                        .build(),
                )
                .with_response(Schema::array(CASE_CONNECTOR.clone()))
                .with_options(options.clone()),
        )?
        .add(
            EndpointDescriptor::new("GET /api/cases/connectors/:id", get_connector::<D>)?
                .with_params(Schema::exact().required("path", path_with("id")).build())
                .with_response(CASE_CONNECTOR.clone())
                .with_options(options.clone()),
        )?
        .add(
            EndpointDescriptor::new("POST /api/cases/connectors", create_connector::<D>)?
                .with_params(Schema::exact().required("body", CASE_CONNECTOR.clone()).build())
                .with_response(CASE_CONNECTOR.clone())
                .with_options(options.clone()),
        )?
        .add(
            EndpointDescriptor::new("DELETE /api/cases/connectors/:id", delete_connector::<D>)?
                .with_params(Schema::exact().required("path", path_with("id")).build())
                .with_options(options.clone()),
        )?
        .add(
            EndpointDescriptor::new("POST /api/cases/{case_id}/comments", add_comment::<D>)?
                .with_params(
                    Schema::exact()
                        .required("path", path_with("case_id"))
                        .required("body", COMMENT_USER_ACTION.clone())
                        .build(),
                )
                .with_response(COMMENT_USER_ACTION_RESPONSE.clone())
                .with_options(options),
        )
}

async fn find_connectors<D>(resources: HandlerResources<D>) -> HandlerResult
where
    D: CasesDependencies + Send + Sync + 'static,
{
    let query: Option<FindQuery> = resources.params.member("query")?;
    let limit = match query.and_then(|q| q.per_page) {
        Some(per_page) if per_page < 1.0 || per_page.fract() != 0.0 => {
            return Err(DomainError::bad_input("perPage must be a positive integer").into());
        }
        Some(per_page) => Some(per_page as usize),
        None => None,
    };

    let connectors = resources.dependencies.connectors().list(limit);
    resources
        .logger
        .debug(format_args!("Found {} connectors", connectors.len()));
    Ok(Reply::Json(Value::Array(connectors)))
}

async fn get_connector<D>(resources: HandlerResources<D>) -> HandlerResult
where
    D: CasesDependencies + Send + Sync + 'static,
{
    let id = resources.params.path_str("id")?;
    resources
        .dependencies
        .connectors()
        .get(id)
        .map(Reply::Json)
        .ok_or_else(|| DomainError::not_found(format!("Connector '{}' not found", id)).into())
}

async fn create_connector<D>(resources: HandlerResources<D>) -> HandlerResult
where
    D: CasesDependencies + Send + Sync + 'static,
{
    let body: Value = resources
        .params
        .member("body")?
        .ok_or_else(|| DomainError::bad_input("Missing request body"))?;
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| DomainError::bad_input("Connector id must be a string"))?
        .to_string();

    let stored = resources.dependencies.connectors().insert(&id, body)?;
    resources.logger.info(format_args!("Created connector '{}'", id));
    Ok(Reply::Json(stored))
}

async fn delete_connector<D>(resources: HandlerResources<D>) -> HandlerResult
where
    D: CasesDependencies + Send + Sync + 'static,
{
    let id = resources.params.path_str("id")?;
    match resources.dependencies.connectors().remove(id) {
        Some(_) => {
            resources.logger.info(format_args!("Deleted connector '{}'", id));
            Ok(Reply::NoContent)
        }
        None => Err(DomainError::not_found(format!("Connector '{}' not found", id)).into()),
    }
}

async fn add_comment<D>(resources: HandlerResources<D>) -> HandlerResult
where
    D: CasesDependencies + Send + Sync + 'static,
{
    let case_id = resources.params.path_str("case_id")?;
    let action: Value = resources
        .params
        .member("body")?
        .ok_or_else(|| DomainError::bad_input("Missing request body"))?;

    let recorded = resources.dependencies.connectors().add_comment(case_id, action);
    Ok(Reply::Json(recorded))
}
