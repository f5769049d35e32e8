use serde::{Deserialize, Serialize};

use crate::admin::AdminDependencies;
use crate::codec::Schema;
use crate::routing::{HandlerResources, HandlerResult, Reply, RouteSummary};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub routes: usize,
}

#[derive(Deserialize)]
struct RoutesQuery {
    tag: Option<String>,
}

pub(crate) fn routes_params() -> Schema {
    Schema::exact()
        .optional("query", Schema::exact().optional("tag", Schema::String).build())
        .build()
}

pub async fn get_status<D>(resources: HandlerResources<D>) -> HandlerResult
where
    D: AdminDependencies + Send + Sync + 'static,
{
    let deps = &resources.dependencies;
    Reply::ok(&SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_seconds: deps.started_at().elapsed().as_secs(),
        routes: deps.route_summaries().len(),
    })
}

pub async fn get_routes<D>(resources: HandlerResources<D>) -> HandlerResult
where
    D: AdminDependencies + Send + Sync + 'static,
{
    let query: Option<RoutesQuery> = resources.params.member("query")?;
    let tag = query.and_then(|q| q.tag);

    let routes: Vec<&RouteSummary> = resources
        .dependencies
        .route_summaries()
        .iter()
        .filter(|r| tag.as_ref().map_or(true, |t| r.tags.contains(t)))
        .collect();
    Reply::ok(&routes)
}
