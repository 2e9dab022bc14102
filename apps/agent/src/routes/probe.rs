use actix_web::{HttpResponse, Responder, post, web};
use probekit::ProbeRequest;
use tracing::info;

use super::AgentState;

macros_utils::routes! {
    route probe_route,
}

/// Run one probe from this agent's vantage point.
///
/// Probe failures are part of the response body, so this always answers 200
/// once the request body parsed.
#[post("/probe")]
pub async fn probe_route(
    state: web::Data<AgentState>,
    request: web::Json<ProbeRequest>,
) -> impl Responder {
    let request = request.into_inner();
    let response = state.executor.execute(&request).await;

    info!(
        region = %state.region,
        target = %request.target,
        protocol = %request.protocol,
        is_up = response.is_up,
        status = response.status_code,
        elapsed_ms = response.response_time_ms,
        "Probe completed"
    );

    HttpResponse::Ok().json(response)
}
