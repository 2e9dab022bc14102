use actix_web::web::ServiceConfig;
use probekit::ProbeExecutor;

mod health;
mod probe;

/// Shared state of a probe agent
pub struct AgentState {
    pub region: String,
    pub executor: ProbeExecutor,
}

pub fn routes(cfg: &mut ServiceConfig) {
    health::routes(cfg);
    probe::routes(cfg);
}
