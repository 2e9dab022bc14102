#![warn(clippy::all, clippy::pedantic)]

use actix_web::{App, HttpServer, web};
use tracing::info;

mod error;
mod routes;
mod settings;

use error::AppError;
use logger::init_tracing;
use probekit::ProbeExecutor;
use routes::AgentState;
use settings::Settings;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = Settings::from_env()?;
    run_server(settings).await
}

async fn run_server(settings: Settings) -> Result<(), AppError> {
    let addr = settings.addr();
    let state = web::Data::new(AgentState {
        region: settings.region.clone(),
        executor: ProbeExecutor::new(settings.executor)?,
    });

    info!(%addr, region = %settings.region, "Probe agent listening");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
