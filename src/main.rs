use school_portal::{
    availability::SeededCalendar, configuration::Configuration,
    configuration_handler::ConfigurationHandler, http::create_app, rest_tables::RestTables,
    static_data::StaticPortalData,
};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("#################");
    println!("# School Portal #");
    println!("#################");

    let configuration = ConfigurationHandler::parse_arguments();

    let fallback = match StaticPortalData::bundled() {
        Ok(fallback) => fallback,
        Err(err) => {
            error!(?err, "Bundled portal data is corrupt");
            return ExitCode::FAILURE;
        }
    };

    let address = format!("0.0.0.0:{}", configuration.port());
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(?err, "Failed to bind {address}");
            return ExitCode::FAILURE;
        }
    };
    println!("Accessible at:\n{}", address);

    let app = match (configuration.tables_url(), configuration.tables_key()) {
        (Some(url), Some(key)) => {
            info!(%url, "Reading portal data from remote tables");
            create_app(
                SeededCalendar,
                RestTables::new(url, key),
                fallback,
                configuration,
            )
        }
        _ => {
            info!("No remote tables configured, serving bundled portal data");
            create_app(SeededCalendar, fallback.clone(), fallback, configuration)
        }
    };

    if let Err(err) = axum::serve(listener, app).await {
        error!(?err, "Server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
