use backoffice_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    backoffice_observability::init();

    let config = ApiConfig::from_env();
    let services = backoffice_api::app::build_services(&config).await?;
    let app = backoffice_api::app::build_app(&config.jwt_secret, services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
