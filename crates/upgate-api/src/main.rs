use upgate_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage, scanner, routes)
    let (_state, router) = upgate_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    upgate_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
