use imagor_rs::config::get_configuration;
use imagor_rs::startup::Application;
use imagor_rs::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let subscriber = get_subscriber("imagor_rs".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("Failed to read configuration");
    let application = Application::build(configuration).await?;

    tracing::info!("listening on port {}", application.port);
    application.run_until_stopped().await?;

    Ok(())
}
