use bearshop_api::configuration::get_configuration;
use bearshop_api::startup::Application;
use bearshop_api::telemetry::{get_subscriber, init_subscriber};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber(
        "bearshop-api".into(),
        "bearshop_api=info,tower_http=info".into(),
        std::io::stdout,
    );
    init_subscriber(subscriber);

    let configuration = get_configuration()?;
    let application = Application::build(configuration).await?;
    application.run_until_stopped().await?;
    Ok(())
}
