use books_api::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut settings = Settings::from_env()?;
    if let Some(url) = std::env::args().nth(1) {
        settings.database_url = url;
    }

    books_api::telemetry::init(&settings.log_filter)?;
    books_api::interface::http::run(settings).await
}
