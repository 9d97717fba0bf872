use anyhow::Context;
use sheet_translator::{serve, AppConfig, AppState, CleanupManager, TranslationClient};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<String>,
    port: Option<u16>,
    bind: Option<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = args.next(),
            "--port" => {
                let value = args.next().context("--port needs a value")?;
                parsed.port = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid port: {}", value))?,
                );
            }
            "--bind" => parsed.bind = args.next(),
            other => anyhow::bail!("unknown argument: {}", other),
        }
    }

    Ok(parsed)
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("sheet_translator={}", config.logging.level).parse()?)
        .add_directive("tower_http=info".parse()?);

    let json = config.logging.format.eq_ignore_ascii_case("json");
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let pretty_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args(env::args().skip(1))?;

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let (mut config, load_error) = AppConfig::load_or_default(config_path);
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    init_tracing(&config)?;
    if let Some(e) = load_error {
        tracing::warn!(path = config_path, error = %e, "Falling back to default configuration");
    }
    tracing::info!("Loaded configuration: {:?}", config.server.name);

    tokio::fs::create_dir_all(&config.storage.output_dir)
        .await
        .with_context(|| {
            format!(
                "cannot create output directory {}",
                config.storage.output_dir.display()
            )
        })?;

    let translator = TranslationClient::new(&config.api)?;
    let cleanup_interval = Duration::from_secs(config.retention.cleanup_interval_seconds.max(1));
    let state = AppState::new(config, Arc::new(translator));

    CleanupManager::from_config(state.registry.clone(), &state.config)
        .start_background_cleanup(cleanup_interval);

    serve(state).await?;

    tracing::info!("Server shutting down");
    Ok(())
}
