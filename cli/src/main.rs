use clap::{error::ErrorKind, CommandFactory, Parser};
use orbit_cli::{apply_overrides, execute, init_tracing, Cli};
use orbit_core::AppConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    info!("Starting orbit-scan v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load_with_env(cli.config.as_deref())?;
    apply_overrides(&cli, &mut config);

    let plan = match cli.plan(config.scanning.max_galaxy) {
        Ok(plan) => plan,
        Err(e) => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping workers");
            on_signal.cancel();
        }
    });

    let totals = execute(&config, &plan, &cancel).await?;
    println!("{totals}");
    Ok(())
}
