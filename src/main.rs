use clap::Parser;
use gitlab_lgtm_lib::config::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `log_level` already falls back to RUST_LOG through clap.
    env_logger::Builder::new()
        .parse_filters(&cli.log_level)
        .format_timestamp_millis()
        .init();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("[server] {}", e);
            std::process::exit(2);
        }
    };

    let handle = match gitlab_lgtm_lib::run(&config).await {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("[server] Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    let cancel_token = handle.cancel_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("[server] Failed to listen for shutdown signal: {}", e);
            return;
        }
        log::info!("[server] Shutdown signal received");
        cancel_token.cancel();
    });

    handle.wait().await;
}
