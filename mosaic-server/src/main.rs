//! Mosaic Server CLI
//!
//! Run with: `cargo run -p mosaic-server -- --help`

use clap::{CommandFactory, FromArgMatches};
use mosaic_server::{
    config_file::load_and_merge_config,
    telemetry::{init_logging, TelemetryConfig},
    MosaicServer, ServerConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse CLI + env via clap (get both typed config and raw matches)
    let matches = ServerConfig::command().get_matches();
    let mut config = ServerConfig::from_arg_matches(&matches)?;

    // 2. Load config file and merge (file values apply only where CLI/env didn't set a value)
    if let Err(e) = load_and_merge_config(&mut config, &matches) {
        eprintln!("Warning: {e}");
    }

    let telemetry_config = TelemetryConfig::with_server_config(&config);
    init_logging(&telemetry_config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        storage = config.storage_type_str(),
        addr = %config.listen_addr,
        public_url = %config.effective_public_url(),
        cors = config.cors_enabled,
        body_limit = config.body_limit,
        build_timeout_secs = config.build_timeout_secs,
        max_tiles = config.max_tiles,
        log_format = ?telemetry_config.log_format,
        "Starting mosaic server"
    );

    let server = MosaicServer::new(config)?;
    server.run().await.map_err(Into::into)
}
