//! Mosaic CLI library.
//!
//! Command handlers, the local gallery cache and the HTTP client behind
//! the `mosaic` binary. The gallery and session types are usable on their
//! own by any front end that wants the same behavior.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gallery;
pub mod remote_client;
pub mod session;
pub mod viewer;

use cli::{Cli, Commands};

/// Dispatch a parsed [`Cli`] to the matching command handler.
pub async fn run(cli: Cli) -> error::CliResult<()> {
    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref())?;
    tracing::debug!(data_dir = %data_dir.display(), server = %cli.server, "resolved CLI context");

    match cli.command {
        Commands::Generate {
            main_image,
            tiles,
            grid_num,
            output_width,
        } => {
            let args = commands::generate::GenerateArgs {
                main_image,
                tiles,
                grid_num,
                output_width,
            };
            commands::generate::run(args, &cli.server, &data_dir, cli.quiet).await
        }

        Commands::Gallery => commands::gallery::run(&data_dir),

        Commands::Show { index, zoom } => commands::show::run(index, zoom, &data_dir),

        Commands::Download { index, output } => {
            commands::download::run(index, output, &cli.server, &data_dir, cli.quiet).await
        }
    }
}
