use crate::error::{CliError, CliResult};
use crate::remote_client::{GenerateJob, MosaicClient};
use colored::Colorize;
use std::path::{Path, PathBuf};

pub struct GenerateArgs {
    pub main_image: PathBuf,
    pub tiles: Vec<PathBuf>,
    pub grid_num: u32,
    pub output_width: u32,
}

pub async fn run(args: GenerateArgs, server: &str, data_dir: &Path, quiet: bool) -> CliResult<()> {
    if args.tiles.is_empty() {
        return Err(CliError::Usage("at least one tile image is required".into()));
    }
    for path in std::iter::once(&args.main_image).chain(args.tiles.iter()) {
        if !path.is_file() {
            return Err(CliError::Input(format!("file not found: {}", path.display())));
        }
    }

    let client = MosaicClient::new(server)?;
    let mut session = super::open_session(data_dir);

    let job = GenerateJob {
        main_image: args.main_image,
        tiles: args.tiles,
        grid_num: args.grid_num,
        output_width: args.output_width,
    };

    if !quiet {
        eprintln!(
            "{} mosaic from {} tile(s), grid {}, width {}px...",
            "Generating".cyan().bold(),
            job.tiles.len(),
            job.grid_num,
            job.output_width
        );
    }

    let url = session.generate(&client, &job).await?;
    let index = session.gallery().len() - 1;

    println!("{url}");
    if !quiet {
        eprintln!(
            "{} saved as gallery entry {index}",
            "Done:".green().bold()
        );
    }
    Ok(())
}
