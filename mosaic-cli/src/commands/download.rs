use crate::error::CliResult;
use crate::remote_client::MosaicClient;
use crate::session::file_name_from_url;
use colored::Colorize;
use std::path::{Path, PathBuf};

pub async fn run(
    index: usize,
    output: Option<PathBuf>,
    server: &str,
    data_dir: &Path,
    quiet: bool,
) -> CliResult<()> {
    let client = MosaicClient::new(server)?;
    let mut session = super::open_session(data_dir);

    // Validate the index before deriving a default file name from it
    session.gallery_mut().open_at_index(index)?;
    let dest = match output {
        Some(p) => p,
        None => PathBuf::from(file_name_from_url(
            session.gallery().current().unwrap_or_default(),
        )),
    };

    let bytes = session.download(&client, index, &dest).await?;
    if !quiet {
        eprintln!(
            "{} {} ({bytes} bytes)",
            "Saved".green().bold(),
            dest.display()
        );
    }
    Ok(())
}
