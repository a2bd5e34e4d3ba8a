use crate::error::CliResult;
use crate::session::file_name_from_url;
use comfy_table::{ContentArrangement, Table};
use std::path::Path;

pub fn run(data_dir: &Path) -> CliResult<()> {
    let session = super::open_session(data_dir);
    let gallery = session.gallery();

    if gallery.is_empty() {
        println!("No mosaics yet. Run 'mosaic generate <main> <tiles>...' to create one.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "NAME", "URL"]);
    for (i, url) in gallery.entries().iter().enumerate() {
        table.add_row(vec![i.to_string(), file_name_from_url(url), url.clone()]);
    }
    println!("{table}");
    Ok(())
}
