use crate::error::CliResult;
use colored::Colorize;
use std::path::Path;

/// Open the viewer on `index` and print the entry with its neighbours.
pub fn run(index: usize, zoom_steps: u32, data_dir: &Path) -> CliResult<()> {
    let mut session = super::open_session(data_dir);
    let gallery = session.gallery_mut();
    gallery.open_at_index(index)?;

    let len = gallery.len();
    let url = gallery.current().unwrap_or_default().to_string();

    gallery.previous();
    let prev = gallery.viewer().index();
    gallery.next();
    gallery.next();
    let next = gallery.viewer().index();

    // Navigation resets zoom, so zoom is applied on the final position.
    gallery.open_at_index(index)?;
    for _ in 0..zoom_steps {
        gallery.viewer_mut().zoom_in();
    }
    let zoom = gallery.viewer().zoom();

    println!("{} #{index} ({} of {len})", "Mosaic".bold(), index + 1);
    println!("  {url}");
    println!("  {} {zoom}x", "zoom:".dimmed());
    if len > 1 {
        println!(
            "  {} previous: #{prev}  next: #{next}",
            "nav:".dimmed()
        );
    }
    Ok(())
}
