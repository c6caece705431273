use std::path::PathBuf;

use asar_archive::Archive;
use clap::Args;
use miette::Result;
use owo_colors::{OwoColorize, Stream::Stdout};

#[derive(Args)]
pub struct ListArgs {
    /// An input archive file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Show the size of every entry
    #[arg(short, long, default_value_t = false)]
    sizes: bool,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = Archive::open(&self.file)?;

        for path in archive.list() {
            let is_dir = archive.get_node(&path).is_some_and(|n| n.is_dir());
            let name = format!("/{path}");
            let name = if is_dir {
                name.if_supports_color(Stdout, |t| t.blue()).to_string()
            } else {
                name
            };

            if self.sizes {
                println!("{:>12} {name}", archive.node_size(&path));
            } else {
                println!("{name}");
            }
        }

        Ok(())
    }
}
