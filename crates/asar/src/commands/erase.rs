use std::path::PathBuf;

use asar_archive::Archive;
use clap::Args;
use miette::{Context, Result};
use tracing::info;

#[derive(Args)]
pub struct EraseArgs {
    /// An archive file to modify
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Paths inside the archive to remove
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<String>,
}

impl EraseArgs {
    pub async fn handle(&self) -> Result<()> {
        let mut archive = Archive::open(&self.file)?;

        for path in &self.paths {
            info!("erasing /{path}");
            archive
                .erase(path)
                .await
                .context(format!("erasing {path}"))?;
        }

        Ok(())
    }
}
