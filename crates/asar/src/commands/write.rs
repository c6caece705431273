use std::path::PathBuf;

use asar_archive::Archive;
use clap::Args;
use miette::{Context, Result};
use tracing::info;

#[derive(Args)]
pub struct WriteArgs {
    /// An archive file to modify
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Destination path inside the archive
    #[arg(short, long, value_name = "PATH")]
    path: String,

    /// A file or directory to copy into the archive
    #[arg(short, long, value_name = "SOURCE")]
    source: PathBuf,

    /// Store the new entries in the unpacked directory
    #[arg(long, default_value_t = false)]
    unpack: bool,
}

impl WriteArgs {
    pub async fn handle(&self) -> Result<()> {
        let mut archive = Archive::open(&self.file)?;

        info!("writing {} to /{}", self.source.display(), self.path);
        archive
            .write(&self.path, &self.source, self.unpack)
            .await
            .context(format!("writing {}", self.path))?;

        Ok(())
    }
}
