use std::path::PathBuf;

use asar_archive::Archive;
use clap::Args;
use miette::{Context, Result};
use tracing::{debug, info};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input archive file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Path inside the archive to extract, the whole archive by default
    #[arg(short, long, value_name = "PATH", default_value = "")]
    path: String,
}

impl ExtractArgs {
    pub async fn handle(&self) -> Result<()> {
        let archive = Archive::open(&self.file)?;

        info!("extracting into {}", self.directory.display());
        archive
            .extract(&self.path, &self.directory, |progress| {
                if progress.current == progress.total {
                    debug!("wrote {}", progress.filename);
                }
            })
            .await
            .context(format!("extracting {}", self.file.display()))?;

        Ok(())
    }
}
