use std::path::PathBuf;

use asar_archive::Archive;
use clap::Args;
use itertools::Itertools;
use miette::{Context, Result};
use tracing::info;

#[derive(Args)]
pub struct UnpackArgs {
    /// An archive file to modify
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Paths inside the archive to move to the unpacked directory
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<String>,
}

impl UnpackArgs {
    pub async fn handle(&self) -> Result<()> {
        let mut archive = Archive::open(&self.file)?;

        info!("unpacking {}", self.paths.iter().map(|p| format!("/{p}")).join(", "));
        archive
            .unpack(self.paths.as_slice())
            .await
            .context(format!("unpacking into {}.unpacked", self.file.display()))?;

        Ok(())
    }
}
