use std::path::PathBuf;

use asar_archive::{pack, PackOptions, Unpack};
use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use regex::Regex;
use tracing::{debug, info};

#[derive(Args)]
pub struct PackArgs {
    /// An input directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target archive file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Store files whose path contains this text in the unpacked directory
    #[arg(long, value_name = "TEXT", conflicts_with = "unpack_regex")]
    unpack: Vec<String>,

    /// Store files whose path matches this expression in the unpacked directory
    #[arg(long, value_name = "REGEX")]
    unpack_regex: Option<String>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl PackArgs {
    pub async fn handle(&self) -> Result<()> {
        if !self.overwrite && self.file.exists() {
            return Err(miette!("{} already exists", self.file.display()));
        }

        let unpack = match &self.unpack_regex {
            Some(regex) => Regex::new(regex)
                .into_diagnostic()
                .context("parsing --unpack-regex")?
                .into(),
            None if self.unpack.is_empty() => Unpack::None,
            None => self.unpack.clone().into(),
        };

        info!("creating {}", self.file.display());
        let options = PackOptions::builder().unpack(unpack).build();

        let mut current = PathBuf::new();
        let summary = pack(&self.directory, &self.file, &options, |progress| {
            if progress.current_file != current {
                current = progress.current_file.to_path_buf();
                debug!("packing {} ({:.1}%)", current.display(), progress.percent);
            }
        })
        .await
        .context(format!("packing {}", self.directory.display()))?;

        info!(
            "wrote {} bytes with a {} byte header",
            summary.file_size, summary.header_size
        );
        Ok(())
    }
}
