//! Modifying an open archive by repacking it.
//!
//! The first modification extracts the whole archive into a working copy below
//! [`ArchiveOptions::temp_root`](crate::read::ArchiveOptions::temp_root). Every modification is
//! applied to that copy, which is then packed into `<archive>.tmp` and swapped into place. The
//! working copy is kept until the handle is closed or dropped.
//!
//! A crash while swapping can leave `<archive>.tmp` or `<archive>.tmp.unpacked` behind. They are
//! removed by the next repack.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::fs::{copy_recursive, host_path, remove_path, sidecar_path, tmp_path};
use crate::pattern::Unpack;
use crate::read::Archive;
use crate::tree::normalize;
use crate::write::{self, PackOptions};

#[derive(Debug)]
enum Mutation<'a> {
    Write { path: &'a str, source: &'a Path },
    Erase(&'a str),
    Reflag,
}

impl Archive {
    /// Copies the file or directory `source` into the archive at `path`
    ///
    /// Anything already at `path` is replaced. With `unpack` set, the new entries are stored in
    /// the sidecar directory.
    pub async fn write(&mut self, path: &str, source: impl AsRef<Path>, unpack: bool) -> Result<()> {
        let path = normalize(path);
        if path.is_empty() {
            return Err(Error::InvalidPath("can not write over the archive root".into()));
        }

        let unpack_paths = if unpack { vec![path.clone()] } else { Vec::new() };
        let mutation = Mutation::Write {
            path: &path,
            source: source.as_ref(),
        };
        self.repack(mutation, &unpack_paths).await
    }

    /// Removes the entry at `path`, succeeding when there is nothing to remove
    pub async fn erase(&mut self, path: &str) -> Result<()> {
        self.check_open()?;
        let path = normalize(path);
        if !self.exists(&path) {
            debug!(path, "nothing to erase");
            return Ok(());
        }
        self.repack(Mutation::Erase(&path), &[]).await
    }

    /// Moves the entries at `paths` to the sidecar directory
    ///
    /// A directory moves every file below it. Paths that do not exist are ignored.
    pub async fn unpack<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<()> {
        let paths = paths
            .iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>();
        self.repack(Mutation::Reflag, &paths).await
    }

    /// The working copy, extracting the archive into it on first use
    async fn ensure_workdir(&mut self) -> Result<PathBuf> {
        if let Some(workdir) = &self.workdir {
            return Ok(workdir.clone());
        }

        let workdir = self
            .options
            .temp_root
            .join(format!("asar-{}", (self.options.id_generator)()));
        tokio::fs::create_dir_all(&workdir).await?;

        info!(workdir = %workdir.display(), "extracting working copy");
        if let Err(e) = self.extract("", &workdir, |_| {}).await {
            if let Err(cleanup) = remove_path(&workdir).await {
                warn!(workdir = %workdir.display(), error = %cleanup, "unable to remove working copy");
            }
            return Err(e);
        }

        self.workdir = Some(workdir.clone());
        Ok(workdir)
    }

    /// Patterns for `new_paths` and every file the current header already unpacks
    async fn unpack_globs(&self, workdir: &Path, new_paths: &[String]) -> Result<Vec<glob::Pattern>> {
        let mut globs = Vec::new();
        for path in new_paths {
            let is_dir = tokio::fs::symlink_metadata(host_path(workdir, path))
                .await
                .is_ok_and(|m| m.is_dir());
            globs.push(if is_dir {
                Unpack::directory_glob(path)?
            } else {
                Unpack::file_glob(path)?
            });
        }

        let mut unpacked = Vec::new();
        self.header.walk("", |node, path| {
            if node.as_file().is_some_and(|f| f.unpacked) {
                unpacked.push(path.to_owned());
            }
            ControlFlow::Continue(())
        });
        for path in unpacked {
            globs.push(Unpack::file_glob(&path)?);
        }

        Ok(globs)
    }

    /// Applies `mutation` to the working copy and swaps the repacked result into place
    ///
    /// When anything fails after the working copy was touched, the copy is discarded so the next
    /// modification starts again from the archive on disk.
    #[instrument(skip(self), fields(src = %self.src.display()), err)]
    async fn repack(&mut self, mutation: Mutation<'_>, new_unpack_paths: &[String]) -> Result<()> {
        self.check_open()?;

        let workdir = self.ensure_workdir().await?;
        let result = self.apply(&workdir, mutation, new_unpack_paths).await;
        if result.is_err() {
            warn!(workdir = %workdir.display(), "repack failed, discarding working copy");
            self.remove_workdir();
        }
        result
    }

    async fn apply(&mut self, workdir: &Path, mutation: Mutation<'_>, new_unpack_paths: &[String]) -> Result<()> {
        match mutation {
            Mutation::Write { path, source } => {
                let target = host_path(workdir, path);
                debug!(path, source = %source.display(), "writing");
                remove_path(&target).await?;
                copy_recursive(source, &target).await?;
            }
            Mutation::Erase(path) if path.is_empty() => {
                debug!("erasing everything");
                let mut children = tokio::fs::read_dir(workdir).await?;
                while let Some(child) = children.next_entry().await? {
                    remove_path(&child.path()).await?;
                }
            }
            Mutation::Erase(path) => {
                debug!(path, "erasing");
                remove_path(&host_path(workdir, path)).await?;
            }
            Mutation::Reflag => {}
        }

        let options = PackOptions::builder()
            .unpack(Unpack::Globs(self.unpack_globs(workdir, new_unpack_paths).await?))
            .chunk_size(self.options.chunk_size)
            .build();

        let tmp = tmp_path(&self.src);
        let tmp_sidecar = sidecar_path(&tmp);
        remove_path(&tmp).await?;
        remove_path(&tmp_sidecar).await?;

        write::pack(workdir, &tmp, &options, |_| {}).await?;

        let sidecar = sidecar_path(&self.src);
        remove_path(&sidecar).await?;
        if tokio::fs::symlink_metadata(&tmp_sidecar).await.is_ok() {
            tokio::fs::rename(&tmp_sidecar, &sidecar).await?;
        }

        self.file = None;
        tokio::fs::remove_file(&self.src).await?;
        tokio::fs::rename(&tmp, &self.src).await?;

        self.load()?;
        info!(header_size = self.header_size, file_size = self.file_size, "repacked");
        Ok(())
    }
}
