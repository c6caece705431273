//! Materializing archive entries onto the filesystem.

use std::io::{self, SeekFrom};
use std::ops::ControlFlow;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::fs::{host_path, relative_link, remove_path, set_executable, sidecar_path, symlink};
use crate::read::Archive;
use crate::stream::pump;
use crate::tree::{normalize, segments};
use crate::types::{FileEntry, Node};

/// Reported after every chunk of file data that was extracted
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractProgress<'a> {
    /// Archive path of the file being extracted
    pub filename: &'a str,
    /// Size of that file
    pub total: u64,
    /// Bytes of that file written so far
    pub current: u64,
    /// Length of the chunk that was just written
    pub chunk_length: usize,
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

impl Archive {
    /// Extracts the node at `path` into the directory `dest`
    ///
    /// The root is extracted directly into `dest`, any other node into `dest/<name>` where
    /// `<name>` is the last segment of `path`. Directories are recreated along with every
    /// descendant, symlinks are recreated pointing at the relative location of their target.
    #[instrument(skip(self, dest, on_progress), fields(dest = %dest.as_ref().display()), err)]
    pub async fn extract<F>(&self, path: &str, dest: impl AsRef<Path>, mut on_progress: F) -> Result<()>
    where
        F: FnMut(&ExtractProgress<'_>),
    {
        let archive = self.file.as_ref().ok_or(Error::NotOpened)?;
        let root_path = normalize(path);
        let root = self
            .get_node(&root_path)
            .ok_or_else(|| Error::NodeNotFound(path.to_owned()))?;

        let dest = dest.as_ref();
        let target = match segments(&root_path).last() {
            Some(name) => dest.join(name),
            None => dest.to_path_buf(),
        };

        let mut entries = Vec::new();
        root.walk(&root_path, |node, path| {
            entries.push((node, path.to_owned()));
            ControlFlow::Continue(())
        });

        for (node, path) in entries {
            let local = host_path(&target, &path[root_path.len()..]);

            let entry = match node {
                Node::Directory(_) => {
                    tokio::fs::create_dir_all(&local).await?;
                    continue;
                }
                Node::File(entry) => entry,
            };

            if let Some(parent) = local.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            if let Some(link) = &entry.link {
                let link_target = relative_link(parent_of(&path), link);
                let is_dir = self.get_node(link).is_some_and(Node::is_dir);

                debug!(path, link = %link_target.display(), "creating symlink");
                remove_path(&local).await?;
                symlink(&link_target, &local, is_dir).await?;
                continue;
            }

            let mut current = 0u64;
            let mut report = |chunk_length: usize| {
                current += chunk_length as u64;
                on_progress(&ExtractProgress {
                    filename: &path,
                    total: entry.size,
                    current,
                    chunk_length,
                });
            };

            let copied = if entry.unpacked {
                let source = host_path(&sidecar_path(&self.src), &path);
                debug!(path, source = %source.display(), "copying unpacked file");

                let mut input = File::open(&source).await?;
                let mut output = File::create(&local).await?;
                pump(&mut input, &mut output, self.options.chunk_size, &mut report).await?
            } else if entry.size > 0 {
                self.copy_range(archive, &path, entry, &local, &mut report).await?
            } else {
                File::create(&local).await?;
                0
            };

            if copied != entry.size {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{path}: expected {} bytes, extracted {copied}", entry.size),
                )
                .into());
            }

            if entry.executable {
                set_executable(&local).await?;
            }
        }

        Ok(())
    }

    async fn copy_range<F>(
        &self,
        archive: &std::fs::File,
        path: &str,
        entry: &FileEntry,
        local: &Path,
        report: F,
    ) -> Result<u64>
    where
        F: FnMut(usize),
    {
        let range = self
            .absolute_range(path, entry)?
            .ok_or_else(|| Error::InvalidArchive(format!("{path}: not a packed file")))?;

        let mut input = File::from_std(archive.try_clone()?);
        input.seek(SeekFrom::Start(range.start)).await?;
        let mut input = input.take(range.end - range.start);

        let mut output = File::create(local).await?;
        Ok(pump(&mut input, &mut output, self.options.chunk_size, report).await?)
    }
}
