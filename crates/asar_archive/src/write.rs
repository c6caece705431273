//! Creating archives from a directory on disk
//!

use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use binrw::BinWrite;
use bon::Builder;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::fs::{archive_path, is_executable, sidecar_path};
use crate::pattern::Unpack;
use crate::pickle::encode_string;
use crate::stream::{pump, DEFAULT_CHUNK_SIZE};
use crate::types::{ArchivePrefix, Directory, FileEntry, Node};

/// Options for how an archive should be packed
///
/// ```
/// use asar_archive::write::PackOptions;
///
/// let options = PackOptions::builder().unpack("*.node").chunk_size(4096).build();
/// assert_eq!(options.chunk_size, 4096);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct PackOptions {
    /// Files to store in the sidecar directory instead of the archive
    #[builder(default, into)]
    pub unpack: Unpack,

    /// Size of a single chunk when streaming file contents
    #[builder(default = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Reported after every chunk of file data that was written
#[derive(Debug, Clone, PartialEq)]
pub struct PackProgress<'a> {
    /// Source file currently being written
    pub current_file: &'a Path,
    /// Total size of every file being packed, unpacked ones included
    pub total: u64,
    /// Bytes written so far
    pub packed: u64,
    /// `packed` as a percentage of `total`
    pub percent: f64,
    /// Length of the chunk that was just written
    pub chunk_length: usize,
}

/// Description of a freshly packed archive
#[derive(Debug, Clone, PartialEq)]
pub struct PackSummary {
    /// Header that was written
    pub header: Node,
    /// Byte length of the encoded header block
    pub header_size: u32,
    /// Size of the archive file
    pub file_size: u64,
}

#[derive(Debug)]
struct PlannedFile {
    source: PathBuf,
    path: String,
    size: u64,
    unpacked: bool,
}

#[derive(Debug, Default)]
struct Plan {
    header: Node,
    files: Vec<PlannedFile>,
    total: u64,
}

/// Builds the header for `src` without touching the destination
///
/// Entries are visited depth first in file name order, which is the order the file contents
/// are written in.
#[instrument(skip(unpack), err)]
fn plan(src: &Path, unpack: &Unpack) -> Result<Plan> {
    let root = std::fs::canonicalize(src).map_err(|source| Error::OpenFailed {
        path: src.to_path_buf(),
        source,
    })?;

    let mut plan = Plan::default();
    let mut offset = 0u64;

    for entry in WalkDir::new(src)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| Error::InvalidPath(entry.path().display().to_string()))?;
        let path = archive_path(relative)?;
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let target = std::fs::canonicalize(entry.path())?;
            let link = target
                .strip_prefix(&root)
                .map_err(|_| Error::LinkEscapesRoot(entry.path().to_path_buf()))?;
            let link = archive_path(link)?;

            debug!(path, link, "symlink");
            plan.header.insert_node(&path, FileEntry::symlink(link).into());
        } else if file_type.is_dir() {
            plan.header.insert_node(&path, Directory::default().into());
        } else {
            let metadata = entry.metadata().map_err(io::Error::from)?;
            let size = metadata.len();
            let executable = is_executable(entry.path(), &metadata);
            let unpacked = unpack.matches(&path);

            let node = if unpacked {
                FileEntry::unpacked(size)
            } else {
                let node = FileEntry::packed(size, offset);
                offset += size;
                node
            };

            debug!(path, size, unpacked, executable, "file");
            plan.header
                .insert_node(&path, node.with_executable(executable).into());
            plan.total += size;
            plan.files.push(PlannedFile {
                source: entry.into_path(),
                path,
                size,
                unpacked,
            });
        }
    }

    Ok(plan)
}

/// Packs the directory `src` into the archive `dest`
///
/// Files selected by [`PackOptions::unpack`] are copied to `<dest>.unpacked`. The header is
/// fully built before anything is written, so a symlink pointing outside of `src` fails with
/// [`Error::LinkEscapesRoot`] without creating `dest`. An I/O error while streaming contents
/// leaves a partial `dest` behind for the caller to remove.
///
/// ```no_run
/// # async fn doit() -> asar_archive::error::Result<()> {
/// use asar_archive::write::{pack, PackOptions};
///
/// let summary = pack("app", "app.asar", &PackOptions::default(), |progress| {
///     println!("{:.1}%", progress.percent);
/// })
/// .await?;
/// println!("header is {} bytes", summary.header_size);
/// # Ok(())
/// # }
/// ```
#[instrument(skip_all, fields(src = %src.as_ref().display(), dest = %dest.as_ref().display()), err)]
pub async fn pack<F>(
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: &PackOptions,
    mut on_progress: F,
) -> Result<PackSummary>
where
    F: FnMut(&PackProgress<'_>),
{
    let src = src.as_ref();
    let dest = dest.as_ref();

    let Plan {
        header,
        files,
        total,
    } = plan(src, &options.unpack)?;

    let json = serde_json::to_string(&header)?;
    let header_block = encode_string(&json)?;
    let header_size = u32::try_from(header_block.len())
        .map_err(|_| Error::InvalidArchive("header exceeds 4 GiB".into()))?;

    let mut head = Cursor::new(Vec::with_capacity(header_block.len() + 8));
    ArchivePrefix { header_size }.write(&mut head)?;
    let mut head = head.into_inner();
    head.extend_from_slice(&header_block);

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut out = BufWriter::new(File::create(dest).await?);
    out.write_all(&head).await?;

    let sidecar = sidecar_path(dest);
    let mut packed = 0u64;

    for file in &files {
        let input = File::open(&file.source).await?;
        let mut input = input.take(file.size);

        let mut report = |chunk_length: usize| {
            packed += chunk_length as u64;
            on_progress(&PackProgress {
                current_file: &file.source,
                total,
                packed,
                percent: if total == 0 {
                    100.0
                } else {
                    packed as f64 / total as f64 * 100.0
                },
                chunk_length,
            });
        };

        let copied = if file.unpacked {
            let target = sidecar.join(relative_host_path(&file.path));
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            debug!(path = file.path, target = %target.display(), "copying unpacked file");
            let mut target = File::create(&target).await?;
            pump(&mut input, &mut target, options.chunk_size, &mut report).await?
        } else {
            pump(&mut input, &mut out, options.chunk_size, &mut report).await?
        };

        if copied != file.size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} changed size while packing", file.source.display()),
            )
            .into());
        }
    }

    out.shutdown().await?;
    let file_size = tokio::fs::metadata(dest).await?.len();

    Ok(PackSummary {
        header,
        header_size,
        file_size,
    })
}

fn relative_host_path(path: &str) -> PathBuf {
    path.split('/').collect()
}
