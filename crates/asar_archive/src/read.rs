//! Types for reading archives
//!

use std::fmt::{self, Debug};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::{ControlFlow, Range};
use std::path::{Path, PathBuf};

use binrw::BinRead;
use bon::Builder;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::fs::{host_path, sidecar_path};
use crate::id::{generate_id, IdGenerator};
use crate::pickle::decode_string;
use crate::stream::DEFAULT_CHUNK_SIZE;
use crate::tree::normalize;
use crate::types::{is_valid_node, ArchivePrefix, FileEntry, Node};
use crate::write::{self, PackOptions};

/// Links are followed at most this many times when reading a file
const MAX_LINK_HOPS: usize = 32;

/// Options for an [`Archive`] handle
#[derive(Debug, Clone, Builder)]
pub struct ArchiveOptions {
    /// Directory in which temporary working copies are created while repacking
    #[builder(default = std::env::temp_dir(), into)]
    pub temp_root: PathBuf,

    /// Names the temporary working copies
    #[builder(default = generate_id as IdGenerator)]
    pub id_generator: IdGenerator,

    /// Size of a single chunk when streaming file contents
    #[builder(default = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A single file read out of an archive
pub struct ArchiveFile<'a> {
    path: String,
    entry: FileEntry,
    reader: EntryReader<'a>,
}

impl Debug for ArchiveFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ArchiveFile({}, {:?})", self.path, self.entry)
    }
}

impl ArchiveFile<'_> {
    /// Path of the file inside the archive, after following links
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Size of the file in bytes
    pub fn size(&self) -> u64 {
        self.entry.size
    }

    /// Whether the file is stored in the sidecar directory
    pub fn is_unpacked(&self) -> bool {
        self.entry.unpacked
    }

    /// Whether the file is flagged executable
    pub fn is_executable(&self) -> bool {
        self.entry.executable
    }
}

impl Read for ArchiveFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

enum EntryReader<'a> {
    Packed(io::Take<&'a mut File>),
    Unpacked(File),
}

impl Read for EntryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            EntryReader::Packed(r) => r.read(buf),
            EntryReader::Unpacked(r) => r.read(buf),
        }
    }
}

/// Handle on an archive file
///
/// A handle starts out closed with an empty header. Opening it reads the header into memory and
/// keeps the archive file open for reading file contents. Mutating operations repack the archive
/// through a temporary working copy that lives until the handle is closed or dropped.
///
/// ```no_run
/// use std::io::Read;
///
/// fn print_archive(path: &str) -> asar_archive::error::Result<()> {
///     let mut archive = asar_archive::Archive::open(path)?;
///
///     for path in archive.list() {
///         println!("{path}");
///     }
///
///     let mut contents = String::new();
///     archive.by_path("package.json")?.read_to_string(&mut contents)?;
///     println!("{contents}");
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Archive {
    pub(crate) src: PathBuf,
    pub(crate) file: Option<File>,
    pub(crate) header_size: u32,
    pub(crate) file_size: u64,
    pub(crate) header: Node,
    pub(crate) workdir: Option<PathBuf>,
    pub(crate) options: ArchiveOptions,
}

impl Archive {
    /// Creates a closed handle on `src`
    pub fn new(src: impl Into<PathBuf>) -> Self {
        Self::with_options(src, ArchiveOptions::default())
    }

    /// Creates a closed handle on `src` using `options`
    pub fn with_options(src: impl Into<PathBuf>, options: ArchiveOptions) -> Self {
        Self {
            src: src.into(),
            file: None,
            header_size: 0,
            file_size: 0,
            header: Node::default(),
            workdir: None,
            options,
        }
    }

    /// Opens the archive at `src`
    pub fn open(src: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_options(src, ArchiveOptions::default())
    }

    /// Opens the archive at `src` using `options`
    pub fn open_with_options(src: impl Into<PathBuf>, options: ArchiveOptions) -> Result<Self> {
        let mut archive = Self::with_options(src, options);
        archive.load()?;
        Ok(archive)
    }

    /// Packs the directory `src` into `dest` and opens the result
    pub async fn pack(
        src: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        options: &PackOptions,
    ) -> Result<Self> {
        let dest = dest.as_ref();
        write::pack(src, dest, options, |_| {}).await?;
        Self::open(dest)
    }

    /// Opens the handle on its source path, closing it first when it is already open
    pub fn reopen(&mut self) -> Result<()> {
        if self.is_open() {
            self.close();
        }
        self.load()
    }

    /// Releases the archive file and removes the temporary working copy
    ///
    /// Failing to remove the working copy is logged and otherwise ignored.
    pub fn close(&mut self) {
        self.file = None;
        self.header = Node::default();
        self.header_size = 0;
        self.file_size = 0;
        self.remove_workdir();
    }

    pub(crate) fn remove_workdir(&mut self) {
        if let Some(workdir) = self.workdir.take() {
            debug!(workdir = %workdir.display(), "removing working copy");
            if let Err(e) = std::fs::remove_dir_all(&workdir) {
                warn!(workdir = %workdir.display(), error = %e, "unable to remove working copy");
            }
        }
    }

    /// Opens the source file and reads its header, leaving any working copy in place
    #[instrument(skip(self), fields(src = %self.src.display()), err)]
    pub(crate) fn load(&mut self) -> Result<()> {
        let mut file = File::open(&self.src).map_err(|source| Error::OpenFailed {
            path: self.src.clone(),
            source,
        })?;

        let prefix = ArchivePrefix::read(&mut file)
            .map_err(|e| Error::InvalidArchive(format!("unable to read header size: {e}")))?;

        let file_size = file.metadata()?.len();
        if ArchivePrefix::SIZE + prefix.header_size as u64 > file_size {
            return Err(Error::InvalidArchive(format!(
                "header size {} exceeds the archive size {file_size}",
                prefix.header_size
            )));
        }

        let mut block = vec![0u8; prefix.header_size as usize];
        file.read_exact(&mut block)
            .map_err(|e| Error::InvalidArchive(format!("unable to read header: {e}")))?;

        let json = decode_string(&block)?;
        let value: serde_json::Value = serde_json::from_str(&json)
            .map_err(|e| Error::InvalidArchive(format!("header is not valid JSON: {e}")))?;
        if !value.get("files").is_some_and(|_| is_valid_node(&value)) {
            return Err(Error::InvalidArchive("header root is not a directory".into()));
        }
        let header: Node = serde_json::from_value(value)
            .map_err(|e| Error::InvalidArchive(format!("malformed header: {e}")))?;

        debug!(header_size = prefix.header_size, file_size, "opened");
        self.header = header;
        self.header_size = prefix.header_size;
        self.file_size = file_size;
        self.file = Some(file);
        Ok(())
    }

    /// Whether the handle holds an open archive file
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::NotOpened)
        }
    }

    /// Path of the archive file
    pub fn path(&self) -> &Path {
        &self.src
    }

    /// Byte length of the header block
    pub fn header_size(&self) -> u32 {
        self.header_size
    }

    /// Size of the archive file on disk
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Root of the temporary working copy, once a modification created one
    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    /// The root of the header
    pub fn header(&self) -> &Node {
        &self.header
    }

    /// An independent copy of the header
    pub fn header_copy(&self) -> Node {
        self.header.clone()
    }

    /// Looks up the node at `path`
    pub fn get_node(&self, path: &str) -> Option<&Node> {
        self.header.get_node(path)
    }

    /// An independent copy of the node at `path`
    pub fn copy_node(&self, path: &str) -> Option<Node> {
        self.get_node(path).cloned()
    }

    /// Whether anything exists at `path`
    pub fn exists(&self, path: &str) -> bool {
        self.get_node(path).is_some()
    }

    /// Names of the children of the directory at `path`
    pub fn list_children(&self, path: &str) -> Result<Vec<&str>> {
        self.header.list_children(path)
    }

    /// Total size of the file contents at `path`
    pub fn node_size(&self, path: &str) -> u64 {
        self.header.size_of(path)
    }

    /// Every path in the archive in depth-first pre-order, the root excluded
    pub fn list(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.header.walk("", |_, path| {
            if !path.is_empty() {
                paths.push(path.to_owned());
            }
            ControlFlow::Continue(())
        });
        paths
    }

    /// Walks the tree below `path`, see [`Node::walk`]
    pub fn walk<'a, F>(&'a self, path: &str, visit: F) -> Result<()>
    where
        F: FnMut(&'a Node, &str) -> ControlFlow<()>,
    {
        self.check_open()?;
        let node = self
            .get_node(path)
            .ok_or_else(|| Error::NodeNotFound(path.to_owned()))?;
        node.walk(path, visit);
        Ok(())
    }

    /// Walks the tree below `path`, see [`Node::walk_async`]
    pub async fn walk_async<'a, F, Fut>(&'a self, path: &str, visit: F) -> Result<()>
    where
        F: FnMut(&'a Node, String) -> Fut,
        Fut: std::future::Future<Output = ControlFlow<()>>,
    {
        self.check_open()?;
        let node = self
            .get_node(path)
            .ok_or_else(|| Error::NodeNotFound(path.to_owned()))?;
        node.walk_async(path, visit).await;
        Ok(())
    }

    /// Absolute position of the packed file at `path` inside the archive file
    ///
    /// `None` for files stored in the sidecar directory and for symlinks. A packed file without an
    /// offset, or one whose contents do not fit inside the archive file, is an invalid archive.
    pub(crate) fn absolute_range(&self, path: &str, entry: &FileEntry) -> Result<Option<Range<u64>>> {
        if entry.unpacked || entry.is_link() {
            return Ok(None);
        }

        let invalid = |reason: &str| Error::InvalidArchive(format!("{path}: {reason}"));
        let offset = entry
            .offset
            .ok_or_else(|| invalid("packed file has no offset"))?;
        let start = ArchivePrefix {
            header_size: self.header_size,
        }
        .data_start()
        .checked_add(offset)
        .ok_or_else(|| invalid("offset is out of range"))?;
        let end = start
            .checked_add(entry.size)
            .filter(|end| *end <= self.file_size)
            .ok_or_else(|| invalid("contents extend past the end of the archive"))?;

        Ok(Some(start..end))
    }

    /// Absolute byte range of the packed file at `path`
    ///
    /// `None` for files stored in the sidecar directory and for symlinks.
    pub fn byte_range(&self, path: &str) -> Result<Option<Range<u64>>> {
        match self.get_node(path) {
            None => Err(Error::NodeNotFound(path.to_owned())),
            Some(Node::Directory(_)) => Err(Error::IsADirectory(path.to_owned())),
            Some(Node::File(entry)) => self.absolute_range(path, entry),
        }
    }

    /// Resolves `path` to a file, following links inside the archive
    fn resolve_file(&self, path: &str) -> Result<(String, FileEntry)> {
        let mut current = normalize(path);
        for _ in 0..MAX_LINK_HOPS {
            match self.get_node(&current) {
                None => return Err(Error::NodeNotFound(current)),
                Some(Node::Directory(_)) => return Err(Error::IsADirectory(current)),
                Some(Node::File(FileEntry {
                    link: Some(link), ..
                })) => current = normalize(link),
                Some(Node::File(entry)) => return Ok((current, entry.clone())),
            }
        }
        Err(Error::InvalidPath(format!("{path}: too many levels of symbolic links")))
    }

    /// Opens the file at `path` for reading
    #[instrument(skip(self))]
    pub fn by_path(&mut self, path: &str) -> Result<ArchiveFile<'_>> {
        self.check_open()?;
        let (path, entry) = self.resolve_file(path)?;

        let reader = if entry.unpacked {
            let sidecar = host_path(&sidecar_path(&self.src), &path);
            EntryReader::Unpacked(File::open(sidecar)?)
        } else {
            let range = self
                .absolute_range(&path, &entry)?
                .ok_or_else(|| Error::InvalidArchive(format!("{path}: not a packed file")))?;
            let file = self.file.as_mut().ok_or(Error::NotOpened)?;
            file.seek(SeekFrom::Start(range.start))?;
            EntryReader::Packed(file.take(range.end - range.start))
        };

        Ok(ArchiveFile {
            path,
            entry,
            reader,
        })
    }

    /// Reads the whole file at `path`
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut file = self.by_path(path)?;
        let mut buffer = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        self.remove_workdir();
    }
}
