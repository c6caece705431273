//! Filesystem helpers shared by packing, extraction and repacking.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::tree::segments;

/// Suffix of the directory holding unpacked entries next to an archive
pub const UNPACKED_SUFFIX: &str = ".unpacked";

/// Suffix of the archive written while repacking
pub const TMP_SUFFIX: &str = ".tmp";

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// `<archive>.unpacked`
pub fn sidecar_path(archive: &Path) -> PathBuf {
    with_suffix(archive, UNPACKED_SUFFIX)
}

/// `<archive>.tmp`
pub fn tmp_path(archive: &Path) -> PathBuf {
    with_suffix(archive, TMP_SUFFIX)
}

/// Resolves an archive path below `root`
pub fn host_path(root: &Path, path: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    out.extend(segments(path));
    out
}

/// Converts a path relative to a packing root into its forward slash archive form
pub(crate) fn archive_path(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| Error::InvalidPath(relative.display().to_string()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Target of a symlink placed in `from_dir` that points at `target`
///
/// Both paths are archive paths relative to the same root.
pub fn relative_link(from_dir: &str, target: &str) -> PathBuf {
    let from = segments(from_dir);
    let to = segments(target);
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    out.extend(&to[common..]);
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Whether the file described by `metadata` should be flagged executable
#[cfg(unix)]
pub(crate) fn is_executable(_path: &Path, metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o100 != 0
}

/// Whether the file described by `metadata` should be flagged executable
#[cfg(not(unix))]
pub(crate) fn is_executable(path: &Path, _metadata: &std::fs::Metadata) -> bool {
    path.extension().is_some_and(|ext| ext == "exe")
}

/// Adds the execute bits to a file
#[cfg(unix)]
pub(crate) async fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = tokio::fs::metadata(path).await?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    tokio::fs::set_permissions(path, permissions).await
}

/// Adds the execute bits to a file
#[cfg(not(unix))]
pub(crate) async fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Creates a symlink at `link` pointing at `target`
#[cfg(unix)]
pub(crate) async fn symlink(target: &Path, link: &Path, _is_dir: bool) -> io::Result<()> {
    tokio::fs::symlink(target, link).await
}

/// Creates a symlink at `link` pointing at `target`
#[cfg(windows)]
pub(crate) async fn symlink(target: &Path, link: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        tokio::fs::symlink_dir(target, link).await
    } else {
        tokio::fs::symlink_file(target, link).await
    }
}

/// Removes a file, symlink or directory tree, doing nothing when `path` does not exist
pub async fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    debug!(path = %path.display(), "removing");
    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}

/// Copies a file, symlink or directory tree from `src` to `dest`
///
/// Symlinks are recreated pointing at the same target rather than followed.
pub async fn copy_recursive(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| Error::InvalidPath(entry.path().display().to_string()))?;
        let target = if relative.as_os_str().is_empty() {
            dest.to_path_buf()
        } else {
            dest.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            let link = tokio::fs::read_link(entry.path()).await?;
            let is_dir = tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            symlink(&link, &target, is_dir).await?;
        } else if file_type.is_dir() {
            tokio::fs::create_dir_all(&target).await?;
        } else {
            tokio::fs::copy(entry.path(), &target).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;

    use crate::fs::{archive_path, copy_recursive, host_path, relative_link, remove_path, sidecar_path, tmp_path};

    #[test]
    fn suffixed_paths() {
        assert_eq!(
            sidecar_path(Path::new("out/app.asar")),
            PathBuf::from("out/app.asar.unpacked")
        );
        assert_eq!(tmp_path(Path::new("app.asar")), PathBuf::from("app.asar.tmp"));
        assert_eq!(
            sidecar_path(&tmp_path(Path::new("app.asar"))),
            PathBuf::from("app.asar.tmp.unpacked")
        );
    }

    #[test]
    fn host_paths() {
        assert_eq!(
            host_path(Path::new("root"), "/a\\b/./c"),
            Path::new("root").join("a").join("b").join("c")
        );
        assert_eq!(host_path(Path::new("root"), ""), PathBuf::from("root"));
    }

    #[test]
    fn archive_paths() {
        assert_eq!(
            archive_path(&Path::new("a").join("b").join("c.txt")).unwrap(),
            "a/b/c.txt"
        );
    }

    #[test]
    fn relative_links() {
        assert_eq!(relative_link("", "a.txt"), PathBuf::from("a.txt"));
        assert_eq!(relative_link("b", "a.txt"), Path::new("..").join("a.txt"));
        assert_eq!(
            relative_link("b/d", "b/c/x"),
            Path::new("..").join("c").join("x")
        );
        assert_eq!(relative_link("b", "b/c.txt"), PathBuf::from("c.txt"));
        assert_eq!(relative_link("b", "b"), PathBuf::from("."));
    }

    #[tokio::test]
    async fn copy_and_remove_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("a.txt"), b"hello").unwrap();
        std::fs::write(src.join("nested").join("b.txt"), b"world").unwrap();

        let dest = dir.path().join("copy").join("dest");
        copy_recursive(&src, &dest).await.unwrap();
        assert_eq!(std::fs::read(dest.join("a.txt")).unwrap(), b"hello");
        assert_eq!(std::fs::read(dest.join("nested").join("b.txt")).unwrap(), b"world");

        let single = dir.path().join("single.txt");
        copy_recursive(&src.join("a.txt"), &single).await.unwrap();
        assert_eq!(std::fs::read(&single).unwrap(), b"hello");

        remove_path(&dest).await.unwrap();
        remove_path(&single).await.unwrap();
        assert!(!dest.exists());
        assert!(!single.exists());

        // missing paths are ignored
        remove_path(&dir.path().join("missing")).await.unwrap();
    }
}
