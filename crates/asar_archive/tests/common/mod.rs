#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tracing::info;
use walkdir::WalkDir;

/// Writes `files` below `root`, creating parent directories
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (path, contents) in files {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

/// A small application layout
pub fn sample_app(root: &Path) {
    write_tree(
        root,
        &[
            ("package.json", br#"{"name":"app","main":"main.js"}"#),
            ("main.js", b"require('./renderer/index.js')"),
            ("renderer/index.js", b"console.log('renderer')"),
            ("renderer/views/list.html", b"<ul></ul>"),
            ("native/addon.node", b"\x7fELF native addon"),
            ("empty.txt", b""),
        ],
    );
    fs::create_dir_all(root.join("assets")).unwrap();
}

#[derive(Debug, PartialEq)]
pub enum Kind {
    Dir,
    File(Vec<u8>, bool),
    Link(PathBuf),
}

#[cfg(unix)]
fn executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o100 != 0
}

#[cfg(not(unix))]
fn executable(_metadata: &fs::Metadata) -> bool {
    false
}

/// Every entry below `root` with its kind and contents, in file name order
pub fn snapshot(root: &Path) -> Vec<(String, Kind)> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");

            let kind = if entry.path_is_symlink() {
                Kind::Link(fs::read_link(entry.path()).unwrap())
            } else if entry.file_type().is_dir() {
                Kind::Dir
            } else {
                let metadata = entry.metadata().unwrap();
                Kind::File(fs::read(entry.path()).unwrap(), executable(&metadata))
            };
            (relative, kind)
        })
        .collect()
}

/// Asserts that two directories hold the same entries
pub fn assert_same_tree(expected: &Path, actual: &Path) {
    info!(
        "comparing {} to {}",
        expected.display(),
        actual.display()
    );
    assert_eq!(snapshot(expected), snapshot(actual));
}
