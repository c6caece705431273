//! Base types for structure of an archive.

use binrw::{BinRead, BinWrite};
use indexmap::IndexMap;
use serde::{ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};

/// Archive size block
///
/// The first 8 bytes of every archive. It is a pickle holding a single `u32`, so the payload size
/// is always `4` and acts as the magic number. All data is stored in little endian format.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little, magic = 4u32)]
pub struct ArchivePrefix {
    /// The byte length of the header block that immediately follows
    pub header_size: u32,
}

impl ArchivePrefix {
    /// Size in bytes of the encoded prefix
    pub const SIZE: u64 = 8;

    /// Absolute position of the data section
    pub fn data_start(&self) -> u64 {
        Self::SIZE + self.header_size as u64
    }
}

/// An entry in the archive header
///
/// Directories are recognised by their `files` mapping, anything else is a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// A directory and its children
    Directory(Directory),

    /// A regular file or a symlink
    File(FileEntry),
}

impl Default for Node {
    fn default() -> Self {
        Node::Directory(Directory::default())
    }
}

impl From<Directory> for Node {
    fn from(value: Directory) -> Self {
        Node::Directory(value)
    }
}

impl From<FileEntry> for Node {
    fn from(value: FileEntry) -> Self {
        Node::File(value)
    }
}

/// Directory node, children are kept in the order they were inserted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    /// Child nodes by name
    pub files: IndexMap<String, Node>,
}

/// File node
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileEntry {
    /// Size of the file contents in bytes
    #[serde(default)]
    pub size: u64,

    /// Position of the contents relative to the start of the data section
    ///
    /// Absent for unpacked files and symlinks.
    #[serde(default, deserialize_with = "deserialize_offset")]
    pub offset: Option<u64>,

    /// Contents live in the sidecar directory instead of the archive
    #[serde(default)]
    pub unpacked: bool,

    /// The source file had its executable bit set
    #[serde(default)]
    pub executable: bool,

    /// Target of a symlink, relative to the package root
    #[serde(default)]
    pub link: Option<String>,
}

impl FileEntry {
    /// Creates a packed file stored at `offset`
    pub fn packed(size: u64, offset: u64) -> Self {
        Self {
            size,
            offset: Some(offset),
            ..Default::default()
        }
    }

    /// Creates a file stored in the sidecar directory
    pub fn unpacked(size: u64) -> Self {
        Self {
            size,
            unpacked: true,
            ..Default::default()
        }
    }

    /// Creates a symlink to `target`
    pub fn symlink(target: impl Into<String>) -> Self {
        Self {
            link: Some(target.into()),
            ..Default::default()
        }
    }

    /// Marks the file as executable
    pub fn with_executable(mut self, executable: bool) -> Self {
        self.executable = executable;
        self
    }

    /// Whether the file is a symlink
    pub fn is_link(&self) -> bool {
        self.link.is_some()
    }
}

impl Serialize for FileEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if self.link.is_none() {
            map.serialize_entry("size", &self.size)?;
        }
        if let Some(offset) = self.offset {
            // decimal string, values may exceed the range of a JSON number
            map.serialize_entry("offset", &offset.to_string())?;
        }
        if self.unpacked {
            map.serialize_entry("unpacked", &true)?;
        }
        if self.executable {
            map.serialize_entry("executable", &true)?;
        }
        if let Some(link) = &self.link {
            map.serialize_entry("link", link)?;
        }
        map.end()
    }
}

fn deserialize_offset<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawOffset {
        Text(String),
        Number(u64),
    }

    match Option::<RawOffset>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawOffset::Number(n)) => Ok(Some(n)),
        Some(RawOffset::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Checks the shape of a raw header value
///
/// A value is a node when it has a `files` object, or both a numeric `size` and a string
/// `offset`. Used on data read from disk before it is converted into [`Node`].
pub fn is_valid_node(value: &serde_json::Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    if object.get("files").is_some_and(|f| f.is_object()) {
        return true;
    }

    object.get("size").is_some_and(|s| s.is_number())
        && object.get("offset").is_some_and(|o| o.is_string())
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::error::Result;
    use crate::pickle::encode_u32;
    use crate::types::{is_valid_node, ArchivePrefix, Directory, FileEntry, Node};

    #[test]
    fn read_prefix() -> Result<()> {
        let mut input = Cursor::new(vec![0x04, 0x00, 0x00, 0x00, 0x34, 0x00, 0x00, 0x00]);

        let prefix = ArchivePrefix::read(&mut input)?;
        assert_eq!(prefix, ArchivePrefix { header_size: 0x34 });
        assert_eq!(prefix.data_start(), 0x3C);

        Ok(())
    }

    #[test]
    fn read_prefix_invalid_magic() {
        let mut input = Cursor::new(vec![0x08, 0x00, 0x00, 0x00, 0x34, 0x00, 0x00, 0x00]);
        assert!(ArchivePrefix::read(&mut input).is_err());
    }

    #[test]
    fn write_prefix_matches_u32_block() -> Result<()> {
        let mut actual = Vec::new();
        ArchivePrefix { header_size: 1234 }.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, encode_u32(1234));
        Ok(())
    }

    #[test]
    fn serialize_nodes() {
        let mut root = Directory::default();
        root.files.insert("a.txt".into(), FileEntry::packed(5, 0).into());
        root.files.insert(
            "run.sh".into(),
            FileEntry::packed(3, 5).with_executable(true).into(),
        );
        root.files.insert("big.bin".into(), FileEntry::unpacked(9).into());
        root.files.insert("link".into(), FileEntry::symlink("a.txt").into());

        assert_eq!(
            serde_json::to_string(&root).unwrap(),
            concat!(
                r#"{"files":{"#,
                r#""a.txt":{"size":5,"offset":"0"},"#,
                r#""run.sh":{"size":3,"offset":"5","executable":true},"#,
                r#""big.bin":{"size":9,"unpacked":true},"#,
                r#""link":{"link":"a.txt"}}}"#
            )
        );
    }

    #[test]
    fn deserialize_keeps_order_and_kinds() {
        let root: Node = serde_json::from_str(
            r#"{"files":{"z":{"files":{}},"a":{"size":2,"offset":"18446744073709551615"},"m":{"size":1,"offset":7}}}"#,
        )
        .unwrap();

        let Node::Directory(dir) = root else {
            panic!("root should be a directory");
        };
        assert_eq!(dir.files.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(dir.files["z"], Node::Directory(Directory::default()));
        assert_eq!(dir.files["a"], Node::File(FileEntry::packed(2, u64::MAX)));
        assert_eq!(dir.files["m"], Node::File(FileEntry::packed(1, 7)));
    }

    #[test]
    fn validate_raw_nodes() {
        assert!(is_valid_node(&json!({ "files": {} })));
        assert!(is_valid_node(&json!({ "size": 1, "offset": "0" })));
        assert!(!is_valid_node(&json!({ "size": 1 })));
        assert!(!is_valid_node(&json!({ "size": "1", "offset": "0" })));
        assert!(!is_valid_node(&json!({ "files": [] })));
        assert!(!is_valid_node(&json!("files")));
    }
}
