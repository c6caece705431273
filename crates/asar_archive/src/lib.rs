//! This library handles reading, creating and patching **ASAR** package archives.
//!
//! # ASAR Archive Format Documentation
//!
//! An ASAR archive stores a directory tree (files, directories and symlinks) inside a single file.
//! Files can optionally be kept outside of the archive in a sidecar directory named after it with
//! an `.unpacked` suffix, which is how native modules and executables are usually shipped.
//!
//! ## File Structure
//!
//! | Offset (bytes)      | Field        | Description                                                  |
//! |---------------------|--------------|--------------------------------------------------------------|
//! | 0x0000              | Size block   | 8 bytes: pickle holding the byte length of the header block  |
//! | 0x0008              | Header block | `headerSize` bytes: pickle holding the JSON header string    |
//! | 0x0008 + headerSize | Data         | file contents, concatenated in depth-first pre-order         |
//!
//! ### Size Block
//!
//! - **Payload Size**: A 4-byte unsigned integer, always `4`.
//! - **Header Size**: A 4-byte unsigned integer holding the length of the header block.
//!
//! ### Header Block
//!
//! - **Payload Size**: A 4-byte unsigned integer holding the length of the rest of the block.
//! - **String Length**: A 4-byte signed integer holding the byte length of the JSON header.
//! - **String**: The UTF-8 encoded JSON header, zero-padded to a multiple of 4 bytes.
//!
//! ### Header
//!
//! ```text
//! Directory := { "files": { name: Node, ... } }
//! File      := { "size": number, "offset": string,
//!                "unpacked"?: true, "executable"?: true, "link"?: string }
//! ```
//!
//! - **offset**: Position of the contents relative to the start of the data section, as a
//!   decimal string. Absent for unpacked files and symlinks.
//! - **unpacked**: The contents live in `<archive>.unpacked/<path>` instead of the data section.
//! - **executable**: The source file had its executable bit set.
//! - **link**: Target of a symlink, relative to the archive root. Symlinks carry no `size`.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.asar`
//! - **Endianness**: Little-endian for all multi-byte integers
//!

pub mod error;
pub mod extract;
pub mod fs;
pub mod id;
mod patch;
pub mod pattern;
pub mod pickle;
pub mod read;
pub mod stream;
pub mod tree;
pub mod types;
pub mod write;

pub use extract::ExtractProgress;
pub use pattern::Unpack;
pub use read::{Archive, ArchiveFile, ArchiveOptions};
pub use types::{Directory, FileEntry, Node};
pub use write::{pack, PackOptions, PackProgress, PackSummary};
