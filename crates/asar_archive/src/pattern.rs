//! Selection of the entries that are stored outside of the archive.

use glob::Pattern;
use regex::Regex;

/// Decides which files are written to the sidecar directory instead of the archive
///
/// `Substring`, `Substrings` and `Regex` are tested against the root-relative path with a
/// leading `/` (`/dir/file.node`), mirroring how the entries were matched when this format was
/// introduced. Substring matching can over-match: `"a.node"` also selects `"/data.node"`.
/// `Globs` is tested against the root-relative path without a leading separator and is what
/// repacking uses to carry earlier decisions forward.
#[derive(Debug, Clone, Default)]
pub enum Unpack {
    /// Nothing is unpacked
    #[default]
    None,

    /// Paths containing this substring
    Substring(String),

    /// Paths containing any of these substrings
    Substrings(Vec<String>),

    /// Paths matching this expression
    Regex(Regex),

    /// Paths matching any of these glob patterns
    Globs(Vec<Pattern>),
}

impl Unpack {
    /// Whether the file at `path` should be unpacked
    pub fn matches(&self, path: &str) -> bool {
        let rooted = format!("/{}", path.replace('\\', "/"));
        match self {
            Unpack::None => false,
            Unpack::Substring(pattern) => contains(&rooted, pattern),
            Unpack::Substrings(patterns) => patterns.iter().any(|p| contains(&rooted, p)),
            Unpack::Regex(regex) => regex.is_match(&rooted),
            Unpack::Globs(globs) => globs.iter().any(|g| g.matches(&rooted[1..])),
        }
    }

    /// Glob selecting every file below the directory `path`
    pub fn directory_glob(path: &str) -> Result<Pattern, glob::PatternError> {
        Pattern::new(&format!("{}/**", Pattern::escape(path)))
    }

    /// Glob selecting exactly the file `path`
    pub fn file_glob(path: &str) -> Result<Pattern, glob::PatternError> {
        Pattern::new(&Pattern::escape(path))
    }
}

fn contains(path: &str, pattern: &str) -> bool {
    !pattern.is_empty() && path.contains(&pattern.replace('\\', "/"))
}

impl From<&str> for Unpack {
    fn from(value: &str) -> Self {
        Unpack::Substring(value.to_owned())
    }
}

impl From<String> for Unpack {
    fn from(value: String) -> Self {
        Unpack::Substring(value)
    }
}

impl From<Vec<String>> for Unpack {
    fn from(value: Vec<String>) -> Self {
        Unpack::Substrings(value)
    }
}

impl From<Regex> for Unpack {
    fn from(value: Regex) -> Self {
        Unpack::Regex(value)
    }
}

impl From<Vec<Pattern>> for Unpack {
    fn from(value: Vec<Pattern>) -> Self {
        Unpack::Globs(value)
    }
}
