//! Path based operations over the header tree.
//!
//! Paths may use `/` or `\` as separator. A single leading separator, empty segments and `.`
//! segments are ignored and `..` removes the previous segment, so `""`, `"."` and `"/"` all name
//! the root.

use std::future::Future;
use std::ops::ControlFlow;

use crate::error::{Error, Result};
use crate::types::{Directory, FileEntry, Node};

/// Splits a path into its normalized segments
pub fn segments(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out
}

/// Normalizes a path to its forward slash form without a leading separator
pub fn normalize(path: &str) -> String {
    segments(path).join("/")
}

/// Joins a child name onto a normalized path
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}/{name}")
    }
}

impl Node {
    /// Whether this node is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    /// Borrow the node as a directory
    pub fn as_dir(&self) -> Option<&Directory> {
        match self {
            Node::Directory(dir) => Some(dir),
            Node::File(_) => None,
        }
    }

    /// Borrow the node as a file
    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }

    /// Sets the node at `path`, creating intermediate directories
    ///
    /// Any prior node at `path` is overwritten, as is a file standing where an intermediate
    /// directory is needed. Returns `false` for the root path or when `self` is not a directory.
    pub fn insert_node(&mut self, path: &str, node: Node) -> bool {
        let segments = segments(path);
        let Some((last, parents)) = segments.split_last() else {
            return false;
        };
        let Node::Directory(root) = self else {
            return false;
        };

        let mut dir = root;
        for segment in parents {
            let child = dir
                .files
                .entry((*segment).to_owned())
                .or_insert_with(Node::default);
            if let Node::File(_) = child {
                *child = Node::default();
            }
            dir = match child {
                Node::Directory(d) => d,
                Node::File(_) => unreachable!("replaced by a directory above"),
            };
        }

        dir.files.insert((*last).to_owned(), node);
        true
    }

    /// Removes the node at `path`
    ///
    /// The root path clears every child. Removing something that is not there succeeds.
    pub fn remove_node(&mut self, path: &str) -> bool {
        let segments = segments(path);
        let Node::Directory(root) = self else {
            return false;
        };
        let Some((last, parents)) = segments.split_last() else {
            root.files.clear();
            return true;
        };

        let mut dir = root;
        for segment in parents {
            match dir.files.get_mut(*segment) {
                Some(Node::Directory(d)) => dir = d,
                _ => return true,
            }
        }

        dir.files.shift_remove(*last);
        true
    }

    /// Looks up the node at `path`
    pub fn get_node(&self, path: &str) -> Option<&Node> {
        let mut node = self;
        for segment in segments(path) {
            node = node.as_dir()?.files.get(segment)?;
        }
        Some(node)
    }

    /// Names of the children of the directory at `path`
    pub fn list_children(&self, path: &str) -> Result<Vec<&str>> {
        let node = self
            .get_node(path)
            .ok_or_else(|| Error::NodeNotFound(path.to_owned()))?;
        let dir = node
            .as_dir()
            .ok_or_else(|| Error::NotADirectory(path.to_owned()))?;

        Ok(dir.files.keys().map(|k| k.as_str()).collect())
    }

    /// Total size of the file contents below this node
    pub fn total_size(&self) -> u64 {
        match self {
            Node::Directory(dir) => dir.files.values().map(Node::total_size).sum(),
            Node::File(file) => file.size,
        }
    }

    /// Total size of the node at `path`, `0` when nothing is there
    pub fn size_of(&self, path: &str) -> u64 {
        self.get_node(path).map_or(0, Node::total_size)
    }

    /// Depth-first pre-order traversal
    ///
    /// `visit` receives every node together with its path, `prefix` being the path of `self`.
    /// Returning [`ControlFlow::Break`] skips the children of that node.
    pub fn walk<'a, F>(&'a self, prefix: &str, mut visit: F)
    where
        F: FnMut(&'a Node, &str) -> ControlFlow<()>,
    {
        let mut stack = vec![(self, normalize(prefix))];
        while let Some((node, path)) = stack.pop() {
            if visit(node, &path).is_break() {
                continue;
            }
            push_children(&mut stack, node, &path);
        }
    }

    /// Same traversal as [`Node::walk`], awaiting `visit` on every node
    pub async fn walk_async<'a, F, Fut>(&'a self, prefix: &str, mut visit: F)
    where
        F: FnMut(&'a Node, String) -> Fut,
        Fut: Future<Output = ControlFlow<()>>,
    {
        let mut stack = vec![(self, normalize(prefix))];
        while let Some((node, path)) = stack.pop() {
            if visit(node, path.clone()).await.is_break() {
                continue;
            }
            push_children(&mut stack, node, &path);
        }
    }
}

fn push_children<'a>(stack: &mut Vec<(&'a Node, String)>, node: &'a Node, path: &str) {
    if let Node::Directory(dir) = node {
        for (name, child) in dir.files.iter().rev() {
            stack.push((child, join(path, name)));
        }
    }
}

#[cfg(test)]
mod test {
    use std::ops::ControlFlow;

    use pretty_assertions::assert_eq;

    use crate::error::Error;
    use crate::tree::{normalize, segments};
    use crate::types::{Directory, FileEntry, Node};

    fn sample() -> Node {
        let mut root = Node::default();
        assert!(root.insert_node("a.txt", FileEntry::packed(5, 0).into()));
        assert!(root.insert_node("b/c.txt", FileEntry::packed(3, 5).into()));
        assert!(root.insert_node("b/d/e.txt", FileEntry::packed(2, 8).into()));
        assert!(root.insert_node("f", Directory::default().into()));
        root
    }

    #[test]
    fn normalize_paths() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("."), "");
        assert_eq!(normalize("/"), "");
        assert_eq!(normalize("./renderer"), "renderer");
        assert_eq!(normalize("\\a\\b"), "a/b");
        assert_eq!(normalize("a/./b/../c/"), "a/c");
        assert_eq!(segments("/a//b"), vec!["a", "b"]);
    }

    #[test]
    fn insert_and_get() {
        let root = sample();

        assert_eq!(root.get_node(""), Some(&root));
        assert_eq!(root.get_node("."), Some(&root));
        assert_eq!(
            root.get_node("b/c.txt"),
            Some(&Node::File(FileEntry::packed(3, 5)))
        );
        assert_eq!(
            root.get_node("\\b\\d\\e.txt"),
            Some(&Node::File(FileEntry::packed(2, 8)))
        );
        assert!(root.get_node("b/missing").is_none());
        assert!(root.get_node("missing/c.txt").is_none());
        // intermediate is a file
        assert!(root.get_node("a.txt/c.txt").is_none());
    }

    #[test]
    fn insert_at_root_fails() {
        let mut root = sample();
        assert!(!root.insert_node("", Directory::default().into()));
        assert!(!root.insert_node(".", Directory::default().into()));
        assert_eq!(root, sample());
    }

    #[test]
    fn insert_overwrites() {
        let mut root = sample();
        assert!(root.insert_node("b", FileEntry::packed(1, 0).into()));
        assert_eq!(root.get_node("b"), Some(&Node::File(FileEntry::packed(1, 0))));

        assert!(root.insert_node("a.txt/x", FileEntry::packed(1, 1).into()));
        assert!(root.get_node("a.txt").is_some_and(Node::is_dir));
    }

    #[test]
    fn remove_nodes() {
        let mut root = sample();

        assert!(root.remove_node("b/d"));
        assert!(root.get_node("b/d/e.txt").is_none());
        assert!(root.get_node("b/c.txt").is_some());

        // absent paths are a no-op
        assert!(root.remove_node("missing/x"));
        assert!(root.remove_node("b/missing"));

        assert!(root.remove_node("."));
        assert_eq!(root, Node::default());
    }

    #[test]
    fn list_children() {
        let root = sample();
        assert_eq!(root.list_children("").unwrap(), vec!["a.txt", "b", "f"]);
        assert_eq!(root.list_children("b").unwrap(), vec!["c.txt", "d"]);
        assert!(root.list_children("f").unwrap().is_empty());
        assert!(matches!(root.list_children("nope"), Err(Error::NodeNotFound(_))));
        assert!(matches!(root.list_children("a.txt"), Err(Error::NotADirectory(_))));
    }

    #[test]
    fn sizes() {
        let root = sample();
        assert_eq!(root.total_size(), 10);
        assert_eq!(root.size_of("b"), 5);
        assert_eq!(root.size_of("a.txt"), 5);
        assert_eq!(root.size_of("f"), 0);
        assert_eq!(root.size_of("missing"), 0);
    }

    #[test]
    fn walk_pre_order() {
        let root = sample();
        let mut visited = Vec::new();
        root.walk("", |_, path| {
            visited.push(path.to_owned());
            ControlFlow::Continue(())
        });

        assert_eq!(
            visited,
            vec!["", "a.txt", "b", "b/c.txt", "b/d", "b/d/e.txt", "f"]
        );
    }

    #[test]
    fn walk_prunes_subtree() {
        let root = sample();
        let mut visited = Vec::new();
        root.walk("", |node, path| {
            visited.push(path.to_owned());
            if node.is_dir() && path == "b" {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert_eq!(visited, vec!["", "a.txt", "b", "f"]);
    }

    #[test]
    fn walk_from_prefix() {
        let root = sample();
        let mut visited = Vec::new();
        root.get_node("b/d").unwrap().walk("b/d", |_, path| {
            visited.push(path.to_owned());
            ControlFlow::Continue(())
        });

        assert_eq!(visited, vec!["b/d", "b/d/e.txt"]);
    }

    #[tokio::test]
    async fn walk_async_matches_walk() {
        let root = sample();

        let mut expected = Vec::new();
        root.walk("", |_, path| {
            expected.push(path.to_owned());
            ControlFlow::Continue(())
        });

        let mut actual = Vec::new();
        root.walk_async("", |_, path| {
            actual.push(path);
            async { ControlFlow::Continue(()) }
        })
        .await;

        assert_eq!(actual, expected);
    }
}
