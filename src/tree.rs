//! The path-addressed tree of nodes (C2), built on top of [`Node`] (C1).

use tokio::sync::RwLock;

use crate::error::TreeError;
use crate::node::{Access, ArgValue, Argument, Node};

/// The metadata assigned to a method by [`Tree::add_method`].
///
/// Overwriting an existing method's metadata is permitted and leaves its
/// children untouched (spec.md §4.1).
#[derive(Debug, Clone, Default)]
pub struct MethodSpec {
    pub description: Option<String>,
    pub access: Access,
    pub tags: Option<Vec<String>>,
    pub critical: Option<bool>,
    pub arguments: Vec<Argument>,
}

/// Split a `/`-delimited path into non-empty segments, tolerating leading
/// and trailing slashes (spec.md §4.1 "Path syntax").
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join path segments back into a full path; the root's full path is `/`
/// (spec.md §3 invariant 4).
pub fn join_path(segments: &[String]) -> String {
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// The address-space tree. Owns the root [`Node`]; all mutation and lookup
/// goes through this type.
///
/// Mutations take the write half of the lock, reads (and serialization)
/// take the read half, per §5's reader/writer discipline.
pub struct Tree {
    root: RwLock<Node>,
}

impl Tree {
    pub fn new(root_description: Option<String>) -> Self {
        let mut root = Node::new();
        root.description = root_description;
        root.access = Some(Access::NoValue);
        Self {
            root: RwLock::new(root),
        }
    }

    /// Split `path`, descend from root creating missing children, and
    /// assign `spec` to the terminal node.
    pub async fn add_method(&self, path: &str, spec: MethodSpec) {
        let segments = split_path(path);
        let mut root = self.root.write().await;
        let mut current = &mut *root;
        for seg in &segments {
            current = current.children.entry(seg.clone()).or_insert_with(Node::new);
        }
        current.description = spec.description;
        current.access = Some(spec.access);
        current.tags = spec.tags;
        current.critical = spec.critical;
        current.arguments = Some(spec.arguments);
    }

    /// Clear the method's metadata at `path` (no-op if absent), then apply
    /// the cleanup rule: walk parent-ward removing every empty node until a
    /// non-empty node or the root is reached. The root is never removed.
    pub async fn remove_method(&self, path: &str) {
        let segments = split_path(path);
        let mut root = self.root.write().await;
        remove_recursive(&mut root, &segments);
    }

    /// Set an argument's value. Fails with `IndexOutOfRange` when the slot
    /// doesn't exist; a path that doesn't resolve is a silent no-op
    /// (writes are opportunistic, spec.md §4.1).
    pub async fn set_value(&self, path: &str, index: usize, value: ArgValue) -> Result<(), TreeError> {
        let segments = split_path(path);
        let mut root = self.root.write().await;
        let Some(node) = lookup_mut(&mut root, &segments) else {
            return Ok(());
        };
        let arg = arg_slot_mut(node, path, index)?;
        arg.value = Some(value);
        Ok(())
    }

    /// Clear an argument's value. Same failure/no-op semantics as
    /// [`Tree::set_value`].
    pub async fn unset_value(&self, path: &str, index: usize) -> Result<(), TreeError> {
        let segments = split_path(path);
        let mut root = self.root.write().await;
        let Some(node) = lookup_mut(&mut root, &segments) else {
            return Ok(());
        };
        let arg = arg_slot_mut(node, path, index)?;
        arg.value = None;
        Ok(())
    }

    /// Read an argument's value. Never fails on a missing path — returns
    /// `None` for both a missing path and an absent value.
    pub async fn get_value(&self, path: &str, index: usize) -> Option<ArgValue> {
        let segments = split_path(path);
        let root = self.root.read().await;
        let node = find_node(&root, &segments)?;
        node.arguments.as_ref()?.get(index)?.value.clone()
    }

    /// Return a clone of the node at `path`, if any.
    pub async fn lookup(&self, path: &str) -> Option<Node> {
        let segments = split_path(path);
        let root = self.root.read().await;
        find_node(&root, &segments).cloned()
    }

    /// Run `f` against the root node while holding the read lock, without
    /// cloning — used by the HTTP endpoint (together with [`find_node`]) so
    /// a response never mixes pre- and post-mutation states of the same
    /// node (§5).
    pub async fn with_root<R>(&self, f: impl FnOnce(&Node) -> R) -> R {
        let root = self.root.read().await;
        f(&root)
    }
}

/// Descend from `node` (normally the tree root) along `segments`, without
/// cloning. `pub(crate)` so callers that already hold a read lock (via
/// [`Tree::with_root`]) can resolve a path within it instead of going
/// through [`Tree::lookup`]'s clone.
pub(crate) fn find_node<'a>(node: &'a Node, segments: &[String]) -> Option<&'a Node> {
    let mut current = node;
    for seg in segments {
        current = current.children.get(seg)?;
    }
    Some(current)
}

fn lookup_mut<'a>(node: &'a mut Node, segments: &[String]) -> Option<&'a mut Node> {
    let mut current = node;
    for seg in segments {
        current = current.children.get_mut(seg)?;
    }
    Some(current)
}

fn arg_slot_mut<'a>(
    node: &'a mut Node,
    path: &str,
    index: usize,
) -> Result<&'a mut Argument, TreeError> {
    node.arguments
        .as_mut()
        .and_then(|args| args.get_mut(index))
        .ok_or_else(|| TreeError::IndexOutOfRange {
            path: path.to_string(),
            index,
        })
}

/// Returns whether `node` is now empty and should be pruned from its
/// parent. The root is exempt by construction — the caller never removes
/// it from a parent map, since it has none.
fn remove_recursive(node: &mut Node, segments: &[String]) -> bool {
    if segments.is_empty() {
        node.clear_metadata();
    } else if let Some(child) = node.children.get_mut(&segments[0]) {
        if remove_recursive(child, &segments[1..]) {
            node.children.remove(&segments[0]);
        }
    }
    node.is_empty_node()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ArgType, Argument};

    fn spec(access: Access, args: Vec<Argument>) -> MethodSpec {
        MethodSpec {
            description: None,
            access,
            tags: None,
            critical: None,
            arguments: args,
        }
    }

    #[tokio::test]
    async fn add_then_lookup_resolves() {
        let tree = Tree::new(None);
        tree.add_method("/chatbox/input", spec(Access::WriteOnly, vec![
            Argument::new(ArgType::OscString),
            Argument::new(ArgType::True),
        ])).await;
        let node = tree.lookup("/chatbox/input").await.expect("node present");
        assert!(node.is_method());
        assert_eq!(node.arguments.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn remove_method_cleans_up_empty_ancestors() {
        let tree = Tree::new(None);
        tree.add_method("/a/b/c", spec(Access::ReadWrite, vec![Argument::new(ArgType::Float32)])).await;
        tree.remove_method("/a/b/c").await;
        assert!(tree.lookup("/a/b/c").await.is_none());
        assert!(tree.lookup("/a/b").await.is_none());
        assert!(tree.lookup("/a").await.is_none());
    }

    #[tokio::test]
    async fn remove_method_keeps_surviving_siblings() {
        let tree = Tree::new(None);
        tree.add_method("/a/b/c", spec(Access::ReadWrite, vec![Argument::new(ArgType::Float32)])).await;
        tree.add_method("/a/d", spec(Access::ReadWrite, vec![Argument::new(ArgType::Int32)])).await;
        tree.remove_method("/a/b/c").await;
        assert!(tree.lookup("/a/b").await.is_none());
        assert!(tree.lookup("/a").await.is_some());
        assert!(tree.lookup("/a/d").await.is_some());
    }

    #[tokio::test]
    async fn remove_method_on_missing_path_is_noop() {
        let tree = Tree::new(None);
        tree.remove_method("/does/not/exist").await;
        assert!(tree.lookup("/does/not/exist").await.is_none());
    }

    #[tokio::test]
    async fn set_value_out_of_range_errors() {
        let tree = Tree::new(None);
        tree.add_method("/a", spec(Access::ReadWrite, vec![Argument::new(ArgType::Float32)])).await;
        let err = tree.set_value("/a", 5, ArgValue::Float(1.0)).await.unwrap_err();
        assert!(matches!(err, TreeError::IndexOutOfRange { index: 5, .. }));
    }

    #[tokio::test]
    async fn set_value_on_missing_path_is_noop_ok() {
        let tree = Tree::new(None);
        assert!(tree.set_value("/nope", 0, ArgValue::Int(1)).await.is_ok());
    }

    #[tokio::test]
    async fn get_value_never_fails() {
        let tree = Tree::new(None);
        assert_eq!(tree.get_value("/nope", 0).await, None);
        tree.add_method("/a", spec(Access::ReadWrite, vec![Argument::new(ArgType::Float32)])).await;
        assert_eq!(tree.get_value("/a", 0).await, None);
        tree.set_value("/a", 0, ArgValue::Float(0.5)).await.unwrap();
        assert_eq!(tree.get_value("/a", 0).await, Some(ArgValue::Float(0.5)));
    }

    #[tokio::test]
    async fn path_with_slashes_tolerated() {
        let tree = Tree::new(None);
        tree.add_method("//a/b//", spec(Access::ReadWrite, vec![])).await;
        assert!(tree.lookup("/a/b").await.is_some());
    }

    #[tokio::test]
    async fn overwrite_preserves_children() {
        let tree = Tree::new(None);
        tree.add_method("/a/b", spec(Access::ReadWrite, vec![Argument::new(ArgType::Int32)])).await;
        tree.add_method("/a", spec(Access::NoValue, vec![])).await;
        assert!(tree.lookup("/a/b").await.is_some());
    }
}
