//! Identifier and identity-tree types.
//!
//! The persisted tree is a nested JSON object: category names map to
//! sub-objects, and identifier keys (always prefixed `uuid_`) map to the
//! original artifact key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix every identifier carries; distinguishes entries from categories.
pub const IDENTIFIER_PREFIX: &str = "uuid_";

/// An opaque, persisted token naming one source artifact across builds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Generate a fresh random identifier (`uuid_` + 32 hex digits).
    pub fn generate() -> Self {
        Self(format!("{}{}", IDENTIFIER_PREFIX, Uuid::new_v4().simple()))
    }

    /// Wrap an existing identifier string (e.g. one read back from disk).
    ///
    /// Returns `None` if the string lacks the identifier prefix.
    pub fn parse(s: impl Into<String>) -> Option<Self> {
        let s = s.into();
        if s.starts_with(IDENTIFIER_PREFIX) && s.len() > IDENTIFIER_PREFIX.len() {
            Some(Self(s))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A node of the identity tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Leaf: the original artifact key an identifier stands for.
    Key(String),
    /// Nested category.
    Category(CategoryNode),
}

/// A category in the identity tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryNode {
    pub children: BTreeMap<String, TreeNode>,
}

impl CategoryNode {
    /// Walk (and optionally create) the category at a dotted path.
    ///
    /// Returns `None` if a segment is missing and `create` is false, or if a
    /// segment names a leaf instead of a category.
    pub fn descend_mut(&mut self, path: &str, create: bool) -> Option<&mut CategoryNode> {
        let mut node = self;
        for part in split_path(path) {
            if !node.children.contains_key(part) {
                if !create {
                    return None;
                }
                node.children
                    .insert(part.to_string(), TreeNode::Category(CategoryNode::default()));
            }
            node = match node.children.get_mut(part) {
                Some(TreeNode::Category(child)) => child,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Read-only variant of [`CategoryNode::descend_mut`] without creation.
    pub fn descend(&self, path: &str) -> Option<&CategoryNode> {
        let mut node = self;
        for part in split_path(path) {
            node = match node.children.get(part) {
                Some(TreeNode::Category(child)) => child,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Visit every `(category path, identifier, key)` triple in the subtree.
    pub fn visit<'a>(&'a self, path: &str, f: &mut dyn FnMut(&str, &'a str, &'a str)) {
        for (name, child) in &self.children {
            match child {
                TreeNode::Key(key) => f(path, name, key),
                TreeNode::Category(sub) => {
                    let sub_path = join_path(path, name);
                    sub.visit(&sub_path, f);
                }
            }
        }
    }
}

/// Split a dotted category path into its non-empty segments.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

/// Join a parent category path and a child name with a dot.
pub fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identifier_shape() {
        let id = Identifier::generate();
        assert!(id.as_str().starts_with("uuid_"));
        assert_eq!(id.as_str().len(), 5 + 32);
        assert!(id.as_str()[5..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_parse_identifier() {
        assert!(Identifier::parse("uuid_abc").is_some());
        assert!(Identifier::parse("uuid_").is_none());
        assert!(Identifier::parse("textures").is_none());
    }

    #[test]
    fn test_descend_creates_categories() {
        let mut root = CategoryNode::default();
        assert!(root.descend("assets.textures").is_none());
        root.descend_mut("assets.textures", true).unwrap();
        assert!(root.descend("assets").is_some());
        assert!(root.descend("assets.textures").is_some());
        assert!(root.descend("assets.fonts").is_none());
    }

    #[test]
    fn test_tree_serialization_shape() {
        let mut root = CategoryNode::default();
        root.descend_mut("assets.textures", true)
            .unwrap()
            .children
            .insert("uuid_1".into(), TreeNode::Key("img/a.png".into()));

        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["assets"]["textures"]["uuid_1"], "img/a.png");

        let back: CategoryNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "assets"), "assets");
        assert_eq!(join_path("assets", "fonts"), "assets.fonts");
    }
}
