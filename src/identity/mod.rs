//! Stable identifiers for source artifacts.
//!
//! The registry hands out one identifier per distinct artifact key (a source
//! path or any caller-chosen string) and files it under a dotted category
//! such as `assets.textures`. The tree is persisted as JSON in the build
//! directory; the forward (key to identifier) and reverse (identifier to
//! category) indexes are rebuilt from the tree alone on restore.
//!
//! # Example
//!
//! ```ignore
//! use particraft::identity::IdentityRegistry;
//!
//! let mut ids = IdentityRegistry::open("build/uuid.json")?;
//! let id = ids.register("img/hero.png", "assets.textures")?;
//! assert_eq!(ids.locate(&id), Some("assets.textures"));
//! ids.persist()?;
//! ```

pub mod types;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CraftError, Result};

pub use types::{CategoryNode, Identifier, TreeNode, IDENTIFIER_PREFIX};

type Generator = Box<dyn FnMut() -> Identifier + Send>;

/// Persistent identity tree for one build directory.
pub struct IdentityRegistry {
    path: Option<PathBuf>,
    tree: CategoryNode,
    id_to_category: HashMap<Identifier, String>,
    key_to_id: HashMap<String, Identifier>,
    generator: Generator,
}

impl fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("path", &self.path)
            .field("entries", &self.key_to_id.len())
            .finish()
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    /// Create an empty registry with no backing file.
    pub fn new() -> Self {
        Self {
            path: None,
            tree: CategoryNode::default(),
            id_to_category: HashMap::new(),
            key_to_id: HashMap::new(),
            generator: Box::new(Identifier::generate),
        }
    }

    /// Create an empty registry bound to a backing file, without reading it.
    pub fn bound_to(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::new()
        }
    }

    /// Bind to a backing file and restore whatever it holds.
    ///
    /// A missing file yields an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut registry = Self::bound_to(path);
        registry.restore()?;
        Ok(registry)
    }

    /// Replace the identifier source. Used to exercise collision handling.
    pub fn with_generator(mut self, generator: impl FnMut() -> Identifier + Send + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    /// The backing file, if bound.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Return the identifier for `key`, creating one under `category` if the
    /// key is new. A key already known anywhere in the tree keeps its
    /// existing identifier and category.
    ///
    /// The category is normalized (empty segments dropped) before use. A
    /// segment carrying the identifier prefix is rejected, since the tree
    /// could not tell it apart from an entry once persisted.
    pub fn register(&mut self, key: &str, category: &str) -> Result<Identifier> {
        if let Some(id) = self.key_to_id.get(key) {
            return Ok(id.clone());
        }

        let category = normalize_category(category)?;
        let id = self.fresh_identifier();
        let node = self.tree.descend_mut(&category, true).ok_or_else(|| CraftError::Registry {
            message: format!("Category '{}' runs through an identifier", category),
            help: None,
        })?;
        node.children
            .insert(id.as_str().to_string(), TreeNode::Key(key.to_string()));
        self.id_to_category.insert(id.clone(), category);
        self.key_to_id.insert(key.to_string(), id.clone());
        Ok(id)
    }

    /// Generate until the candidate is absent from the reverse index.
    fn fresh_identifier(&mut self) -> Identifier {
        loop {
            let candidate = (self.generator)();
            if !self.id_to_category.contains_key(&candidate) {
                return candidate;
            }
            tracing::debug!(identifier = %candidate, "identifier collision, regenerating");
        }
    }

    /// Forward lookup: artifact key to identifier.
    pub fn resolve(&self, key: &str) -> Option<&Identifier> {
        self.key_to_id.get(key)
    }

    /// Reverse lookup: identifier to category path.
    pub fn locate(&self, id: &Identifier) -> Option<&str> {
        self.id_to_category.get(id).map(|s| s.as_str())
    }

    /// The artifact key an identifier stands for.
    pub fn get(&self, id: &Identifier) -> Option<&str> {
        let category = self.id_to_category.get(id)?;
        match self.tree.descend(category)?.children.get(id.as_str()) {
            Some(TreeNode::Key(key)) => Some(key.as_str()),
            _ => None,
        }
    }

    /// Remove an identifier and its key. Returns whether anything was removed.
    pub fn remove_identifier(&mut self, id: &Identifier) -> bool {
        let Some(category) = self.id_to_category.remove(id) else {
            return false;
        };
        let removed = self
            .tree
            .descend_mut(&category, false)
            .and_then(|node| node.children.remove(id.as_str()));

        if let Some(TreeNode::Key(key)) = removed {
            self.key_to_id.remove(&key);
            true
        } else {
            false
        }
    }

    /// Remove the entry registered for `key`.
    pub fn remove_key(&mut self, key: &str) -> bool {
        match self.key_to_id.get(key).cloned() {
            Some(id) => self.remove_identifier(&id),
            None => false,
        }
    }

    /// Entries filed directly under `category`, sorted by identifier.
    pub fn list_category(&self, category: &str) -> Vec<(Identifier, String)> {
        let Some(node) = self.tree.descend(category) else {
            return Vec::new();
        };
        node.children
            .iter()
            .filter_map(|(name, child)| match child {
                TreeNode::Key(key) => Some((Identifier::parse(name.as_str())?, key.clone())),
                TreeNode::Category(_) => None,
            })
            .collect()
    }

    /// Every `(identifier, category, key)` in the tree, in tree order.
    pub fn entries(&self) -> Vec<(Identifier, String, String)> {
        let mut out = Vec::new();
        self.tree.visit("", &mut |category, name, key| {
            if let Some(id) = Identifier::parse(name) {
                out.push((id, category.to_string(), key.to_string()));
            }
        });
        out
    }

    pub fn len(&self) -> usize {
        self.key_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_to_id.is_empty()
    }

    /// Drop every entry. The backing file is untouched until `persist`.
    pub fn clear(&mut self) {
        self.tree = CategoryNode::default();
        self.id_to_category.clear();
        self.key_to_id.clear();
    }

    /// The raw tree.
    pub fn tree(&self) -> &CategoryNode {
        &self.tree
    }

    /// Reload from the backing file, discarding in-memory state.
    pub fn restore(&mut self) -> Result<()> {
        let path = self.require_path()?.to_path_buf();
        self.clear();

        if !path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| CraftError::io(&path, "Failed to read identity tree", e))?;
        let tree: CategoryNode = serde_json::from_str(&content).map_err(|e| CraftError::Parse {
            message: format!("Invalid identity tree {}: {}", path.display(), e),
            help: Some("Delete the file to regenerate identifiers".to_string()),
        })?;

        self.rebuild_indexes(tree)
    }

    /// Bind to `path` and reload from it.
    pub fn restore_from(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.path = Some(path.into());
        self.restore()
    }

    fn rebuild_indexes(&mut self, tree: CategoryNode) -> Result<()> {
        let mut problems = Vec::new();
        let mut id_to_category = HashMap::new();
        let mut key_to_id = HashMap::new();

        check_node(&tree, "", &mut problems);
        tree.visit("", &mut |category, name, key| {
            if let Some(id) = Identifier::parse(name) {
                id_to_category.insert(id.clone(), category.to_string());
                key_to_id.insert(key.to_string(), id);
            }
        });

        if let Some(problem) = problems.into_iter().next() {
            return Err(CraftError::Parse {
                message: problem,
                help: Some("Delete the file to regenerate identifiers".to_string()),
            });
        }

        self.tree = tree;
        self.id_to_category = id_to_category;
        self.key_to_id = key_to_id;
        Ok(())
    }

    /// Serialize the tree to the backing file.
    ///
    /// Writes only when the serialized tree differs from the file's current
    /// content. Returns whether a write happened.
    pub fn persist(&self) -> Result<bool> {
        let path = self.require_path()?;

        let mut problems = Vec::new();
        check_node(&self.tree, "", &mut problems);
        if let Some(problem) = problems.into_iter().next() {
            return Err(CraftError::Registry {
                message: format!("Refusing to persist identity tree: {}", problem),
                help: None,
            });
        }
        let content = self.to_json()?;

        if let Ok(existing) = fs::read_to_string(path) {
            if existing == content {
                return Ok(false);
            }
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| CraftError::io(parent, "Failed to create directory", e))?;
            }
        }
        fs::write(path, content)
            .map_err(|e| CraftError::io(path, "Failed to write identity tree", e))?;
        tracing::debug!(path = %path.display(), entries = self.len(), "persisted identity tree");
        Ok(true)
    }

    /// Bind to `path` and persist there.
    pub fn persist_to(&mut self, path: impl Into<PathBuf>) -> Result<bool> {
        self.path = Some(path.into());
        self.persist()
    }

    /// The tree as pretty JSON (four-space indent).
    pub fn to_json(&self) -> Result<String> {
        use serde::Serialize;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.tree.serialize(&mut ser).map_err(|e| CraftError::Registry {
            message: format!("Failed to serialize identity tree: {}", e),
            help: None,
        })?;
        String::from_utf8(buf).map_err(|e| CraftError::Registry {
            message: format!("Identity tree is not valid UTF-8: {}", e),
            help: None,
        })
    }

    fn require_path(&self) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| CraftError::Registry {
            message: "No backing file set for the identity registry".to_string(),
            help: Some("Bind the registry with IdentityRegistry::open or persist_to".to_string()),
        })
    }
}

/// Rejoin the non-empty segments of a dotted category path, rejecting
/// segments that would read back as identifiers.
fn normalize_category(category: &str) -> Result<String> {
    let segments: Vec<&str> = types::split_path(category).collect();
    if let Some(bad) = segments.iter().find(|s| Identifier::parse(**s).is_some()) {
        return Err(CraftError::Registry {
            message: format!("Category '{}' has a segment named like an identifier: '{}'", category, bad),
            help: Some(format!("Category names must not start with '{}'", IDENTIFIER_PREFIX)),
        });
    }
    Ok(segments.join("."))
}

/// Collect structural problems: identifiers holding categories, or category
/// names holding plain strings.
fn check_node(node: &CategoryNode, path: &str, problems: &mut Vec<String>) {
    for (name, child) in &node.children {
        let is_id = Identifier::parse(name.as_str()).is_some();
        match child {
            TreeNode::Key(_) if !is_id => {
                problems.push(format!("'{}' in '{}' is not an identifier", name, path))
            }
            TreeNode::Category(_) if is_id => {
                problems.push(format!("identifier '{}' in '{}' holds a category", name, path))
            }
            TreeNode::Category(sub) => check_node(sub, &types::join_path(path, name), problems),
            TreeNode::Key(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn test_register_is_idempotent() {
        let mut ids = IdentityRegistry::new();
        let a = ids.register("img/a.png", "assets.textures").unwrap();
        let again = ids.register("img/a.png", "assets.textures").unwrap();
        assert_eq!(a, again);
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_first_category_wins() {
        let mut ids = IdentityRegistry::new();
        let a = ids.register("shared.bin", "assets.textures").unwrap();
        let b = ids.register("shared.bin", "assets.fonts").unwrap();
        assert_eq!(a, b);
        assert_eq!(ids.locate(&a), Some("assets.textures"));
        assert!(ids.list_category("assets.fonts").is_empty());
    }

    #[test]
    fn test_distinct_keys_distinct_ids() {
        let mut ids = IdentityRegistry::new();
        let mut seen = HashSet::new();
        for i in 0..200 {
            let category = if i % 2 == 0 { "assets.textures" } else { "assets.fonts" };
            assert!(seen.insert(ids.register(&format!("file{}.png", i), category).unwrap()));
        }
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_collision_regenerates() {
        let mut sequence = vec!["uuid_b", "uuid_a", "uuid_a"].into_iter().map(String::from).collect::<Vec<_>>();
        let mut ids = IdentityRegistry::new().with_generator(move || {
            let next = sequence.pop().unwrap_or_else(|| "uuid_z".to_string());
            Identifier::parse(next).unwrap()
        });

        let first = ids.register("one", "code").unwrap();
        let second = ids.register("two", "code").unwrap();
        assert_eq!(first.as_str(), "uuid_a");
        // The second "uuid_a" collides and is discarded
        assert_eq!(second.as_str(), "uuid_b");
    }

    #[test]
    fn test_lookups() {
        let mut ids = IdentityRegistry::new();
        let id = ids.register("main.cpp", "code").unwrap();
        assert_eq!(ids.resolve("main.cpp"), Some(&id));
        assert_eq!(ids.resolve("other.cpp"), None);
        assert_eq!(ids.locate(&id), Some("code"));
        assert_eq!(ids.get(&id), Some("main.cpp"));
    }

    #[test]
    fn test_remove() {
        let mut ids = IdentityRegistry::new();
        let a = ids.register("a", "assets.textures").unwrap();
        ids.register("b", "assets.textures").unwrap();

        assert!(ids.remove_identifier(&a));
        assert!(!ids.remove_identifier(&a));
        assert_eq!(ids.resolve("a"), None);
        assert!(ids.remove_key("b"));
        assert!(ids.is_empty());
    }

    #[test]
    fn test_tree_shape() {
        let mut n = 0;
        let mut ids = IdentityRegistry::new().with_generator(move || {
            n += 1;
            Identifier::parse(format!("uuid_{}", n)).unwrap()
        });
        ids.register("img/a.png", "assets.textures").unwrap();
        ids.register("fonts/f.ttf", "assets.fonts").unwrap();

        insta::assert_json_snapshot!(ids.tree(), @r###"
        {
          "assets": {
            "fonts": {
              "uuid_2": "fonts/f.ttf"
            },
            "textures": {
              "uuid_1": "img/a.png"
            }
          }
        }
        "###);
    }

    #[test]
    fn test_persist_requires_path() {
        let ids = IdentityRegistry::new();
        assert!(matches!(ids.persist(), Err(CraftError::Registry { .. })));
    }

    #[test]
    fn test_persist_and_restore_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build").join("uuid.json");

        let mut first = IdentityRegistry::bound_to(&path);
        let tex = first.register("img/a.png", "assets.textures").unwrap();
        let font = first.register("fonts/f.ttf", "assets.fonts").unwrap();
        assert!(first.persist().unwrap());

        let mut second = IdentityRegistry::open(&path).unwrap();
        assert_eq!(second.resolve("img/a.png"), Some(&tex));
        assert_eq!(second.locate(&font), Some("assets.fonts"));
        assert_eq!(second.register("img/a.png", "assets.textures").unwrap(), tex);

        let new = second.register("img/b.png", "assets.textures").unwrap();
        assert_ne!(new, tex);
        assert_ne!(new, font);
    }

    #[test]
    fn test_persist_skips_identical_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uuid.json");

        let mut ids = IdentityRegistry::bound_to(&path);
        ids.register("x", "assets.textures").unwrap();
        assert!(ids.persist().unwrap());
        assert!(!ids.persist().unwrap());

        ids.register("y", "assets.textures").unwrap();
        assert!(ids.persist().unwrap());
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let ids = IdentityRegistry::open(dir.path().join("missing.json")).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_restore_rejects_malformed_tree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uuid.json");
        fs::write(&path, r#"{"assets": {"textures": "oops"}}"#).unwrap();
        assert!(IdentityRegistry::open(&path).is_err());

        fs::write(&path, "not json").unwrap();
        assert!(IdentityRegistry::open(&path).is_err());
    }

    #[test]
    fn test_persisted_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uuid.json");
        let mut ids = IdentityRegistry::bound_to(&path).with_generator(|| Identifier::parse("uuid_0001").unwrap());
        ids.register("img/a.png", "assets.textures").unwrap();
        ids.persist().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "{\n    \"assets\": {\n        \"textures\": {\n            \"uuid_0001\": \"img/a.png\"\n        }\n    }\n}"
        );
    }

    #[test]
    fn test_entries_and_list_category() {
        let mut ids = IdentityRegistry::new();
        let a = ids.register("a.png", "assets.textures").unwrap();
        let f = ids.register("f.ttf", "assets.fonts").unwrap();

        let listed = ids.list_category("assets.textures");
        assert_eq!(listed, vec![(a.clone(), "a.png".to_string())]);

        let entries = ids.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&(f, "assets.fonts".to_string(), "f.ttf".to_string())));
    }

    #[test]
    fn test_identifier_named_category_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uuid.json");
        let mut ids = IdentityRegistry::bound_to(&path);

        let err = ids.register("img/a.png", "assets.uuid_textures").unwrap_err();
        assert!(matches!(err, CraftError::Registry { .. }));
        assert!(ids.is_empty());
        assert!(ids.tree().children.is_empty());

        ids.register("img/a.png", "assets.textures").unwrap();
        ids.persist().unwrap();
        let reopened = IdentityRegistry::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_category_path_is_normalized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uuid.json");
        let mut ids = IdentityRegistry::bound_to(&path);

        let id = ids.register("data/a.bin", ".assets..other.").unwrap();
        assert_eq!(ids.locate(&id), Some("assets.other"));
        assert_eq!(ids.get(&id), Some("data/a.bin"));
        ids.persist().unwrap();

        let reopened = IdentityRegistry::open(&path).unwrap();
        assert_eq!(reopened.locate(&id), Some("assets.other"));
        assert_eq!(reopened.entries(), ids.entries());
    }

    #[test]
    fn test_persist_refuses_unreadable_tree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uuid.json");
        let mut ids = IdentityRegistry::bound_to(&path);
        ids.tree
            .children
            .insert("textures".to_string(), TreeNode::Key("img/a.png".to_string()));

        assert!(matches!(ids.persist(), Err(CraftError::Registry { .. })));
        assert!(!path.exists());
    }
}
