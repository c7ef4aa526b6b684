//! Structure tags applied to flowed content.
//!
//! Tags form a tree stored in an arena. Every flow item records the
//! innermost tag open when it was added; the full path is recovered by
//! walking parents. Each node carries a [`TagKey`] so that an element
//! split across boxes (and therefore pages) is still one element.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::model::TagKey;

/// Index of a node in a [`TagArena`].
pub type TagNodeId = usize;

/// An open or closed structure tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TagNode {
    /// Identity shared by every fragment of the element
    pub key: TagKey,
    /// Structure role, e.g. "P" or "H1"
    pub role: String,
    /// Attributes such as "Lang" or "Alt"
    pub attributes: IndexMap<String, String>,
    /// Enclosing tag
    pub parent: Option<TagNodeId>,
}

/// Tag tree plus the stack of currently open tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagArena {
    nodes: Vec<TagNode>,
    open: Vec<TagNodeId>,
}

impl TagArena {
    /// Empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a tag nested in the current one.
    pub fn begin(&mut self, role: impl Into<String>, attributes: IndexMap<String, String>) -> TagNodeId {
        let id = self.nodes.len();
        self.nodes.push(TagNode {
            key: TagKey::new(),
            role: role.into(),
            attributes,
            parent: self.open.last().copied(),
        });
        self.open.push(id);
        id
    }

    /// Close the innermost tag.
    pub fn end(&mut self) -> Result<TagNodeId> {
        self.open
            .pop()
            .ok_or_else(|| Error::state("end_tag without matching begin_tag"))
    }

    /// Innermost open tag.
    pub fn current(&self) -> Option<TagNodeId> {
        self.open.last().copied()
    }

    /// Number of open tags.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Node by id.
    pub fn node(&self, id: TagNodeId) -> Option<&TagNode> {
        self.nodes.get(id)
    }

    /// Path from the outermost tag down to `id`.
    pub fn path(&self, id: Option<TagNodeId>) -> Vec<TagNodeId> {
        let mut path = Vec::new();
        let mut cursor = id;
        while let Some(i) = cursor {
            path.push(i);
            cursor = self.nodes.get(i).and_then(|n| n.parent);
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_and_path() {
        let mut arena = TagArena::new();
        let doc = arena.begin("Div", IndexMap::new());
        let p = arena.begin("P", IndexMap::new());
        assert_eq!(arena.path(Some(p)), vec![doc, p]);
        assert_eq!(arena.end().unwrap(), p);
        assert_eq!(arena.current(), Some(doc));
        arena.end().unwrap();
        assert!(arena.path(None).is_empty());
    }

    #[test]
    fn test_unmatched_end_is_state_misuse() {
        let mut arena = TagArena::new();
        assert!(matches!(arena.end(), Err(Error::StateMisuse(_))));
    }

    #[test]
    fn test_clone_keeps_keys() {
        let mut arena = TagArena::new();
        let p = arena.begin("P", IndexMap::new());
        let copy = arena.clone();
        assert_eq!(copy.node(p).unwrap().key, arena.node(p).unwrap().key);
        assert_eq!(copy.depth(), 1);
    }
}
