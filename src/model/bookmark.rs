//! Document outline (bookmarks).

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::ids::PageId;

/// A node in the bookmark tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Title shown in the outline
    pub title: String,
    /// Action run when the bookmark is selected
    pub action: Option<Action>,
    /// Whether children are initially expanded
    pub open: bool,
    /// Child bookmarks in display order
    pub children: Vec<Bookmark>,
}

impl Bookmark {
    /// Create a bookmark with no action.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            action: None,
            open: false,
            children: Vec::new(),
        }
    }

    /// Bookmark jumping to a page.
    pub fn to_page(title: impl Into<String>, page: PageId) -> Self {
        Self {
            action: Some(Action::goto(page)),
            ..Self::new(title)
        }
    }

    /// Set the action.
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Append a child and return self.
    pub fn with_child(mut self, child: Bookmark) -> Self {
        self.children.push(child);
        self
    }

    /// Visit this bookmark and all descendants, depth first.
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a Bookmark>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }

    /// Visit this bookmark and all descendants mutably, depth first.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Bookmark)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_is_depth_first() {
        let tree = Bookmark::new("1")
            .with_child(Bookmark::new("1.1").with_child(Bookmark::new("1.1.1")))
            .with_child(Bookmark::new("1.2"));
        let mut out = Vec::new();
        tree.walk(&mut out);
        let titles: Vec<&str> = out.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["1", "1.1", "1.1.1", "1.2"]);
    }

    #[test]
    fn test_walk_mut() {
        let mut tree = Bookmark::new("a").with_child(Bookmark::new("b"));
        tree.walk_mut(&mut |b| b.open = true);
        assert!(tree.open && tree.children[0].open);
    }
}
