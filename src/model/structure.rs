//! Logical structure rebuilt from tag markers in page content.

use indexmap::IndexMap;
use serde::Serialize;

use super::ids::TagKey;
use super::page::{ContentOp, Page, ARTIFACT};

/// A node of the structure tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StructureNode {
    /// A structure element
    Element(StructureElement),
    /// Marked content on a page
    Content {
        /// Page index (0-based)
        page: usize,
        /// Text shown, empty for graphics
        text: String,
    },
}

/// A structure element with its children in reading order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureElement {
    /// Role, e.g. "P"
    pub role: String,
    /// Attributes
    pub attributes: IndexMap<String, String>,
    /// Child elements and content
    pub children: Vec<StructureNode>,
}

impl StructureElement {
    fn new(role: impl Into<String>, attributes: IndexMap<String, String>) -> Self {
        Self {
            role: role.into(),
            attributes,
            children: Vec::new(),
        }
    }

    /// Concatenated text of all descendant content, in order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                StructureNode::Element(e) => e.collect_text(out),
                StructureNode::Content { text, .. } => {
                    if !out.is_empty() && !text.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(text);
                },
            }
        }
    }

    /// Child elements.
    pub fn elements(&self) -> impl Iterator<Item = &StructureElement> {
        self.children.iter().filter_map(|c| match c {
            StructureNode::Element(e) => Some(e),
            StructureNode::Content { .. } => None,
        })
    }

    /// Number of elements in this subtree, self included.
    pub fn count(&self) -> usize {
        1 + self.elements().map(|e| e.count()).sum::<usize>()
    }

    /// Element at a path of child element indices.
    fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut StructureElement> {
        let mut node = self;
        for &i in path {
            node = match node.children.get_mut(i)? {
                StructureNode::Element(e) => e,
                StructureNode::Content { .. } => return None,
            };
        }
        Some(node)
    }
}

/// Build the structure tree of a sequence of pages. Elements that continue
/// across pages (same tag key) become one element. Artifacts and the
/// content inside them are left out.
pub(crate) fn build(pages: &[Page]) -> StructureElement {
    let mut root = StructureElement::new("Document", IndexMap::new());
    // Child index paths of every element seen so far, by key.
    let mut known: IndexMap<TagKey, Vec<usize>> = IndexMap::new();

    for (page_index, page) in pages.iter().enumerate() {
        let mut stack: Vec<Vec<usize>> = Vec::new();
        let mut artifact_depth = 0usize;

        for op in page.content() {
            match op {
                ContentOp::BeginTag { key, role, attributes } => {
                    if artifact_depth > 0 || role == ARTIFACT {
                        artifact_depth += 1;
                        continue;
                    }
                    if let Some(path) = known.get(key) {
                        stack.push(path.clone());
                        continue;
                    }
                    let mut path = stack.last().cloned().unwrap_or_default();
                    let parent = match root.at_path_mut(&path) {
                        Some(parent) => parent,
                        None => continue,
                    };
                    let element = StructureElement::new(role.clone(), attributes.clone());
                    parent.children.push(StructureNode::Element(element));
                    path.push(parent.children.len() - 1);
                    known.insert(*key, path.clone());
                    stack.push(path);
                },
                ContentOp::EndTag => {
                    if artifact_depth > 0 {
                        artifact_depth -= 1;
                    } else {
                        stack.pop();
                    }
                },
                ContentOp::Text { text, .. } if artifact_depth == 0 => {
                    if let Some(parent) = stack.last().and_then(|path| root.at_path_mut(path)) {
                        parent.children.push(StructureNode::Content {
                            page: page_index,
                            text: text.clone(),
                        });
                    }
                },
                ContentOp::Rectangle { .. } | ContentOp::Line { .. } | ContentOp::Image { .. }
                    if artifact_depth == 0 =>
                {
                    if let Some(parent) = stack.last().and_then(|path| root.at_path_mut(path)) {
                        parent.children.push(StructureNode::Content {
                            page: page_index,
                            text: String::new(),
                        });
                    }
                },
                _ => {},
            }
        }
    }
    log::debug!("structure tree has {} elements", root.count() - 1);
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageSize;
    use crate::layout::LayoutBox;
    use crate::style::Style;

    #[test]
    fn test_nested_roles() {
        let mut page = Page::new(PageSize::A4);
        page.begin_tag("Sect", IndexMap::new());
        page.begin_tag("H1", IndexMap::new());
        page.draw_text("Title", 0.0, 0.0);
        page.end_tag().unwrap();
        page.begin_tag("P", IndexMap::new());
        page.draw_text("Body", 0.0, 0.0);
        page.end_tag().unwrap();
        page.end_tag().unwrap();

        let root = build(&[page]);
        let sect = root.elements().next().unwrap();
        assert_eq!(sect.role, "Sect");
        let roles: Vec<&str> = sect.elements().map(|e| e.role.as_str()).collect();
        assert_eq!(roles, vec!["H1", "P"]);
        assert_eq!(sect.text(), "Title Body");
    }

    #[test]
    fn test_artifacts_excluded() {
        let mut page = Page::new(PageSize::A4);
        page.begin_artifact();
        page.draw_text("page 1", 0.0, 0.0);
        page.end_tag().unwrap();
        page.begin_tag("P", IndexMap::new());
        page.draw_text("content", 0.0, 0.0);
        page.end_tag().unwrap();
        let root = build(&[page]);
        assert_eq!(root.count(), 2);
        assert_eq!(root.text(), "content");
    }

    #[test]
    fn test_element_continued_on_next_page_is_merged() {
        let mut lbox = LayoutBox::new(120.0);
        lbox.begin_tag("P", IndexMap::new());
        let words: String = (0..40).map(|i| format!("w{} ", i)).collect();
        lbox.add_text(&words, &Style::new(), None);
        lbox.end_tag().unwrap();
        lbox.flush();
        let rest = lbox.split_at(30.0).unwrap();
        assert!(!rest.lines().is_empty());

        let mut first = Page::new(PageSize::A4);
        first.draw_layout_box(&lbox, 72.0, 800.0).unwrap();
        let mut second = Page::new(PageSize::A4);
        second.draw_layout_box(&rest, 72.0, 800.0).unwrap();

        let root = build(&[first, second]);
        assert_eq!(root.count(), 2);
        let p = root.elements().next().unwrap();
        assert!(p.text().starts_with("w0 "));
        assert!(p.text().ends_with("w39"));
        let pages: Vec<usize> = p
            .children
            .iter()
            .filter_map(|c| match c {
                StructureNode::Content { page, .. } => Some(*page),
                _ => None,
            })
            .collect();
        assert!(pages.contains(&0) && pages.contains(&1));
    }
}
