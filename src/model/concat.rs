//! Appending one document to another.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::action::Action;
use super::bookmark::Bookmark;
use super::document::Document;
use super::ids::{AnnotationId, PageId};
use crate::error::{Error, Result};

/// How the bookmarks of an appended document are added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkMode {
    /// Append them after the existing top level bookmarks
    Flatten,
    /// Nest them under a new bookmark with this title that points at the
    /// first appended page
    Nested(String),
}

struct IdMap {
    pages: IndexMap<PageId, PageId>,
    annotations: IndexMap<AnnotationId, AnnotationId>,
}

impl IdMap {
    fn action(&self, action: &mut Action) {
        if let Action::GoTo { page, .. } = action {
            if let Some(new) = self.pages.get(page) {
                *page = *new;
            }
        }
    }

    fn bookmark(&self, bookmark: &mut Bookmark) {
        bookmark.walk_mut(&mut |b| {
            if let Some(action) = &mut b.action {
                self.action(action);
            }
        });
    }
}

impl Document {
    /// Append the pages, bookmarks, named actions, embedded files and form
    /// elements of `other`. Returns the number of pages appended.
    ///
    /// Form element names must not collide: if any do, this fails with
    /// [`Error::NameCollision`] listing exactly those names and leaves
    /// `self` untouched. Appended pages and annotations get fresh ids.
    /// An XFA form in `other` is dropped; signatures of `other` are not
    /// carried over.
    pub fn concatenate(&mut self, mut other: Document, mode: BookmarkMode) -> Result<usize> {
        let collisions: BTreeSet<String> = other
            .form()
            .names()
            .filter(|name| self.form().element(name).is_some())
            .map(|name| name.to_string())
            .collect();
        if !collisions.is_empty() {
            return Err(Error::NameCollision(collisions));
        }

        if other.form_mut().remove_xfa() {
            log::warn!("dropping XFA form of appended document");
        }
        let dropped = other.clear_signatures();
        if dropped > 0 {
            log::warn!("{} signature(s) of appended document not carried over", dropped);
        }

        let mut ids = IdMap {
            pages: IndexMap::new(),
            annotations: IndexMap::new(),
        };
        let mut pages = std::mem::take(other.pages_mut());
        let mut tags = IndexMap::new();
        for page in &mut pages {
            let old = page.id();
            let annotations = page.renew_ids(&mut tags);
            ids.pages.insert(old, page.id());
            ids.annotations.extend(annotations);
        }
        for page in &mut pages {
            for a in page.annotations_mut() {
                for action in a.actions.values_mut() {
                    ids.action(action);
                }
            }
        }
        let first_page = pages.first().map(|p| p.id());
        let count = pages.len();
        self.pages_mut().extend(pages);

        let mut bookmarks = std::mem::take(other.bookmarks_mut());
        for b in &mut bookmarks {
            ids.bookmark(b);
        }
        match mode {
            BookmarkMode::Flatten => self.bookmarks_mut().extend(bookmarks),
            BookmarkMode::Nested(title) => {
                let mut root = match first_page {
                    Some(id) => Bookmark::to_page(title, id),
                    None => Bookmark::new(title),
                };
                root.children = bookmarks;
                self.bookmarks_mut().push(root);
            },
        }

        for (name, mut action) in std::mem::take(other.named_actions_mut()) {
            if self.named_actions().contains_key(&name) {
                log::warn!("named action '{}' already exists, keeping the original", name);
                continue;
            }
            ids.action(&mut action);
            self.named_actions_mut().insert(name, action);
        }

        for (name, file) in std::mem::take(other.embedded_files_mut()) {
            let mut unique = name.clone();
            let mut n = 2;
            while self.embedded_files().contains_key(&unique) {
                unique = format!("{} ({})", name, n);
                n += 1;
            }
            if unique != name {
                log::debug!("embedded file '{}' renamed to '{}'", name, unique);
            }
            self.embedded_files_mut().insert(unique, file);
        }

        let elements = other.form_mut().take_elements();
        let mut remapped = IndexMap::with_capacity(elements.len());
        for (name, mut element) in elements {
            for w in &mut element.widgets {
                if let Some(page) = ids.pages.get(&w.page) {
                    w.page = *page;
                }
                if let Some(annotation) = ids.annotations.get(&w.annotation) {
                    w.annotation = *annotation;
                }
            }
            for action in element.actions.values_mut() {
                ids.action(action);
            }
            remapped.insert(name, element);
        }
        self.form_mut().extend_unchecked(remapped);

        for (name, script) in std::mem::take(other.javascript_mut()) {
            self.javascript_mut().entry(name).or_insert(script);
        }
        for layer in std::mem::take(other.layers_mut()) {
            if !self.layers().iter().any(|l| l.id() == layer.id()) {
                self.layers_mut().push(layer);
            }
        }
        for intent in std::mem::take(other.output_intents_mut()) {
            if !self
                .output_intents()
                .iter()
                .any(|i| i.intent_type == intent.intent_type)
            {
                self.output_intents_mut().push(intent);
            }
        }

        log::debug!("appended {} pages", count);
        Ok(count)
    }
}
